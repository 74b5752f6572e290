pub mod context;
pub mod error;
pub mod value;

pub use context::{ExecutionContext, ExecutionStats, VariableInfo, VariableScope};
pub use error::RuntimeError;
pub use value::Value;
