use thiserror::Error;

use crate::world::WorldError;

/// BotScript runtime errors.
///
/// All variants are raised internally as `Err` values and caught once at the
/// top of `Interpreter::execute`, which converts them into an error result
/// and records the message in the execution stats. Only the message string is
/// part of the user-visible contract.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Cannot assign to readonly variable '{0}'")]
    ReadonlyViolation(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid command argument: {0}")]
    InvalidCommandArgument(String),

    #[error("Command failed: {0}")]
    CommandFailure(String),
}

impl From<WorldError> for RuntimeError {
    fn from(value: WorldError) -> Self {
        RuntimeError::CommandFailure(value.to_string())
    }
}
