//! BotScript: an embedded scripting language for autonomous agents.
//!
//! Pipeline: source text → [`tokenizer::Lexer`] → tokens → [`parser::Parser`]
//! → [`ast::Program`] → [`interpreter::Interpreter::execute`], with side
//! effects dispatched through the [`world::CapabilityPort`] trait.

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod tokenizer;
pub mod world;

pub use ast::Program;
pub use interpreter::{
    CommandOutcome, ExecutionResult, ExecutionState, Interpreter, StopHandle,
};
pub use parser::{ParseError, Parser};
pub use runtime::{ExecutionContext, ExecutionStats, RuntimeError, Value, VariableScope};
pub use tokenizer::{Lexer, Position, Token, TokenKind};
pub use world::{CapabilityPort, TelemetrySnapshot, WorldError};

/// Tokenize and parse a script in one step.
pub fn compile(source: &str) -> Result<Program, ParseError> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_pairs_lexer_and_parser() {
        let program = compile("var x = 1 + 2\nsay x").expect("compile");
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn test_compile_surfaces_parse_errors() {
        let err = compile("repeat {").expect_err("malformed");
        assert!(err.line() >= 1);
    }
}
