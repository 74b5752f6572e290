use crate::ast::{BinaryOp, Command, Expr, Program, Stmt, UnaryOp};
use crate::tokenizer::{Position, Token, TokenKind};

/// Parser error types
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        position: Position,
    },
    UnexpectedEndOfInput {
        expected: String,
        position: Position,
    },
    InvalidSyntax {
        message: String,
        position: Position,
    },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::InvalidSyntax { position, .. } => *position,
        }
    }

    pub fn line(&self) -> usize {
        self.position().line
    }

    pub fn column(&self) -> usize {
        self.position().column
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                position,
            } => {
                write!(
                    f,
                    "Expected {} but found {:?} at line {}, column {}",
                    expected, found, position.line, position.column
                )
            }
            ParseError::UnexpectedEndOfInput { expected, position } => {
                write!(
                    f,
                    "Unexpected end of input, expected {} at line {}, column {}",
                    expected, position.line, position.column
                )
            }
            ParseError::InvalidSyntax { message, position } => {
                write!(
                    f,
                    "Invalid syntax: {} at line {}, column {}",
                    message, position.line, position.column
                )
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Recursive descent parser for BotScript.
///
/// Parsing aborts on the first malformed construct; no recovery, no partial
/// AST. Binary operators are left-associative and built iteratively at each
/// precedence level.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        // The lexer always terminates its stream with Eof; tolerate callers
        // that hand over an empty vector directly.
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, "", 1, 1));
        }
        Self { tokens, current: 0 }
    }

    /// Parse a complete BotScript program.
    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
            self.consume_statement_terminator()?;
        }

        Ok(Program::new(statements))
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Var => self.parse_var_declaration(),
            TokenKind::Set => self.parse_assignment(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Repeat => self.parse_repeat_statement(),
            _ if kind.is_command_keyword() => Ok(Stmt::Command(self.parse_command()?)),
            _ => {
                // Anything else is a bare expression statement.
                let expr = self.parse_expression()?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    /// `var name = expr`
    fn parse_var_declaration(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // consume 'var'

        let name = self.consume_identifier("variable name")?;
        self.consume(TokenKind::Assign, "'=' after variable name")?;
        let initializer = self.parse_expression()?;

        Ok(Stmt::VarDecl {
            name,
            initializer,
            position,
        })
    }

    /// `set name = expr`
    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // consume 'set'

        let target = self.consume_identifier("variable name after 'set'")?;
        self.consume(TokenKind::Assign, "'=' in assignment")?;
        let value = self.parse_expression()?;

        Ok(Stmt::Assignment {
            target,
            value,
            position,
        })
    }

    /// `if expr { ... } (else { ... })?`
    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // consume 'if'

        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;

        let else_block = if self.check(TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
            position,
        })
    }

    /// `repeat expr { ... }`
    fn parse_repeat_statement(&mut self) -> Result<Stmt, ParseError> {
        let position = self.current_position();
        self.advance(); // consume 'repeat'

        let count = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Stmt::Repeat {
            count,
            body,
            position,
        })
    }

    /// `{ statement* }`, newline-separated.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.consume(TokenKind::LeftBrace, "'{' to open block")?;

        let mut statements = Vec::new();
        loop {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            if self.check(TokenKind::RightBrace) {
                break;
            }
            if self.is_at_end() {
                return Err(ParseError::UnexpectedEndOfInput {
                    expected: "'}' to close block".to_string(),
                    position: self.current_position(),
                });
            }
            statements.push(self.parse_statement()?);
            if !self.check(TokenKind::RightBrace) {
                self.consume_statement_terminator()?;
            }
        }

        self.consume(TokenKind::RightBrace, "'}' to close block")?;
        Ok(statements)
    }

    /// Command statements, dispatched by keyword. Each command has its own
    /// fixed/optional argument arity; an optional argument is attempted only
    /// when the next token can begin an expression.
    fn parse_command(&mut self) -> Result<Command, ParseError> {
        let position = self.current_position();
        let keyword = self.advance().kind;

        match keyword {
            TokenKind::Say => {
                let message = self.parse_expression()?;
                Ok(Command::Say { message, position })
            }
            TokenKind::Goto => {
                let x = self.parse_expression()?;
                let y = self.parse_expression()?;
                let z = self.parse_expression()?;
                Ok(Command::Goto { x, y, z, position })
            }
            TokenKind::Attack => {
                let target = self.parse_expression()?;
                Ok(Command::Attack { target, position })
            }
            TokenKind::Dig => {
                let block = if self.next_begins_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Command::Dig { block, position })
            }
            TokenKind::Place => {
                let item = self.parse_expression()?;
                let coords = if self.next_begins_expression() {
                    let x = self.parse_expression()?;
                    let y = self.parse_expression()?;
                    let z = self.parse_expression()?;
                    Some((x, y, z))
                } else {
                    None
                };
                Ok(Command::Place {
                    item,
                    coords,
                    position,
                })
            }
            TokenKind::Equip => {
                let item = self.parse_expression()?;
                Ok(Command::Equip { item, position })
            }
            TokenKind::Drop => {
                let item = self.parse_expression()?;
                let count = if self.next_begins_expression() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                Ok(Command::Drop {
                    item,
                    count,
                    position,
                })
            }
            TokenKind::Wait => {
                let seconds = self.parse_expression()?;
                Ok(Command::Wait { seconds, position })
            }
            other => Err(ParseError::InvalidSyntax {
                message: format!("'{:?}' is not a command", other),
                position,
            }),
        }
    }

    //
    // Expressions, lowest to highest precedence.
    //

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_and()?;
        while self.check(TokenKind::Or) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_and()?;
            expr = Expr::binary(expr, BinaryOp::Or, right, position);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.check(TokenKind::And) {
            let position = self.current_position();
            self.advance();
            let right = self.parse_equality()?;
            expr = Expr::binary(expr, BinaryOp::And, right, position);
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_relational()?;
            expr = Expr::binary(expr, op, right, position);
        }
        Ok(expr)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_additive()?;
            expr = Expr::binary(expr, op, right, position);
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = Expr::binary(expr, op, right, position);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                _ => break,
            };
            let position = self.current_position();
            self.advance();
            let right = self.parse_unary()?;
            expr = Expr::binary(expr, op, right, position);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::Not => {
                let position = self.current_position();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOp::Not, operand, position))
            }
            TokenKind::Minus => {
                let position = self.current_position();
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOp::Negate, operand, position))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let position = self.current_position();

        match self.peek().kind {
            TokenKind::Number => {
                let token = self.advance();
                let text = token.text.clone();
                match text.parse::<f64>() {
                    Ok(value) => Ok(Expr::number(value, position)),
                    Err(_) => Err(ParseError::InvalidSyntax {
                        message: format!("invalid number literal '{}'", text),
                        position,
                    }),
                }
            }
            TokenKind::String => {
                let token = self.advance();
                Ok(Expr::string(token.text.clone(), position))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::boolean(true, position))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::boolean(false, position))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                Ok(Expr::variable(token.text.clone(), position))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "')' to close grouping")?;
                Ok(expr)
            }
            TokenKind::Invalid => {
                let token = self.peek();
                Err(ParseError::InvalidSyntax {
                    message: format!("unrecognized input '{}'", token.text),
                    position,
                })
            }
            TokenKind::Eof => Err(ParseError::UnexpectedEndOfInput {
                expected: "expression".to_string(),
                position,
            }),
            found => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found,
                position,
            }),
        }
    }

    //
    // Cursor helpers.
    //

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        // The lexer guarantees a trailing Eof token.
        self.tokens
            .get(self.current)
            .unwrap_or_else(|| self.tokens.last().expect("token stream is never empty"))
    }

    fn current_position(&self) -> Position {
        self.peek().position()
    }

    fn advance(&mut self) -> &Token {
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        } else {
            self.current = self.tokens.len() - 1;
        }
        &self.tokens[self.current - 1]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn next_begins_expression(&self) -> bool {
        self.peek().kind.can_begin_expression()
    }

    fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else if self.is_at_end() {
            Err(ParseError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                position: self.current_position(),
            })
        } else {
            Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek().kind,
                position: self.current_position(),
            })
        }
    }

    fn consume_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        let token = self.consume(TokenKind::Identifier, expected)?;
        Ok(token.text.clone())
    }

    /// Statements end at a newline, a closing brace, or end of input.
    fn consume_statement_terminator(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof | TokenKind::RightBrace => Ok(()),
            found => Err(ParseError::UnexpectedToken {
                expected: "newline after statement".to_string(),
                found,
                position: self.current_position(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, Command, Expr, Stmt};
    use crate::tokenizer::Lexer;

    fn parse_source(source: &str) -> Result<Program, ParseError> {
        Parser::new(Lexer::new(source).tokenize()).parse()
    }

    #[test]
    fn test_var_declaration() {
        let program = parse_source("var health = 20").expect("parse");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::VarDecl { name, initializer, .. } => {
                assert_eq!(name, "health");
                assert!(matches!(initializer, Expr::Number { value, .. } if *value == 20.0));
            }
            other => panic!("expected var declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let program = parse_source("2 + 3 * 4").expect("parse");
        match &program.statements[0] {
            Stmt::Expression(Expr::Binary { op, left, right, .. }) => {
                assert_eq!(*op, BinaryOp::Add);
                assert!(matches!(**left, Expr::Number { value, .. } if value == 2.0));
                match &**right {
                    Expr::Binary { op, .. } => assert_eq!(*op, BinaryOp::Multiply),
                    other => panic!("expected multiplication on the right, got {other:?}"),
                }
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn test_left_associativity() {
        // (10 - 4) - 3, not 10 - (4 - 3)
        let program = parse_source("10 - 4 - 3").expect("parse");
        match &program.statements[0] {
            Stmt::Expression(Expr::Binary { op, left, .. }) => {
                assert_eq!(*op, BinaryOp::Subtract);
                assert!(matches!(**left, Expr::Binary { .. }));
            }
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn test_if_else_blocks() {
        let program = parse_source("if health > 15 {\n say \"ok\"\n} else {\n say \"low\"\n}")
            .expect("parse");
        match &program.statements[0] {
            Stmt::If {
                then_block,
                else_block,
                ..
            } => {
                assert_eq!(then_block.len(), 1);
                assert_eq!(else_block.as_ref().map(|b| b.len()), Some(1));
            }
            other => panic!("expected if statement, got {other:?}"),
        }
    }

    #[test]
    fn test_goto_takes_exactly_three_coordinates() {
        let program = parse_source("goto 10 64 200").expect("parse");
        assert!(matches!(
            &program.statements[0],
            Stmt::Command(Command::Goto { .. })
        ));

        let err = parse_source("goto 10 64").expect_err("missing coordinate");
        assert!(matches!(
            err,
            ParseError::UnexpectedEndOfInput { .. } | ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_dig_argument_is_optional() {
        let program = parse_source("dig\ndig \"stone\"").expect("parse");
        assert!(matches!(
            &program.statements[0],
            Stmt::Command(Command::Dig { block: None, .. })
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::Command(Command::Dig { block: Some(_), .. })
        ));
    }

    #[test]
    fn test_drop_optional_count() {
        let program = parse_source("drop \"dirt\"\ndrop \"dirt\" 32").expect("parse");
        assert!(matches!(
            &program.statements[0],
            Stmt::Command(Command::Drop { count: None, .. })
        ));
        assert!(matches!(
            &program.statements[1],
            Stmt::Command(Command::Drop { count: Some(_), .. })
        ));
    }

    #[test]
    fn test_unary_minus_and_grouping() {
        let program = parse_source("-(2 + 3)").expect("parse");
        assert!(matches!(
            &program.statements[0],
            Stmt::Expression(Expr::Unary { .. })
        ));
    }

    #[test]
    fn test_error_carries_position() {
        let err = parse_source("var = 5").expect_err("missing name");
        assert_eq!(err.line(), 1);
        assert_eq!(err.column(), 5);
    }

    #[test]
    fn test_invalid_token_aborts_parse() {
        let err = parse_source("var x = @").expect_err("invalid token");
        assert!(err.to_string().contains("unrecognized input"));
    }

    #[test]
    fn test_empty_token_stream_parses_to_empty_program() {
        let program = Parser::new(Vec::new()).parse().expect("parse");
        assert!(program.statements.is_empty());
    }

    #[test]
    fn test_no_partial_ast_on_error() {
        // First statement is fine, second is malformed; parse must fail.
        assert!(parse_source("var x = 1\nif {").is_err());
    }
}
