//=====================================================
// File: ast/mod.rs
//=====================================================
// Goal: BotScript Abstract Syntax Tree definitions
// Objective: Define position-stamped node types for programs, statements,
//            expressions, and agent commands
//=====================================================

use std::fmt;

use crate::tokenizer::Position;

/// A parsed BotScript program: the ordered top-level statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// BotScript statements. Every node carries the position of its first token
/// for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        initializer: Expr,
        position: Position,
    },
    Assignment {
        target: String,
        value: Expr,
        position: Position,
    },
    If {
        condition: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
        position: Position,
    },
    Repeat {
        count: Expr,
        body: Vec<Stmt>,
        position: Position,
    },
    Command(Command),
    /// A bare expression whose value is discarded.
    Expression(Expr),
}

impl Stmt {
    pub fn position(&self) -> Position {
        match self {
            Stmt::VarDecl { position, .. }
            | Stmt::Assignment { position, .. }
            | Stmt::If { position, .. }
            | Stmt::Repeat { position, .. } => *position,
            Stmt::Command(command) => command.position(),
            Stmt::Expression(expr) => expr.position(),
        }
    }
}

/// BotScript expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number {
        value: f64,
        position: Position,
    },
    String {
        value: String,
        position: Position,
    },
    Boolean {
        value: bool,
        position: Position,
    },
    Variable {
        name: String,
        position: Position,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        position: Position,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: Position,
    },
}

impl Expr {
    pub fn number(value: f64, position: Position) -> Self {
        Expr::Number { value, position }
    }

    pub fn string(value: impl Into<String>, position: Position) -> Self {
        Expr::String {
            value: value.into(),
            position,
        }
    }

    pub fn boolean(value: bool, position: Position) -> Self {
        Expr::Boolean { value, position }
    }

    pub fn variable(name: impl Into<String>, position: Position) -> Self {
        Expr::Variable {
            name: name.into(),
            position,
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr, position: Position) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
            position,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr, position: Position) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
            position,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Expr::Number { position, .. }
            | Expr::String { position, .. }
            | Expr::Boolean { position, .. }
            | Expr::Variable { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Unary { position, .. } => *position,
        }
    }
}

/// Binary operators, lowest to highest precedence tier:
/// `or` < `and` < equality < relational < additive < multiplicative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Negate => "-",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Agent command payloads. Argument arity is fixed per command; optional
/// arguments are represented as `Option`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say {
        message: Expr,
        position: Position,
    },
    Goto {
        x: Expr,
        y: Expr,
        z: Expr,
        position: Position,
    },
    Attack {
        target: Expr,
        position: Position,
    },
    Dig {
        block: Option<Expr>,
        position: Position,
    },
    Place {
        item: Expr,
        coords: Option<(Expr, Expr, Expr)>,
        position: Position,
    },
    Equip {
        item: Expr,
        position: Position,
    },
    Drop {
        item: Expr,
        count: Option<Expr>,
        position: Position,
    },
    Wait {
        seconds: Expr,
        position: Position,
    },
}

impl Command {
    pub fn position(&self) -> Position {
        match self {
            Command::Say { position, .. }
            | Command::Goto { position, .. }
            | Command::Attack { position, .. }
            | Command::Dig { position, .. }
            | Command::Place { position, .. }
            | Command::Equip { position, .. }
            | Command::Drop { position, .. }
            | Command::Wait { position, .. } => *position,
        }
    }

    /// Keyword the command was written with, for logs and failure messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Say { .. } => "say",
            Command::Goto { .. } => "goto",
            Command::Attack { .. } => "attack",
            Command::Dig { .. } => "dig",
            Command::Place { .. } => "place",
            Command::Equip { .. } => "equip",
            Command::Drop { .. } => "drop",
            Command::Wait { .. } => "wait",
        }
    }
}

//=====================================================
// End of file
//=====================================================
