use serde::{Deserialize, Serialize};

use crate::lexer::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Neg,
    Not,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
        }
    }
}

/// Untyped expression tree produced by the parser. Every node carries the
/// location of its first token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Integer {
        value: i64,
        loc: Location,
    },
    Float {
        value: f64,
        loc: Location,
    },
    Boolean {
        value: bool,
        loc: Location,
    },
    StringLit {
        value: String,
        loc: Location,
    },
    Identifier {
        name: String,
        loc: Location,
    },
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
        loc: Location,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        loc: Location,
    },
    Call {
        callee: String,
        arguments: Vec<Expression>,
        loc: Location,
    },
    StructInit {
        name: String,
        field_values: Vec<Expression>,
        loc: Location,
    },
    FieldAccess {
        object: Box<Expression>,
        field: String,
        loc: Location,
    },
    ArrayLit {
        elements: Vec<Expression>,
        loc: Location,
    },
    Index {
        array: Box<Expression>,
        index: Box<Expression>,
        loc: Location,
    },
}

impl Expression {
    pub fn loc(&self) -> Location {
        match self {
            Expression::Integer { loc, .. }
            | Expression::Float { loc, .. }
            | Expression::Boolean { loc, .. }
            | Expression::StringLit { loc, .. }
            | Expression::Identifier { loc, .. }
            | Expression::Unary { loc, .. }
            | Expression::Binary { loc, .. }
            | Expression::Call { loc, .. }
            | Expression::StructInit { loc, .. }
            | Expression::FieldAccess { loc, .. }
            | Expression::ArrayLit { loc, .. }
            | Expression::Index { loc, .. } => loc.clone(),
        }
    }
}
