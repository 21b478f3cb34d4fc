use serde::{Deserialize, Serialize};

use crate::lexer::Location;
use crate::sema::{FunctionId, VarId};
use crate::ty::{StructId, TyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
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

impl BinOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::Mod => "%",
            BinOpKind::Eq => "==",
            BinOpKind::Ne => "!=",
            BinOpKind::Lt => "<",
            BinOpKind::Le => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::Ge => ">=",
            BinOpKind::And => "&&",
            BinOpKind::Or => "||",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinOpKind::Add | BinOpKind::Sub | BinOpKind::Mul | BinOpKind::Div | BinOpKind::Mod
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOpKind::Eq
                | BinOpKind::Ne
                | BinOpKind::Lt
                | BinOpKind::Le
                | BinOpKind::Gt
                | BinOpKind::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinOpKind::And | BinOpKind::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOpKind {
    Neg,
    Not,
}

impl UnOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnOpKind::Neg => "-",
            UnOpKind::Not => "!",
        }
    }
}

/// A typed expression. The type is the result type after checking; an
/// expression that failed to check carries [`crate::ty::ty_ids::ERROR`] and
/// downstream checks treat it as compatible with everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub ty: TyId,
    pub loc: Location,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    IntegerLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    StringLiteral(String),
    VarRef {
        name: String,
        var_id: VarId,
    },
    Binary {
        op: BinOpKind,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOpKind,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        func_id: FunctionId,
        arguments: Vec<Expr>,
    },
    StructInstantiation {
        name: String,
        struct_id: StructId,
        /// In declaration order of the struct's fields.
        field_values: Vec<Expr>,
    },
    FieldAccess {
        object: Box<Expr>,
        field_name: String,
        /// Positional index of the field inside the record.
        field_index: u32,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
}
