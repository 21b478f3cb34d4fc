use serde::{Deserialize, Serialize};

use crate::lexer::Location;

use super::{Expression, TySpecId};

/// A braced sequence of statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Declaration {
        name: String,
        ty: Option<TySpecId>,
        value: Option<Expression>,
        mutable: bool,
        loc: Location,
    },
    Assignment {
        name: String,
        value: Expression,
        loc: Location,
    },
    FieldAssignment {
        object: Expression,
        field: String,
        value: Expression,
        loc: Location,
    },
    Return {
        value: Option<Expression>,
        loc: Location,
    },
    If {
        condition: Expression,
        then_branch: Block,
        else_branch: Option<Block>,
        loc: Location,
    },
    While {
        condition: Expression,
        body: Block,
        loc: Location,
    },
    For {
        init: Box<Statement>,
        condition: Expression,
        step: Box<Statement>,
        body: Block,
        loc: Location,
    },
    Expr {
        expr: Expression,
        loc: Location,
    },
}

impl Statement {
    pub fn loc(&self) -> Location {
        match self {
            Statement::Declaration { loc, .. }
            | Statement::Assignment { loc, .. }
            | Statement::FieldAssignment { loc, .. }
            | Statement::Return { loc, .. }
            | Statement::If { loc, .. }
            | Statement::While { loc, .. }
            | Statement::For { loc, .. }
            | Statement::Expr { loc, .. } => loc.clone(),
        }
    }
}
