//! # AIR — the typed intermediate representation
//!
//! The output of the semantic middle-end and the input of the code
//! generator. Every expression node carries a resolved [`crate::ty::TyId`],
//! every reference to a variable, function or struct carries the stable ID
//! the binder assigned, and field accesses carry the positional index code
//! generation depends on. The tree is fully owned: each child node has
//! exactly one parent.

pub mod builder;
pub mod expr;
pub mod printer;
pub mod stmt;

pub use self::builder::AirBuilder;
pub use self::expr::{BinOpKind, Expr, ExprKind, UnOpKind};
pub use self::stmt::{Field, Function, Module, Param, Stmt, StmtKind, StructDecl};
