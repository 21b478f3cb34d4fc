use serde::{Deserialize, Serialize};

use crate::lexer::Location;
use crate::sema::{FunctionId, VarId};
use crate::ty::{StructId, TyId};

use super::expr::Expr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub loc: Location,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    VarDecl {
        name: String,
        var_id: VarId,
        is_mutable: bool,
        ty: TyId,
        initializer: Option<Expr>,
    },
    Assignment {
        name: String,
        var_id: VarId,
        value: Expr,
    },
    FieldAssignment {
        object: Expr,
        field_name: String,
        field_index: u32,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Vec<Stmt>,
    },
    ExprStmt {
        expression: Expr,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub var_id: VarId,
    pub ty: TyId,
    pub is_mutable: bool,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub func_id: FunctionId,
    pub params: Vec<Param>,
    pub return_ty: TyId,
    /// Empty for extern functions.
    pub body: Vec<Stmt>,
    pub is_extern: bool,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TyId,
    /// Field index for code generation; declaration order is stable.
    pub index: u32,
    pub loc: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub struct_id: StructId,
    pub ty_id: TyId,
    pub fields: Vec<Field>,
    pub loc: Location,
}

impl StructDecl {
    pub fn find_field(&self, field_name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == field_name)
    }
}

/// The fully lowered program: every unit of the compilation merged into one
/// module, structs first, functions in binding order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub structs: Vec<StructDecl>,
    pub functions: Vec<Function>,
    pub imports: Vec<String>,
}

impl Module {
    pub fn find_struct(&self, name: &str) -> Option<&StructDecl> {
        self.structs.iter().find(|decl| decl.name == name)
    }

    pub fn find_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|function| function.name == name)
    }
}
