//! Human readable rendering of an AIR module, used by `--dump-air`.

use std::fmt::Write as _;

use crate::ty::TyTable;

use super::expr::{Expr, ExprKind};
use super::stmt::{Function, Module, Stmt, StmtKind, StructDecl};

pub struct AirPrinter<'a> {
    ty_table: &'a TyTable,
    out: String,
    indent: usize,
}

impl<'a> AirPrinter<'a> {
    pub fn new(ty_table: &'a TyTable) -> Self {
        Self {
            ty_table,
            out: String::new(),
            indent: 0,
        }
    }

    pub fn print_module(mut self, module: &Module) -> String {
        self.line(format!("module {}", module.name));
        for import in &module.imports {
            self.line(format!("import {import}"));
        }

        for decl in &module.structs {
            self.print_struct(decl);
        }
        for function in &module.functions {
            self.print_function(function);
        }

        self.out
    }

    fn print_struct(&mut self, decl: &StructDecl) {
        self.line(format!(
            "struct {} (struct_id={}, ty={})",
            decl.name,
            decl.struct_id,
            self.ty_table.ty_name(decl.ty_id)
        ));
        self.indent += 1;
        for field in &decl.fields {
            self.line(format!(
                "[{}] {}: {}",
                field.index,
                field.name,
                self.ty_table.ty_name(field.ty)
            ));
        }
        self.indent -= 1;
    }

    fn print_function(&mut self, function: &Function) {
        let params = function
            .params
            .iter()
            .map(|param| {
                format!(
                    "{} %{}: {}",
                    param.name,
                    param.var_id,
                    self.ty_table.ty_name(param.ty)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let marker = if function.is_extern { "extern fun" } else { "fun" };
        self.line(format!(
            "{marker} {} #{}({params}) -> {}",
            function.name,
            function.func_id,
            self.ty_table.ty_name(function.return_ty)
        ));

        self.indent += 1;
        for statement in &function.body {
            self.print_stmt(statement);
        }
        self.indent -= 1;
    }

    fn print_stmt(&mut self, statement: &Stmt) {
        match &statement.kind {
            StmtKind::VarDecl {
                name,
                var_id,
                is_mutable,
                ty,
                initializer,
            } => {
                let mutability = if *is_mutable { "mut " } else { "" };
                let init = match initializer {
                    Some(init) => format!(" = {}", self.render_expr(init)),
                    None => String::new(),
                };
                self.line(format!(
                    "let {mutability}{name} %{var_id}: {}{init}",
                    self.ty_table.ty_name(*ty)
                ));
            }
            StmtKind::Assignment {
                name,
                var_id,
                value,
            } => {
                self.line(format!("{name} %{var_id} = {}", self.render_expr(value)));
            }
            StmtKind::FieldAssignment {
                object,
                field_name,
                field_index,
                value,
            } => {
                self.line(format!(
                    "{}.{field_name}[{field_index}] = {}",
                    self.render_expr(object),
                    self.render_expr(value)
                ));
            }
            StmtKind::Return { value } => match value {
                Some(value) => self.line(format!("return {}", self.render_expr(value))),
                None => self.line("return"),
            },
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line(format!("if {}", self.render_expr(condition)));
                self.indent += 1;
                for statement in then_branch {
                    self.print_stmt(statement);
                }
                self.indent -= 1;
                if !else_branch.is_empty() {
                    self.line("else");
                    self.indent += 1;
                    for statement in else_branch {
                        self.print_stmt(statement);
                    }
                    self.indent -= 1;
                }
            }
            StmtKind::ExprStmt { expression } => {
                self.line(self.render_expr(expression));
            }
        }
    }

    fn render_expr(&self, expression: &Expr) -> String {
        let rendered = match &expression.kind {
            ExprKind::IntegerLiteral(value) => value.to_string(),
            ExprKind::FloatLiteral(value) => format!("{value:?}"),
            ExprKind::BoolLiteral(value) => value.to_string(),
            ExprKind::StringLiteral(value) => format!("{value:?}"),
            ExprKind::VarRef { name, var_id } => format!("{name}%{var_id}"),
            ExprKind::Binary { op, left, right } => format!(
                "({} {} {})",
                self.render_expr(left),
                op.as_str(),
                self.render_expr(right)
            ),
            ExprKind::Unary { op, operand } => {
                format!("({}{})", op.as_str(), self.render_expr(operand))
            }
            ExprKind::Call {
                name,
                func_id,
                arguments,
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.render_expr(argument))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name}#{func_id}({arguments})")
            }
            ExprKind::StructInstantiation {
                name, field_values, ..
            } => {
                let values = field_values
                    .iter()
                    .map(|value| self.render_expr(value))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{name} {{ {values} }}")
            }
            ExprKind::FieldAccess {
                object,
                field_name,
                field_index,
            } => format!(
                "{}.{field_name}[{field_index}]",
                self.render_expr(object)
            ),
            ExprKind::ArrayLiteral { elements } => {
                let elements = elements
                    .iter()
                    .map(|element| self.render_expr(element))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{elements}]")
            }
            ExprKind::ArrayAccess { array, index } => {
                format!("{}[{}]", self.render_expr(array), self.render_expr(index))
            }
        };

        format!("{rendered}:{}", self.ty_table.ty_name(expression.ty))
    }

    fn line(&mut self, content: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        let _ = writeln!(self.out, "{}", content.as_ref());
    }
}
