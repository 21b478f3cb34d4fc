//! # Optimizer Module
//!
//! Optimization passes over the AIR. Passes transform a module in place and
//! must preserve typing: a folded node keeps the type of the expression it
//! replaces.

use crate::air::{Expr, ExprKind, Module, Stmt, StmtKind};
use crate::air::{BinOpKind, UnOpKind};

pub trait OptimizerPass {
    fn run(&self, module: &mut Module);
}

/// Folds operations on literal operands: integer and float arithmetic,
/// comparisons, logical connectives and unary operators. Division and
/// remainder by a literal zero are left alone so the error surfaces at
/// runtime instead of at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantFolding;

impl OptimizerPass for ConstantFolding {
    fn run(&self, module: &mut Module) {
        for function in &mut module.functions {
            for statement in &mut function.body {
                fold_stmt(statement);
            }
        }
    }
}

fn fold_stmt(statement: &mut Stmt) {
    match &mut statement.kind {
        StmtKind::VarDecl { initializer, .. } => {
            if let Some(initializer) = initializer {
                fold_expr(initializer);
            }
        }
        StmtKind::Assignment { value, .. } => fold_expr(value),
        StmtKind::FieldAssignment { object, value, .. } => {
            fold_expr(object);
            fold_expr(value);
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                fold_expr(value);
            }
        }
        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            fold_expr(condition);
            for statement in then_branch {
                fold_stmt(statement);
            }
            for statement in else_branch {
                fold_stmt(statement);
            }
        }
        StmtKind::ExprStmt { expression } => fold_expr(expression),
    }
}

fn fold_expr(expression: &mut Expr) {
    match &mut expression.kind {
        ExprKind::Binary { left, right, .. } => {
            fold_expr(left);
            fold_expr(right);
        }
        ExprKind::Unary { operand, .. } => fold_expr(operand),
        ExprKind::Call { arguments, .. } => {
            for argument in arguments {
                fold_expr(argument);
            }
        }
        ExprKind::StructInstantiation { field_values, .. } => {
            for value in field_values {
                fold_expr(value);
            }
        }
        ExprKind::FieldAccess { object, .. } => fold_expr(object),
        ExprKind::ArrayLiteral { elements } => {
            for element in elements {
                fold_expr(element);
            }
        }
        ExprKind::ArrayAccess { array, index } => {
            fold_expr(array);
            fold_expr(index);
        }
        _ => {}
    }

    if let Some(folded) = try_fold(expression) {
        expression.kind = folded;
    }
}

fn try_fold(expression: &Expr) -> Option<ExprKind> {
    match &expression.kind {
        ExprKind::Binary { op, left, right } => match (&left.kind, &right.kind) {
            (ExprKind::IntegerLiteral(lhs), ExprKind::IntegerLiteral(rhs)) => {
                fold_integer(*op, *lhs, *rhs)
            }
            (ExprKind::FloatLiteral(lhs), ExprKind::FloatLiteral(rhs)) => {
                fold_float(*op, *lhs, *rhs)
            }
            (ExprKind::BoolLiteral(lhs), ExprKind::BoolLiteral(rhs)) => fold_bool(*op, *lhs, *rhs),
            _ => None,
        },
        ExprKind::Unary { op, operand } => match (op, &operand.kind) {
            (UnOpKind::Neg, ExprKind::IntegerLiteral(value)) => {
                Some(ExprKind::IntegerLiteral(value.wrapping_neg()))
            }
            (UnOpKind::Neg, ExprKind::FloatLiteral(value)) => {
                Some(ExprKind::FloatLiteral(-value))
            }
            (UnOpKind::Not, ExprKind::BoolLiteral(value)) => Some(ExprKind::BoolLiteral(!value)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_integer(op: BinOpKind, lhs: i64, rhs: i64) -> Option<ExprKind> {
    let kind = match op {
        BinOpKind::Add => ExprKind::IntegerLiteral(lhs.wrapping_add(rhs)),
        BinOpKind::Sub => ExprKind::IntegerLiteral(lhs.wrapping_sub(rhs)),
        BinOpKind::Mul => ExprKind::IntegerLiteral(lhs.wrapping_mul(rhs)),
        BinOpKind::Div => {
            if rhs == 0 {
                return None;
            }
            ExprKind::IntegerLiteral(lhs.wrapping_div(rhs))
        }
        BinOpKind::Mod => {
            if rhs == 0 {
                return None;
            }
            ExprKind::IntegerLiteral(lhs.wrapping_rem(rhs))
        }
        BinOpKind::Eq => ExprKind::BoolLiteral(lhs == rhs),
        BinOpKind::Ne => ExprKind::BoolLiteral(lhs != rhs),
        BinOpKind::Lt => ExprKind::BoolLiteral(lhs < rhs),
        BinOpKind::Le => ExprKind::BoolLiteral(lhs <= rhs),
        BinOpKind::Gt => ExprKind::BoolLiteral(lhs > rhs),
        BinOpKind::Ge => ExprKind::BoolLiteral(lhs >= rhs),
        BinOpKind::And | BinOpKind::Or => return None,
    };
    Some(kind)
}

fn fold_float(op: BinOpKind, lhs: f64, rhs: f64) -> Option<ExprKind> {
    let kind = match op {
        BinOpKind::Add => ExprKind::FloatLiteral(lhs + rhs),
        BinOpKind::Sub => ExprKind::FloatLiteral(lhs - rhs),
        BinOpKind::Mul => ExprKind::FloatLiteral(lhs * rhs),
        BinOpKind::Div => {
            if rhs == 0.0 {
                return None;
            }
            ExprKind::FloatLiteral(lhs / rhs)
        }
        BinOpKind::Mod => {
            if rhs == 0.0 {
                return None;
            }
            ExprKind::FloatLiteral(lhs % rhs)
        }
        BinOpKind::Eq => ExprKind::BoolLiteral(lhs == rhs),
        BinOpKind::Ne => ExprKind::BoolLiteral(lhs != rhs),
        BinOpKind::Lt => ExprKind::BoolLiteral(lhs < rhs),
        BinOpKind::Le => ExprKind::BoolLiteral(lhs <= rhs),
        BinOpKind::Gt => ExprKind::BoolLiteral(lhs > rhs),
        BinOpKind::Ge => ExprKind::BoolLiteral(lhs >= rhs),
        BinOpKind::And | BinOpKind::Or => return None,
    };
    Some(kind)
}

fn fold_bool(op: BinOpKind, lhs: bool, rhs: bool) -> Option<ExprKind> {
    let kind = match op {
        BinOpKind::And => ExprKind::BoolLiteral(lhs && rhs),
        BinOpKind::Or => ExprKind::BoolLiteral(lhs || rhs),
        BinOpKind::Eq => ExprKind::BoolLiteral(lhs == rhs),
        BinOpKind::Ne => ExprKind::BoolLiteral(lhs != rhs),
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Location;
    use crate::ty::ty_ids;

    fn int(value: i64) -> Expr {
        Expr {
            ty: ty_ids::INTEGER,
            loc: Location::default(),
            kind: ExprKind::IntegerLiteral(value),
        }
    }

    fn binary(op: BinOpKind, left: Expr, right: Expr, ty: crate::ty::TyId) -> Expr {
        Expr {
            ty,
            loc: Location::default(),
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    #[test]
    fn test_fold_integer_arithmetic() {
        let mut expression = binary(BinOpKind::Add, int(40), int(2), ty_ids::INTEGER);
        fold_expr(&mut expression);

        assert_eq!(expression.kind, ExprKind::IntegerLiteral(42));
        assert_eq!(expression.ty, ty_ids::INTEGER);
    }

    #[test]
    fn test_fold_nested() {
        // (2 * 3) + 4
        let inner = binary(BinOpKind::Mul, int(2), int(3), ty_ids::INTEGER);
        let mut expression = binary(BinOpKind::Add, inner, int(4), ty_ids::INTEGER);
        fold_expr(&mut expression);

        assert_eq!(expression.kind, ExprKind::IntegerLiteral(10));
    }

    #[test]
    fn test_fold_comparison() {
        let mut expression = binary(BinOpKind::Lt, int(1), int(2), ty_ids::BOOL);
        fold_expr(&mut expression);

        assert_eq!(expression.kind, ExprKind::BoolLiteral(true));
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        let mut expression = binary(BinOpKind::Div, int(1), int(0), ty_ids::INTEGER);
        fold_expr(&mut expression);

        assert!(matches!(expression.kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn test_fold_unary() {
        let mut expression = Expr {
            ty: ty_ids::INTEGER,
            loc: Location::default(),
            kind: ExprKind::Unary {
                op: UnOpKind::Neg,
                operand: Box::new(int(7)),
            },
        };
        fold_expr(&mut expression);

        assert_eq!(expression.kind, ExprKind::IntegerLiteral(-7));
    }

    #[test]
    fn test_fold_logical() {
        let left = Expr {
            ty: ty_ids::BOOL,
            loc: Location::default(),
            kind: ExprKind::BoolLiteral(true),
        };
        let right = Expr {
            ty: ty_ids::BOOL,
            loc: Location::default(),
            kind: ExprKind::BoolLiteral(false),
        };
        let mut expression = binary(BinOpKind::And, left, right, ty_ids::BOOL);
        fold_expr(&mut expression);

        assert_eq!(expression.kind, ExprKind::BoolLiteral(false));
    }
}
