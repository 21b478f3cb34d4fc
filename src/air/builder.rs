//! # AIR Builder
//!
//! Final lowering pass: walks the bound, type-resolved AST and produces the
//! typed AIR tree. All expression and statement type checking happens here.
//!
//! The builder continues after most errors so one compilation surfaces as
//! many diagnostics as possible. A node that failed to check is emitted with
//! the error type, and [`AirBuilder::check_types_compatible`] treats the
//! error type as compatible with everything, which keeps one broken
//! expression from producing a trail of follow-up diagnostics.

use std::collections::HashMap;

use crate::diagnostics::{DiagnosticEngine, Phase};
use crate::ice;
use crate::lexer::Location;
use crate::parser::ast::{
    self, Block, Expression, Program, Statement, TySpecArena, TySpecId, TySpecKind,
};
use crate::sema::binder::Bindings;
use crate::sema::resolver::{ResolvedFunction, ResolvedStruct};
use crate::sema::symbols::{SymbolTable, VarId};
use crate::sema::FunctionId;
use crate::ty::{ty_ids, StructId, TyId, TyTable};

use super::expr::{BinOpKind, Expr, ExprKind, UnOpKind};
use super::stmt::{Field, Function, Module, Param, Stmt, StmtKind, StructDecl};

pub struct AirBuilder<'a> {
    ty_table: &'a mut TyTable,
    symbols: &'a SymbolTable,
    resolved_structs: &'a HashMap<StructId, ResolvedStruct>,
    resolved_functions: &'a HashMap<FunctionId, ResolvedFunction>,
    bindings: &'a Bindings,
    diagnostics: &'a mut DiagnosticEngine,

    // per-function state
    var_types: HashMap<String, TyId>,
    var_ids: HashMap<String, VarId>,
    current_return_ty: TyId,
    locals: Vec<VarId>,
    local_cursor: usize,
}

impl<'a> AirBuilder<'a> {
    pub fn new(
        ty_table: &'a mut TyTable,
        symbols: &'a SymbolTable,
        resolved_structs: &'a HashMap<StructId, ResolvedStruct>,
        resolved_functions: &'a HashMap<FunctionId, ResolvedFunction>,
        bindings: &'a Bindings,
        diagnostics: &'a mut DiagnosticEngine,
    ) -> Self {
        Self {
            ty_table,
            symbols,
            resolved_structs,
            resolved_functions,
            bindings,
            diagnostics,
            var_types: HashMap::new(),
            var_ids: HashMap::new(),
            current_return_ty: ty_ids::VOID,
            locals: vec![],
            local_cursor: 0,
        }
    }

    /// Lower all units into one module: structs of every unit first, then
    /// functions in binding order. Returns `None` if any diagnostics were
    /// produced, by this pass or an earlier one.
    pub fn build(
        &mut self,
        name: impl ToString,
        programs: &[&Program],
        imports: Vec<String>,
    ) -> Option<Module> {
        let mut module = Module {
            name: name.to_string(),
            structs: vec![],
            functions: vec![],
            imports,
        };

        for program in programs {
            for decl in program.structs() {
                if let Some(lowered) = self.lower_struct(decl) {
                    module.structs.push(lowered);
                }
            }
        }

        for program in programs {
            for function in program.functions() {
                if let Some(lowered) = self.lower_function(function, &program.arena) {
                    module.functions.push(lowered);
                }
            }
        }

        if self.diagnostics.has_errors() {
            return None;
        }

        Some(module)
    }

    // ----- declarations ---------------------------------------------------

    fn lower_struct(&mut self, decl: &ast::StructDecl) -> Option<StructDecl> {
        let symbol = self
            .symbols
            .lookup_struct(&decl.name)
            .unwrap_or_else(|| ice!("struct '{}' not in symbol table", decl.name));
        let Some(resolved) = self.resolved_structs.get(&symbol.struct_id) else {
            ice!("struct '{}' was never resolved", decl.name);
        };

        let fields = resolved
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| Field {
                name: field.name.clone(),
                ty: field.type_id,
                index: index as u32,
                loc: field.location.clone(),
            })
            .collect();

        Some(StructDecl {
            name: decl.name.clone(),
            struct_id: resolved.struct_id,
            ty_id: resolved.type_id,
            fields,
            loc: decl.loc.clone(),
        })
    }

    fn lower_function(&mut self, function: &ast::Function, arena: &TySpecArena) -> Option<Function> {
        let symbol = self
            .symbols
            .lookup_function(&function.name)
            .unwrap_or_else(|| ice!("function '{}' not in symbol table", function.name));
        let func_id = symbol.id;
        let return_ty = symbol.return_type;
        let param_types = symbol.param_types.clone();

        let Some(binding) = self.bindings.functions.get(&func_id) else {
            ice!("function '{}' has no binding record", function.name);
        };

        self.var_types.clear();
        self.var_ids.clear();
        self.current_return_ty = return_ty;
        self.locals = binding.locals.clone();
        self.local_cursor = 0;

        let mut params = vec![];
        for (index, param) in function.params.iter().enumerate() {
            let Some(param_ty) = param_types.get(index).copied() else {
                ice!("parameter '{}' has no resolved type", param.name);
            };
            let Some(var_id) = binding.params.get(index).copied() else {
                ice!("parameter '{}' has no VarId", param.name);
            };

            self.var_types.insert(param.name.clone(), param_ty);
            self.var_ids.insert(param.name.clone(), var_id);

            params.push(Param {
                name: param.name.clone(),
                var_id,
                ty: param_ty,
                is_mutable: false,
                loc: param.loc.clone(),
            });
        }

        let mut body = vec![];
        if !function.is_extern {
            match &function.body {
                Some(block) => body = self.lower_block(block, arena),
                None => self.diagnostics.error(
                    Phase::AirBuilding,
                    function.loc.clone(),
                    format!("Function '{}' is missing a body", function.name),
                ),
            }
        }

        Some(Function {
            name: function.name.clone(),
            func_id,
            params,
            return_ty,
            body,
            is_extern: function.is_extern,
            loc: function.loc.clone(),
        })
    }

    // ----- statements -----------------------------------------------------

    fn lower_block(&mut self, block: &Block, arena: &TySpecArena) -> Vec<Stmt> {
        let mut statements = vec![];
        for statement in &block.statements {
            if let Some(lowered) = self.lower_stmt(statement, arena) {
                statements.push(lowered);
            }
        }
        statements
    }

    fn lower_stmt(&mut self, statement: &Statement, arena: &TySpecArena) -> Option<Stmt> {
        match statement {
            Statement::Declaration {
                name,
                ty,
                value,
                mutable,
                loc,
            } => self.lower_declaration(name, *ty, value.as_ref(), *mutable, loc, arena),
            Statement::Assignment { name, value, loc } => self.lower_assignment(name, value, loc),
            Statement::FieldAssignment {
                object,
                field,
                value,
                loc,
            } => self.lower_field_assignment(object, field, value, loc),
            Statement::Return { value, loc } => self.lower_return(value.as_ref(), loc),
            Statement::If {
                condition,
                then_branch,
                else_branch,
                loc,
            } => self.lower_if(condition, then_branch, else_branch.as_ref(), loc, arena),
            Statement::While { loc, .. } => {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    "While loops not yet supported in IR lowering",
                );
                None
            }
            Statement::For { loc, .. } => {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    "For loops not yet supported in IR lowering",
                );
                None
            }
            Statement::Expr { expr, loc } => {
                let expression = self.lower_expr(expr)?;
                Some(Stmt {
                    loc: loc.clone(),
                    kind: StmtKind::ExprStmt { expression },
                })
            }
        }
    }

    fn lower_declaration(
        &mut self,
        name: &str,
        ty: Option<TySpecId>,
        value: Option<&Expression>,
        mutable: bool,
        loc: &Location,
        arena: &TySpecArena,
    ) -> Option<Stmt> {
        let mut var_ty = ty_ids::VOID;
        let annotated = ty.is_some();
        if let Some(spec) = ty {
            var_ty = self.resolve_annotation(arena, spec);
        }

        let mut initializer = None;
        match value {
            Some(value) => {
                initializer = self.lower_expr(value);
                match &initializer {
                    Some(init) => {
                        if !annotated {
                            // inference: the declared type is the initializer's
                            var_ty = init.ty;
                        } else if var_ty != ty_ids::ERROR {
                            self.check_types_compatible(
                                var_ty,
                                init.ty,
                                loc,
                                "variable initialization",
                            );
                        }
                    }
                    None => {
                        // initializer failed to lower and was already diagnosed
                        if !annotated {
                            var_ty = ty_ids::ERROR;
                        }
                    }
                }
            }
            None => {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!("Variable '{name}' requires an initializer"),
                );
                if var_ty == ty_ids::VOID {
                    var_ty = ty_ids::ERROR;
                }
            }
        }

        let var_id = self.next_local_var_id();
        self.var_types.insert(name.to_string(), var_ty);
        self.var_ids.insert(name.to_string(), var_id);

        Some(Stmt {
            loc: loc.clone(),
            kind: StmtKind::VarDecl {
                name: name.to_string(),
                var_id,
                is_mutable: mutable,
                ty: var_ty,
                initializer,
            },
        })
    }

    fn lower_assignment(
        &mut self,
        name: &str,
        value: &Expression,
        loc: &Location,
    ) -> Option<Stmt> {
        let var_ty = match self.var_types.get(name) {
            Some(ty) => *ty,
            None => {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!("Undefined variable '{name}'"),
                );
                ty_ids::ERROR
            }
        };

        let value = self.lower_expr(value)?;
        self.check_types_compatible(var_ty, value.ty, loc, "assignment");

        let var_id = self.var_ids.get(name).copied().unwrap_or(0);

        Some(Stmt {
            loc: loc.clone(),
            kind: StmtKind::Assignment {
                name: name.to_string(),
                var_id,
                value,
            },
        })
    }

    fn lower_field_assignment(
        &mut self,
        object: &Expression,
        field: &str,
        value: &Expression,
        loc: &Location,
    ) -> Option<Stmt> {
        let object = self.lower_expr(object)?;
        let value = self.lower_expr(value)?;

        let mut field_index = 0;
        if object.ty != ty_ids::ERROR {
            if !self.ty_table.is_struct(object.ty) {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    "Field assignment requires struct type",
                );
            } else {
                let resolved = self.resolved_struct_of(object.ty);
                match resolved.find_field(field) {
                    Some((index, resolved_field)) => {
                        field_index = index;
                        self.check_types_compatible(
                            resolved_field.type_id,
                            value.ty,
                            loc,
                            "field assignment",
                        );
                    }
                    None => {
                        self.diagnostics.error(
                            Phase::AirBuilding,
                            loc.clone(),
                            format!("Struct '{}' has no field '{field}'", resolved.name),
                        );
                    }
                }
            }
        }

        Some(Stmt {
            loc: loc.clone(),
            kind: StmtKind::FieldAssignment {
                object,
                field_name: field.to_string(),
                field_index,
                value,
            },
        })
    }

    fn lower_return(&mut self, value: Option<&Expression>, loc: &Location) -> Option<Stmt> {
        match value {
            Some(value) => {
                let value = self.lower_expr(value)?;
                self.check_types_compatible(
                    self.current_return_ty,
                    value.ty,
                    loc,
                    "return statement",
                );
                Some(Stmt {
                    loc: loc.clone(),
                    kind: StmtKind::Return { value: Some(value) },
                })
            }
            None => {
                self.check_types_compatible(
                    self.current_return_ty,
                    ty_ids::VOID,
                    loc,
                    "return statement",
                );
                Some(Stmt {
                    loc: loc.clone(),
                    kind: StmtKind::Return { value: None },
                })
            }
        }
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then_branch: &Block,
        else_branch: Option<&Block>,
        loc: &Location,
        arena: &TySpecArena,
    ) -> Option<Stmt> {
        let condition_loc = condition.loc();
        let condition = self.lower_expr(condition)?;

        if condition.ty != ty_ids::BOOL && condition.ty != ty_ids::ERROR {
            self.diagnostics.error(
                Phase::AirBuilding,
                condition_loc,
                "If condition must be of type bool",
            );
        }

        let then_branch = self.lower_block(then_branch, arena);
        let else_branch = match else_branch {
            Some(block) => self.lower_block(block, arena),
            None => vec![],
        };

        Some(Stmt {
            loc: loc.clone(),
            kind: StmtKind::If {
                condition,
                then_branch,
                else_branch,
            },
        })
    }

    // ----- expressions ----------------------------------------------------

    fn lower_expr(&mut self, expression: &Expression) -> Option<Expr> {
        match expression {
            Expression::Integer { value, loc } => Some(Expr {
                ty: ty_ids::INTEGER,
                loc: loc.clone(),
                kind: ExprKind::IntegerLiteral(*value),
            }),
            Expression::Float { value, loc } => Some(Expr {
                ty: ty_ids::FLOAT,
                loc: loc.clone(),
                kind: ExprKind::FloatLiteral(*value),
            }),
            Expression::Boolean { value, loc } => Some(Expr {
                ty: ty_ids::BOOL,
                loc: loc.clone(),
                kind: ExprKind::BoolLiteral(*value),
            }),
            Expression::StringLit { value, loc } => Some(Expr {
                ty: ty_ids::STRING,
                loc: loc.clone(),
                kind: ExprKind::StringLiteral(value.clone()),
            }),
            Expression::Identifier { name, loc } => Some(self.lower_identifier(name, loc)),
            Expression::Unary { op, operand, loc } => self.lower_unary(*op, operand, loc),
            Expression::Binary {
                op,
                left,
                right,
                loc,
            } => self.lower_binary(*op, left, right, loc),
            Expression::Call {
                callee,
                arguments,
                loc,
            } => self.lower_call(callee, arguments, loc),
            Expression::StructInit {
                name,
                field_values,
                loc,
            } => self.lower_struct_init(name, field_values, loc),
            Expression::FieldAccess { object, field, loc } => {
                self.lower_field_access(object, field, loc)
            }
            Expression::ArrayLit { elements, loc } => self.lower_array_literal(elements, loc),
            Expression::Index { array, index, loc } => self.lower_array_access(array, index, loc),
        }
    }

    fn lower_identifier(&mut self, name: &str, loc: &Location) -> Expr {
        let Some(ty) = self.var_types.get(name).copied() else {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                format!("Undefined variable '{name}'"),
            );
            return Expr {
                ty: ty_ids::ERROR,
                loc: loc.clone(),
                kind: ExprKind::VarRef {
                    name: name.to_string(),
                    var_id: 0,
                },
            };
        };

        let Some(var_id) = self.var_ids.get(name).copied() else {
            ice!("variable '{name}' has a type but no VarId");
        };

        Expr {
            ty,
            loc: loc.clone(),
            kind: ExprKind::VarRef {
                name: name.to_string(),
                var_id,
            },
        }
    }

    fn lower_unary(
        &mut self,
        op: ast::UnaryOperator,
        operand: &Expression,
        loc: &Location,
    ) -> Option<Expr> {
        let operand = self.lower_expr(operand)?;
        let operand_ty = operand.ty;
        let op = unop_kind(op);

        let ty = match op {
            UnOpKind::Neg => {
                if operand_ty == ty_ids::ERROR {
                    ty_ids::ERROR
                } else if !self.ty_table.is_numeric(operand_ty) {
                    self.diagnostics.error(
                        Phase::AirBuilding,
                        loc.clone(),
                        "Negation operator requires numeric operand",
                    );
                    ty_ids::ERROR
                } else {
                    operand_ty
                }
            }
            UnOpKind::Not => {
                if operand_ty == ty_ids::ERROR {
                    ty_ids::ERROR
                } else if operand_ty != ty_ids::BOOL {
                    self.diagnostics.error(
                        Phase::AirBuilding,
                        loc.clone(),
                        "Logical NOT operator requires boolean operand",
                    );
                    ty_ids::ERROR
                } else {
                    ty_ids::BOOL
                }
            }
        };

        Some(Expr {
            ty,
            loc: loc.clone(),
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        })
    }

    fn lower_binary(
        &mut self,
        op: ast::BinaryOperator,
        left: &Expression,
        right: &Expression,
        loc: &Location,
    ) -> Option<Expr> {
        let left = self.lower_expr(left)?;
        let right = self.lower_expr(right)?;

        let left_ty = left.ty;
        let right_ty = right.ty;
        let op = binop_kind(op);
        let has_error_operand = left_ty == ty_ids::ERROR || right_ty == ty_ids::ERROR;

        let ty = if op.is_arithmetic() {
            if has_error_operand {
                ty_ids::ERROR
            } else if (left_ty == ty_ids::INTEGER && right_ty == ty_ids::INTEGER)
                || (left_ty == ty_ids::FLOAT && right_ty == ty_ids::FLOAT)
            {
                left_ty
            } else {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!(
                        "Arithmetic operation '{}' requires numeric operands",
                        op.as_str()
                    ),
                );
                ty_ids::ERROR
            }
        } else if op.is_comparison() {
            if has_error_operand {
                ty_ids::BOOL
            } else if left_ty != right_ty {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!(
                        "Comparison operation '{}' requires operands of the same type",
                        op.as_str()
                    ),
                );
                ty_ids::ERROR
            } else if self.ty_table.is_struct(left_ty) || self.ty_table.is_array(left_ty) {
                // composite equality is not defined in the IR
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!(
                        "Comparison operation '{}' requires operands of primitive type",
                        op.as_str()
                    ),
                );
                ty_ids::ERROR
            } else {
                ty_ids::BOOL
            }
        } else {
            // logical
            if has_error_operand {
                ty_ids::BOOL
            } else if left_ty != ty_ids::BOOL || right_ty != ty_ids::BOOL {
                self.diagnostics.error(
                    Phase::AirBuilding,
                    loc.clone(),
                    format!(
                        "Logical operation '{}' requires boolean operands",
                        op.as_str()
                    ),
                );
                ty_ids::ERROR
            } else {
                ty_ids::BOOL
            }
        };

        Some(Expr {
            ty,
            loc: loc.clone(),
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        })
    }

    fn lower_call(
        &mut self,
        name: &str,
        arguments: &[Expression],
        loc: &Location,
    ) -> Option<Expr> {
        let Some(symbol) = self.symbols.lookup_function(name) else {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                format!("Undefined function '{name}'"),
            );
            return None;
        };
        let func_id = symbol.id;
        let return_ty = symbol.return_type;
        let param_types = symbol.param_types.clone();

        if arguments.len() != param_types.len() {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                format!(
                    "Function '{name}' expects {} argument(s), got {}",
                    param_types.len(),
                    arguments.len()
                ),
            );
        }

        let mut lowered_arguments = vec![];
        for (index, argument) in arguments.iter().enumerate() {
            let argument_loc = argument.loc();
            let Some(argument) = self.lower_expr(argument) else {
                continue;
            };

            if let Some(expected) = param_types.get(index) {
                self.check_types_compatible(
                    *expected,
                    argument.ty,
                    &argument_loc,
                    "function argument",
                );
            }

            lowered_arguments.push(argument);
        }

        Some(Expr {
            ty: return_ty,
            loc: loc.clone(),
            kind: ExprKind::Call {
                name: name.to_string(),
                func_id,
                arguments: lowered_arguments,
            },
        })
    }

    fn lower_struct_init(
        &mut self,
        name: &str,
        field_values: &[Expression],
        loc: &Location,
    ) -> Option<Expr> {
        let Some(symbol) = self.symbols.lookup_struct(name) else {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                format!("Undefined struct '{name}'"),
            );
            return None;
        };
        let Some(resolved) = self.resolved_structs.get(&symbol.struct_id) else {
            ice!("struct '{name}' was never resolved");
        };

        if field_values.len() != resolved.fields.len() {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                format!(
                    "Struct '{name}' expects {} field(s), got {}",
                    resolved.fields.len(),
                    field_values.len()
                ),
            );
        }

        let mut lowered_values = vec![];
        for (index, value) in field_values.iter().enumerate() {
            let value_loc = value.loc();
            let Some(value) = self.lower_expr(value) else {
                continue;
            };

            if let Some(field) = resolved.fields.get(index) {
                self.check_types_compatible(field.type_id, value.ty, &value_loc, "struct field");
            }

            lowered_values.push(value);
        }

        Some(Expr {
            ty: resolved.type_id,
            loc: loc.clone(),
            kind: ExprKind::StructInstantiation {
                name: name.to_string(),
                struct_id: resolved.struct_id,
                field_values: lowered_values,
            },
        })
    }

    fn lower_field_access(
        &mut self,
        object: &Expression,
        field: &str,
        loc: &Location,
    ) -> Option<Expr> {
        let object = self.lower_expr(object)?;

        let error_node = |object: Expr, loc: &Location| Expr {
            ty: ty_ids::ERROR,
            loc: loc.clone(),
            kind: ExprKind::FieldAccess {
                object: Box::new(object),
                field_name: field.to_string(),
                field_index: 0,
            },
        };

        if object.ty == ty_ids::ERROR {
            return Some(error_node(object, loc));
        }

        if !self.ty_table.is_struct(object.ty) {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                "Field access requires struct type",
            );
            return Some(error_node(object, loc));
        }

        let resolved = self.resolved_struct_of(object.ty);
        let Some((field_index, resolved_field)) = resolved.find_field(field) else {
            let message = format!("Struct '{}' has no field '{field}'", resolved.name);
            self.diagnostics
                .error(Phase::AirBuilding, loc.clone(), message);
            return Some(error_node(object, loc));
        };
        let field_ty = resolved_field.type_id;

        Some(Expr {
            ty: field_ty,
            loc: loc.clone(),
            kind: ExprKind::FieldAccess {
                object: Box::new(object),
                field_name: field.to_string(),
                field_index,
            },
        })
    }

    fn lower_array_literal(&mut self, elements: &[Expression], loc: &Location) -> Option<Expr> {
        let mut lowered_elements = vec![];
        for element in elements {
            let element = self.lower_expr(element)?;
            lowered_elements.push(element);
        }

        // the array type is inferred from the first element
        let mut array_ty = ty_ids::ERROR;
        if let Some(first) = lowered_elements.first() {
            let element_ty = first.ty;
            let mut consistent = true;

            if element_ty != ty_ids::ERROR {
                for element in &lowered_elements[1..] {
                    if element.ty != element_ty && element.ty != ty_ids::ERROR {
                        self.diagnostics.error(
                            Phase::AirBuilding,
                            loc.clone(),
                            "Array elements must have the same type",
                        );
                        consistent = false;
                        break;
                    }
                }

                if consistent {
                    array_ty = self.ty_table.register_array(element_ty);
                }
            }
        }

        Some(Expr {
            ty: array_ty,
            loc: loc.clone(),
            kind: ExprKind::ArrayLiteral {
                elements: lowered_elements,
            },
        })
    }

    fn lower_array_access(
        &mut self,
        array: &Expression,
        index: &Expression,
        loc: &Location,
    ) -> Option<Expr> {
        let array = self.lower_expr(array)?;
        let index = self.lower_expr(index)?;

        let node = |array: Expr, index: Expr, ty: TyId, loc: &Location| Expr {
            ty,
            loc: loc.clone(),
            kind: ExprKind::ArrayAccess {
                array: Box::new(array),
                index: Box::new(index),
            },
        };

        if array.ty == ty_ids::ERROR {
            return Some(node(array, index, ty_ids::ERROR, loc));
        }

        if !self.ty_table.is_array(array.ty) {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                "Array access requires array type",
            );
            return Some(node(array, index, ty_ids::ERROR, loc));
        }

        if index.ty != ty_ids::INTEGER && index.ty != ty_ids::ERROR {
            self.diagnostics.error(
                Phase::AirBuilding,
                loc.clone(),
                "Array index must be of type integer",
            );
            return Some(node(array, index, ty_ids::ERROR, loc));
        }

        let Some(element_ty) = self.ty_table.array_element_type(array.ty) else {
            ice!("array type without element type");
        };

        Some(node(array, index, element_ty, loc))
    }

    // ----- helpers --------------------------------------------------------

    /// Resolve a declared variable annotation. Arrays resolve structurally;
    /// named and builtin annotations through the type table.
    fn resolve_annotation(&mut self, arena: &TySpecArena, spec: TySpecId) -> TyId {
        let Some(node) = arena.get(spec) else {
            return ty_ids::ERROR;
        };

        match &node.kind {
            TySpecKind::Array { element, .. } => {
                let element_ty = self.resolve_annotation(arena, *element);
                if element_ty == ty_ids::ERROR {
                    return ty_ids::ERROR;
                }
                self.ty_table.register_array(element_ty)
            }
            _ => {
                let name = arena.render(spec);
                match self.ty_table.lookup_by_name(&name) {
                    Some(ty) => ty,
                    None => {
                        self.diagnostics.error(
                            Phase::AirBuilding,
                            node.loc.clone(),
                            format!("Unknown type '{name}'"),
                        );
                        ty_ids::ERROR
                    }
                }
            }
        }
    }

    fn resolved_struct_of(&self, ty: TyId) -> &'a ResolvedStruct {
        let Some(info) = self.ty_table.ty_info(ty) else {
            ice!("unknown type id {ty}");
        };
        let Some(struct_id) = info.struct_id else {
            ice!("type '{}' is not a struct", info.name);
        };
        let Some(resolved) = self.resolved_structs.get(&struct_id) else {
            ice!("struct '{}' was never resolved", info.name);
        };
        resolved
    }

    fn next_local_var_id(&mut self) -> VarId {
        let var_id = self.locals.get(self.local_cursor).copied().unwrap_or(0);
        self.local_cursor += 1;
        var_id
    }

    /// Equal types are compatible; the error type is compatible with
    /// everything so one failure does not cascade.
    fn check_types_compatible(
        &mut self,
        expected: TyId,
        actual: TyId,
        loc: &Location,
        context: &str,
    ) -> bool {
        if self.ty_table.are_compatible(expected, actual) {
            return true;
        }

        if expected == ty_ids::ERROR || actual == ty_ids::ERROR {
            return true;
        }

        self.diagnostics.error(
            Phase::AirBuilding,
            loc.clone(),
            format!(
                "Type mismatch in {context}: expected '{}', got '{}'",
                self.ty_table.ty_name(expected),
                self.ty_table.ty_name(actual)
            ),
        );
        false
    }
}

fn binop_kind(op: ast::BinaryOperator) -> BinOpKind {
    match op {
        ast::BinaryOperator::Add => BinOpKind::Add,
        ast::BinaryOperator::Sub => BinOpKind::Sub,
        ast::BinaryOperator::Mul => BinOpKind::Mul,
        ast::BinaryOperator::Div => BinOpKind::Div,
        ast::BinaryOperator::Mod => BinOpKind::Mod,
        ast::BinaryOperator::Eq => BinOpKind::Eq,
        ast::BinaryOperator::Ne => BinOpKind::Ne,
        ast::BinaryOperator::Lt => BinOpKind::Lt,
        ast::BinaryOperator::Le => BinOpKind::Le,
        ast::BinaryOperator::Gt => BinOpKind::Gt,
        ast::BinaryOperator::Ge => BinOpKind::Ge,
        ast::BinaryOperator::And => BinOpKind::And,
        ast::BinaryOperator::Or => BinOpKind::Or,
    }
}

fn unop_kind(op: ast::UnaryOperator) -> UnOpKind {
    match op {
        ast::UnaryOperator::Neg => UnOpKind::Neg,
        ast::UnaryOperator::Not => UnOpKind::Not,
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::air::{ExprKind, Module, StmtKind};
    use crate::driver::Compiler;
    use crate::ty::ty_ids;

    fn compile(source: &str) -> (Option<Module>, Compiler) {
        let mut compiler = Compiler::new();
        let module = compiler.compile_source(source, Path::new("test.kea"));
        (module, compiler)
    }

    fn error_messages(compiler: &Compiler) -> Vec<String> {
        compiler
            .diagnostics
            .all()
            .iter()
            .map(|diagnostic| diagnostic.message.clone())
            .collect()
    }

    #[test]
    fn test_minimal_function() {
        let (module, compiler) = compile("fun main() -> int { return 42; }");

        assert!(!compiler.diagnostics.has_errors());
        let module = module.expect("module built");
        assert_eq!(module.functions.len(), 1);

        let main = &module.functions[0];
        assert_eq!(main.name, "main");
        assert_eq!(main.func_id, 0);
        assert_eq!(main.return_ty, ty_ids::INTEGER);
        assert_eq!(main.body.len(), 1);

        let StmtKind::Return { value: Some(value) } = &main.body[0].kind else {
            panic!("expected return statement");
        };
        assert_eq!(value.ty, ty_ids::INTEGER);
        assert_eq!(value.kind, ExprKind::IntegerLiteral(42));
    }

    #[test]
    fn test_binary_typing() {
        let (module, _) = compile(
            "fun f(a: int, b: int) -> bool { return a + b > 10; }",
        );

        let module = module.expect("module built");
        let StmtKind::Return { value: Some(value) } = &module.functions[0].body[0].kind else {
            panic!("expected return");
        };
        assert_eq!(value.ty, ty_ids::BOOL);
        let ExprKind::Binary { left, .. } = &value.kind else {
            panic!("expected comparison");
        };
        assert_eq!(left.ty, ty_ids::INTEGER);
    }

    #[test]
    fn test_mixed_arithmetic_rejected() {
        let (module, compiler) = compile("fun f() -> int { return 1 + 2.0; }");

        assert!(module.is_none());
        let messages = error_messages(&compiler);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("Arithmetic operation '+' requires numeric operands"));
    }

    #[test]
    fn test_initializer_type_mismatch() {
        let (module, compiler) = compile("fun f() -> void { let x: int = true; }");

        assert!(module.is_none());
        let messages = error_messages(&compiler);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0],
            "Type mismatch in variable initialization: expected 'int', got 'bool'"
        );
    }

    #[test]
    fn test_missing_initializer() {
        let (module, compiler) = compile("fun f() -> void { let x: int; }");

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0].contains("Variable 'x' requires an initializer"));
    }

    #[test]
    fn test_undefined_variable_produces_single_error() {
        let (module, compiler) = compile("fun f() -> int { return missing + 1; }");

        assert!(module.is_none());
        // the VarRef lowers with the error type; the addition and the return
        // check stay silent
        let messages = error_messages(&compiler);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("Undefined variable 'missing'"));
    }

    #[test]
    fn test_call_arity_mismatch() {
        let (module, compiler) = compile(
            "fun g(a: int) -> int { return a; }\n\
             fun f() -> int { return g(1, 2); }",
        );

        assert!(module.is_none());
        assert!(error_messages(&compiler)
            .iter()
            .any(|message| message.contains("Function 'g' expects 1 argument(s), got 2")));
    }

    #[test]
    fn test_struct_field_access_index() {
        let (module, _) = compile(
            "struct Pt { x: int, y: int }\n\
             fun main() -> int {\n\
               let p: Pt = Pt { 3, 4 };\n\
               return p.x;\n\
             }",
        );

        let module = module.expect("module built");
        let StmtKind::Return { value: Some(value) } = &module.functions[0].body[1].kind else {
            panic!("expected return");
        };
        let ExprKind::FieldAccess { field_index, .. } = &value.kind else {
            panic!("expected field access");
        };
        assert_eq!(*field_index, 0);
        assert_eq!(value.ty, ty_ids::INTEGER);
    }

    #[test]
    fn test_unknown_field() {
        let (module, compiler) = compile(
            "struct Pt { x: int }\n\
             fun f(p: Pt) -> int { return p.z; }",
        );

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0].contains("Struct 'Pt' has no field 'z'"));
    }

    #[test]
    fn test_array_element_mismatch() {
        let (module, compiler) = compile("fun f() -> void { let a = [1, 2.0]; }");

        assert!(module.is_none());
        let messages = error_messages(&compiler);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].contains("Array elements must have the same type"));
    }

    #[test]
    fn test_array_access_typing() {
        let (module, _) = compile(
            "fun f() -> int { let a = [1, 2, 3]; return a[1]; }",
        );

        let module = module.expect("module built");
        let StmtKind::Return { value: Some(value) } = &module.functions[0].body[1].kind else {
            panic!("expected return");
        };
        assert!(matches!(value.kind, ExprKind::ArrayAccess { .. }));
        assert_eq!(value.ty, ty_ids::INTEGER);
    }

    #[test]
    fn test_array_index_must_be_integer() {
        let (module, compiler) = compile(
            "fun f() -> int { let a = [1, 2]; return a[true]; }",
        );

        assert!(module.is_none());
        assert!(error_messages(&compiler)
            .iter()
            .any(|message| message.contains("Array index must be of type integer")));
    }

    #[test]
    fn test_if_condition_must_be_bool() {
        let (module, compiler) = compile("fun f() -> void { if 1 { } }");

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0].contains("If condition must be of type bool"));
    }

    #[test]
    fn test_return_type_mismatch() {
        let (module, compiler) = compile("fun f() -> int { return true; }");

        assert!(module.is_none());
        assert_eq!(
            error_messages(&compiler)[0],
            "Type mismatch in return statement: expected 'int', got 'bool'"
        );
    }

    #[test]
    fn test_return_without_value_requires_void() {
        let (module, compiler) = compile("fun f() -> int { return; }");

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0]
            .contains("Type mismatch in return statement: expected 'int', got 'void'"));
    }

    #[test]
    fn test_while_is_rejected() {
        let (module, compiler) = compile("fun f() -> void { while true { } }");

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0]
            .contains("While loops not yet supported in IR lowering"));
    }

    #[test]
    fn test_struct_field_count_mismatch() {
        let (module, compiler) = compile(
            "struct Pt { x: int, y: int }\n\
             fun f() -> void { let p = Pt { 1 }; }",
        );

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0]
            .contains("Struct 'Pt' expects 2 field(s), got 1"));
    }

    #[test]
    fn test_extern_function_has_empty_body() {
        let (module, _) = compile(
            "extern fun print(s: string) -> void;\n\
             fun main() -> void { print(\"hi\"); }",
        );

        let module = module.expect("module built");
        let print = module.find_function("print").expect("extern lowered");
        assert!(print.is_extern);
        assert!(print.body.is_empty());
    }

    #[test]
    fn test_struct_comparison_rejected() {
        let (module, compiler) = compile(
            "struct Pt { x: int }\n\
             fun f(a: Pt, b: Pt) -> bool { return a == b; }",
        );

        assert!(module.is_none());
        assert!(error_messages(&compiler)[0]
            .contains("Comparison operation '==' requires operands of primitive type"));
    }
}
