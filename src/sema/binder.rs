//! # Symbol Binder
//!
//! First semantic pass over a (merged) program. Two sub-passes:
//!
//! 1. **Declarations**: every struct gets a `StructId` and a `TyId`, every
//!    function a `FunctionId` with its parameter and return types resolved
//!    against the type table. All structs are registered before any function
//!    so signatures may reference structs declared later in the unit.
//! 2. **Bodies**: every parameter and local declaration gets a `VarId`,
//!    scoped through a [`ScopeStack`]. Redeclaration in the same scope is an
//!    error, shadowing in a nested scope is not.
//!
//! Besides populating the symbol table, the binder records per function which
//! `VarId`s it handed out (parameters, then locals in walk order). The AIR
//! builder replays the identical walk and consumes these records, which keeps
//! the ID assignment deterministic even in the presence of shadowing.

use std::collections::HashMap;

use crate::diagnostics::{DiagnosticEngine, Phase};
use crate::lexer::Location;
use crate::parser::ast::{Block, Function, Program, Statement, StructDecl, TySpecArena, TySpecId};
use crate::parser::ast::TySpecKind;
use crate::ty::{ty_ids, TyId, TyTable};

use super::symbols::{FunctionId, ScopeStack, SymbolTable, VarId};

/// The `VarId`s one function received during binding: parameters first, then
/// local declarations in statement walk order.
#[derive(Debug, Clone, Default)]
pub struct FunctionBinding {
    pub params: Vec<VarId>,
    pub locals: Vec<VarId>,
}

#[derive(Debug, Default)]
pub struct Bindings {
    pub functions: HashMap<FunctionId, FunctionBinding>,
}

pub struct SymbolBinder<'a> {
    ty_table: &'a mut TyTable,
    symbols: &'a mut SymbolTable,
    bindings: &'a mut Bindings,
    diagnostics: &'a mut DiagnosticEngine,
}

impl<'a> SymbolBinder<'a> {
    pub fn new(
        ty_table: &'a mut TyTable,
        symbols: &'a mut SymbolTable,
        bindings: &'a mut Bindings,
        diagnostics: &'a mut DiagnosticEngine,
    ) -> Self {
        Self {
            ty_table,
            symbols,
            bindings,
            diagnostics,
        }
    }

    pub fn bind(&mut self, program: &Program) -> bool {
        self.bind_declarations(program);

        if !self.diagnostics.has_errors() {
            self.bind_function_bodies(program);
        }

        !self.diagnostics.has_errors()
    }

    // ----- pass 1: declarations -------------------------------------------

    fn bind_declarations(&mut self, program: &Program) {
        // structs first so function signatures can reference them
        for decl in program.structs() {
            self.bind_struct_declaration(decl);
        }
        for function in program.functions() {
            self.bind_function_declaration(function, &program.arena);
        }
    }

    fn bind_struct_declaration(&mut self, decl: &StructDecl) {
        if self.symbols.lookup_struct(&decl.name).is_some() {
            self.diagnostics.error(
                Phase::SymbolBinding,
                decl.loc.clone(),
                format!("Duplicate struct declaration: '{}'", decl.name),
            );
            return;
        }

        let struct_id = self.ty_table.allocate_struct_id();
        let ty_id = self.ty_table.register_struct(&decl.name, struct_id);
        self.symbols
            .register_struct(&decl.name, struct_id, ty_id, decl.loc.clone());
    }

    fn bind_function_declaration(&mut self, function: &Function, arena: &TySpecArena) {
        if self.symbols.lookup_function(&function.name).is_some() {
            self.diagnostics.error(
                Phase::SymbolBinding,
                function.loc.clone(),
                format!("Duplicate function declaration: '{}'", function.name),
            );
            return;
        }

        let func_id = self.symbols.allocate_func_id();

        let mut param_types = vec![];
        for param in &function.params {
            let ty = self.resolve_spec(arena, param.ty, "parameter");
            param_types.push(ty);
        }

        let return_type = self.resolve_spec(arena, function.return_ty, "return");

        self.symbols.register_function(
            func_id,
            &function.name,
            return_type,
            param_types,
            function.is_extern,
            function.loc.clone(),
        );
    }

    /// Resolve a declared type spec against the type table. Named and builtin
    /// specs resolve through their rendered name; array specs resolve their
    /// element first and intern the array type. Unknown names are diagnosed
    /// but yield the error type so binding can continue.
    fn resolve_spec(&mut self, arena: &TySpecArena, spec: TySpecId, context: &str) -> TyId {
        let Some(node) = arena.get(spec) else {
            return ty_ids::ERROR;
        };

        match &node.kind {
            TySpecKind::Array { element, .. } => {
                let element_ty = self.resolve_spec(arena, *element, context);
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
                            Phase::SymbolBinding,
                            node.loc.clone(),
                            format!("Unknown {context} type: {name}"),
                        );
                        ty_ids::ERROR
                    }
                }
            }
        }
    }

    // ----- pass 2: bodies -------------------------------------------------

    fn bind_function_bodies(&mut self, program: &Program) {
        for function in program.functions() {
            self.bind_function_body(function);
        }
    }

    fn bind_function_body(&mut self, function: &Function) {
        let Some(symbol) = self.symbols.lookup_function(&function.name) else {
            // a duplicate declaration was skipped in pass 1; bodies only run
            // on a clean pass 1, so this cannot happen
            return;
        };
        let func_id = symbol.id;

        let mut scope = ScopeStack::new();
        let mut binding = FunctionBinding::default();

        for param in &function.params {
            if self.check_duplicate_variable(&param.name, &param.loc, &scope) {
                continue;
            }
            let var_id = self.symbols.allocate_var_id();
            self.symbols
                .register_variable(var_id, &param.name, false, param.loc.clone());
            scope.add_variable(&param.name, var_id);
            binding.params.push(var_id);
        }

        if let Some(body) = &function.body {
            if !function.is_extern {
                self.bind_block(body, &mut scope, &mut binding);
            }
        }

        self.bindings.functions.insert(func_id, binding);
    }

    fn bind_block(&mut self, block: &Block, scope: &mut ScopeStack, binding: &mut FunctionBinding) {
        scope.enter_scope();
        for statement in &block.statements {
            self.bind_statement(statement, scope, binding);
        }
        scope.exit_scope();
    }

    fn bind_statement(
        &mut self,
        statement: &Statement,
        scope: &mut ScopeStack,
        binding: &mut FunctionBinding,
    ) {
        match statement {
            Statement::Declaration {
                name, mutable, loc, ..
            } => {
                if self.check_duplicate_variable(name, loc, scope) {
                    return;
                }
                let var_id = self.symbols.allocate_var_id();
                self.symbols
                    .register_variable(var_id, name, *mutable, loc.clone());
                scope.add_variable(name, var_id);
                binding.locals.push(var_id);
            }
            Statement::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.bind_block(then_branch, scope, binding);
                if let Some(else_branch) = else_branch {
                    self.bind_block(else_branch, scope, binding);
                }
            }
            Statement::While { body, .. } => {
                self.bind_block(body, scope, binding);
            }
            Statement::For {
                init, step, body, ..
            } => {
                // initializer and body share one loop scope
                scope.enter_scope();
                self.bind_statement(init, scope, binding);
                self.bind_statement(step, scope, binding);
                for statement in &body.statements {
                    self.bind_statement(statement, scope, binding);
                }
                scope.exit_scope();
            }
            Statement::Assignment { .. }
            | Statement::FieldAssignment { .. }
            | Statement::Return { .. }
            | Statement::Expr { .. } => {}
        }
    }

    fn check_duplicate_variable(&mut self, name: &str, loc: &Location, scope: &ScopeStack) -> bool {
        // same-scope only: shadowing in nested scopes is allowed
        if scope.has_local(name) {
            self.diagnostics.error(
                Phase::SymbolBinding,
                loc.clone(),
                format!("Duplicate variable declaration in same scope: '{name}'"),
            );
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    struct BindResult {
        ty_table: TyTable,
        symbols: SymbolTable,
        bindings: Bindings,
        diagnostics: DiagnosticEngine,
        success: bool,
    }

    fn bind(input: &str) -> BindResult {
        let mut diagnostics = DiagnosticEngine::default();
        let program = parse_source(input, None, &mut diagnostics);
        assert!(!diagnostics.has_errors(), "test input must parse");

        let mut ty_table = TyTable::new();
        let mut symbols = SymbolTable::new();
        let mut bindings = Bindings::default();
        let success = SymbolBinder::new(
            &mut ty_table,
            &mut symbols,
            &mut bindings,
            &mut diagnostics,
        )
        .bind(&program);

        BindResult {
            ty_table,
            symbols,
            bindings,
            diagnostics,
            success,
        }
    }

    #[test]
    fn test_bind_function_and_struct() {
        let result = bind(
            "struct Pt { x: int, y: int }\n\
             fun dist(a: Pt, b: Pt) -> float { return 0.0; }",
        );

        assert!(result.success);
        let pt = result.symbols.lookup_struct("Pt").expect("struct bound");
        assert_eq!(pt.struct_id, 0);

        let dist = result.symbols.lookup_function("dist").expect("fn bound");
        assert_eq!(dist.id, 0);
        assert_eq!(dist.param_types, vec![pt.ty_id, pt.ty_id]);
        assert_eq!(dist.return_type, ty_ids::FLOAT);
    }

    #[test]
    fn test_struct_usable_before_declaration() {
        let result = bind(
            "fun get(p: Pt) -> int { return 0; }\n\
             struct Pt { x: int }",
        );

        assert!(result.success, "structs bind before functions");
    }

    #[test]
    fn test_duplicate_struct() {
        let result = bind("struct P { x: int } struct P { y: int }");

        assert!(!result.success);
        assert_eq!(result.diagnostics.error_count(), 1);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Duplicate struct declaration: 'P'"));
    }

    #[test]
    fn test_duplicate_function() {
        let result = bind("fun f() -> void {} fun f() -> void {}");

        assert!(!result.success);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Duplicate function declaration: 'f'"));
    }

    #[test]
    fn test_unknown_parameter_type() {
        let result = bind("fun f(x: Missing) -> void {}");

        assert!(!result.success);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Unknown parameter type: Missing"));
        // the function is still registered, with an error placeholder
        let f = result.symbols.lookup_function("f").expect("registered");
        assert_eq!(f.param_types, vec![ty_ids::ERROR]);
    }

    #[test]
    fn test_array_parameter_type() {
        let result = bind("fun sum(xs: int[]) -> int { return 0; }");

        assert!(result.success);
        let f = result.symbols.lookup_function("sum").unwrap();
        assert!(result.ty_table.is_array(f.param_types[0]));
        assert_eq!(
            result.ty_table.array_element_type(f.param_types[0]),
            Some(ty_ids::INTEGER)
        );
    }

    #[test]
    fn test_same_scope_duplicate_variable() {
        let result = bind("fun f() -> void { let x = 1; let x = 2; }");

        assert!(!result.success);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Duplicate variable declaration in same scope: 'x'"));
    }

    #[test]
    fn test_shadowing_in_nested_scope() {
        let result = bind(
            "fun f() -> void { let x = 1; if true { let x = 2; } }",
        );

        assert!(result.success);
        let binding = &result.bindings.functions[&0];
        assert_eq!(binding.locals.len(), 2);
        assert_ne!(binding.locals[0], binding.locals[1]);
    }

    #[test]
    fn test_parameter_binding_order() {
        let result = bind("fun f(a: int, b: int) -> void { let c = 1; }");

        assert!(result.success);
        let binding = &result.bindings.functions[&0];
        assert_eq!(binding.params.len(), 2);
        assert_eq!(binding.locals.len(), 1);
        assert!(binding.params[0] < binding.params[1]);
        assert!(binding.params[1] < binding.locals[0]);
    }

    #[test]
    fn test_duplicate_parameter() {
        let result = bind("fun f(a: int, a: int) -> void {}");

        assert!(!result.success);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Duplicate variable declaration in same scope: 'a'"));
    }
}
