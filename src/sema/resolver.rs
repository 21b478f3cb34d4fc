//! # Type Resolver
//!
//! Second semantic pass: turns the declared shape of every struct and
//! function into its resolved form. Struct fields and function signatures
//! are mapped from rendered type annotations to `TyId`s; the results are
//! keyed by `StructId`/`FunctionId` for the AIR builder. After resolution the
//! pass walks struct fields depth-first to reject structs that (transitively)
//! embed themselves by value. Array-typed fields add indirection and are
//! opaque to that walk.

use std::collections::{HashMap, HashSet};

use crate::diagnostics::{DiagnosticEngine, Phase};
use crate::lexer::Location;
use crate::parser::ast::{Function, Program, StructDecl};
use crate::ty::{ty_ids, StructId, TyId, TyKind, TyTable};

use super::symbols::{FunctionId, SymbolTable};

#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub type_id: TyId,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct ResolvedStruct {
    pub struct_id: StructId,
    pub type_id: TyId,
    pub name: String,
    pub fields: Vec<ResolvedField>,
    pub location: Location,
}

impl ResolvedStruct {
    pub fn find_field(&self, name: &str) -> Option<(u32, &ResolvedField)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
            .map(|(index, field)| (index as u32, field))
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedFunction {
    pub id: FunctionId,
    pub name: String,
    pub return_type: TyId,
    pub param_types: Vec<TyId>,
    pub is_extern: bool,
    pub location: Location,
}

pub struct TypeResolver<'a> {
    ty_table: &'a mut TyTable,
    symbols: &'a SymbolTable,
    diagnostics: &'a mut DiagnosticEngine,
    resolved_structs: HashMap<StructId, ResolvedStruct>,
    resolved_functions: HashMap<FunctionId, ResolvedFunction>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(
        ty_table: &'a mut TyTable,
        symbols: &'a SymbolTable,
        diagnostics: &'a mut DiagnosticEngine,
    ) -> Self {
        Self {
            ty_table,
            symbols,
            diagnostics,
            resolved_structs: HashMap::new(),
            resolved_functions: HashMap::new(),
        }
    }

    /// Resolve all declared signatures across the given units. Structs are
    /// resolved before functions so signatures can reference any struct.
    pub fn resolve(&mut self, programs: &[&Program]) -> bool {
        for program in programs {
            for decl in program.structs() {
                self.resolve_struct_fields(decl, program);
            }
        }
        for program in programs {
            for function in program.functions() {
                self.resolve_function_signature(function, program);
            }
        }

        if !self.diagnostics.has_errors() {
            let struct_ids: Vec<StructId> = self.resolved_structs.keys().copied().collect();
            for struct_id in struct_ids {
                let (name, location) = {
                    let resolved = &self.resolved_structs[&struct_id];
                    (resolved.name.clone(), resolved.location.clone())
                };
                let mut visiting = HashSet::new();
                if self.check_circular_dependency(struct_id, &name, &mut visiting, &location) {
                    // one diagnostic per cycle; no further work on it
                    break;
                }
            }
        }

        !self.diagnostics.has_errors()
    }

    /// Map a rendered type name to its `TyId`. Built-ins resolve by name,
    /// `T[]`/`T[N]` suffixes resolve the element and intern the array type,
    /// everything else must be a declared struct. Unknown names produce a
    /// diagnostic with a nearest-name suggestion where one is close enough.
    pub fn resolve_type_name(&mut self, name: &str, loc: &Location) -> Option<TyId> {
        match name {
            "int" => return Some(ty_ids::INTEGER),
            "float" => return Some(ty_ids::FLOAT),
            "string" => return Some(ty_ids::STRING),
            "bool" => return Some(ty_ids::BOOL),
            "void" => return Some(ty_ids::VOID),
            _ => {}
        }

        if name.ends_with(']') {
            if let Some(open) = name.rfind('[') {
                let element = self.resolve_type_name(&name[..open], loc)?;
                return Some(self.ty_table.register_array(element));
            }
        }

        if let Some(symbol) = self.symbols.lookup_struct(name) {
            return Some(symbol.ty_id);
        }

        match self.suggest_type_name(name) {
            Some(suggestion) => self.diagnostics.error(
                Phase::TypeResolution,
                loc.clone(),
                format!("Unknown type '{name}'. Did you mean '{suggestion}'?"),
            ),
            None => self.diagnostics.error(
                Phase::TypeResolution,
                loc.clone(),
                format!("Unknown type '{name}'"),
            ),
        }

        None
    }

    pub fn resolved_structs(&self) -> &HashMap<StructId, ResolvedStruct> {
        &self.resolved_structs
    }

    pub fn resolved_functions(&self) -> &HashMap<FunctionId, ResolvedFunction> {
        &self.resolved_functions
    }

    pub fn into_resolved(
        self,
    ) -> (
        HashMap<StructId, ResolvedStruct>,
        HashMap<FunctionId, ResolvedFunction>,
    ) {
        (self.resolved_structs, self.resolved_functions)
    }

    fn resolve_struct_fields(&mut self, decl: &StructDecl, program: &Program) {
        let Some(symbol) = self.symbols.lookup_struct(&decl.name) else {
            crate::ice!("struct '{}' not in symbol table", decl.name);
        };
        let struct_id = symbol.struct_id;
        let type_id = symbol.ty_id;

        let mut resolved = ResolvedStruct {
            struct_id,
            type_id,
            name: decl.name.clone(),
            fields: vec![],
            location: decl.loc.clone(),
        };

        for field in &decl.fields {
            let type_name = program.arena.render(field.ty);
            let Some(ty_id) = self.resolve_type_name(&type_name, &field.loc) else {
                continue;
            };
            resolved.fields.push(ResolvedField {
                name: field.name.clone(),
                type_id: ty_id,
                location: field.loc.clone(),
            });
        }

        self.resolved_structs.insert(struct_id, resolved);
    }

    fn resolve_function_signature(&mut self, function: &Function, program: &Program) {
        let Some(symbol) = self.symbols.lookup_function(&function.name) else {
            crate::ice!("function '{}' not in symbol table", function.name);
        };
        let func_id = symbol.id;
        let is_extern = symbol.is_extern;

        let return_type_name = program.arena.render(function.return_ty);
        let Some(return_type) = self.resolve_type_name(&return_type_name, &function.loc) else {
            return;
        };

        let mut param_types = vec![];
        for param in &function.params {
            let type_name = program.arena.render(param.ty);
            let Some(ty_id) = self.resolve_type_name(&type_name, &param.loc) else {
                return;
            };
            param_types.push(ty_id);
        }

        self.resolved_functions.insert(
            func_id,
            ResolvedFunction {
                id: func_id,
                name: function.name.clone(),
                return_type,
                param_types,
                is_extern,
                location: function.loc.clone(),
            },
        );
    }

    fn check_circular_dependency(
        &mut self,
        struct_id: StructId,
        struct_name: &str,
        visiting: &mut HashSet<StructId>,
        loc: &Location,
    ) -> bool {
        if visiting.contains(&struct_id) {
            self.diagnostics.error(
                Phase::TypeResolution,
                loc.clone(),
                format!("Circular dependency detected in struct '{struct_name}'"),
            );
            return true;
        }

        let Some(resolved) = self.resolved_structs.get(&struct_id) else {
            return false;
        };
        let fields: Vec<(String, TyId, Location)> = resolved
            .fields
            .iter()
            .map(|field| (field.name.clone(), field.type_id, field.location.clone()))
            .collect();

        visiting.insert(struct_id);

        for (_, field_ty, field_loc) in fields {
            let Some(info) = self.ty_table.ty_info(field_ty) else {
                continue;
            };
            // arrays add indirection and break the cycle
            if info.kind != TyKind::Struct {
                continue;
            }
            let target_name = info.name.clone();
            if let Some(field_struct_id) = info.struct_id {
                if self.check_circular_dependency(
                    field_struct_id,
                    &target_name,
                    visiting,
                    &field_loc,
                ) {
                    return true;
                }
            }
        }

        visiting.remove(&struct_id);
        false
    }

    /// Closest declared type name, scored by length difference with a bonus
    /// for a matching first character; only matches with score < 3 qualify.
    fn suggest_type_name(&self, name: &str) -> Option<String> {
        let mut candidates: Vec<String> = vec![
            "int".to_string(),
            "float".to_string(),
            "string".to_string(),
            "bool".to_string(),
            "void".to_string(),
        ];
        for symbol in self.symbols.all_structs() {
            candidates.push(symbol.name.clone());
        }

        let mut best_match = None;
        let mut best_score = i32::MAX;

        for candidate in candidates {
            let mut score = (name.len() as i32 - candidate.len() as i32).abs();
            if let (Some(a), Some(b)) = (name.chars().next(), candidate.chars().next()) {
                if a == b {
                    score -= 2;
                }
            }

            if score < best_score && score < 3 {
                best_score = score;
                best_match = Some(candidate);
            }
        }

        best_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::sema::binder::{Bindings, SymbolBinder};

    struct ResolveResult {
        structs: HashMap<StructId, ResolvedStruct>,
        functions: HashMap<FunctionId, ResolvedFunction>,
        symbols: SymbolTable,
        diagnostics: DiagnosticEngine,
        success: bool,
    }

    fn resolve(input: &str) -> ResolveResult {
        let mut diagnostics = DiagnosticEngine::default();
        let program = parse_source(input, None, &mut diagnostics);
        assert!(!diagnostics.has_errors(), "test input must parse");

        let mut ty_table = TyTable::new();
        let mut symbols = SymbolTable::new();
        let mut bindings = Bindings::default();
        let bound = SymbolBinder::new(
            &mut ty_table,
            &mut symbols,
            &mut bindings,
            &mut diagnostics,
        )
        .bind(&program);
        assert!(bound, "test input must bind");

        let mut resolver = TypeResolver::new(&mut ty_table, &symbols, &mut diagnostics);
        let success = resolver.resolve(&[&program]);
        let (structs, functions) = resolver.into_resolved();

        ResolveResult {
            structs,
            functions,
            symbols,
            diagnostics,
            success,
        }
    }

    #[test]
    fn test_resolve_struct_fields() {
        let result = resolve("struct Pt { x: int, y: float }");

        assert!(result.success);
        let symbol = result.symbols.lookup_struct("Pt").unwrap();
        let resolved = &result.structs[&symbol.struct_id];
        assert_eq!(resolved.fields.len(), 2);
        assert_eq!(resolved.fields[0].type_id, ty_ids::INTEGER);
        assert_eq!(resolved.fields[1].type_id, ty_ids::FLOAT);
        assert_eq!(resolved.find_field("y").unwrap().0, 1);
    }

    #[test]
    fn test_resolve_function_signature() {
        let result = resolve("struct S { v: int } fun f(s: S, n: int) -> S { return s; }");

        assert!(result.success);
        let symbol = result.symbols.lookup_function("f").unwrap();
        let resolved = &result.functions[&symbol.id];
        let struct_ty = result.symbols.lookup_struct("S").unwrap().ty_id;
        assert_eq!(resolved.param_types, vec![struct_ty, ty_ids::INTEGER]);
        assert_eq!(resolved.return_type, struct_ty);
        assert!(!resolved.is_extern);
    }

    #[test]
    fn test_unknown_type_with_suggestion() {
        let result = resolve("struct S { v: itn }");

        assert!(!result.success);
        let message = &result.diagnostics.all()[0].message;
        assert!(message.contains("Unknown type 'itn'"));
        assert!(message.contains("Did you mean 'int'?"));
    }

    #[test]
    fn test_unknown_type_without_suggestion() {
        let result = resolve("struct S { v: Zzzzzzzzzzzzzz }");

        assert!(!result.success);
        let message = &result.diagnostics.all()[0].message;
        assert!(message.contains("Unknown type 'Zzzzzzzzzzzzzz'"));
        assert!(!message.contains("Did you mean"));
    }

    #[test]
    fn test_circular_struct_detected() {
        let result = resolve("struct A { b: B } struct B { a: A }");

        assert!(!result.success);
        assert_eq!(result.diagnostics.error_count(), 1);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Circular dependency detected"));
    }

    #[test]
    fn test_self_referential_struct_detected() {
        let result = resolve("struct A { a: A }");

        assert!(!result.success);
        assert!(result.diagnostics.all()[0]
            .message
            .contains("Circular dependency detected in struct 'A'"));
    }

    #[test]
    fn test_array_of_self_is_allowed() {
        let result = resolve("struct Tree { children: Tree[] }");

        assert!(result.success, "array fields are opaque to the cycle walk");
    }

    #[test]
    fn test_mutual_reference_through_array_is_allowed() {
        let result = resolve("struct A { bs: B[] } struct B { as_: A[] }");

        assert!(result.success);
    }
}
