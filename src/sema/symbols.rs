//! Symbol storage shared by every pass: functions and structs live in a flat
//! global namespace keyed by name, variables are keyed by their [`VarId`] so
//! passes that run after binding can look them up without a scope chain.

use std::collections::HashMap;

use crate::lexer::Location;
use crate::ty::{StructId, TyId};

pub type VarId = u32;
pub type FunctionId = u32;

#[derive(Debug, Clone)]
pub struct VarSymbol {
    pub id: VarId,
    pub name: String,
    pub is_mutable: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub id: FunctionId,
    pub name: String,
    pub return_type: TyId,
    pub param_types: Vec<TyId>,
    pub is_extern: bool,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct StructSymbol {
    pub struct_id: StructId,
    pub ty_id: TyId,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    functions: HashMap<String, FunctionSymbol>,
    structs: HashMap<String, StructSymbol>,
    variables: HashMap<VarId, VarSymbol>,
    next_var_id: VarId,
    next_func_id: FunctionId,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_var_id(&mut self) -> VarId {
        let id = self.next_var_id;
        self.next_var_id += 1;
        id
    }

    pub fn allocate_func_id(&mut self) -> FunctionId {
        let id = self.next_func_id;
        self.next_func_id += 1;
        id
    }

    pub fn register_variable(
        &mut self,
        id: VarId,
        name: impl ToString,
        is_mutable: bool,
        location: Location,
    ) {
        self.variables.insert(
            id,
            VarSymbol {
                id,
                name: name.to_string(),
                is_mutable,
                location,
            },
        );
    }

    pub fn register_function(
        &mut self,
        id: FunctionId,
        name: impl ToString,
        return_type: TyId,
        param_types: Vec<TyId>,
        is_extern: bool,
        location: Location,
    ) {
        let name = name.to_string();
        self.functions.insert(
            name.clone(),
            FunctionSymbol {
                id,
                name,
                return_type,
                param_types,
                is_extern,
                location,
            },
        );
    }

    pub fn register_struct(
        &mut self,
        name: impl ToString,
        struct_id: StructId,
        ty_id: TyId,
        location: Location,
    ) {
        let name = name.to_string();
        self.structs.insert(
            name.clone(),
            StructSymbol {
                struct_id,
                ty_id,
                name,
                location,
            },
        );
    }

    pub fn lookup_function(&self, name: &str) -> Option<&FunctionSymbol> {
        self.functions.get(name)
    }

    pub fn lookup_struct(&self, name: &str) -> Option<&StructSymbol> {
        self.structs.get(name)
    }

    pub fn lookup_variable(&self, id: VarId) -> Option<&VarSymbol> {
        self.variables.get(&id)
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionSymbol> {
        self.functions.values()
    }

    pub fn all_structs(&self) -> impl Iterator<Item = &StructSymbol> {
        self.structs.values()
    }

    pub fn all_variables(&self) -> impl Iterator<Item = &VarSymbol> {
        self.variables.values()
    }
}

#[derive(Debug, Default)]
struct ScopeFrame {
    variables: HashMap<String, VarId>,
}

/// Lexical scope chain used during binding. Frames are pushed for function
/// bodies, blocks and loop bodies; lookup walks from the innermost frame
/// outwards. After binding the chain is discarded; later passes use the flat
/// `VarId`-keyed store.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<ScopeFrame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame::default()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    pub fn exit_scope(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn add_variable(&mut self, name: impl ToString, id: VarId) {
        if let Some(frame) = self.frames.last_mut() {
            frame.variables.insert(name.to_string(), id);
        }
    }

    /// Check only the innermost frame; shadowing across frames is allowed.
    pub fn has_local(&self, name: &str) -> bool {
        self.frames
            .last()
            .map(|frame| frame.variables.contains_key(name))
            .unwrap_or(false)
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.variables.get(name).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_ids_monotonic() {
        let mut table = SymbolTable::new();

        assert_eq!(table.allocate_var_id(), 0);
        assert_eq!(table.allocate_var_id(), 1);
        assert_eq!(table.allocate_func_id(), 0);
        assert_eq!(table.allocate_func_id(), 1);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut table = SymbolTable::new();

        let func_id = table.allocate_func_id();
        table.register_function(func_id, "main", 1, vec![], false, Location::default());
        table.register_struct("Pt", 0, 1000, Location::default());
        let var_id = table.allocate_var_id();
        table.register_variable(var_id, "x", true, Location::default());

        assert_eq!(table.lookup_function("main").unwrap().id, func_id);
        assert_eq!(table.lookup_struct("Pt").unwrap().ty_id, 1000);
        assert!(table.lookup_variable(var_id).unwrap().is_mutable);
        assert!(table.lookup_function("missing").is_none());
    }

    #[test]
    fn test_scope_lookup_walks_outwards() {
        let mut scope = ScopeStack::new();

        scope.add_variable("x", 0);
        scope.enter_scope();
        scope.add_variable("y", 1);

        assert_eq!(scope.lookup("x"), Some(0));
        assert_eq!(scope.lookup("y"), Some(1));

        scope.exit_scope();
        assert_eq!(scope.lookup("y"), None);
    }

    #[test]
    fn test_scope_shadowing() {
        let mut scope = ScopeStack::new();

        scope.add_variable("x", 0);
        scope.enter_scope();
        scope.add_variable("x", 1);

        assert_eq!(scope.lookup("x"), Some(1));
        assert!(scope.has_local("x"));

        scope.exit_scope();
        assert_eq!(scope.lookup("x"), Some(0));
    }

    #[test]
    fn test_has_local_is_frame_local() {
        let mut scope = ScopeStack::new();

        scope.add_variable("x", 0);
        scope.enter_scope();

        assert!(!scope.has_local("x"));
        assert_eq!(scope.lookup("x"), Some(0));
    }
}
