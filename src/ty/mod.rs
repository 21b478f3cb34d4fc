//! # Type Table Module
//!
//! Canonical registry of resolved types. Every type that survives resolution
//! is identified by a [`TyId`]; the low IDs are reserved for the built-in
//! types and are stable across runs, user-defined types start at
//! [`ty_ids::USER_DEFINED_START`]. Struct types are interned by name, array
//! types by element type, so type identity checks in the IR reduce to ID
//! equality.

use std::collections::HashMap;

pub type TyId = u32;
pub type StructId = u32;

/// Reserved type IDs, stable across all runs.
pub mod ty_ids {
    use super::TyId;

    /// Sentinel for failed resolution; treated as compatible with everything
    /// by the layers above so one error does not cascade.
    pub const ERROR: TyId = 0;
    pub const INTEGER: TyId = 1;
    pub const FLOAT: TyId = 2;
    pub const STRING: TyId = 3;
    pub const BOOL: TyId = 4;
    pub const VOID: TyId = 5;
    pub const USER_DEFINED_START: TyId = 1000;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TyKind {
    Error,
    Integer,
    Float,
    String,
    Bool,
    Void,
    Struct,
    Array,
}

#[derive(Debug, Clone)]
pub struct TyInfo {
    pub id: TyId,
    pub kind: TyKind,
    pub name: String,
    pub struct_id: Option<StructId>,
    /// For arrays: the single element type.
    pub type_params: Vec<TyId>,
}

impl TyInfo {
    pub fn is_builtin(&self) -> bool {
        matches!(
            self.kind,
            TyKind::Integer | TyKind::Float | TyKind::String | TyKind::Bool | TyKind::Void
        )
    }

    pub fn is_struct(&self) -> bool {
        self.kind == TyKind::Struct
    }

    pub fn is_error(&self) -> bool {
        self.kind == TyKind::Error
    }
}

#[derive(Debug)]
pub struct TyTable {
    types: HashMap<TyId, TyInfo>,
    name_to_ty: HashMap<String, TyId>,
    array_type_cache: HashMap<TyId, TyId>,
    next_ty_id: TyId,
    next_struct_id: StructId,
}

impl Default for TyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TyTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: HashMap::new(),
            name_to_ty: HashMap::new(),
            array_type_cache: HashMap::new(),
            next_ty_id: ty_ids::USER_DEFINED_START,
            next_struct_id: 0,
        };

        table.register_builtin("int", TyKind::Integer, ty_ids::INTEGER);
        table.register_builtin("float", TyKind::Float, ty_ids::FLOAT);
        table.register_builtin("string", TyKind::String, ty_ids::STRING);
        table.register_builtin("bool", TyKind::Bool, ty_ids::BOOL);
        table.register_builtin("void", TyKind::Void, ty_ids::VOID);
        table.register_builtin("error", TyKind::Error, ty_ids::ERROR);

        table
    }

    fn register_builtin(&mut self, name: &str, kind: TyKind, id: TyId) -> TyId {
        self.types.insert(
            id,
            TyInfo {
                id,
                kind,
                name: name.to_string(),
                struct_id: None,
                type_params: vec![],
            },
        );
        self.name_to_ty.insert(name.to_string(), id);
        id
    }

    /// Register a struct type, interning by name: re-registering an existing
    /// name returns the already assigned id.
    pub fn register_struct(&mut self, name: &str, struct_id: StructId) -> TyId {
        if let Some(existing) = self.lookup_by_name(name) {
            return existing;
        }

        let ty_id = self.next_ty_id;
        self.next_ty_id += 1;
        self.types.insert(
            ty_id,
            TyInfo {
                id: ty_id,
                kind: TyKind::Struct,
                name: name.to_string(),
                struct_id: Some(struct_id),
                type_params: vec![],
            },
        );
        self.name_to_ty.insert(name.to_string(), ty_id);
        ty_id
    }

    /// Register an array type, interning by element type: the same element
    /// type always yields the same array id.
    pub fn register_array(&mut self, element_ty: TyId) -> TyId {
        if let Some(cached) = self.array_type_cache.get(&element_ty) {
            return *cached;
        }

        let array_ty_id = self.next_ty_id;
        self.next_ty_id += 1;
        let array_name = format!("{}[]", self.ty_name(element_ty));
        self.types.insert(
            array_ty_id,
            TyInfo {
                id: array_ty_id,
                kind: TyKind::Array,
                name: array_name,
                struct_id: None,
                type_params: vec![element_ty],
            },
        );
        self.array_type_cache.insert(element_ty, array_ty_id);

        array_ty_id
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<TyId> {
        self.name_to_ty.get(name).copied()
    }

    pub fn ty_info(&self, id: TyId) -> Option<&TyInfo> {
        self.types.get(&id)
    }

    pub fn has_ty(&self, id: TyId) -> bool {
        self.types.contains_key(&id)
    }

    pub fn has_ty_name(&self, name: &str) -> bool {
        self.name_to_ty.contains_key(name)
    }

    pub fn allocate_struct_id(&mut self) -> StructId {
        let id = self.next_struct_id;
        self.next_struct_id += 1;
        id
    }

    pub fn ty_name(&self, id: TyId) -> String {
        match self.ty_info(id) {
            Some(info) => info.name.clone(),
            None => "<invalid type id>".to_string(),
        }
    }

    pub fn is_numeric(&self, id: TyId) -> bool {
        id == ty_ids::INTEGER || id == ty_ids::FLOAT
    }

    pub fn is_bool(&self, id: TyId) -> bool {
        id == ty_ids::BOOL
    }

    pub fn is_string(&self, id: TyId) -> bool {
        id == ty_ids::STRING
    }

    pub fn is_void(&self, id: TyId) -> bool {
        id == ty_ids::VOID
    }

    pub fn is_error(&self, id: TyId) -> bool {
        id == ty_ids::ERROR
    }

    pub fn is_struct(&self, id: TyId) -> bool {
        self.ty_info(id)
            .map(|info| info.kind == TyKind::Struct)
            .unwrap_or(false)
    }

    pub fn is_array(&self, id: TyId) -> bool {
        self.ty_info(id)
            .map(|info| info.kind == TyKind::Array)
            .unwrap_or(false)
    }

    pub fn array_element_type(&self, array_ty: TyId) -> Option<TyId> {
        self.ty_info(array_ty).and_then(|info| {
            if info.kind == TyKind::Array {
                info.type_params.first().copied()
            } else {
                None
            }
        })
    }

    /// Strict identity. Arrays are canonicalized by element type and structs
    /// by name, so id equality is type equality. The universal compatibility
    /// of the error type is the business of the layers above, not of the
    /// table.
    pub fn are_compatible(&self, lhs: TyId, rhs: TyId) -> bool {
        lhs == rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_have_reserved_ids() {
        let table = TyTable::new();

        assert_eq!(table.lookup_by_name("int"), Some(ty_ids::INTEGER));
        assert_eq!(table.lookup_by_name("float"), Some(ty_ids::FLOAT));
        assert_eq!(table.lookup_by_name("string"), Some(ty_ids::STRING));
        assert_eq!(table.lookup_by_name("bool"), Some(ty_ids::BOOL));
        assert_eq!(table.lookup_by_name("void"), Some(ty_ids::VOID));
        assert_eq!(table.lookup_by_name("error"), Some(ty_ids::ERROR));
    }

    #[test]
    fn test_struct_interning_by_name() {
        let mut table = TyTable::new();

        let sid = table.allocate_struct_id();
        let first = table.register_struct("S", sid);
        let second = table.register_struct("S", 999);

        assert_eq!(first, second);
        assert!(first >= ty_ids::USER_DEFINED_START);
        assert_eq!(table.ty_info(first).unwrap().struct_id, Some(sid));
    }

    #[test]
    fn test_array_interning_by_element() {
        let mut table = TyTable::new();

        let first = table.register_array(ty_ids::INTEGER);
        let second = table.register_array(ty_ids::INTEGER);
        let other = table.register_array(ty_ids::FLOAT);

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.ty_name(first), "int[]");
        assert_eq!(table.array_element_type(first), Some(ty_ids::INTEGER));
    }

    #[test]
    fn test_nested_array_names() {
        let mut table = TyTable::new();

        let inner = table.register_array(ty_ids::INTEGER);
        let outer = table.register_array(inner);

        assert_eq!(table.ty_name(outer), "int[][]");
    }

    #[test]
    fn test_classification() {
        let mut table = TyTable::new();
        let sid = table.allocate_struct_id();
        let struct_ty = table.register_struct("Pt", sid);
        let array_ty = table.register_array(struct_ty);

        assert!(table.is_numeric(ty_ids::INTEGER));
        assert!(table.is_numeric(ty_ids::FLOAT));
        assert!(!table.is_numeric(ty_ids::BOOL));
        assert!(table.is_struct(struct_ty));
        assert!(table.is_array(array_ty));
        assert!(!table.is_struct(array_ty));
        assert!(table.is_void(ty_ids::VOID));
        assert!(table.is_error(ty_ids::ERROR));
    }

    #[test]
    fn test_struct_ids_are_monotonic() {
        let mut table = TyTable::new();

        assert_eq!(table.allocate_struct_id(), 0);
        assert_eq!(table.allocate_struct_id(), 1);
        assert_eq!(table.allocate_struct_id(), 2);
    }

    #[test]
    fn test_compatibility_is_identity() {
        let table = TyTable::new();

        assert!(table.are_compatible(ty_ids::INTEGER, ty_ids::INTEGER));
        assert!(!table.are_compatible(ty_ids::INTEGER, ty_ids::FLOAT));
    }
}
