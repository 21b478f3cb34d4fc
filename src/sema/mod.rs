//! # Semantic Analysis
//!
//! The passes between parsing and IR lowering. They share one type table,
//! one symbol table and one diagnostic engine, and run strictly in sequence:
//! import resolution merges all units into a single symbol universe, the
//! binder assigns stable IDs, the type resolver canonicalizes declared
//! signatures. The AIR builder (in [`crate::air`]) consumes their output.

pub mod binder;
pub mod imports;
pub mod resolver;
pub mod symbols;

pub use self::binder::{Bindings, FunctionBinding, SymbolBinder};
pub use self::imports::ImportResolver;
pub use self::resolver::{ResolvedField, ResolvedFunction, ResolvedStruct, TypeResolver};
pub use self::symbols::{
    FunctionId, FunctionSymbol, ScopeStack, StructSymbol, SymbolTable, VarId, VarSymbol,
};
