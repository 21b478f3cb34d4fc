//! Syntactic type annotations. The parser interns every annotation it sees
//! into a [`TySpecArena`] and the AST refers to them by [`TySpecId`]. Specs
//! keep the source location of the annotation and are never deduplicated:
//! two `int` annotations written in different places get different IDs.

use serde::{Deserialize, Serialize};

use crate::lexer::Location;

pub type TySpecId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinTySpec {
    Int,
    Float,
    Bool,
    String,
    Void,
}

impl BuiltinTySpec {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTySpec::Int => "int",
            BuiltinTySpec::Float => "float",
            BuiltinTySpec::Bool => "bool",
            BuiltinTySpec::String => "string",
            BuiltinTySpec::Void => "void",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TySpecKind {
    Builtin(BuiltinTySpec),
    Named(String),
    Array {
        element: TySpecId,
        size: Option<u64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TySpec {
    pub kind: TySpecKind,
    pub loc: Location,
}

/// Append-only arena of parsed type annotations. One arena exists per parsed
/// program and is owned by it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TySpecArena {
    nodes: Vec<TySpec>,
}

impl TySpecArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern_builtin(&mut self, loc: Location, builtin: BuiltinTySpec) -> TySpecId {
        self.add(TySpec {
            kind: TySpecKind::Builtin(builtin),
            loc,
        })
    }

    pub fn intern_named(&mut self, loc: Location, name: impl ToString) -> TySpecId {
        self.add(TySpec {
            kind: TySpecKind::Named(name.to_string()),
            loc,
        })
    }

    pub fn intern_array(
        &mut self,
        loc: Location,
        element: TySpecId,
        size: Option<u64>,
    ) -> TySpecId {
        self.add(TySpec {
            kind: TySpecKind::Array { element, size },
            loc,
        })
    }

    pub fn get(&self, id: TySpecId) -> Option<&TySpec> {
        self.nodes.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Human readable rendering of a spec, used in diagnostics and for
    /// name-based type lookup.
    pub fn render(&self, id: TySpecId) -> String {
        let Some(spec) = self.get(id) else {
            return "invalid".to_string();
        };

        match &spec.kind {
            TySpecKind::Builtin(builtin) => builtin.name().to_string(),
            TySpecKind::Named(name) => name.clone(),
            TySpecKind::Array { element, size } => match size {
                Some(size) => format!("{}[{size}]", self.render(*element)),
                None => format!("{}[]", self.render(*element)),
            },
        }
    }

    fn add(&mut self, spec: TySpec) -> TySpecId {
        self.nodes.push(spec);
        (self.nodes.len() - 1) as TySpecId
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_render() {
        let mut arena = TySpecArena::new();

        let int = arena.intern_builtin(Location::default(), BuiltinTySpec::Int);
        let named = arena.intern_named(Location::default(), "Point");
        let array = arena.intern_array(Location::default(), int, None);
        let sized = arena.intern_array(Location::default(), named, Some(4));

        assert_eq!(arena.render(int), "int");
        assert_eq!(arena.render(named), "Point");
        assert_eq!(arena.render(array), "int[]");
        assert_eq!(arena.render(sized), "Point[4]");
    }

    #[test]
    fn test_no_structural_dedup() {
        let mut arena = TySpecArena::new();

        let a = arena.intern_builtin(Location::new(1, 1), BuiltinTySpec::Int);
        let b = arena.intern_builtin(Location::new(2, 1), BuiltinTySpec::Int);

        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_render_invalid_id() {
        let arena = TySpecArena::new();
        assert_eq!(arena.render(17), "invalid");
    }
}
