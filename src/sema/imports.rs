//! # Import Resolver
//!
//! Extends the symbol universe of a compilation with every transitively
//! imported source unit. Imported files are located through a fixed search
//! order, parsed with the shared diagnostic engine, and bound into the *same*
//! type and symbol tables as the root unit, so `FunctionId`s, `StructId`s and
//! `VarId`s stay globally unique and cross-file references resolve like local
//! ones.
//!
//! Canonicalized paths are the identity of a unit: importing the same file
//! twice (directly or transitively) is idempotent, and revisiting a path that
//! is still being processed is a circular import.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::diagnostics::{DiagnosticEngine, Phase};
use crate::lexer::Location;
use crate::parser::ast::{Import, Program};
use crate::parser::parse_source;
use crate::ty::TyTable;

use super::binder::{Bindings, SymbolBinder};
use super::symbols::SymbolTable;

pub struct ImportResolver<'a> {
    ty_table: &'a mut TyTable,
    symbols: &'a mut SymbolTable,
    bindings: &'a mut Bindings,
    diagnostics: &'a mut DiagnosticEngine,
    /// Base directories consulted after the importing file's own directory.
    search_paths: Vec<PathBuf>,
    /// Cycle detection key set; shared by construction since nested imports
    /// recurse on this one resolver.
    currently_importing: HashSet<PathBuf>,
    already_imported: HashSet<PathBuf>,
    resolved_import_paths: Vec<String>,
    imported_programs: Vec<Program>,
}

impl<'a> ImportResolver<'a> {
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
            search_paths: Self::initialize_search_paths(),
            currently_importing: HashSet::new(),
            already_imported: HashSet::new(),
            resolved_import_paths: vec![],
            imported_programs: vec![],
        }
    }

    /// Search path priority after the importing file's directory:
    /// 1. current working directory
    /// 2. standard library directory (`KEA_HOME` or executable-relative)
    /// 3. `KEA_PATH` (colon-separated)
    fn initialize_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }

        if let Some(stdlib) = Self::stdlib_path() {
            paths.push(stdlib);
        }

        if let Ok(kea_path) = std::env::var("KEA_PATH") {
            for part in kea_path.split(':') {
                if !part.is_empty() && Path::new(part).exists() {
                    paths.push(PathBuf::from(part));
                }
            }
        }

        paths
    }

    fn stdlib_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("KEA_HOME") {
            let stdlib = Path::new(&home).join("stdlib");
            if stdlib.exists() {
                return Some(stdlib);
            }
        }

        // fall back to a stdlib directory next to (or above) the executable
        if let Ok(exe) = std::env::current_exe() {
            if let Some(exe_dir) = exe.parent() {
                let sibling = exe_dir.join("stdlib");
                if sibling.exists() {
                    return Some(sibling);
                }
                if let Some(root) = exe_dir.parent() {
                    let above = root.join("stdlib");
                    if above.exists() {
                        return Some(above);
                    }
                }
            }
        }

        None
    }

    /// Resolve every import of the root unit. `current_file` is the path of
    /// the root source file; relative imports are tried against its directory
    /// first.
    pub fn resolve_imports(&mut self, program: &Program, current_file: &Path) -> bool {
        let base_dir = match current_file.parent() {
            Some(parent) if parent != Path::new("") => parent.to_path_buf(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        // mark the root unit in-flight so a cycle back into it is caught at
        // the import that closes it
        let root_key = normalize_path(current_file);
        self.currently_importing.insert(root_key.clone());

        let mut success = true;
        for import in program.imports() {
            if !self.resolve_import(import, &base_dir) {
                success = false;
            }
        }

        self.currently_importing.remove(&root_key);
        success
    }

    pub fn import_paths(&self) -> &[String] {
        &self.resolved_import_paths
    }

    pub fn into_imported_programs(self) -> (Vec<Program>, Vec<String>) {
        (self.imported_programs, self.resolved_import_paths)
    }

    fn resolve_import(&mut self, import: &Import, base_dir: &Path) -> bool {
        trace!("resolving import '{}'", import.path);

        let Some(file_path) = self.resolve_import_path(&import.path, base_dir) else {
            self.diagnostics.error(
                Phase::SymbolBinding,
                import.loc.clone(),
                format!("Cannot find import: '{}'", import.path),
            );
            return false;
        };

        let normalized = normalize_path(&file_path);

        if self.already_imported.contains(&normalized) {
            trace!("import '{}' already processed", import.path);
            return true;
        }

        if self.currently_importing.contains(&normalized) {
            self.diagnostics.error(
                Phase::SymbolBinding,
                import.loc.clone(),
                format!("Circular import detected: '{}'", import.path),
            );
            return false;
        }

        self.currently_importing.insert(normalized.clone());
        let success = self.process_imported_file(&normalized, &import.loc);
        self.currently_importing.remove(&normalized);

        if success {
            self.already_imported.insert(normalized.clone());
            self.resolved_import_paths
                .push(normalized.to_string_lossy().to_string());
        }

        success
    }

    fn resolve_import_path(&self, import_path: &str, base_dir: &Path) -> Option<PathBuf> {
        let mut candidates = vec![base_dir.to_path_buf()];
        candidates.extend(self.search_paths.iter().cloned());

        for search_dir in &candidates {
            let candidate = search_dir.join(import_path);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let absolute = Path::new(import_path);
        if absolute.is_absolute() && absolute.is_file() {
            return Some(absolute.to_path_buf());
        }

        None
    }

    fn process_imported_file(&mut self, file_path: &Path, import_loc: &Location) -> bool {
        debug!("processing imported file '{}'", file_path.display());

        let source = match std::fs::read_to_string(file_path) {
            Ok(source) => source,
            Err(_) => {
                self.diagnostics.error(
                    Phase::SymbolBinding,
                    import_loc.clone(),
                    format!("Cannot open import file: '{}'", file_path.display()),
                );
                return false;
            }
        };

        let errors_before = self.diagnostics.error_count();
        let imported = parse_source(
            &source,
            Some(file_path.to_string_lossy().to_string()),
            self.diagnostics,
        );
        if self.diagnostics.error_count() > errors_before {
            self.diagnostics.error(
                Phase::SymbolBinding,
                import_loc.clone(),
                format!("Failed to parse import: '{}'", file_path.display()),
            );
            return false;
        }

        // depth-first: the imports of the imported unit come first, so their
        // declarations are registered before this unit's own
        let base_dir = file_path
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        for import in imported.imports() {
            if !self.resolve_import(import, &base_dir) {
                return false;
            }
        }

        // bind the imported declarations into the shared tables so IDs stay
        // globally unique across all units
        let mut binder = SymbolBinder::new(
            self.ty_table,
            self.symbols,
            self.bindings,
            self.diagnostics,
        );
        if !binder.bind(&imported) {
            return false;
        }

        self.imported_programs.push(imported);
        true
    }
}

/// Canonical form of a path, used as the identity of a compilation unit.
fn normalize_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
