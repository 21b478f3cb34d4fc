//! Helpers for the integration test suite: run the compiler pipeline on
//! source snippets or files and hand back the module together with the
//! tables and diagnostics, so tests can assert on IDs, types and messages.

use std::path::{Path, PathBuf};

use kea_lang::air::Module;
use kea_lang::driver::Compiler;

pub struct Compiled {
    pub module: Option<Module>,
    pub compiler: Compiler,
}

impl Compiled {
    pub fn error_messages(&self) -> Vec<String> {
        self.compiler
            .diagnostics
            .all()
            .iter()
            .filter(|diagnostic| {
                diagnostic.severity == kea_lang::diagnostics::Severity::Error
            })
            .map(|diagnostic| diagnostic.message.clone())
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.compiler.diagnostics.error_count()
    }

    pub fn rendered_diagnostics(&self) -> String {
        self.compiler.diagnostics.render(false)
    }

    pub fn module(&self) -> &Module {
        self.module.as_ref().unwrap_or_else(|| {
            panic!(
                "expected a clean compilation, got:\n{}",
                self.rendered_diagnostics()
            )
        })
    }

    #[track_caller]
    pub fn assert_clean(&self) -> &Module {
        assert!(
            !self.compiler.diagnostics.has_errors(),
            "unexpected diagnostics:\n{}",
            self.rendered_diagnostics()
        );
        self.module()
    }
}

pub fn compile_source(source: &str) -> Compiled {
    compile_source_at(source, Path::new("main.kea"))
}

pub fn compile_source_at(source: &str, path: &Path) -> Compiled {
    let mut compiler = Compiler::new();
    let module = compiler.compile_source(source, path);
    Compiled { module, compiler }
}

pub fn compile_file(path: &Path) -> Compiled {
    let mut compiler = Compiler::new();
    let module = compiler.compile_file(path);
    Compiled { module, compiler }
}

/// Write `files` into `dir` and compile the first one as the root unit.
pub fn compile_project(dir: &Path, files: &[(&str, &str)]) -> Compiled {
    assert!(!files.is_empty(), "need at least a root file");

    let mut root = PathBuf::new();
    for (index, (name, content)) in files.iter().enumerate() {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create test directories");
        }
        std::fs::write(&path, content).expect("write test file");
        if index == 0 {
            root = path;
        }
    }

    compile_file(&root)
}
