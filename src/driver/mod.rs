//! # Driver Module
//!
//! [`Compiler`] owns the state that outlives every stage (diagnostic engine,
//! type table, symbol table, binding records) and runs the pipeline in its
//! fixed order: parse, import resolution, symbol binding, type resolution,
//! AIR building. Between stages it checks the diagnostic engine and stops at
//! the first stage that reported errors.
//!
//! [`CompilerDriver`] wraps a [`Compiler`] with the user-facing concerns of
//! the `keac` binary: dumps, optimization, LLVM emission, linking.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context};
use log::{debug, info};

use crate::air::builder::AirBuilder;
use crate::air::printer::AirPrinter;
use crate::air::Module;
use crate::codegen::CodeGenerator;
use crate::diagnostics::DiagnosticEngine;
use crate::optimizer::{ConstantFolding, OptimizerPass};
use crate::parser::ast::Program;
use crate::parser::parse_source;
use crate::sema::binder::Bindings;
use crate::sema::{ImportResolver, SymbolBinder, SymbolTable, TypeResolver};
use crate::ty::TyTable;

/// Long-lived pipeline state. One `Compiler` compiles one program; callers
/// that want to compile several programs in parallel allocate one each.
pub struct Compiler {
    pub diagnostics: DiagnosticEngine,
    pub ty_table: TyTable,
    pub symbols: SymbolTable,
    pub bindings: Bindings,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            diagnostics: DiagnosticEngine::new(),
            ty_table: TyTable::new(),
            symbols: SymbolTable::new(),
            bindings: Bindings::default(),
        }
    }

    /// Parse one source unit. Does not run the rest of the pipeline.
    pub fn parse(&mut self, source: &str, path: &Path) -> Program {
        parse_source(
            source,
            Some(path.to_string_lossy().to_string()),
            &mut self.diagnostics,
        )
    }

    pub fn compile_file(&mut self, path: &Path) -> Option<Module> {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(_) => {
                self.diagnostics.error(
                    crate::diagnostics::Phase::Parser,
                    crate::lexer::Location::default(),
                    format!("Could not read file: '{}'", path.display()),
                );
                return None;
            }
        };
        self.compile_source(&source, path)
    }

    pub fn compile_source(&mut self, source: &str, path: &Path) -> Option<Module> {
        debug!("parsing '{}'", path.display());
        let program = self.parse(source, path);
        if self.diagnostics.has_errors() {
            return None;
        }

        self.run_pipeline(program, path)
    }

    /// Run imports, binding, type resolution and AIR building over an
    /// already parsed root unit.
    pub fn run_pipeline(&mut self, program: Program, path: &Path) -> Option<Module> {
        debug!("resolving imports of '{}'", path.display());
        let mut import_resolver = ImportResolver::new(
            &mut self.ty_table,
            &mut self.symbols,
            &mut self.bindings,
            &mut self.diagnostics,
        );
        import_resolver.resolve_imports(&program, path);
        let (imported_programs, import_paths) = import_resolver.into_imported_programs();
        if self.diagnostics.has_errors() {
            return None;
        }

        debug!("binding symbols");
        let mut binder = SymbolBinder::new(
            &mut self.ty_table,
            &mut self.symbols,
            &mut self.bindings,
            &mut self.diagnostics,
        );
        binder.bind(&program);
        if self.diagnostics.has_errors() {
            return None;
        }

        // imported units first: their declarations were bound first, so
        // their IDs come first too
        let mut units: Vec<&Program> = imported_programs.iter().collect();
        units.push(&program);

        debug!("resolving types");
        let mut type_resolver =
            TypeResolver::new(&mut self.ty_table, &self.symbols, &mut self.diagnostics);
        type_resolver.resolve(&units);
        let (resolved_structs, resolved_functions) = type_resolver.into_resolved();
        if self.diagnostics.has_errors() {
            return None;
        }

        debug!("building AIR");
        let module_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string());
        let mut builder = AirBuilder::new(
            &mut self.ty_table,
            &self.symbols,
            &resolved_structs,
            &resolved_functions,
            &self.bindings,
            &mut self.diagnostics,
        );
        builder.build(module_name, &units, import_paths)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilerOptions {
    pub input_file: PathBuf,
    pub output: Option<PathBuf>,
    pub dump_ast: bool,
    pub dump_air: bool,
    /// Stop after writing the `.ll` file.
    pub emit_llvm: bool,
    pub no_optimize: bool,
}

pub struct CompilerDriver {
    options: CompilerOptions,
    compiler: Compiler,
}

impl CompilerDriver {
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            compiler: Compiler::new(),
        }
    }

    /// Run the full compilation. Returns `Ok(false)` when the input had
    /// errors (diagnostics have been printed), `Err` for I/O and toolchain
    /// failures.
    pub fn run(&mut self) -> anyhow::Result<bool> {
        let input = self.options.input_file.clone();
        let source = std::fs::read_to_string(&input)
            .with_context(|| format!("could not read '{}'", input.display()))?;

        let program = self.compiler.parse(&source, &input);
        if self.options.dump_ast {
            println!("{}", serde_json::to_string_pretty(&program)?);
        }
        if self.compiler.diagnostics.has_errors() {
            self.compiler.diagnostics.print_all();
            return Ok(false);
        }

        let module = self.compiler.run_pipeline(program, &input);
        let Some(mut module) = module else {
            self.compiler.diagnostics.print_all();
            return Ok(false);
        };

        if !self.options.no_optimize {
            debug!("running constant folding");
            ConstantFolding.run(&mut module);
        }

        if self.options.dump_air {
            print!(
                "{}",
                AirPrinter::new(&self.compiler.ty_table).print_module(&module)
            );
        }

        let ir = CodeGenerator::new(&self.compiler.ty_table).generate(&module);
        let ll_path = self.output_path("ll");
        std::fs::write(&ll_path, &ir)
            .with_context(|| format!("could not write '{}'", ll_path.display()))?;
        info!("wrote LLVM IR to '{}'", ll_path.display());

        if !self.options.emit_llvm {
            self.link_executable(&ll_path)?;
        }

        // surface accumulated warnings even on success
        if self.compiler.diagnostics.warning_count() > 0 {
            self.compiler.diagnostics.print_all();
        }

        Ok(true)
    }

    fn output_path(&self, extension: &str) -> PathBuf {
        match &self.options.output {
            Some(output) if self.options.emit_llvm => output.clone(),
            _ => self.options.input_file.with_extension(extension),
        }
    }

    fn link_executable(&self, ll_path: &Path) -> anyhow::Result<()> {
        let executable = match &self.options.output {
            Some(output) => output.clone(),
            None => self.options.input_file.with_extension("out"),
        };

        let mut command = Command::new("clang");
        command.arg(ll_path);
        if let Some(runtime) = Self::runtime_source() {
            command.arg(runtime);
        }
        command.arg("-o").arg(&executable);

        debug!("linking: {command:?}");
        let status = command
            .status()
            .context("could not invoke 'clang' (is it installed?)")?;
        if !status.success() {
            bail!("linking failed with status {status}");
        }

        info!("created executable '{}'", executable.display());
        Ok(())
    }

    /// The C runtime next to the stdlib, found the same way imports find the
    /// standard library.
    fn runtime_source() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("KEA_HOME") {
            let runtime = Path::new(&home).join("stdlib").join("runtime.c");
            if runtime.is_file() {
                return Some(runtime);
            }
        }
        if let Ok(exe) = std::env::current_exe() {
            for base in exe.ancestors().skip(1).take(4) {
                let runtime = base.join("stdlib").join("runtime.c");
                if runtime.is_file() {
                    return Some(runtime);
                }
            }
        }
        None
    }
}
