//! # Cli
//!
//! Command line interface of the Kea compiler.

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// The path to the Kea source file.
    #[arg(index = 1)]
    pub file: std::path::PathBuf,

    /// The path to the output (executable, or IR file with --emit-llvm).
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// Dump the parsed AST as JSON (for debugging).
    #[arg(long)]
    pub dump_ast: bool,

    /// Dump the typed AIR (for debugging).
    #[arg(long)]
    pub dump_air: bool,

    /// Stop after writing the LLVM IR file.
    #[arg(long)]
    pub emit_llvm: bool,

    /// Turn off optimization.
    #[arg(long)]
    pub no_optimize: bool,

    /// How much the compiler reports about its own work.
    #[arg(value_enum, short, long, default_value_t = Verbosity::default())]
    pub verbosity: Verbosity,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }
}

/// Amount of compiler-internal logging written to stderr. Diagnostics for
/// the compiled program are always printed regardless of this setting.
#[derive(ValueEnum, Clone, Copy, Default, Debug)]
pub enum Verbosity {
    /// Nothing beyond hard failures.
    #[default]
    #[value(alias("0"))]
    Quiet,

    /// Also surface compiler-internal warnings.
    #[value(alias("1"))]
    Warnings,

    /// Stage-by-stage progress: which files are parsed, linked, written.
    #[value(alias("2"))]
    Stages,

    /// Detailed pipeline output (imports, binding, lowering).
    #[value(alias("3"))]
    Internals,

    /// Per-step tracing. Very noisy; meant for debugging the compiler.
    #[value(alias("4"))]
    Everything,
}

impl Verbosity {
    /// The `log` level this verbosity enables.
    pub fn level(self) -> log::Level {
        match self {
            Verbosity::Quiet => log::Level::Error,
            Verbosity::Warnings => log::Level::Warn,
            Verbosity::Stages => log::Level::Info,
            Verbosity::Internals => log::Level::Debug,
            Verbosity::Everything => log::Level::Trace,
        }
    }
}
