//! # keac
//!
//! The Kea compiler binary. It combines parser, semantic analysis, IR
//! lowering and code generation into a single application.

mod cli;

use cli::Cli;

use kea_lang::driver::{CompilerDriver, CompilerOptions};

fn main() -> anyhow::Result<()> {
    let args = Cli::init();

    simple_logger::init_with_level(args.verbosity.level()).unwrap();

    let options = CompilerOptions {
        input_file: args.file,
        output: args.output,
        dump_ast: args.dump_ast,
        dump_air: args.dump_air,
        emit_llvm: args.emit_llvm,
        no_optimize: args.no_optimize,
    };

    let mut driver = CompilerDriver::new(options);
    if !driver.run()? {
        std::process::exit(1);
    }

    Ok(())
}
