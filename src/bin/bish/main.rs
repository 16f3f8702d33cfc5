//! # Bish
//!
//! This binary is the compiler driver for Bishop. It combines lexer, parser,
//! type checker, and C++ emitter into a single application: one source file
//! in, one C++ translation unit out. The generated file is handed to an
//! external C++ compiler together with the Bishop runtime headers.

mod cli;

use cli::*;

use std::{error::Error, fs, process::exit};

use colored::Colorize;
use log::{error, info, warn};

use bishop_lang::{codegen, lexer::Lexer, parser, project, typechecker};

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::init();

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    match args.command {
        Commands::Build(build) => run_build(build),
    }
}

fn run_build(args: BuildArgs) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(&args.file)?;
    let filename = args.file.to_string_lossy().to_string();

    info!("compiling '{filename}'");

    let tokens = Lexer::new(&source).lex();

    let program = match parser::parse(tokens) {
        Ok(program) => program,
        Err(parse_error) => {
            eprintln!(
                "{} {filename}:{}: {parse_error}",
                "error:".red().bold(),
                parse_error.line
            );
            exit(1);
        }
    };

    if args.dump_parsed {
        info!("parsed AST:\n{program:#?}");
    }

    // Standard-library module factories and multi-file project discovery
    // live outside the compiler; the driver hands over whatever modules it
    // was given. With none, imports of user modules simply fail to resolve.
    let available = project::ModuleMap::default();
    let (modules, missing) = project::resolve(&program, &available);

    for path in &missing {
        warn!("could not resolve import '{path}'");
    }

    let outcome = typechecker::check(&program, &modules, &filename, args.test);

    if !outcome.errors.is_empty() {
        for type_error in &outcome.errors {
            eprintln!("{type_error}");
        }

        error!("{} error(s) found in '{filename}'", outcome.errors.len());
        exit(1);
    }

    let generated = codegen::generate(&program, &modules, &outcome.annotations, args.test);

    let output = args
        .output
        .unwrap_or_else(|| args.file.with_extension("cpp"));

    fs::write(&output, generated)?;
    info!("wrote '{}'", output.to_string_lossy());

    Ok(())
}
