use std::path::PathBuf;
use std::process;

use clap::Parser as CliParser;

use bnt::diagnostics::Diagnostics;
use bnt::fmt;
use bnt::interpreter::builtins;
use bnt::interpreter::Interpreter;
use bnt::lexer;
use bnt::parser::Parser;
use bnt::types::TypeChecker;

#[derive(CliParser)]
#[command(name = "bnt", about = "The bnt programming language")]
struct Cli {
    /// Print debug output: stage headers, the token stream and the typed AST
    #[arg(short = 'd', long = "debug")]
    debug: bool,
    /// Path to the .bnt source file
    file: PathBuf,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            process::exit(1);
        }
    };

    let source = match lexer::read_source(&cli.file) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("{:#}", error);
            process::exit(2);
        }
    };
    if source.is_empty() {
        eprintln!("Error: Source file is empty: {}", cli.file.display());
        process::exit(2);
    }

    // The prelude rides in front of the user's code; diagnostics subtract
    // its line count again.
    let full_source = format!("{}{}", builtins::PRELUDE, source);
    let line_offset = builtins::prelude_line_count();

    if cli.debug {
        fmt::print_header("Building");
        println!("{}", full_source);
    }

    let tokens = match lexer::tokenize(&full_source) {
        Ok(tokens) => tokens,
        Err(error) => {
            eprintln!("{:#}", error);
            eprintln!("One or more errors occurred during lexing, exiting");
            process::exit(3);
        }
    };

    if cli.debug {
        fmt::print_header("Tokens");
        print!("{}", fmt::dump_tokens(&tokens));
    }

    let mut parser = Parser::new(tokens, Diagnostics::new(&full_source, line_offset));
    let program = parser.parse();
    if parser.has_errors() {
        parser.diagnostics().print_all();
        eprintln!("One or more errors occurred during parsing, exiting");
        process::exit(4);
    }

    let mut checker = TypeChecker::new(Diagnostics::new(&full_source, line_offset));
    checker.check(&program);
    checker.diagnostics().print_all();
    if checker.has_errors() {
        eprintln!("One or more errors occurred during type checking, exiting");
        process::exit(5);
    }

    if cli.debug {
        fmt::print_header("Typed AST");
        print!("{}", fmt::dump_ast(&program));
        fmt::print_header("Successful Build, Running");
    }

    let mut interpreter = Interpreter::new(Diagnostics::new(&full_source, line_offset));
    let succeeded = interpreter.run(&program);
    if !succeeded || interpreter.has_errors() {
        interpreter.diagnostics().print_all();
        eprintln!("One or more errors occurred at runtime, exiting");
        process::exit(6);
    }
}
