use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use carp::CompileError;
use carp::ast::{Program, printer};
use carp::checker::Checker;
use carp::interpreter::Interpreter;
use carp::parser::Parser as CarpParser;
use carp::scanner;

#[derive(Parser, Debug)]
#[command(name = "carp", about = "A Carp language checker and interpreter")]
struct Cli {
    /// Carp source file to run
    file: PathBuf,

    /// Dump tokens and exit
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST and exit
    #[arg(long)]
    dump_ast: bool,

    /// AST output format
    #[arg(long, default_value = "sexp", value_parser = ["sexp", "json"])]
    ast_format: String,

    /// Stop after the semantic check
    #[arg(long)]
    check: bool,

    /// Print the final variable bindings after evaluation
    #[arg(long)]
    dump_env: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(cli: &Cli) -> Result<String> {
    std::fs::read_to_string(&cli.file)
        .with_context(|| format!("read source file '{}'", cli.file.display()))
}

fn report_compile_error(cli: &Cli, source: &str, err: CompileError) -> anyhow::Error {
    let err = err.with_source_code(cli.file.display().to_string(), source);
    eprintln!("{:?}", miette::Report::new(err));
    anyhow::anyhow!("compilation failed")
}

fn parse_source(cli: &Cli, source: &str) -> Result<Program> {
    let tokens = scanner::scan(source).map_err(|e| report_compile_error(cli, source, e))?;
    CarpParser::new(tokens)
        .parse()
        .map_err(|e| report_compile_error(cli, source, e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let source = read_source(&cli)?;

    if cli.dump_tokens {
        let tokens = scanner::scan(&source).map_err(|e| report_compile_error(&cli, &source, e))?;
        for token in &tokens {
            println!("{token}");
        }
        return Ok(());
    }

    let program = parse_source(&cli, &source)?;

    if cli.dump_ast {
        match cli.ast_format.as_str() {
            "json" => println!("{}", printer::to_json(&program)),
            _ => print!("{}", printer::to_sexp(&program)),
        }
        return Ok(());
    }

    Checker::new()
        .check(&program)
        .map_err(|e| report_compile_error(&cli, &source, e))?;
    if cli.check {
        return Ok(());
    }

    let mut interpreter = Interpreter::new();
    interpreter
        .interpret(&program)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if cli.dump_env {
        for (name, value) in interpreter.environment().bindings() {
            println!("{name} = {value}");
        }
    }
    Ok(())
}
