use std::{error::Error, fs, path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser};
use natron::{
    lexer, pipeline,
    util::{
        fmt::{tree, Context, Show},
        intern::Interner,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Checks a Natron source file: lexing, parsing and semantic analysis.
#[derive(Parser)]
#[command(name = "natronc", version, long_about = None)]
struct Cli {
    /// Source file to check
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print the tokens of the primed source
    #[arg(long)]
    emit_tokens: bool,

    /// Print the syntax tree
    #[arg(long)]
    emit_ast: bool,

    /// Stop after parsing
    #[arg(long)]
    parse_only: bool,

    /// Increase logging verbosity (-v, -vv). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(directive_for_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("failed to run: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the source passed every requested stage.
fn run(cli: &Cli) -> Result<bool, Box<dyn Error>> {
    let src = fs::read_to_string(&cli.input)?;
    info!(path = %cli.input.display(), bytes = src.len(), "read source");

    let mut idents = Interner::with_capacity(256);

    if cli.emit_tokens {
        match lexer::tokenize(&lexer::prime(&src)) {
            Ok(tokens) => {
                for token in tokens {
                    println!("{token:?}");
                }
            }
            Err(error) => {
                let ctx = Context {
                    ident_interner: &idents,
                };
                eprintln!("{:#}", error.display(&ctx));
                return Ok(false);
            }
        }
    }

    let result = if cli.parse_only {
        pipeline::parse(&src, &mut idents).map_err(|diagnostic| pipeline::Failure {
            program: None,
            diagnostic,
        })
    } else {
        pipeline::run(&src, &mut idents)
    };

    let ctx = Context {
        ident_interner: &idents,
    };
    match result {
        Ok(program) => {
            if cli.emit_ast {
                print!("{}", tree::print_program_string(&idents, &program));
            }
            Ok(true)
        }
        Err(failure) => {
            if let (true, Some(program)) = (cli.emit_ast, &failure.program) {
                print!("{}", tree::print_program_string(&idents, program));
            }
            eprintln!("{:#}", failure.diagnostic.display(&ctx));
            Ok(false)
        }
    }
}

fn directive_for_verbosity(v: u8) -> &'static str {
    match v {
        0 => "natron=warn",
        1 => "natron=debug",
        _ => "natron=trace",
    }
}
