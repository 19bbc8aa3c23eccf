//! Musica compiler CLI
//!
//! Compiles `.mus` sources into ABC notation.

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use musica::lexer::Token;

/// Musica - compile music notation to ABC
#[derive(Parser, Debug)]
#[command(name = "musica")]
#[command(version)]
#[command(about = "Compile Musica (.mus) sources to ABC notation")]
#[command(long_about = r#"
Musica compiles a small Spanish-keyword music language into ABC notation.

A source file declares its tempo, time signature and key, then lists notes:

  Tempo 60
  Compas 7/8
  Tonalidad Si Mayor
  Sol4 Corchea
  Do#5 Negra

Example usage:
  musica melodia.mus                 print ABC to stdout
  musica melodia.mus -o melodia.abc
  musica melodia.mus --tokens        print the token stream
  musica melodia.mus --ast           print the parsed program
"#)]
struct Cli {
    /// Source file to compile (.mus)
    input: PathBuf,

    /// Output file (.abc). Prints to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip semantic analysis
    #[arg(long)]
    no_validate: bool,

    /// Print the token stream and exit
    #[arg(long)]
    tokens: bool,

    /// Print the parsed program and exit
    #[arg(long)]
    ast: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn has_mus_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "mus")
}

fn print_tokens(source: &str) -> Result<(), musica::MusicaError> {
    let tokens = musica::tokenize(source)?;
    println!("{:<6}{:<8}TOKEN", "LINE", "COLUMN");
    for t in tokens {
        if t.token == Token::Whitespace {
            continue;
        }
        println!("{:<6}{:<8}{}", t.line, t.column, t.token);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if !has_mus_extension(&cli.input) {
        eprintln!("Error: Input file must have the .mus extension");
        return ExitCode::FAILURE;
    }

    let source = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("compiling {}", cli.input.display());

    if cli.tokens {
        return match print_tokens(&source) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    if cli.ast {
        return match musica::parse(&source) {
            Ok(program) => {
                print!("{}", program);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let result = if cli.no_validate {
        musica::compile_unchecked(&source)
    } else {
        musica::compile(&source)
    };

    let abc = match result {
        Ok(abc) => abc,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, &abc) {
                eprintln!("Error writing to '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
            log::info!("wrote ABC to {}", path.display());
        }
        None => print!("{}", abc),
    }

    ExitCode::SUCCESS
}
