pub mod abc;
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;

pub use abc::{emit, emit_at, emit_with_options, to_abc, AbcOptions, BarPolicy, MusicalTime};
pub use ast::*;
pub use error::*;
pub use parser::{parse, tokenize};
pub use semantic::{resolve, resolve_in, ResolutionContext};

/// Compile a Musica source string to ABC notation.
/// This is the main entry point for the library.
pub fn compile(source: &str) -> Result<String, MusicaError> {
    let program = parse(source)?;
    resolve(&program)?;
    Ok(to_abc(&program))
}

/// Compile without semantic analysis (useful for inspecting partial programs)
pub fn compile_unchecked(source: &str) -> Result<String, MusicaError> {
    let program = parse(source)?;
    Ok(to_abc(&program))
}

/// Compile one fragment, appending to `out` and continuing from `time`.
///
/// Nothing is written if the fragment fails to parse or validate. A fragment
/// that declares a new time signature starts a fresh measure at the current beat.
pub fn compile_into(
    source: &str,
    out: &mut String,
    time: &mut MusicalTime,
) -> Result<(), MusicaError> {
    let program = parse(source)?;
    resolve(&program)?;
    let options = AbcOptions::from_metadata(&program.metadata);
    emit_at(&program, &options, out, time)?;
    Ok(())
}
