//! # Error Types
//!
//! This module defines all error types for the Musica compiler.
//!
//! ## Error Types
//! - `ParseError` - Lexer/parser errors with line and column information
//! - `MetadataError` - Invalid YAML front matter
//! - `Semantic` - The first semantic violation found by the analyzer
//! - `Output` - The ABC sink refused a write
//!
//! Semantic errors are kept in their own enum so the analyzer can be used
//! without the parser:
//! - `DuplicateDeclaration` - a declaration kind appears twice
//! - `InvalidDeclarationValue` - tempo, time signature or key out of range
//! - `InvalidNoteValue` - bad pitch spelling or octave
//! - `MissingDeclaration` - a mandatory declaration never appeared
//!
//! ## Usage
//! ```rust
//! use musica::{compile, MusicaError, SemanticError};
//!
//! let source = "Tempo 300\nCompas 4/4\nTonalidad Do Mayor\n";
//! match compile(source) {
//!     Ok(abc) => println!("{}", abc),
//!     Err(MusicaError::Semantic(SemanticError::InvalidDeclarationValue { kind, detail })) => {
//!         eprintln!("Bad {} declaration: {}", kind, detail);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::ast::DeclarationKind;

#[derive(Error, Debug)]
pub enum MusicaError {
    /// Parse error with location information.
    ///
    /// # Example
    /// ```
    /// # use musica::MusicaError;
    /// let err = MusicaError::ParseError {
    ///     line: 3,
    ///     column: 7,
    ///     message: "Expected a number after 'Tempo'".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at line 3, column 7: Expected a number after 'Tempo'");
    /// ```
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Invalid front matter.
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// The program parsed but failed semantic analysis.
    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("Failed to write ABC output")]
    Output(#[from] std::fmt::Error),
}

/// The single diagnostic produced by a failed analysis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    /// # Example
    /// ```
    /// # use musica::{DeclarationKind, SemanticError};
    /// let err = SemanticError::DuplicateDeclaration(DeclarationKind::Tempo);
    /// assert_eq!(err.to_string(), "duplicate tempo declaration");
    /// ```
    #[error("duplicate {0} declaration")]
    DuplicateDeclaration(DeclarationKind),

    #[error("invalid {kind} declaration: {detail}")]
    InvalidDeclarationValue {
        kind: DeclarationKind,
        detail: String,
    },

    #[error("invalid note: {0}")]
    InvalidNoteValue(String),

    /// # Example
    /// ```
    /// # use musica::{DeclarationKind, SemanticError};
    /// let err = SemanticError::MissingDeclaration(DeclarationKind::TimeSignature);
    /// assert_eq!(err.to_string(), "missing time signature declaration");
    /// ```
    #[error("missing {0} declaration")]
    MissingDeclaration(DeclarationKind),
}
