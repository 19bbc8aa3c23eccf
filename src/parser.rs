//! # Parser Module
//!
//! This module parses tokens from the lexer into a [`Program`].
//!
//! ## Two-Step Parsing
//!
//! ### Front Matter
//! An optional YAML block between `---` lines (anywhere in the file) is cut
//! out first and deserialized into [`Metadata`]. The block's lines are
//! replaced by blank lines so token positions still match the file.
//!
//! ### Program Lines
//! Every remaining non-empty line holds exactly one item:
//! - `Tempo 60`
//! - `Compas 7/8` (or `Compás`)
//! - `Tonalidad Si Mayor` (`Mayor`/`M`, `Menor`/`m`)
//! - `Sol4 Corchea` - a note expression followed by a duration expression
//!
//! Declarations may appear on any line; they are collected in source order.
//! The parser checks shape only. Ranges, spellings and multiplicity are the
//! semantic analyzer's job.
//!
//! ## Entry Point
//! `parse(source: &str) -> Result<Program, MusicaError>`
//!
//! ## Example
//! ```rust
//! use musica::parse;
//!
//! let source = r#"---
//! title: Escala
//! ---
//! Tempo 90
//! Compas 4/4
//! Tonalidad Do Mayor
//! Do4 Negra
//! Re4 Negra
//! "#;
//!
//! let program = parse(source).unwrap();
//! assert_eq!(program.metadata.title, Some("Escala".to_string()));
//! assert_eq!(program.declarations.len(), 3);
//! assert_eq!(program.statements.len(), 2);
//! ```

use crate::ast::*;
use crate::error::MusicaError;
use crate::lexer::{Lexer, LocatedToken, Token};

/// Parser for Musica source code
pub struct Parser {
    tokens: Vec<LocatedToken>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<LocatedToken>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> Option<&LocatedToken> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&LocatedToken> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn skip_whitespace(&mut self) {
        while let Some(t) = self.current() {
            if t.token == Token::Whitespace {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Build a parse error at the current token, or just past the last one at end of input
    fn error_here(&self, message: impl Into<String>) -> MusicaError {
        let (line, column) = match self.current().or_else(|| self.tokens.last()) {
            Some(t) if self.current().is_some() => (t.line, t.column),
            Some(t) => (t.line, t.column + 1),
            None => (1, 1),
        };
        MusicaError::ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Parse every line into a Program (metadata already extracted)
    pub fn parse_program(&mut self, metadata: Metadata) -> Result<Program, MusicaError> {
        let mut program = Program {
            metadata,
            ..Program::default()
        };

        loop {
            self.skip_whitespace();
            let Some(t) = self.current() else {
                break;
            };

            match t.token {
                Token::Newline => {
                    self.advance();
                    continue;
                }
                Token::Tempo => {
                    let decl = self.parse_tempo()?;
                    program.add_declaration(decl);
                }
                Token::Compas => {
                    let decl = self.parse_time_signature()?;
                    program.add_declaration(decl);
                }
                Token::Tonalidad => {
                    let decl = self.parse_key()?;
                    program.add_declaration(decl);
                }
                _ => {
                    let stmt = self.parse_statement()?;
                    program.add_statement(stmt);
                }
            }

            self.expect_end_of_line()?;
        }

        Ok(program)
    }

    fn expect_end_of_line(&mut self) -> Result<(), MusicaError> {
        self.skip_whitespace();
        match self.current() {
            None => Ok(()),
            Some(t) if t.token == Token::Newline => {
                self.advance();
                Ok(())
            }
            Some(t) => Err(self.error_here(format!(
                "Unexpected {} - only one declaration or note is allowed per line",
                t.token
            ))),
        }
    }

    fn expect_number(&mut self, what: &str) -> Result<i32, MusicaError> {
        self.skip_whitespace();
        match self.current().map(|t| &t.token) {
            Some(Token::Number(n)) => {
                let value = saturate(*n);
                self.advance();
                Ok(value)
            }
            _ => Err(self.error_here(format!("Expected {}", what))),
        }
    }

    /// `Tempo <bpm>`
    fn parse_tempo(&mut self) -> Result<Declaration, MusicaError> {
        self.advance(); // Tempo
        let bpm = self.expect_number("a number after 'Tempo'")?;
        Ok(Declaration::tempo(bpm))
    }

    /// `Compas <numerator>/<denominator>`
    fn parse_time_signature(&mut self) -> Result<Declaration, MusicaError> {
        self.advance(); // Compas
        let numerator = self.expect_number("a numerator after 'Compas'")?;

        self.skip_whitespace();
        match self.current() {
            Some(t) if t.token == Token::Slash => {
                self.advance();
            }
            _ => return Err(self.error_here("Expected '/' in time signature (e.g. 'Compas 4/4')")),
        }

        let denominator = self.expect_number("a denominator after '/'")?;
        Ok(Declaration::time_signature(numerator, denominator))
    }

    /// `Tonalidad <root> <Mayor|Menor|M|m>`
    fn parse_key(&mut self) -> Result<Declaration, MusicaError> {
        self.advance(); // Tonalidad

        self.skip_whitespace();
        let root = match self.current().map(|t| &t.token) {
            Some(Token::Word(word)) => word.clone(),
            _ => return Err(self.error_here("Expected a root note after 'Tonalidad'")),
        };
        self.advance();

        self.skip_whitespace();
        let mode = match self.current().map(|t| &t.token) {
            Some(Token::Major) => Mode::Major,
            Some(Token::Minor) => Mode::Minor,
            _ => {
                return Err(self.error_here(format!(
                    "Expected 'Mayor' or 'Menor' after key root '{}'",
                    root
                )))
            }
        };
        self.advance();

        Ok(Declaration::key(root, mode))
    }

    /// A note (`Sol4`) or a duration (`Corchea`)
    fn parse_expression(&mut self) -> Result<Expression, MusicaError> {
        self.skip_whitespace();
        let Some(t) = self.current() else {
            return Err(self.error_here("Expected a note or a duration"));
        };

        if let Some(kind) = t.token.duration_kind() {
            self.advance();
            return Ok(Expression::Duration(DurationExpression {
                duration: Duration::new(kind),
            }));
        }

        let name = match &t.token {
            Token::Word(word) => word.clone(),
            other => return Err(self.error_here(format!("Expected a note, found {}", other))),
        };
        self.advance();

        // The octave must follow the name directly: Sol4, not Sol 4
        let octave = match self.current().map(|t| &t.token) {
            Some(Token::Number(n)) => {
                let octave = saturate(*n);
                self.advance();
                octave
            }
            _ => {
                return Err(self.error_here(format!(
                    "Expected an octave number right after note '{}' (e.g. '{}4')",
                    name, name
                )))
            }
        };

        Ok(Expression::Note(NoteExpression {
            note: Note::new(name, octave),
        }))
    }

    /// `<note> <duration>`
    fn parse_statement(&mut self) -> Result<Statement, MusicaError> {
        let note = match self.parse_expression()? {
            Expression::Note(note) => note,
            Expression::Duration(expr) => {
                return Err(self.error_here(format!(
                    "Duration '{}' must follow a note",
                    expr.duration
                )))
            }
        };

        self.skip_whitespace();
        let duration_start = self.position;
        let duration = match self.parse_expression() {
            Ok(Expression::Duration(duration)) => duration,
            Ok(Expression::Note(_)) | Err(_) => {
                // Report at the start of whatever stood where the duration belongs
                self.position = duration_start;
                return Err(self.error_here(format!(
                    "Expected a duration (Blanca, Negra, Corchea, Semicorchea) after note '{}'",
                    note.note
                )))
            }
        };

        Ok(Statement::Note(NoteStatement { note, duration }))
    }
}

/// Out-of-range numbers clamp to `i32::MAX` and are rejected by the analyzer
fn saturate(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Cut the front matter out of the source.
/// Returns (front matter content, source with the block blanked out).
fn extract_metadata(source: &str) -> (Option<String>, String) {
    let lines: Vec<&str> = source.lines().collect();

    let mut start_idx = None;
    let mut end_idx = None;

    for (i, line) in lines.iter().enumerate() {
        if line.trim() == "---" {
            if start_idx.is_none() {
                start_idx = Some(i);
            } else {
                end_idx = Some(i);
                break;
            }
        }
    }

    match (start_idx, end_idx) {
        (Some(start), Some(end)) => {
            let metadata_content = lines[start + 1..end].join("\n");

            let remaining: Vec<&str> = lines
                .iter()
                .enumerate()
                .map(|(i, line)| if (start..=end).contains(&i) { "" } else { *line })
                .collect();

            (Some(metadata_content), remaining.join("\n"))
        }
        _ => (None, source.to_string()),
    }
}

fn parse_metadata(content: &str) -> Result<Metadata, MusicaError> {
    if content.trim().is_empty() {
        return Ok(Metadata::default());
    }

    let raw: RawMetadata =
        serde_yaml::from_str(content).map_err(|e| MusicaError::MetadataError(e.to_string()))?;

    if let Some(beats) = raw.bar_beats {
        if !beats.is_finite() || beats <= 0.0 {
            return Err(MusicaError::MetadataError(format!(
                "bar-beats must be a positive number of quarter beats, got {}",
                beats
            )));
        }
    }

    Ok(Metadata {
        title: raw.title,
        bar_beats: raw.bar_beats,
    })
}

/// Tokenize the program part of a source file, skipping any front matter.
/// Token positions refer to lines of the original file.
pub fn tokenize(source: &str) -> Result<Vec<LocatedToken>, MusicaError> {
    let (_, music_source) = extract_metadata(source);
    Lexer::new(&music_source).tokenize()
}

/// Parse Musica source into a Program
pub fn parse(source: &str) -> Result<Program, MusicaError> {
    let (metadata_content, music_source) = extract_metadata(source);

    let metadata = match metadata_content {
        Some(content) => parse_metadata(&content)?,
        None => Metadata::default(),
    };

    let tokens = Lexer::new(&music_source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program(metadata)?;

    log::debug!(
        "parsed {} declarations and {} statements",
        program.declarations.len(),
        program.statements.len()
    );
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_declarations() {
        let program = parse("Tempo 60\nCompas 7/8\nTonalidad Si Mayor").unwrap();
        assert_eq!(
            program.declarations,
            vec![
                Declaration::tempo(60),
                Declaration::time_signature(7, 8),
                Declaration::key("Si", Mode::Major),
            ]
        );
        assert!(program.statements.is_empty());
    }

    #[test]
    fn test_note_statements() {
        let program = parse("Sol4 Corchea\nDo#5 Semicorchea\nSib3 Blanca").unwrap();
        assert_eq!(
            program.statements,
            vec![
                Statement::Note(NoteStatement::new("Sol", 4, DurationKind::Eighth)),
                Statement::Note(NoteStatement::new("Do#", 5, DurationKind::Sixteenth)),
                Statement::Note(NoteStatement::new("Sib", 3, DurationKind::Half)),
            ]
        );
    }

    #[test]
    fn test_short_mode_markers() {
        let program = parse("Tonalidad La m").unwrap();
        assert_eq!(program.declarations, vec![Declaration::key("La", Mode::Minor)]);
    }

    #[test]
    fn test_time_signature_with_spaces() {
        let program = parse("Compás 3 / 4").unwrap();
        assert_eq!(program.declarations, vec![Declaration::time_signature(3, 4)]);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let source = "// cabecera\nTempo 60\n\n   \n// patron 2+2+3\nSol4 Corchea // nota\n";
        let program = parse(source).unwrap();
        assert_eq!(program.declarations.len(), 1);
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_unknown_root_is_left_for_analysis() {
        let program = parse("Tonalidad Xb Mayor").unwrap();
        assert_eq!(program.declarations, vec![Declaration::key("Xb", Mode::Major)]);
    }

    #[test]
    fn test_text_round_trip_of_program() {
        let source = "Tempo 60\nCompas 7/8\nTonalidad Si Mayor\nSol4 Corchea\n";
        let program = parse(source).unwrap();
        assert_eq!(
            program.to_string(),
            "Tempo 60\nCompas 7/8\nTonalidad Si M\n\nSol4 Corchea\n"
        );
    }

    #[test]
    fn test_with_metadata() {
        let source = r#"---
title: Melodia
bar-beats: 4
---
Tempo 60"#;
        let program = parse(source).unwrap();
        assert_eq!(program.metadata.title, Some("Melodia".to_string()));
        assert_eq!(program.metadata.bar_beats, Some(4.0));
        assert_eq!(program.declarations.len(), 1);
    }

    #[test]
    fn test_metadata_keeps_line_numbers() {
        let source = "---\ntitle: X\n---\nTempo";
        match parse(source) {
            Err(MusicaError::ParseError { line, .. }) => assert_eq!(line, 4),
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_metadata() {
        let source = "---\nbar-beats: -2\n---\nTempo 60";
        assert!(matches!(parse(source), Err(MusicaError::MetadataError(_))));

        let source = "---\ntitle: [unclosed\n---\nTempo 60";
        assert!(matches!(parse(source), Err(MusicaError::MetadataError(_))));
    }

    #[test]
    fn test_missing_octave() {
        let result = parse("Sol Corchea");
        match result {
            Err(MusicaError::ParseError { message, .. }) => {
                assert!(message.contains("octave"), "unexpected message: {}", message);
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_detached_octave_is_rejected() {
        assert!(parse("Sol 4 Corchea").is_err());
    }

    #[test]
    fn test_missing_duration() {
        let result = parse("Sol4\nLa4 Negra");
        match result {
            Err(MusicaError::ParseError { line, message, .. }) => {
                assert_eq!(line, 1);
                assert!(message.contains("Expected a duration"));
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_duration_without_note() {
        assert!(parse("Corchea Sol4").is_err());
    }

    #[test]
    fn test_two_items_on_one_line() {
        let result = parse("Sol4 Corchea La4 Corchea");
        match result {
            Err(MusicaError::ParseError { line, column, message }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 14);
                assert!(message.contains("one declaration or note"));
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_time_signature_missing_slash() {
        assert!(parse("Compas 7 8").is_err());
    }

    #[test]
    fn test_key_missing_mode() {
        assert!(parse("Tonalidad Si").is_err());
    }

    #[test]
    fn test_tokenize_with_front_matter() {
        let source = "---\ntitle: Vals\nbar-beats: 3\n---\nTempo 60\nSol4 Negra";
        let tokens = tokenize(source).unwrap();
        let kinds: Vec<Token> = tokens
            .into_iter()
            .map(|t| t.token)
            .filter(|t| *t != Token::Whitespace && *t != Token::Newline)
            .collect();
        assert_eq!(
            kinds,
            vec![
                Token::Tempo,
                Token::Number(60),
                Token::Word("Sol".to_string()),
                Token::Number(4),
                Token::Negra,
            ]
        );
    }

    #[test]
    fn test_oversized_numbers_saturate() {
        let program = parse("Tempo 3000000000\nSol99999999999 Negra").unwrap();
        assert_eq!(program.declarations, vec![Declaration::tempo(i32::MAX)]);
        assert_eq!(
            program.statements,
            vec![Statement::Note(NoteStatement::new("Sol", i32::MAX, DurationKind::Quarter))]
        );
    }

    #[test]
    fn test_error_at_end_of_input() {
        match parse("Tempo") {
            Err(MusicaError::ParseError { line, column, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(column, 2);
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }
}
