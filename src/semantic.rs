//! # Semantic Analysis Module
//!
//! This module decides whether a parsed [`Program`] is valid and reports the
//! first violation it finds.
//!
//! ## Validation Rules
//!
//! ### Declarations (checked first, in source order)
//! - Each kind (tempo, time signature, key) may appear only once
//! - Tempo: 20 to 200 BPM
//! - Time signature: numerator in 2..=12, denominator one of 2, 4, 8, 16
//! - Key: the root must be a known pitch-class spelling (`Si`, `Fa#`, `Bb`, ...)
//!
//! ### Statements (checked second, in source order)
//! - The note name must be a known pitch-class spelling
//! - The octave must lie in `MIN_OCTAVE..=MAX_OCTAVE`
//! - Durations are a closed set and always valid
//!
//! ### Mandatory declarations (checked last)
//! - Tempo, time signature and key must all have been declared
//!
//! ## Resolution Context
//! Seen declarations are recorded as sentinel keys (`"__tempo__"`, ...) in a
//! [`ResolutionContext`]. Each analysis runs inside its own scope, so one
//! context can be reused across programs without keys leaking between them.
//!
//! ## Entry Point
//! `resolve(program: &Program) -> Result<(), SemanticError>`
//!
//! ## Example
//! ```rust
//! use musica::{parse, resolve};
//!
//! let program = parse("Tempo 60\nCompas 7/8\nTonalidad Si Mayor\nSol4 Corchea").unwrap();
//! assert!(resolve(&program).is_ok());
//! ```

use std::collections::HashSet;

use crate::ast::*;
use crate::error::SemanticError;

pub const MIN_BPM: i32 = 20;
pub const MAX_BPM: i32 = 200;
pub const MAX_NUMERATOR: i32 = 12;
pub const VALID_DENOMINATORS: [i32; 4] = [2, 4, 8, 16];
pub const MIN_OCTAVE: i32 = 0;
pub const MAX_OCTAVE: i32 = 8;

/// Fact table of sentinel keys, organised as a stack of scopes.
///
/// The outermost scope always exists; `exit_scope` never removes it.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    scopes: Vec<HashSet<String>>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self {
            scopes: vec![HashSet::new()],
        }
    }
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes, including the outermost one
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Record a key in the innermost scope. Returns false if it was already there.
    pub fn declare(&mut self, key: &str) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => scope.insert(key.to_string()),
            None => false,
        }
    }

    /// Whether the innermost scope holds the key
    pub fn is_declared(&self, key: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.contains(key))
    }

    /// Whether any open scope holds the key
    pub fn lookup(&self, key: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(key))
    }
}

/// Validate a program with a fresh resolution context
pub fn resolve(program: &Program) -> Result<(), SemanticError> {
    let mut context = ResolutionContext::new();
    resolve_in(program, &mut context)
}

/// Validate a program inside a new scope of an existing context.
///
/// The scope is closed again whether or not validation succeeds.
pub fn resolve_in(program: &Program, context: &mut ResolutionContext) -> Result<(), SemanticError> {
    context.enter_scope();
    let result = resolve_program(program, context);
    context.exit_scope();

    match &result {
        Ok(()) => log::debug!(
            "resolved {} declarations and {} statements",
            program.declarations.len(),
            program.statements.len()
        ),
        Err(e) => log::debug!("semantic analysis failed: {}", e),
    }
    result
}

fn resolve_program(program: &Program, context: &mut ResolutionContext) -> Result<(), SemanticError> {
    for declaration in &program.declarations {
        resolve_declaration(declaration, context)?;
    }

    for statement in &program.statements {
        resolve_statement(statement)?;
    }

    for kind in DeclarationKind::ALL {
        if !context.is_declared(kind.sentinel()) {
            return Err(SemanticError::MissingDeclaration(kind));
        }
    }

    Ok(())
}

/// Check one declaration and record its sentinel key
pub fn resolve_declaration(
    declaration: &Declaration,
    context: &mut ResolutionContext,
) -> Result<(), SemanticError> {
    let kind = declaration.kind();
    if context.is_declared(kind.sentinel()) {
        return Err(SemanticError::DuplicateDeclaration(kind));
    }

    check_declaration_value(declaration).map_err(|detail| {
        SemanticError::InvalidDeclarationValue { kind, detail }
    })?;

    context.declare(kind.sentinel());
    Ok(())
}

fn check_declaration_value(declaration: &Declaration) -> Result<(), String> {
    match declaration {
        Declaration::Tempo(tempo) => {
            if !(MIN_BPM..=MAX_BPM).contains(&tempo.bpm) {
                return Err(format!(
                    "bpm {} is outside {}..={}",
                    tempo.bpm, MIN_BPM, MAX_BPM
                ));
            }
        }
        Declaration::TimeSignature(ts) => {
            if ts.numerator <= 1 || ts.numerator > MAX_NUMERATOR {
                return Err(format!(
                    "numerator {} must be greater than 1 and at most {}",
                    ts.numerator, MAX_NUMERATOR
                ));
            }
            if !VALID_DENOMINATORS.contains(&ts.denominator) {
                return Err(format!(
                    "denominator {} must be one of 2, 4, 8, 16",
                    ts.denominator
                ));
            }
        }
        Declaration::Key(key) => {
            if PitchClass::from_name(&key.root).is_none() {
                return Err(format!("invalid root note '{}'", key.root));
            }
        }
    }
    Ok(())
}

/// Check one statement. Statements never touch the resolution context.
pub fn resolve_statement(statement: &Statement) -> Result<(), SemanticError> {
    match statement {
        Statement::Note(stmt) => resolve_note(&stmt.note),
    }
}

fn resolve_note(expr: &NoteExpression) -> Result<(), SemanticError> {
    let note = &expr.note;
    if PitchClass::from_name(&note.name).is_none() {
        return Err(SemanticError::InvalidNoteValue(format!(
            "unknown note name '{}' in '{}'",
            note.name, note
        )));
    }
    if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&note.octave) {
        return Err(SemanticError::InvalidNoteValue(format!(
            "octave {} of '{}' is outside {}..={}",
            note.octave, note, MIN_OCTAVE, MAX_OCTAVE
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn header() -> Vec<Declaration> {
        vec![
            Declaration::tempo(60),
            Declaration::time_signature(7, 8),
            Declaration::key("Si", Mode::Major),
        ]
    }

    fn program_with(declarations: Vec<Declaration>, statements: Vec<NoteStatement>) -> Program {
        Program {
            declarations,
            statements: statements.into_iter().map(Statement::Note).collect(),
            ..Program::default()
        }
    }

    #[test]
    fn test_valid_program() {
        let program = program_with(
            header(),
            vec![NoteStatement::new("Sol", 4, DurationKind::Eighth)],
        );
        assert_eq!(resolve(&program), Ok(()));
    }

    #[test]
    fn test_valid_parsed_program() {
        let program = parse("Tempo 120\nCompas 3/4\nTonalidad Fa# Menor\nDo#5 Negra\nBb3 Blanca").unwrap();
        assert_eq!(resolve(&program), Ok(()));
    }

    #[test]
    fn test_tempo_bounds() {
        for (bpm, ok) in [(19, false), (20, true), (200, true), (201, false)] {
            let mut decls = header();
            decls[0] = Declaration::tempo(bpm);
            let result = resolve(&program_with(decls, vec![]));
            assert_eq!(result.is_ok(), ok, "bpm {}", bpm);
        }
    }

    #[test]
    fn test_invalid_denominator() {
        let mut decls = header();
        decls[1] = Declaration::time_signature(7, 6);
        let result = resolve(&program_with(decls, vec![]));
        match result {
            Err(SemanticError::InvalidDeclarationValue { kind, detail }) => {
                assert_eq!(kind, DeclarationKind::TimeSignature);
                assert!(detail.contains("denominator 6"), "detail: {}", detail);
            }
            other => panic!("Expected InvalidDeclarationValue, got {:?}", other),
        }
    }

    #[test]
    fn test_numerator_bounds() {
        for (numerator, ok) in [(1, false), (2, true), (12, true), (13, false)] {
            let mut decls = header();
            decls[1] = Declaration::time_signature(numerator, 4);
            let result = resolve(&program_with(decls, vec![]));
            assert_eq!(result.is_ok(), ok, "numerator {}", numerator);
        }
    }

    #[test]
    fn test_invalid_key_root() {
        let mut decls = header();
        decls[2] = Declaration::key("Xb", Mode::Major);
        let result = resolve(&program_with(decls, vec![]));
        assert_eq!(
            result,
            Err(SemanticError::InvalidDeclarationValue {
                kind: DeclarationKind::Key,
                detail: "invalid root note 'Xb'".to_string(),
            })
        );
    }

    #[test]
    fn test_duplicate_tempo() {
        let mut decls = header();
        decls.push(Declaration::tempo(90));
        let result = resolve(&program_with(decls, vec![]));
        assert_eq!(
            result,
            Err(SemanticError::DuplicateDeclaration(DeclarationKind::Tempo))
        );
    }

    #[test]
    fn test_duplicate_reported_before_later_value_error() {
        let decls = vec![
            Declaration::tempo(60),
            Declaration::tempo(60),
            Declaration::time_signature(7, 6),
        ];
        let result = resolve(&program_with(decls, vec![]));
        assert_eq!(
            result,
            Err(SemanticError::DuplicateDeclaration(DeclarationKind::Tempo))
        );
    }

    #[test]
    fn test_invalid_note_name() {
        let program = program_with(
            header(),
            vec![NoteStatement::new("Zz", 4, DurationKind::Quarter)],
        );
        match resolve(&program) {
            Err(SemanticError::InvalidNoteValue(detail)) => assert!(detail.contains("'Zz'")),
            other => panic!("Expected InvalidNoteValue, got {:?}", other),
        }
    }

    #[test]
    fn test_octave_bounds() {
        for (octave, ok) in [(-1, false), (0, true), (8, true), (9, false)] {
            let program = program_with(
                header(),
                vec![NoteStatement::new("La", octave, DurationKind::Quarter)],
            );
            assert_eq!(resolve(&program).is_ok(), ok, "octave {}", octave);
        }
    }

    #[test]
    fn test_missing_declaration_checked_last() {
        // The bad note is reported even though the key is also missing
        let program = program_with(
            vec![Declaration::tempo(60), Declaration::time_signature(4, 4)],
            vec![NoteStatement::new("Sol", 9, DurationKind::Quarter)],
        );
        assert!(matches!(resolve(&program), Err(SemanticError::InvalidNoteValue(_))));

        let program = program_with(
            vec![Declaration::tempo(60), Declaration::time_signature(4, 4)],
            vec![NoteStatement::new("Sol", 4, DurationKind::Quarter)],
        );
        assert_eq!(
            resolve(&program),
            Err(SemanticError::MissingDeclaration(DeclarationKind::Key))
        );
    }

    #[test]
    fn test_missing_order() {
        let program = program_with(vec![], vec![]);
        assert_eq!(
            resolve(&program),
            Err(SemanticError::MissingDeclaration(DeclarationKind::Tempo))
        );
    }

    #[test]
    fn test_shared_context_does_not_leak() {
        let mut context = ResolutionContext::new();
        let program = program_with(header(), vec![]);

        assert_eq!(resolve_in(&program, &mut context), Ok(()));
        // Same declarations again must not count as duplicates
        assert_eq!(resolve_in(&program, &mut context), Ok(()));
        assert_eq!(context.depth(), 1);
        assert!(!context.lookup("__tempo__"));

        // A failed run also closes its scope
        let broken = program_with(vec![Declaration::tempo(5)], vec![]);
        assert!(resolve_in(&broken, &mut context).is_err());
        assert_eq!(context.depth(), 1);

        // Nor does a key from a partial program satisfy the next one
        let partial = program_with(vec![Declaration::tempo(60)], vec![]);
        assert!(resolve_in(&partial, &mut context).is_err());
        let rest = program_with(
            vec![Declaration::time_signature(4, 4), Declaration::key("Do", Mode::Major)],
            vec![],
        );
        assert_eq!(
            resolve_in(&rest, &mut context),
            Err(SemanticError::MissingDeclaration(DeclarationKind::Tempo))
        );
    }

    #[test]
    fn test_context_scopes() {
        let mut context = ResolutionContext::new();
        assert!(context.declare("__key__"));
        assert!(!context.declare("__key__"));

        context.enter_scope();
        assert_eq!(context.depth(), 2);
        assert!(!context.is_declared("__key__"));
        assert!(context.lookup("__key__"));

        context.exit_scope();
        context.exit_scope();
        assert_eq!(context.depth(), 1);
        assert!(context.is_declared("__key__"));
    }
}
