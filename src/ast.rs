//! # Abstract Syntax Tree (AST) Types
//!
//! This module defines the datatype values and AST nodes of the Musica language.
//!
//! ## Type Hierarchy
//! ```text
//! Program
//!   ├── Metadata (front matter: title, bar-beats)
//!   ├── Vec<Declaration>
//!   │     ├── Tempo(Tempo)                   Tempo 60
//!   │     ├── TimeSignature(TimeSignature)   Compas 7/8
//!   │     └── Key(Key)                       Tonalidad Si Mayor
//!   └── Vec<Statement>
//!         └── Note(NoteStatement)            Sol4 Corchea
//!               ├── note: NoteExpression(Note)
//!               └── duration: DurationExpression(Duration)
//! ```
//!
//! ## Key Concepts
//!
//! ### Names stay as written
//! `Note::name` and `Key::root` keep the spelling from the source (`"Sol#"`,
//! `"Bb"`). Whether a spelling is a real pitch class is decided by the
//! semantic analyzer through [`PitchClass::from_name`], so a bad spelling is
//! reported as a semantic error with the offending text.
//!
//! ### Beats
//! Beat weights are measured in quarter notes: a half note is 2 beats, a
//! sixteenth is 0.25, regardless of the declared time signature.
//!
//! ### Stringification
//! Every node implements `Display`. The text is the human-readable Musica
//! form (`Compas 7/8`), not ABC. It never validates and never mutates.
//!
//! ## Related Modules
//! - `parser` - Creates these types from Musica source
//! - `semantic` - Validates these types
//! - `abc` - Generates ABC notation from these types

use serde::Deserialize;
use std::fmt;

/// Note length. Surface names are Spanish: Semicorchea, Corchea, Negra, Blanca.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationKind {
    Sixteenth, // Semicorchea
    Eighth,    // Corchea
    Quarter,   // Negra
    Half,      // Blanca
}

impl DurationKind {
    /// Returns the duration in quarter-note beats
    pub fn beats(&self) -> f64 {
        match self {
            DurationKind::Sixteenth => 0.25,
            DurationKind::Eighth => 0.5,
            DurationKind::Quarter => 1.0,
            DurationKind::Half => 2.0,
        }
    }

    /// Spanish name used in source and in stringification
    pub fn name(&self) -> &'static str {
        match self {
            DurationKind::Sixteenth => "Semicorchea",
            DurationKind::Eighth => "Corchea",
            DurationKind::Quarter => "Negra",
            DurationKind::Half => "Blanca",
        }
    }
}

/// Key mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

/// Diatonic step, A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Upper-case ABC letter
    pub fn letter(&self) -> char {
        match self {
            Step::C => 'C',
            Step::D => 'D',
            Step::E => 'E',
            Step::F => 'F',
            Step::G => 'G',
            Step::A => 'A',
            Step::B => 'B',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp, // #
    Flat,  // b
}

/// A valid pitch-class spelling, resolved to its step and accidental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchClass {
    pub step: Step,
    pub accidental: Accidental,
}

impl PitchClass {
    /// Look up a spelling in the fixed pitch-class table.
    ///
    /// Accepts solfège (`Do Re Mi Fa Sol La Si`) and letter (`C D E F G A B`)
    /// names, each optionally followed by `#` or `b`: `"Do#"`, `"Sib"`, `"F#"`, `"Bb"`.
    /// Returns `None` for anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        let (base, accidental) = if let Some(base) = name.strip_suffix('#') {
            (base, Accidental::Sharp)
        } else if let Some(base) = name.strip_suffix('b') {
            (base, Accidental::Flat)
        } else {
            (name, Accidental::Natural)
        };

        let step = match base {
            "Do" | "C" => Step::C,
            "Re" | "D" => Step::D,
            "Mi" | "E" => Step::E,
            "Fa" | "F" => Step::F,
            "Sol" | "G" => Step::G,
            "La" | "A" => Step::A,
            "Si" | "B" => Step::B,
            _ => return None,
        };

        Some(Self { step, accidental })
    }
}

/// A pitch with its octave, e.g. `Sol4`
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub name: String,
    pub octave: i32,
}

impl Note {
    pub fn new(name: impl Into<String>, octave: i32) -> Self {
        Self {
            name: name.into(),
            octave,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
    pub kind: DurationKind,
}

impl Duration {
    pub fn new(kind: DurationKind) -> Self {
        Self { kind }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tempo {
    pub bpm: i32,
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.bpm)
    }
}

/// Time signature (e.g., 4/4, 3/4, 7/8)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSignature {
    pub numerator: i32,   // Pulses per measure
    pub denominator: i32, // Note value that gets one pulse
}

impl TimeSignature {
    /// Length of one measure in quarter-note beats (7/8 = 3.5)
    pub fn measure_beats(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub root: String,
    pub mode: Mode,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "M",
            Mode::Minor => "m",
        };
        write!(f, "{} {}", self.root, mode)
    }
}

/// The three program-level settings. Each must appear exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Tempo,
    TimeSignature,
    Key,
}

impl DeclarationKind {
    /// Every kind, in the order missing declarations are reported
    pub const ALL: [DeclarationKind; 3] = [
        DeclarationKind::Tempo,
        DeclarationKind::TimeSignature,
        DeclarationKind::Key,
    ];

    /// Reserved key recorded in the resolution context once this kind is seen
    pub fn sentinel(&self) -> &'static str {
        match self {
            DeclarationKind::Tempo => "__tempo__",
            DeclarationKind::TimeSignature => "__time_signature__",
            DeclarationKind::Key => "__key__",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Tempo => f.write_str("tempo"),
            DeclarationKind::TimeSignature => f.write_str("time signature"),
            DeclarationKind::Key => f.write_str("key"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Tempo(Tempo),
    TimeSignature(TimeSignature),
    Key(Key),
}

impl Declaration {
    pub fn tempo(bpm: i32) -> Self {
        Declaration::Tempo(Tempo { bpm })
    }

    pub fn time_signature(numerator: i32, denominator: i32) -> Self {
        Declaration::TimeSignature(TimeSignature {
            numerator,
            denominator,
        })
    }

    pub fn key(root: impl Into<String>, mode: Mode) -> Self {
        Declaration::Key(Key {
            root: root.into(),
            mode,
        })
    }

    pub fn kind(&self) -> DeclarationKind {
        match self {
            Declaration::Tempo(_) => DeclarationKind::Tempo,
            Declaration::TimeSignature(_) => DeclarationKind::TimeSignature,
            Declaration::Key(_) => DeclarationKind::Key,
        }
    }

    pub fn bpm(&self) -> Option<i32> {
        match self {
            Declaration::Tempo(tempo) => Some(tempo.bpm),
            _ => None,
        }
    }

    pub fn numerator(&self) -> Option<i32> {
        match self {
            Declaration::TimeSignature(ts) => Some(ts.numerator),
            _ => None,
        }
    }

    pub fn denominator(&self) -> Option<i32> {
        match self {
            Declaration::TimeSignature(ts) => Some(ts.denominator),
            _ => None,
        }
    }

    pub fn root(&self) -> Option<&str> {
        match self {
            Declaration::Key(key) => Some(&key.root),
            _ => None,
        }
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            Declaration::Key(key) => Some(key.mode),
            _ => None,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Tempo(tempo) => write!(f, "Tempo {}", tempo.bpm),
            Declaration::TimeSignature(ts) => write!(f, "Compas {}", ts),
            Declaration::Key(key) => write!(f, "Tonalidad {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteExpression {
    pub note: Note,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DurationExpression {
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Note(NoteExpression),
    Duration(DurationExpression),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Note(expr) => write!(f, "{}", expr.note),
            Expression::Duration(expr) => write!(f, "{}", expr.duration),
        }
    }
}

/// A single note with its duration, e.g. `Sol4 Corchea`
#[derive(Debug, Clone, PartialEq)]
pub struct NoteStatement {
    pub note: NoteExpression,
    pub duration: DurationExpression,
}

impl NoteStatement {
    pub fn new(name: impl Into<String>, octave: i32, duration: DurationKind) -> Self {
        Self {
            note: NoteExpression {
                note: Note::new(name, octave),
            },
            duration: DurationExpression {
                duration: Duration::new(duration),
            },
        }
    }

    /// Beat weight of this statement in quarter notes
    pub fn beats(&self) -> f64 {
        self.duration.duration.kind.beats()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Note(NoteStatement),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Note(stmt) => write!(f, "{} {}", stmt.note.note, stmt.duration.duration),
        }
    }
}

/// Compile options read from the front matter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub title: Option<String>,
    pub bar_beats: Option<f64>, // Fixed measure length in quarter beats; None follows the time signature
}

/// Raw front matter for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RawMetadata {
    pub title: Option<String>,
    pub bar_beats: Option<f64>,
}

/// A complete Musica program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub metadata: Metadata,
    pub declarations: Vec<Declaration>,
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_declaration(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    pub fn add_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Drop every child node. Releasing an already released program does nothing.
    pub fn release(&mut self) {
        self.declarations.clear();
        self.statements.clear();
    }

    /// Iterate over the note statements in source order
    pub fn notes(&self) -> impl Iterator<Item = &NoteStatement> {
        self.statements.iter().map(|stmt| match stmt {
            Statement::Note(note) => note,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.declarations {
            writeln!(f, "{}", decl)?;
        }
        if !self.declarations.is_empty() && !self.statements.is_empty() {
            writeln!(f)?;
        }
        for stmt in &self.statements {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}
