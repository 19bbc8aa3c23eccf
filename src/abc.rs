//! # ABC Generation
//!
//! Renders a validated [`Program`] as ABC notation.
//!
//! ## Output Layout
//! ```text
//! X:1
//! T:Generated          title from front matter, default "Generated"
//! Q:1/4=60             one line per declaration, in source order
//! M:7/8
//! L:1/8                unit note length, always an eighth
//! K:Bmaj
//! G G A A B B B | ^c ^c ... |
//! ```
//!
//! ## Musical Time
//! A caller-owned beat counter (quarter-note beats) advances with every note.
//! When it lands on a measure boundary a `"| "` separator is written. Passing
//! the same counter to several calls continues the bar count across fragments.
//! [`MusicalTime`] also carries the meter, so a fragment in a new time
//! signature starts its first measure where the previous fragment stopped.
//!
//! The program must have passed [`crate::semantic::resolve`]; nothing here
//! checks it again.

use std::fmt::{self, Write};

use crate::ast::*;

pub const DEFAULT_TITLE: &str = "Generated";

/// Tolerance when comparing beat positions against measure boundaries
const BEAT_EPSILON: f64 = 0.001;

/// When a bar separator is written
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarPolicy {
    /// Measure length follows the declared time signature
    TimeSignature,
    /// Fixed measure length in quarter beats, ignoring the time signature
    FixedBeats(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbcOptions {
    pub title: String,
    pub bar_policy: BarPolicy,
}

impl Default for AbcOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            bar_policy: BarPolicy::TimeSignature,
        }
    }
}

impl AbcOptions {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            title: metadata
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            bar_policy: match metadata.bar_beats {
                Some(beats) => BarPolicy::FixedBeats(beats),
                None => BarPolicy::TimeSignature,
            },
        }
    }
}

/// Position in the piece, carried from one fragment to the next.
///
/// Besides the absolute beat count it remembers the meter in force and the
/// beat where that meter started, so a fragment that changes the time
/// signature opens a new measure grid instead of reusing the old one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MusicalTime {
    beats: f64,
    bar_origin: f64,
    measure_beats: Option<f64>,
}

impl MusicalTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a bare beat count. The measure grid starts at beat zero.
    pub fn at(beats: f64) -> Self {
        Self {
            beats,
            ..Self::default()
        }
    }

    /// Quarter-note beats emitted so far
    pub fn beats(&self) -> f64 {
        self.beats
    }

    /// Switch to a meter of `length` beats. A different meter restarts the
    /// measure grid at the current beat.
    fn set_meter(&mut self, length: f64) {
        match self.measure_beats {
            Some(current) if (current - length).abs() < BEAT_EPSILON => {}
            Some(_) => {
                log::debug!("meter change at beat {}", self.beats);
                self.bar_origin = self.beats;
                self.measure_beats = Some(length);
            }
            None => self.measure_beats = Some(length),
        }
    }
}

/// Display adapter that renders a Program as ABC from beat zero
struct Abc<'a>(&'a Program);

impl fmt::Display for Abc<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut time = MusicalTime::new();
        emit_at(self.0, &AbcOptions::from_metadata(&self.0.metadata), f, &mut time)
    }
}

/// Convert a Program to an ABC string, starting at beat zero
pub fn to_abc(program: &Program) -> String {
    Abc(program).to_string()
}

/// Write a Program as ABC to `out`, using the options from its front matter.
///
/// `beat_counter` is read as the starting beat and left at the final beat.
/// The measure grid is anchored at beat zero; use [`emit_at`] to carry meter
/// changes across fragments.
pub fn emit<W: Write>(program: &Program, out: &mut W, beat_counter: &mut f64) -> fmt::Result {
    let options = AbcOptions::from_metadata(&program.metadata);
    emit_with_options(program, &options, out, beat_counter)
}

pub fn emit_with_options<W: Write>(
    program: &Program,
    options: &AbcOptions,
    out: &mut W,
    beat_counter: &mut f64,
) -> fmt::Result {
    let mut time = MusicalTime::at(*beat_counter);
    let result = emit_at(program, options, out, &mut time);
    *beat_counter = time.beats;
    result
}

/// Write a Program as ABC to `out`, continuing from `time`
pub fn emit_at<W: Write>(
    program: &Program,
    options: &AbcOptions,
    out: &mut W,
    time: &mut MusicalTime,
) -> fmt::Result {
    writeln!(out, "X:1")?;
    writeln!(out, "T:{}", options.title)?;

    for declaration in &program.declarations {
        match declaration {
            Declaration::Tempo(tempo) => writeln!(out, "Q:1/4={}", tempo.bpm)?,
            Declaration::TimeSignature(ts) => {
                writeln!(out, "M:{}/{}", ts.numerator, ts.denominator)?;
                writeln!(out, "L:1/8")?;
                if options.bar_policy == BarPolicy::TimeSignature {
                    time.set_meter(ts.measure_beats());
                }
            }
            Declaration::Key(key) => writeln!(out, "K:{}", key_field(key))?,
        }
    }

    let (origin, measure_beats) = match options.bar_policy {
        BarPolicy::FixedBeats(beats) => (0.0, Some(beats)),
        BarPolicy::TimeSignature => (time.bar_origin, time.measure_beats),
    };

    for note in program.notes() {
        write!(out, "{} ", note_token(note))?;
        time.beats += note.beats();

        if let Some(length) = measure_beats {
            if is_measure_boundary(time.beats - origin, length) {
                log::trace!("bar at beat {}", time.beats);
                out.write_str("| ")?;
            }
        }
    }

    out.write_str("|\n")
}

/// Whether `beat` is a whole number of measures of `length` beats
fn is_measure_boundary(beat: f64, length: f64) -> bool {
    if beat < BEAT_EPSILON || length < BEAT_EPSILON {
        return false;
    }
    let remainder = beat % length;
    remainder < BEAT_EPSILON || length - remainder < BEAT_EPSILON
}

fn accidental_text(accidental: Accidental) -> &'static str {
    match accidental {
        Accidental::Natural => "",
        Accidental::Sharp => "#",
        Accidental::Flat => "b",
    }
}

/// `K:` field value, e.g. `Bmaj`, `F#min`, `Bbmaj`. The mode always comes
/// from the declaration, never from the accidental of the root.
fn key_field(key: &Key) -> String {
    let mode = match key.mode {
        Mode::Major => "maj",
        Mode::Minor => "min",
    };
    match PitchClass::from_name(&key.root) {
        Some(pitch) => format!(
            "{}{}{}",
            pitch.step.letter(),
            accidental_text(pitch.accidental),
            mode
        ),
        None => format!("{}{}", key.root, mode),
    }
}

/// ABC note token: accidental, letter, octave marks, length relative to L:1/8.
///
/// Octave 4 is the upper-case octave (`C` = middle C), octave 5 lower case,
/// higher octaves add `'`, lower ones add `,`.
fn note_token(stmt: &NoteStatement) -> String {
    let note = &stmt.note.note;
    let mut token = String::new();

    let pitch = PitchClass::from_name(&note.name);
    let letter = match pitch {
        Some(p) => {
            match p.accidental {
                Accidental::Sharp => token.push('^'),
                Accidental::Flat => token.push('_'),
                Accidental::Natural => {}
            }
            p.step.letter()
        }
        None => 'z',
    };

    if note.octave >= 5 {
        token.push(letter.to_ascii_lowercase());
        for _ in 5..note.octave {
            token.push('\'');
        }
    } else {
        token.push(letter);
        for _ in note.octave..4 {
            token.push(',');
        }
    }

    token.push_str(length_suffix(stmt.duration.duration.kind));
    token
}

fn length_suffix(kind: DurationKind) -> &'static str {
    match kind {
        DurationKind::Sixteenth => "/2",
        DurationKind::Eighth => "",
        DurationKind::Quarter => "2",
        DurationKind::Half => "4",
    }
}
