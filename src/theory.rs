// src/theory.rs


use crate::constants::{DEFAULT_OCTAVE, MAX_ACCIDENTAL, MAX_OCTAVE, MIN_OCTAVE, SEMITONES_PER_OCTAVE};
use crate::error::PracticeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A note's identity modulo octave, 0 = C through 11 = B.
pub type PitchClass = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Semitones above C for the natural letter.
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// The letter `steps` letter-names above this one (wrapping at B).
    pub fn offset(self, steps: usize) -> Letter {
        Self::ALL[(self.index() + steps) % Self::ALL.len()]
    }

    pub fn from_char(input: char) -> Option<Letter> {
        match input.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// Which way a note is spelled: flats, or sharps and naturals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccidentalPreference {
    #[default]
    Sharp,
    Flat,
}

// Semitones above the root for the major/perfect form of degrees 1-7.
const NATURAL_DEGREE_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// A spelled pitch. Immutable; every operation returns a new value.
///
/// Serialized as its text form, e.g. `"Bb4"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Note {
    letter: Letter,
    accidental: i8,
    octave: i32,
}

impl Note {
    pub fn new(letter: Letter, accidental: i8, octave: i32) -> Self {
        Note {
            letter,
            accidental,
            octave,
        }
    }

    pub fn letter(&self) -> Letter {
        self.letter
    }

    pub fn accidental(&self) -> i8 {
        self.accidental
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    pub fn accidental_preference(&self) -> AccidentalPreference {
        if self.accidental < 0 {
            AccidentalPreference::Flat
        } else {
            AccidentalPreference::Sharp
        }
    }

    /// MIDI-style pitch number. Spelling octave follows the letter, so Cb4 is 59.
    pub fn absolute_pitch(&self) -> i32 {
        (self.octave + 1) * SEMITONES_PER_OCTAVE + self.letter.semitone() + self.accidental as i32
    }

    pub fn pitch_class(&self) -> PitchClass {
        self.absolute_pitch().rem_euclid(SEMITONES_PER_OCTAVE) as PitchClass
    }

    /// Spelled name without octave, e.g. `"F#"` or `"Bb"`.
    pub fn name(&self) -> String {
        let mut name = String::with_capacity(3);
        name.push(self.letter.as_char());
        let symbol = match self.accidental_preference() {
            AccidentalPreference::Flat => 'b',
            AccidentalPreference::Sharp => '#',
        };
        for _ in 0..self.accidental.unsigned_abs() {
            name.push(symbol);
        }
        name
    }

    /// Same pitch class, regardless of octave and spelling.
    pub fn is_pitch_equivalent(&self, other: &Note) -> bool {
        self.pitch_class() == other.pitch_class()
    }

    pub fn with_octave(&self, octave: i32) -> Note {
        Note::new(self.letter, self.accidental, octave)
    }

    /// Spells the note that sits `interval` above this one, choosing the
    /// letter from the interval's degree (the b7 of Bb is Ab, not G#).
    pub fn spell_interval(&self, interval: Interval) -> Note {
        let steps = interval.degree.saturating_sub(1) as usize;
        let letter = self.letter.offset(steps);
        let target = self.absolute_pitch() + interval.semitones as i32;
        let mut accidental = (target - letter.semitone()).rem_euclid(SEMITONES_PER_OCTAVE);
        if accidental > SEMITONES_PER_OCTAVE / 2 {
            accidental -= SEMITONES_PER_OCTAVE;
        }
        let octave = (target - letter.semitone() - accidental).div_euclid(SEMITONES_PER_OCTAVE) - 1;
        Note::new(letter, accidental as i8, octave)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name(), self.octave)
    }
}

impl FromStr for Note {
    type Err = PracticeError;

    /// Accepts `C`, `c#`, `Bb3`, `F##`, `Ebb5`, `Fx`, `G♭`, `A♯-1`.
    /// A missing octave defaults to 4; octaves outside -1..=9 are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || PracticeError::InvalidNote(s.to_string());

        let mut chars = text.chars().peekable();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;

        let mut accidental: i8 = 0;
        while let Some(&c) = chars.peek() {
            let step = match c {
                '#' | '♯' => 1,
                'x' | '𝄪' => 2,
                'b' | '♭' => -1,
                _ => break,
            };
            accidental += step;
            if accidental.abs() > MAX_ACCIDENTAL {
                return Err(invalid());
            }
            chars.next();
        }

        let rest: String = chars.collect();
        let octave = if rest.is_empty() {
            DEFAULT_OCTAVE
        } else {
            rest.parse::<i32>().map_err(|_| invalid())?
        };
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(invalid());
        }

        Ok(Note::new(letter, accidental, octave))
    }
}

impl TryFrom<String> for Note {
    type Error = PracticeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Note> for String {
    fn from(note: Note) -> Self {
        note.to_string()
    }
}

/// One entry of a formula: a scale degree and its size in semitones above
/// the root. Degrees beyond 7 (9, 11, 13) carry compound sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub degree: u8,
    pub semitones: u8,
}

impl Interval {
    pub const fn new(degree: u8, semitones: u8) -> Self {
        Interval { degree, semitones }
    }

    pub fn pitch_class_offset(&self) -> PitchClass {
        (self.semitones as i32 % SEMITONES_PER_OCTAVE) as PitchClass
    }

    /// Degree label relative to the major scale: `1`, `b3`, `#11`, `bb7`.
    pub fn label(&self) -> String {
        let steps = self.degree.saturating_sub(1) as i32;
        let natural = NATURAL_DEGREE_SEMITONES[(steps % 7) as usize] + SEMITONES_PER_OCTAVE * (steps / 7);
        let alteration = self.semitones as i32 - natural;
        let prefix = match alteration {
            a if a < 0 => "b".repeat(a.unsigned_abs() as usize),
            a => "#".repeat(a as usize),
        };
        format!("{}{}", prefix, self.degree)
    }
}

/// Collapses notes to the set of pitch classes they sound.
pub fn pitch_class_set<'a>(notes: impl IntoIterator<Item = &'a Note>) -> BTreeSet<PitchClass> {
    notes.into_iter().map(Note::pitch_class).collect()
}
