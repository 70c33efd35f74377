// src/catalog.rs

use crate::theory::{Interval, PitchClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Chord,
    Scale,
    Interval,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Chord => "chord",
            Family::Scale => "scale",
            Family::Interval => "interval",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chord" | "chords" => Ok(Family::Chord),
            "scale" | "scales" => Ok(Family::Scale),
            "interval" | "intervals" => Ok(Family::Interval),
            other => Err(format!("unknown family '{}'", other)),
        }
    }
}

/// Difficulty tier. Catalog entries use the four ranked tiers; `Custom`
/// only appears on drill configurations with an explicit type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Custom,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
            Difficulty::Custom => "custom",
        }
    }

    fn level(&self) -> Option<u8> {
        match self {
            Difficulty::Beginner => Some(1),
            Difficulty::Intermediate => Some(2),
            Difficulty::Advanced => Some(3),
            Difficulty::Expert => Some(4),
            Difficulty::Custom => None,
        }
    }

    /// Tiers are cumulative: beginner ⊂ intermediate ⊂ advanced ⊂ expert.
    /// `Custom` includes nothing on its own.
    pub fn includes(&self, tier: Difficulty) -> bool {
        match (self.level(), tier.level()) {
            (Some(drill), Some(entry)) => entry <= drill,
            _ => false,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            "custom" => Ok(Difficulty::Custom),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

/// A chord type, scale type or interval: named set of degrees above a root.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Formula {
    pub family: Family,
    pub symbol: &'static str,
    pub name: &'static str,
    pub intervals: &'static [Interval],
    pub tier: Difficulty,
}

impl Formula {
    pub fn pitch_class_offsets(&self) -> BTreeSet<PitchClass> {
        self.intervals.iter().map(Interval::pitch_class_offset).collect()
    }

    pub fn degree_labels(&self) -> Vec<String> {
        self.intervals.iter().map(Interval::label).collect()
    }
}

macro_rules! formula {
    ($family:ident, $symbol:literal, $name:literal, $tier:ident, [$(($d:literal, $s:literal)),+ $(,)?]) => {
        Formula {
            family: Family::$family,
            symbol: $symbol,
            name: $name,
            intervals: &[$(Interval::new($d, $s)),+],
            tier: Difficulty::$tier,
        }
    };
}

pub static CHORD_FORMULAS: &[Formula] = &[
    formula!(Chord, "maj", "Major triad", Beginner, [(1, 0), (3, 4), (5, 7)]),
    formula!(Chord, "m", "Minor triad", Beginner, [(1, 0), (3, 3), (5, 7)]),
    formula!(Chord, "dim", "Diminished triad", Beginner, [(1, 0), (3, 3), (5, 6)]),
    formula!(Chord, "aug", "Augmented triad", Beginner, [(1, 0), (3, 4), (5, 8)]),
    formula!(Chord, "maj7", "Major seventh", Beginner, [(1, 0), (3, 4), (5, 7), (7, 11)]),
    formula!(Chord, "m7", "Minor seventh", Beginner, [(1, 0), (3, 3), (5, 7), (7, 10)]),
    formula!(Chord, "7", "Dominant seventh", Beginner, [(1, 0), (3, 4), (5, 7), (7, 10)]),
    formula!(Chord, "m7b5", "Half-diminished", Intermediate, [(1, 0), (3, 3), (5, 6), (7, 10)]),
    formula!(Chord, "dim7", "Diminished seventh", Intermediate, [(1, 0), (3, 3), (5, 6), (7, 9)]),
    formula!(Chord, "6", "Major sixth", Intermediate, [(1, 0), (3, 4), (5, 7), (6, 9)]),
    formula!(Chord, "m6", "Minor sixth", Intermediate, [(1, 0), (3, 3), (5, 7), (6, 9)]),
    formula!(Chord, "sus2", "Suspended second", Intermediate, [(1, 0), (2, 2), (5, 7)]),
    formula!(Chord, "sus4", "Suspended fourth", Intermediate, [(1, 0), (4, 5), (5, 7)]),
    formula!(Chord, "7sus4", "Dominant seventh sus4", Intermediate, [(1, 0), (4, 5), (5, 7), (7, 10)]),
    formula!(Chord, "mMaj7", "Minor major seventh", Intermediate, [(1, 0), (3, 3), (5, 7), (7, 11)]),
    formula!(Chord, "9", "Dominant ninth", Advanced, [(1, 0), (3, 4), (5, 7), (7, 10), (9, 14)]),
    formula!(Chord, "maj9", "Major ninth", Advanced, [(1, 0), (3, 4), (5, 7), (7, 11), (9, 14)]),
    formula!(Chord, "m9", "Minor ninth", Advanced, [(1, 0), (3, 3), (5, 7), (7, 10), (9, 14)]),
    formula!(Chord, "m11", "Minor eleventh", Advanced, [(1, 0), (3, 3), (5, 7), (7, 10), (9, 14), (11, 17)]),
    formula!(Chord, "13", "Dominant thirteenth", Advanced, [(1, 0), (3, 4), (5, 7), (7, 10), (9, 14), (13, 21)]),
    formula!(Chord, "7b9", "Dominant flat nine", Advanced, [(1, 0), (3, 4), (5, 7), (7, 10), (9, 13)]),
    formula!(Chord, "7#9", "Dominant sharp nine", Advanced, [(1, 0), (3, 4), (5, 7), (7, 10), (9, 15)]),
    formula!(Chord, "7#11", "Dominant sharp eleven", Advanced, [(1, 0), (3, 4), (5, 7), (7, 10), (11, 18)]),
    formula!(Chord, "maj7#11", "Lydian major seventh", Advanced, [(1, 0), (3, 4), (5, 7), (7, 11), (11, 18)]),
    formula!(Chord, "7#5", "Augmented seventh", Expert, [(1, 0), (3, 4), (5, 8), (7, 10)]),
    formula!(Chord, "maj7#5", "Augmented major seventh", Expert, [(1, 0), (3, 4), (5, 8), (7, 11)]),
    formula!(Chord, "7b9b13", "Dominant flat nine flat thirteen", Expert, [(1, 0), (3, 4), (7, 10), (9, 13), (13, 20)]),
    formula!(Chord, "13#11", "Dominant thirteen sharp eleven", Expert, [(1, 0), (3, 4), (7, 10), (9, 14), (11, 18), (13, 21)]),
    formula!(Chord, "7alt", "Altered dominant", Expert, [(1, 0), (3, 4), (7, 10), (9, 13), (9, 15), (11, 18), (13, 20)]),
];

pub static SCALE_FORMULAS: &[Formula] = &[
    formula!(Scale, "ionian", "Major (Ionian)", Beginner, [(1, 0), (2, 2), (3, 4), (4, 5), (5, 7), (6, 9), (7, 11)]),
    formula!(Scale, "aeolian", "Natural minor (Aeolian)", Beginner, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 7), (6, 8), (7, 10)]),
    formula!(Scale, "maj-pent", "Major pentatonic", Beginner, [(1, 0), (2, 2), (3, 4), (5, 7), (6, 9)]),
    formula!(Scale, "min-pent", "Minor pentatonic", Beginner, [(1, 0), (3, 3), (4, 5), (5, 7), (7, 10)]),
    formula!(Scale, "dorian", "Dorian", Intermediate, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 7), (6, 9), (7, 10)]),
    formula!(Scale, "phrygian", "Phrygian", Intermediate, [(1, 0), (2, 1), (3, 3), (4, 5), (5, 7), (6, 8), (7, 10)]),
    formula!(Scale, "lydian", "Lydian", Intermediate, [(1, 0), (2, 2), (3, 4), (4, 6), (5, 7), (6, 9), (7, 11)]),
    formula!(Scale, "mixolydian", "Mixolydian", Intermediate, [(1, 0), (2, 2), (3, 4), (4, 5), (5, 7), (6, 9), (7, 10)]),
    formula!(Scale, "locrian", "Locrian", Intermediate, [(1, 0), (2, 1), (3, 3), (4, 5), (5, 6), (6, 8), (7, 10)]),
    formula!(Scale, "harm-minor", "Harmonic minor", Intermediate, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 7), (6, 8), (7, 11)]),
    formula!(Scale, "mel-minor", "Melodic minor", Intermediate, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 7), (6, 9), (7, 11)]),
    formula!(Scale, "blues", "Blues", Intermediate, [(1, 0), (3, 3), (4, 5), (4, 6), (5, 7), (7, 10)]),
    formula!(Scale, "lydian-dom", "Lydian dominant", Advanced, [(1, 0), (2, 2), (3, 4), (4, 6), (5, 7), (6, 9), (7, 10)]),
    formula!(Scale, "altered", "Altered (super Locrian)", Advanced, [(1, 0), (2, 1), (2, 3), (3, 4), (5, 6), (6, 8), (7, 10)]),
    formula!(Scale, "whole-tone", "Whole tone", Advanced, [(1, 0), (2, 2), (3, 4), (4, 6), (5, 8), (7, 10)]),
    formula!(Scale, "dim-hw", "Diminished (half-whole)", Advanced, [(1, 0), (2, 1), (2, 3), (3, 4), (4, 6), (5, 7), (6, 9), (7, 10)]),
    formula!(Scale, "dim-wh", "Diminished (whole-half)", Advanced, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 6), (6, 8), (6, 9), (7, 11)]),
    formula!(Scale, "bebop-dom", "Bebop dominant", Advanced, [(1, 0), (2, 2), (3, 4), (4, 5), (5, 7), (6, 9), (7, 10), (7, 11)]),
    formula!(Scale, "locrian-n2", "Locrian natural 2", Expert, [(1, 0), (2, 2), (3, 3), (4, 5), (5, 6), (6, 8), (7, 10)]),
    formula!(Scale, "phrygian-dom", "Phrygian dominant", Expert, [(1, 0), (2, 1), (3, 4), (4, 5), (5, 7), (6, 8), (7, 10)]),
    formula!(Scale, "lydian-aug", "Lydian augmented", Expert, [(1, 0), (2, 2), (3, 4), (4, 6), (5, 8), (6, 9), (7, 11)]),
    formula!(Scale, "harm-major", "Harmonic major", Expert, [(1, 0), (2, 2), (3, 4), (4, 5), (5, 7), (6, 8), (7, 11)]),
    formula!(Scale, "bebop-maj", "Bebop major", Expert, [(1, 0), (2, 2), (3, 4), (4, 5), (5, 7), (5, 8), (6, 9), (7, 11)]),
];

pub static INTERVAL_FORMULAS: &[Formula] = &[
    formula!(Interval, "m3", "Minor third", Beginner, [(1, 0), (3, 3)]),
    formula!(Interval, "M3", "Major third", Beginner, [(1, 0), (3, 4)]),
    formula!(Interval, "P4", "Perfect fourth", Beginner, [(1, 0), (4, 5)]),
    formula!(Interval, "P5", "Perfect fifth", Beginner, [(1, 0), (5, 7)]),
    formula!(Interval, "P8", "Octave", Beginner, [(1, 0), (8, 12)]),
    formula!(Interval, "m2", "Minor second", Intermediate, [(1, 0), (2, 1)]),
    formula!(Interval, "M2", "Major second", Intermediate, [(1, 0), (2, 2)]),
    formula!(Interval, "m6", "Minor sixth", Intermediate, [(1, 0), (6, 8)]),
    formula!(Interval, "M6", "Major sixth", Intermediate, [(1, 0), (6, 9)]),
    formula!(Interval, "m7", "Minor seventh", Intermediate, [(1, 0), (7, 10)]),
    formula!(Interval, "M7", "Major seventh", Intermediate, [(1, 0), (7, 11)]),
    formula!(Interval, "TT", "Tritone", Advanced, [(1, 0), (4, 6)]),
    formula!(Interval, "m9", "Minor ninth", Expert, [(1, 0), (9, 13)]),
    formula!(Interval, "M9", "Major ninth", Expert, [(1, 0), (9, 14)]),
    formula!(Interval, "P11", "Perfect eleventh", Expert, [(1, 0), (11, 17)]),
    formula!(Interval, "A11", "Augmented eleventh", Expert, [(1, 0), (11, 18)]),
    formula!(Interval, "M13", "Major thirteenth", Expert, [(1, 0), (13, 21)]),
];

pub fn formulas(family: Family) -> &'static [Formula] {
    match family {
        Family::Chord => CHORD_FORMULAS,
        Family::Scale => SCALE_FORMULAS,
        Family::Interval => INTERVAL_FORMULAS,
    }
}

/// Looks a formula up by its exact symbol (`"M3"` and `"m3"` differ).
pub fn find(family: Family, symbol: &str) -> Option<&'static Formula> {
    formulas(family).iter().find(|f| f.symbol == symbol)
}

/// Every formula of `family` whose tier the drill difficulty includes.
pub fn formulas_for_tier(family: Family, difficulty: Difficulty) -> Vec<&'static Formula> {
    formulas(family)
        .iter()
        .filter(|f| difficulty.includes(f.tier))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const FAMILIES: [Family; 3] = [Family::Chord, Family::Scale, Family::Interval];

    #[test]
    fn test_symbols_unique_within_family() {
        for family in FAMILIES {
            let mut seen = HashSet::new();
            for f in formulas(family) {
                assert!(seen.insert(f.symbol), "duplicate symbol {}", f.symbol);
                assert_eq!(f.family, family);
            }
        }
    }

    #[test]
    fn test_formulas_start_at_root_and_ascend() {
        for family in FAMILIES {
            for f in formulas(family) {
                assert_eq!(f.intervals[0], Interval::new(1, 0), "{} must start at root", f.symbol);
                for pair in f.intervals.windows(2) {
                    assert!(pair[0].semitones < pair[1].semitones, "{} not ascending", f.symbol);
                }
                assert_ne!(f.tier, Difficulty::Custom);
            }
        }
    }

    #[test]
    fn test_tiers_are_cumulative() {
        assert!(Difficulty::Expert.includes(Difficulty::Beginner));
        assert!(Difficulty::Advanced.includes(Difficulty::Intermediate));
        assert!(Difficulty::Intermediate.includes(Difficulty::Intermediate));
        assert!(!Difficulty::Beginner.includes(Difficulty::Intermediate));
        // Advanced does not reach into expert-only material.
        assert!(!Difficulty::Advanced.includes(Difficulty::Expert));
        assert!(!Difficulty::Custom.includes(Difficulty::Beginner));

        let beginner = formulas_for_tier(Family::Chord, Difficulty::Beginner).len();
        let advanced = formulas_for_tier(Family::Chord, Difficulty::Advanced).len();
        let expert = formulas_for_tier(Family::Chord, Difficulty::Expert).len();
        assert!(beginner < advanced && advanced < expert);
        assert_eq!(expert, CHORD_FORMULAS.len());
    }

    #[test]
    fn test_find_is_case_sensitive() {
        assert_eq!(find(Family::Interval, "M3").map(|f| f.name), Some("Major third"));
        assert_eq!(find(Family::Interval, "m3").map(|f| f.name), Some("Minor third"));
        assert!(find(Family::Chord, "Maj7").is_none());
    }

    #[test]
    fn test_pitch_class_offsets_fold_compound_degrees() {
        let thirteen = find(Family::Chord, "13").unwrap();
        let offsets: Vec<u8> = thirteen.pitch_class_offsets().into_iter().collect();
        assert_eq!(offsets, vec![0, 2, 4, 7, 9, 10]);
        assert_eq!(find(Family::Interval, "P8").unwrap().pitch_class_offsets().len(), 1);
    }

    #[test]
    fn test_degree_labels() {
        let alt = find(Family::Chord, "7alt").unwrap();
        assert_eq!(alt.degree_labels(), vec!["1", "3", "b7", "b9", "#9", "#11", "b13"]);
    }
}
