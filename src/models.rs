// src/models.rs

use crate::catalog::{self, Difficulty, Family, Formula};
use crate::constants::{
    DEFAULT_ITEM_COUNT, EASE_FACTOR_DEFAULT, ROOT_OCTAVE, STARTING_RATING,
};
use crate::error::{ConfigError, PracticeError};
use crate::theory::{pitch_class_set, Interval, Letter, Note, PitchClass};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// --- Key Filters ---

const EASY_KEYS: [(Letter, i8); 4] = [
    (Letter::C, 0),
    (Letter::F, 0),
    (Letter::G, 0),
    (Letter::B, -1),
];
const MEDIUM_EXTRA_KEYS: [(Letter, i8); 5] = [
    (Letter::A, 0),
    (Letter::E, 0),
    (Letter::E, -1),
    (Letter::A, -1),
    (Letter::D, 0),
];
const HARD_KEYS: [(Letter, i8); 5] = [
    (Letter::D, -1),
    (Letter::F, 1),
    (Letter::A, -1),
    (Letter::B, 0),
    (Letter::E, 0),
];
const ALL_KEYS: [(Letter, i8); 12] = [
    (Letter::C, 0),
    (Letter::D, -1),
    (Letter::D, 0),
    (Letter::E, -1),
    (Letter::E, 0),
    (Letter::F, 0),
    (Letter::F, 1),
    (Letter::G, 0),
    (Letter::A, -1),
    (Letter::A, 0),
    (Letter::B, -1),
    (Letter::B, 0),
];

fn spelled(keys: &[(Letter, i8)]) -> Vec<Note> {
    keys.iter()
        .map(|&(letter, acc)| Note::new(letter, acc, ROOT_OCTAVE))
        .collect()
}

/// Which roots a drill may use: a named tier or an explicit set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "tier", content = "keys")]
pub enum KeyFilter {
    Easy,
    Medium,
    Hard,
    All,
    Custom(Vec<Note>),
}

impl KeyFilter {
    /// Resolves the filter to drill roots in octave 4. Custom keys that
    /// repeat a pitch class are dropped after their first spelling.
    pub fn roots(&self) -> Vec<Note> {
        match self {
            KeyFilter::Easy => spelled(&EASY_KEYS),
            KeyFilter::Medium => {
                let mut keys = spelled(&EASY_KEYS);
                keys.extend(spelled(&MEDIUM_EXTRA_KEYS));
                keys
            }
            KeyFilter::Hard => spelled(&HARD_KEYS),
            KeyFilter::All => spelled(&ALL_KEYS),
            KeyFilter::Custom(keys) => {
                let mut seen = BTreeSet::new();
                keys.iter()
                    .filter(|k| seen.insert(k.pitch_class()))
                    .map(|k| k.with_octave(ROOT_OCTAVE))
                    .collect()
            }
        }
    }
}

impl FromStr for KeyFilter {
    type Err = String;

    /// `easy`, `medium`, `hard`, `all`, or a comma-separated key list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(KeyFilter::Easy),
            "medium" => Ok(KeyFilter::Medium),
            "hard" => Ok(KeyFilter::Hard),
            "all" => Ok(KeyFilter::All),
            _ => s
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(|k| k.parse::<Note>().map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()
                .map(KeyFilter::Custom),
        }
    }
}

// --- Question Kinds ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleTone,
    AllTones,
    AuralQuality,
    AuralSpelling,
    SingleDegree,
    AllDegrees,
    EarTraining,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 7] = [
        QuestionKind::SingleTone,
        QuestionKind::AllTones,
        QuestionKind::AuralQuality,
        QuestionKind::AuralSpelling,
        QuestionKind::SingleDegree,
        QuestionKind::AllDegrees,
        QuestionKind::EarTraining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::SingleTone => "single-tone",
            QuestionKind::AllTones => "all-tones",
            QuestionKind::AuralQuality => "aural-quality",
            QuestionKind::AuralSpelling => "aural-spelling",
            QuestionKind::SingleDegree => "single-degree",
            QuestionKind::AllDegrees => "all-degrees",
            QuestionKind::EarTraining => "ear-training",
        }
    }

    /// Kinds whose prompt is played rather than shown.
    pub fn is_aural(&self) -> bool {
        matches!(
            self,
            QuestionKind::AuralQuality | QuestionKind::AuralSpelling | QuestionKind::EarTraining
        )
    }

    /// Kinds answered by naming a chord/scale/interval type rather than notes.
    pub fn expects_type(&self) -> bool {
        matches!(self, QuestionKind::AuralQuality | QuestionKind::EarTraining)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        QuestionKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().replace('-', "") == normalized)
            .ok_or_else(|| format!("unknown question kind '{}'", s))
    }
}

// --- Drill Configuration ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillConfiguration {
    pub subject: Family,
    /// Formula symbols to draw from; empty means "everything in the tier".
    pub type_filter: BTreeSet<String>,
    pub key_filter: KeyFilter,
    pub question_kinds: BTreeSet<QuestionKind>,
    pub item_count: usize,
    pub difficulty: Difficulty,
}

impl Default for DrillConfiguration {
    fn default() -> Self {
        DrillConfiguration {
            subject: Family::Chord,
            type_filter: BTreeSet::new(),
            key_filter: KeyFilter::Easy,
            question_kinds: BTreeSet::from([QuestionKind::AllTones]),
            item_count: DEFAULT_ITEM_COUNT,
            difficulty: Difficulty::Beginner,
        }
    }
}

impl DrillConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.question_kinds.is_empty() {
            return Err(ConfigError::EmptyQuestionTypes);
        }
        if matches!(&self.key_filter, KeyFilter::Custom(keys) if keys.is_empty()) {
            return Err(ConfigError::EmptyCustomKeys);
        }
        if self.difficulty == Difficulty::Custom && self.type_filter.is_empty() {
            return Err(ConfigError::EmptyCustomTypes);
        }
        if self.item_count == 0 {
            return Err(ConfigError::ZeroItemCount);
        }
        Ok(())
    }

    pub fn add_kind(&mut self, kind: QuestionKind) {
        self.question_kinds.insert(kind);
    }

    /// Removes a question kind unless it is the last one left.
    /// Returns whether the kind was removed.
    pub fn remove_kind(&mut self, kind: QuestionKind) -> bool {
        if self.question_kinds.len() == 1 && self.question_kinds.contains(&kind) {
            return false;
        }
        self.question_kinds.remove(&kind)
    }

    /// Candidate formula pool. A non-empty type filter wins over the tier.
    pub fn resolve_formulas(&self) -> Vec<&'static Formula> {
        if self.type_filter.is_empty() {
            return catalog::formulas_for_tier(self.subject, self.difficulty);
        }
        self.type_filter
            .iter()
            .filter_map(|symbol| {
                let found = catalog::find(self.subject, symbol);
                if found.is_none() {
                    warn!("Ignoring unknown {} symbol '{}' in type filter", self.subject, symbol);
                }
                found
            })
            .collect()
    }

    pub fn resolve_roots(&self) -> Vec<Note> {
        self.key_filter.roots()
    }
}

// --- Questions ---

/// A chord, scale or interval rooted on a specific note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub root: Note,
    pub formula: &'static Formula,
}

impl Subject {
    pub fn new(root: Note, formula: &'static Formula) -> Self {
        Subject { root, formula }
    }

    pub fn family(&self) -> Family {
        self.formula.family
    }

    pub fn tone(&self, interval: Interval) -> Note {
        self.root.spell_interval(interval)
    }

    /// Spelled tones in formula order.
    pub fn tones(&self) -> Vec<Note> {
        self.formula.intervals.iter().map(|&i| self.tone(i)).collect()
    }

    pub fn pitch_classes(&self) -> BTreeSet<PitchClass> {
        pitch_class_set(&self.tones())
    }

    pub fn display_name(&self) -> String {
        match self.family() {
            Family::Chord => format!("{}{}", self.root.name(), self.formula.symbol),
            Family::Scale => format!("{} {}", self.root.name(), self.formula.name),
            Family::Interval => format!("{} above {}", self.formula.name, self.root.name()),
        }
    }

    /// Stable scheduler key, e.g. `chord:maj7:Bb`.
    pub fn concept_key(&self) -> String {
        format!("{}:{}:{}", self.family(), self.formula.symbol, self.root.name())
    }

    pub fn from_concept_key(key: &str) -> Result<Subject, PracticeError> {
        let unknown = || PracticeError::UnknownConceptKey(key.to_string());
        let mut parts = key.splitn(3, ':');
        let (family, symbol, root) = match (parts.next(), parts.next(), parts.next()) {
            (Some(f), Some(s), Some(r)) => (f, s, r),
            _ => return Err(unknown()),
        };
        let family: Family = family.parse().map_err(|_| unknown())?;
        let formula = catalog::find(family, symbol).ok_or_else(unknown)?;
        let root: Note = root.parse().map_err(|_| unknown())?;
        Ok(Subject::new(root.with_octave(ROOT_OCTAVE), formula))
    }
}

/// What the question asks. The kind is the tag; only the single-tone and
/// single-degree prompts carry a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    SingleTone { target: Interval },
    AllTones,
    AuralQuality,
    AuralSpelling,
    SingleDegree { target: Interval },
    AllDegrees,
    EarTraining,
}

impl Prompt {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Prompt::SingleTone { .. } => QuestionKind::SingleTone,
            Prompt::AllTones => QuestionKind::AllTones,
            Prompt::AuralQuality => QuestionKind::AuralQuality,
            Prompt::AuralSpelling => QuestionKind::AuralSpelling,
            Prompt::SingleDegree { .. } => QuestionKind::SingleDegree,
            Prompt::AllDegrees => QuestionKind::AllDegrees,
            Prompt::EarTraining => QuestionKind::EarTraining,
        }
    }
}

/// The expected answer, derived from subject and prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectAnswer {
    Notes(Vec<Note>),
    Formula(&'static Formula),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    pub subject: Subject,
    pub prompt: Prompt,
}

impl Question {
    pub fn new(subject: Subject, prompt: Prompt) -> Self {
        Question { subject, prompt }
    }

    pub fn kind(&self) -> QuestionKind {
        self.prompt.kind()
    }

    pub fn concept_key(&self) -> String {
        self.subject.concept_key()
    }

    pub fn correct_answer(&self) -> CorrectAnswer {
        match self.prompt {
            Prompt::SingleTone { target } | Prompt::SingleDegree { target } => {
                CorrectAnswer::Notes(vec![self.subject.tone(target)])
            }
            Prompt::AllTones | Prompt::AllDegrees | Prompt::AuralSpelling => {
                CorrectAnswer::Notes(self.subject.tones())
            }
            Prompt::AuralQuality | Prompt::EarTraining => CorrectAnswer::Formula(self.subject.formula),
        }
    }

    /// Pitch classes a note answer must hit. Type-identification prompts
    /// have none.
    pub fn correct_pitch_classes(&self) -> BTreeSet<PitchClass> {
        match self.correct_answer() {
            CorrectAnswer::Notes(notes) => pitch_class_set(&notes),
            CorrectAnswer::Formula(_) => BTreeSet::new(),
        }
    }

    pub fn text(&self) -> String {
        let name = self.subject.display_name();
        let family = self.subject.family();
        match self.prompt {
            Prompt::SingleTone { target } => format!("What is the {} of {}?", target.label(), name),
            Prompt::AllTones => format!("Spell {}.", name),
            Prompt::AuralQuality => format!("Name the {} quality you hear.", family),
            Prompt::AuralSpelling => format!("Spell the {} you hear, starting on {}.", family, self.subject.root.name()),
            Prompt::SingleDegree { target } => format!("What is degree {} of {}?", target.label(), name),
            Prompt::AllDegrees => format!("Spell every degree of {}.", name),
            Prompt::EarTraining => format!("Name the {} you hear.", family),
        }
    }
}

/// A learner's answer: notes for spelling prompts, a type symbol for
/// identification prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Notes(Vec<Note>),
    Formula(String),
}

impl Submission {
    /// Parses typed input for the given kind. Notes may be separated by
    /// spaces or commas.
    pub fn from_text(kind: QuestionKind, text: &str) -> Result<Submission, PracticeError> {
        if kind.expects_type() {
            return Ok(Submission::Formula(text.trim().to_string()));
        }
        text.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::parse::<Note>)
            .collect::<Result<Vec<_>, _>>()
            .map(Submission::Notes)
    }
}

#[derive(Debug, Clone)]
pub struct AnswerRecord {
    pub question: Question,
    pub submission: Submission,
    pub is_correct: bool,
    pub missed_pitch_classes: BTreeSet<PitchClass>,
    pub extra_pitch_classes: BTreeSet<PitchClass>,
    pub response_time: Duration,
    pub answered_at: DateTime<Utc>,
}

// --- Internal State Models ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingState {
    pub current_rating: i32,
    pub streak_count: u32,
    pub last_delta: i32,
    pub last_played: Option<NaiveDate>,
    pub sessions_played: u32,
}

impl Default for RatingState {
    fn default() -> Self {
        RatingState {
            current_rating: STARTING_RATING,
            streak_count: 0,
            last_delta: 0,
            last_played: None,
            sessions_played: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacedRepetitionItem {
    pub concept_key: String,
    pub ease_factor: f64,
    pub interval_days: u32,
    pub due_date: NaiveDate,
    pub lapse_count: u32,
    pub review_count: u32,
    pub last_reviewed: NaiveDate,
}

impl SpacedRepetitionItem {
    pub fn new(concept_key: &str, today: NaiveDate) -> Self {
        SpacedRepetitionItem {
            concept_key: concept_key.to_string(),
            ease_factor: EASE_FACTOR_DEFAULT,
            interval_days: 0,
            due_date: today,
            lapse_count: 0,
            review_count: 0,
            last_reviewed: today,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleProgress {
    pub module_id: String,
    pub attempts: u32,
    pub correct_answers: u32,
    pub perfect_session_count: u32,
    pub is_completed: bool,
}

impl ModuleProgress {
    pub fn new(module_id: &str) -> Self {
        ModuleProgress {
            module_id: module_id.to_string(),
            ..Default::default()
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct_answers as f64 / self.attempts as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(notes: &[Note]) -> Vec<String> {
        notes.iter().map(Note::name).collect()
    }

    #[test]
    fn test_key_tiers() {
        assert_eq!(names(&KeyFilter::Easy.roots()), vec!["C", "F", "G", "Bb"]);
        assert_eq!(KeyFilter::Medium.roots().len(), 9);
        assert_eq!(names(&KeyFilter::Hard.roots()), vec!["Db", "F#", "Ab", "B", "E"]);
        let all: BTreeSet<PitchClass> = KeyFilter::All.roots().iter().map(Note::pitch_class).collect();
        assert_eq!(all.len(), 12);
    }

    #[test]
    fn test_custom_keys_dedupe_by_pitch_class() {
        let filter: KeyFilter = "C#, Db, E3".parse().unwrap();
        let roots = filter.roots();
        assert_eq!(names(&roots), vec!["C#", "E"]);
        assert!(roots.iter().all(|r| r.octave() == ROOT_OCTAVE));
    }

    #[test]
    fn test_question_kind_parsing() {
        assert_eq!("all-tones".parse::<QuestionKind>(), Ok(QuestionKind::AllTones));
        assert_eq!("singleTone".parse::<QuestionKind>(), Ok(QuestionKind::SingleTone));
        assert_eq!("ear_training".parse::<QuestionKind>(), Ok(QuestionKind::EarTraining));
        assert!("melody".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn test_validate_rejects_invariant_violations() {
        let mut config = DrillConfiguration::default();
        assert_eq!(config.validate(), Ok(()));

        config.question_kinds.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyQuestionTypes));

        let config = DrillConfiguration {
            key_filter: KeyFilter::Custom(vec![]),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyCustomKeys));

        let config = DrillConfiguration {
            difficulty: Difficulty::Custom,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyCustomTypes));

        let config = DrillConfiguration {
            item_count: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroItemCount));
    }

    #[test]
    fn test_remove_kind_never_empties_set() {
        let mut config = DrillConfiguration::default();
        assert!(!config.remove_kind(QuestionKind::AllTones));
        assert_eq!(config.question_kinds.len(), 1);

        config.add_kind(QuestionKind::SingleTone);
        assert!(config.remove_kind(QuestionKind::AllTones));
        assert!(!config.remove_kind(QuestionKind::SingleTone));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_type_filter_overrides_tier_and_skips_unknown() {
        let config = DrillConfiguration {
            type_filter: BTreeSet::from(["m7b5".to_string(), "nope".to_string()]),
            difficulty: Difficulty::Beginner,
            ..Default::default()
        };
        let pool: Vec<&str> = config.resolve_formulas().iter().map(|f| f.symbol).collect();
        assert_eq!(pool, vec!["m7b5"]);
    }

    #[test]
    fn test_concept_key_round_trip() {
        let formula = catalog::find(Family::Chord, "7#9").unwrap();
        let subject = Subject::new("Bb4".parse().unwrap(), formula);
        let key = subject.concept_key();
        assert_eq!(key, "chord:7#9:Bb");
        assert_eq!(Subject::from_concept_key(&key).unwrap(), subject);
        assert!(Subject::from_concept_key("chord:zzz:C").is_err());
        assert!(Subject::from_concept_key("garbage").is_err());
    }

    #[test]
    fn test_single_tone_answer_is_spelled_target() {
        let formula = catalog::find(Family::Chord, "7").unwrap();
        let subject = Subject::new("Bb4".parse().unwrap(), formula);
        let question = Question::new(subject, Prompt::SingleTone { target: Interval::new(7, 10) });
        assert_eq!(question.correct_answer(), CorrectAnswer::Notes(vec!["Ab5".parse().unwrap()]));
        assert_eq!(question.text(), "What is the b7 of Bb7?");
    }

    #[test]
    fn test_submission_parsing() {
        let notes = Submission::from_text(QuestionKind::AllTones, "E4, G4 C5").unwrap();
        assert_eq!(
            notes,
            Submission::Notes(vec!["E4".parse().unwrap(), "G4".parse().unwrap(), "C5".parse().unwrap()])
        );
        let symbol = Submission::from_text(QuestionKind::AuralQuality, " m7 ").unwrap();
        assert_eq!(symbol, Submission::Formula("m7".to_string()));
        assert!(Submission::from_text(QuestionKind::AllTones, "E4 Q").is_err());
        let runaway = format!("E4 C{}", "#".repeat(200));
        assert!(Submission::from_text(QuestionKind::AllTones, &runaway).is_err());
        assert!(Submission::from_text(QuestionKind::AllTones, "G300000000").is_err());
    }

    #[test]
    fn test_drill_configuration_serializes() {
        let config = DrillConfiguration {
            key_filter: KeyFilter::Custom(vec!["Eb4".parse().unwrap()]),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: DrillConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
