// src/curriculum.rs

use crate::catalog::{Difficulty, Family};
use crate::error::{PracticeError, Result};
use crate::models::{DrillConfiguration, KeyFilter, ModuleProgress, QuestionKind};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pathway {
    Harmony,
    Scales,
    Intervals,
    EarTraining,
}

impl Pathway {
    pub const ALL: [Pathway; 4] = [
        Pathway::Harmony,
        Pathway::Scales,
        Pathway::Intervals,
        Pathway::EarTraining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pathway::Harmony => "harmony",
            Pathway::Scales => "scales",
            Pathway::Intervals => "intervals",
            Pathway::EarTraining => "ear-training",
        }
    }
}

impl fmt::Display for Pathway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pathway {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Pathway::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| format!("unknown pathway '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionCriteria {
    pub minimum_attempts: u32,
    pub accuracy_threshold: f64,
}

impl CompletionCriteria {
    pub fn is_met(&self, progress: &ModuleProgress) -> bool {
        progress.attempts >= self.minimum_attempts && progress.accuracy() >= self.accuracy_threshold
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurriculumModule {
    pub id: String,
    pub title: String,
    pub pathway: Pathway,
    pub level: u32,
    pub prerequisite_ids: BTreeSet<String>,
    pub criteria: CompletionCriteria,
    /// The drill a learner runs to practise this module.
    pub drill: DrillConfiguration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Locked,
    Unlocked,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptOutcome {
    pub progress: ModuleProgress,
    pub newly_completed: bool,
    /// Modules that were locked before this attempt and are open now.
    pub newly_unlocked: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathwaySummary {
    pub pathway: Pathway,
    pub completed: usize,
    pub unlocked: usize,
    pub total: usize,
}

pub struct CurriculumManager {
    modules: Vec<CurriculumModule>,
    progress: BTreeMap<String, ModuleProgress>,
    active_module: Option<String>,
}

impl CurriculumManager {
    pub fn new(modules: Vec<CurriculumModule>) -> Self {
        Self::with_progress(modules, BTreeMap::new(), None)
    }

    pub fn with_progress(
        mut modules: Vec<CurriculumModule>,
        progress: BTreeMap<String, ModuleProgress>,
        active_module: Option<String>,
    ) -> Self {
        modules.sort_by(|a, b| (a.pathway, a.level).cmp(&(b.pathway, b.level)));
        let active_module = active_module.filter(|id| modules.iter().any(|m| &m.id == id));
        CurriculumManager {
            modules,
            progress,
            active_module,
        }
    }

    pub fn modules(&self) -> &[CurriculumModule] {
        &self.modules
    }

    pub fn module(&self, id: &str) -> Option<&CurriculumModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn progress_map(&self) -> &BTreeMap<String, ModuleProgress> {
        &self.progress
    }

    /// Progress for a module; modules never attempted report zeros.
    pub fn progress(&self, module_id: &str) -> ModuleProgress {
        self.progress
            .get(module_id)
            .cloned()
            .unwrap_or_else(|| ModuleProgress::new(module_id))
    }

    pub fn is_completed(&self, module_id: &str) -> bool {
        self.progress.get(module_id).is_some_and(|p| p.is_completed)
    }

    pub fn is_unlocked(&self, module: &CurriculumModule) -> bool {
        module
            .prerequisite_ids
            .iter()
            .all(|prereq| self.is_completed(prereq))
    }

    pub fn status(&self, module: &CurriculumModule) -> ModuleStatus {
        if self.is_completed(&module.id) {
            ModuleStatus::Completed
        } else if self.is_unlocked(module) {
            ModuleStatus::Unlocked
        } else {
            ModuleStatus::Locked
        }
    }

    /// Adds a finished drill's counts to a module and re-evaluates its
    /// completion latch.
    pub fn record_attempt(
        &mut self,
        module_id: &str,
        questions_answered: u32,
        correct_answers: u32,
        was_perfect_session: bool,
    ) -> Result<AttemptOutcome> {
        if correct_answers > questions_answered {
            return Err(PracticeError::InvalidAttempt {
                answered: questions_answered,
                correct: correct_answers,
            });
        }
        let module = self
            .module(module_id)
            .ok_or_else(|| PracticeError::UnknownModule(module_id.to_string()))?;
        if !self.is_unlocked(module) {
            warn!("Attempt recorded against locked module {}", module_id);
            return Err(PracticeError::ModuleLocked(module_id.to_string()));
        }
        let criteria = module.criteria;
        let open_before = self.open_module_ids();

        let current = self.progress(module_id);
        let (Some(attempts), Some(correct)) = (
            current.attempts.checked_add(questions_answered),
            current.correct_answers.checked_add(correct_answers),
        ) else {
            warn!("Attempt counters for {} would overflow", module_id);
            return Err(PracticeError::InvalidAttempt {
                answered: questions_answered,
                correct: correct_answers,
            });
        };

        let progress = self
            .progress
            .entry(module_id.to_string())
            .or_insert_with(|| ModuleProgress::new(module_id));
        progress.attempts = attempts;
        progress.correct_answers = correct;
        if was_perfect_session {
            progress.perfect_session_count = progress.perfect_session_count.saturating_add(1);
        }

        let newly_completed = !progress.is_completed && criteria.is_met(progress);
        if newly_completed {
            progress.is_completed = true;
        }

        debug!(
            "[Curriculum] {}: {} / {} correct ({:.1}%), completed={}",
            module_id,
            progress.correct_answers,
            progress.attempts,
            progress.accuracy() * 100.0,
            progress.is_completed
        );
        let progress = progress.clone();

        let newly_unlocked: Vec<String> = self
            .open_module_ids()
            .difference(&open_before)
            .cloned()
            .collect();

        if newly_completed {
            info!("Module completed: {}", module_id);
        }
        for id in &newly_unlocked {
            info!("Module unlocked: {}", id);
        }

        Ok(AttemptOutcome {
            progress,
            newly_completed,
            newly_unlocked,
        })
    }

    /// First unlocked, unfinished module of the pathway by level. `None`
    /// means the pathway is exhausted or still blocked.
    pub fn recommended_next_module(&self, pathway: Pathway) -> Option<&CurriculumModule> {
        self.modules
            .iter()
            .filter(|m| m.pathway == pathway)
            .find(|m| self.status(m) == ModuleStatus::Unlocked)
    }

    pub fn active_module(&self) -> Option<&CurriculumModule> {
        self.active_module.as_deref().and_then(|id| self.module(id))
    }

    pub fn active_module_id(&self) -> Option<&str> {
        self.active_module.as_deref()
    }

    /// Points the UI at a module to resume. Has no effect on unlocking.
    pub fn set_active_module(&mut self, module_id: &str) -> Result<()> {
        if self.module(module_id).is_none() {
            return Err(PracticeError::UnknownModule(module_id.to_string()));
        }
        self.active_module = Some(module_id.to_string());
        Ok(())
    }

    pub fn clear_active_module(&mut self) {
        self.active_module = None;
    }

    pub fn pathway_summary(&self, pathway: Pathway) -> PathwaySummary {
        let mut summary = PathwaySummary {
            pathway,
            completed: 0,
            unlocked: 0,
            total: 0,
        };
        for module in self.modules.iter().filter(|m| m.pathway == pathway) {
            summary.total += 1;
            match self.status(module) {
                ModuleStatus::Completed => summary.completed += 1,
                ModuleStatus::Unlocked => summary.unlocked += 1,
                ModuleStatus::Locked => {}
            }
        }
        summary
    }

    fn open_module_ids(&self) -> BTreeSet<String> {
        self.modules
            .iter()
            .filter(|m| self.status(m) == ModuleStatus::Unlocked)
            .map(|m| m.id.clone())
            .collect()
    }
}

// --- Default catalog ---

fn drill(
    subject: Family,
    types: &[&str],
    key_filter: KeyFilter,
    kinds: &[QuestionKind],
    difficulty: Difficulty,
) -> DrillConfiguration {
    DrillConfiguration {
        subject,
        type_filter: types.iter().map(|t| t.to_string()).collect(),
        key_filter,
        question_kinds: kinds.iter().copied().collect(),
        difficulty,
        ..Default::default()
    }
}

fn module(
    id: &str,
    title: &str,
    pathway: Pathway,
    level: u32,
    prerequisites: &[&str],
    criteria: (u32, f64),
    drill: DrillConfiguration,
) -> CurriculumModule {
    CurriculumModule {
        id: id.to_string(),
        title: title.to_string(),
        pathway,
        level,
        prerequisite_ids: prerequisites.iter().map(|p| p.to_string()).collect(),
        criteria: CompletionCriteria {
            minimum_attempts: criteria.0,
            accuracy_threshold: criteria.1,
        },
        drill,
    }
}

pub fn default_curriculum() -> Vec<CurriculumModule> {
    use Difficulty::*;
    use Family::{Chord, Interval, Scale};
    use QuestionKind::*;

    vec![
        // Harmony
        module("harmony-triads", "Triads", Pathway::Harmony, 1, &[], (20, 0.8),
            drill(Chord, &["maj", "m", "dim", "aug"], KeyFilter::Easy, &[AllTones, SingleTone], Beginner)),
        module("harmony-sevenths", "Seventh chords", Pathway::Harmony, 2, &["harmony-triads"], (30, 0.85),
            drill(Chord, &["maj7", "m7", "7"], KeyFilter::Easy, &[AllTones, SingleTone], Beginner)),
        module("harmony-sevenths-all-keys", "Sevenths in every key", Pathway::Harmony, 3, &["harmony-sevenths"], (30, 0.85),
            drill(Chord, &["maj7", "m7", "7", "m7b5", "dim7"], KeyFilter::All, &[AllTones, SingleTone], Intermediate)),
        module("harmony-extensions", "Extended chords", Pathway::Harmony, 4, &["harmony-sevenths-all-keys"], (40, 0.85),
            drill(Chord, &["9", "maj9", "m9", "13", "m11"], KeyFilter::All, &[AllTones, SingleTone], Advanced)),
        module("harmony-altered", "Altered dominants", Pathway::Harmony, 5, &["harmony-extensions"], (40, 0.9),
            drill(Chord, &["7b9", "7#9", "7#11", "7alt", "7b9b13"], KeyFilter::All, &[AllTones, SingleTone], Expert)),
        // Scales
        module("scales-major-minor", "Major and minor", Pathway::Scales, 1, &[], (20, 0.8),
            drill(Scale, &["ionian", "aeolian", "maj-pent", "min-pent"], KeyFilter::Easy, &[AllDegrees, SingleDegree], Beginner)),
        module("scales-modes", "The modes", Pathway::Scales, 2, &["scales-major-minor"], (30, 0.85),
            drill(Scale, &["dorian", "phrygian", "lydian", "mixolydian", "locrian"], KeyFilter::Medium, &[AllDegrees, SingleDegree], Intermediate)),
        module("scales-minor-family", "Minor scales and blues", Pathway::Scales, 3, &["scales-modes"], (30, 0.85),
            drill(Scale, &["harm-minor", "mel-minor", "blues"], KeyFilter::Medium, &[AllDegrees, SingleDegree], Intermediate)),
        module("scales-jazz", "Jazz scales", Pathway::Scales, 4, &["scales-minor-family", "harmony-sevenths"], (40, 0.85),
            drill(Scale, &["lydian-dom", "altered", "whole-tone", "dim-hw", "bebop-dom"], KeyFilter::All, &[AllDegrees, SingleDegree], Advanced)),
        // Intervals
        module("intervals-basic", "Thirds, fourths and fifths", Pathway::Intervals, 1, &[], (20, 0.8),
            drill(Interval, &["m3", "M3", "P4", "P5", "P8"], KeyFilter::Easy, &[SingleTone], Beginner)),
        module("intervals-all", "Every simple interval", Pathway::Intervals, 2, &["intervals-basic"], (30, 0.85),
            drill(Interval, &[], KeyFilter::All, &[SingleTone, AllTones], Advanced)),
        module("intervals-compound", "Compound intervals", Pathway::Intervals, 3, &["intervals-all"], (30, 0.85),
            drill(Interval, &["m9", "M9", "P11", "A11", "M13"], KeyFilter::All, &[SingleTone], Expert)),
        // Ear training
        module("ear-intervals", "Hearing intervals", Pathway::EarTraining, 1, &["intervals-basic"], (20, 0.75),
            drill(Interval, &[], KeyFilter::Easy, &[EarTraining], Intermediate)),
        module("ear-triads", "Hearing triads", Pathway::EarTraining, 2, &["harmony-triads"], (20, 0.8),
            drill(Chord, &["maj", "m", "dim", "aug"], KeyFilter::Medium, &[AuralQuality], Beginner)),
        module("ear-sevenths", "Hearing seventh chords", Pathway::EarTraining, 3, &["ear-triads", "harmony-sevenths"], (30, 0.8),
            drill(Chord, &["maj7", "m7", "7", "m7b5", "dim7"], KeyFilter::Medium, &[AuralQuality, AuralSpelling], Intermediate)),
        module("ear-modes", "Hearing modes", Pathway::EarTraining, 4, &["ear-sevenths", "scales-modes"], (30, 0.8),
            drill(Scale, &["ionian", "dorian", "phrygian", "lydian", "mixolydian", "aeolian"], KeyFilter::Easy, &[EarTraining], Intermediate)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::QuestionGenerator;

    fn simple(id: &str, level: u32, prereqs: &[&str], min: u32, threshold: f64) -> CurriculumModule {
        module(
            id,
            id,
            Pathway::Harmony,
            level,
            prereqs,
            (min, threshold),
            DrillConfiguration::default(),
        )
    }

    fn chain() -> CurriculumManager {
        CurriculumManager::new(vec![
            simple("c", 3, &["b"], 10, 0.8),
            simple("a", 1, &[], 10, 0.8),
            simple("b", 2, &["a"], 10, 0.8),
        ])
    }

    #[test]
    fn test_completion_threshold_examples() {
        let mut pass = CurriculumManager::new(vec![simple("m", 1, &[], 30, 0.85)]);
        let outcome = pass.record_attempt("m", 35, 30, false).unwrap();
        assert!(outcome.newly_completed);
        assert!(pass.progress("m").is_completed);

        let mut fail = CurriculumManager::new(vec![simple("m", 1, &[], 30, 0.85)]);
        let outcome = fail.record_attempt("m", 35, 28, false).unwrap();
        assert!(!outcome.newly_completed);
        assert!(!fail.progress("m").is_completed);
    }

    #[test]
    fn test_minimum_attempts_gate_completion() {
        let mut manager = CurriculumManager::new(vec![simple("m", 1, &[], 30, 0.85)]);
        manager.record_attempt("m", 10, 10, true).unwrap();
        assert!(!manager.is_completed("m"));
        manager.record_attempt("m", 10, 10, true).unwrap();
        let outcome = manager.record_attempt("m", 10, 9, false).unwrap();
        assert!(outcome.newly_completed);
        assert_eq!(outcome.progress.attempts, 30);
        assert_eq!(outcome.progress.correct_answers, 29);
        assert_eq!(outcome.progress.perfect_session_count, 2);
    }

    #[test]
    fn test_completion_is_a_one_way_latch() {
        let mut manager = CurriculumManager::new(vec![simple("m", 1, &[], 10, 0.9)]);
        manager.record_attempt("m", 10, 10, true).unwrap();
        assert!(manager.is_completed("m"));

        for _ in 0..5 {
            let outcome = manager.record_attempt("m", 20, 0, false).unwrap();
            assert!(!outcome.newly_completed);
            assert!(outcome.progress.is_completed);
        }
        let progress = manager.progress("m");
        assert!(progress.accuracy() < 0.9);
        assert!(progress.is_completed);
    }

    #[test]
    fn test_prerequisites_unlock_in_order() {
        let mut manager = chain();
        let status = |m: &CurriculumManager, id: &str| m.status(m.module(id).unwrap());

        assert_eq!(status(&manager, "a"), ModuleStatus::Unlocked);
        assert_eq!(status(&manager, "b"), ModuleStatus::Locked);
        assert!(matches!(manager.record_attempt("b", 10, 10, true), Err(PracticeError::ModuleLocked(_))));

        let outcome = manager.record_attempt("a", 10, 10, true).unwrap();
        assert_eq!(outcome.newly_unlocked, vec!["b".to_string()]);
        assert_eq!(status(&manager, "a"), ModuleStatus::Completed);
        assert_eq!(status(&manager, "b"), ModuleStatus::Unlocked);
        assert_eq!(status(&manager, "c"), ModuleStatus::Locked);
    }

    #[test]
    fn test_recommended_next_module_walks_levels() {
        let mut manager = chain();
        assert_eq!(manager.recommended_next_module(Pathway::Harmony).map(|m| m.id.as_str()), Some("a"));
        manager.record_attempt("a", 10, 10, true).unwrap();
        assert_eq!(manager.recommended_next_module(Pathway::Harmony).map(|m| m.id.as_str()), Some("b"));
        manager.record_attempt("b", 10, 10, true).unwrap();
        manager.record_attempt("c", 10, 10, true).unwrap();
        assert!(manager.recommended_next_module(Pathway::Harmony).is_none());
        assert!(manager.recommended_next_module(Pathway::Scales).is_none());
    }

    #[test]
    fn test_unknown_lookups_return_defaults() {
        let manager = chain();
        let progress = manager.progress("nope");
        assert_eq!(progress.attempts, 0);
        assert!(!progress.is_completed);
        assert_eq!(progress.accuracy(), 0.0);
    }

    #[test]
    fn test_invalid_attempts_are_rejected() {
        let mut manager = chain();
        assert!(matches!(
            manager.record_attempt("a", 5, 6, false),
            Err(PracticeError::InvalidAttempt { answered: 5, correct: 6 })
        ));
        assert!(matches!(manager.record_attempt("zzz", 5, 5, false), Err(PracticeError::UnknownModule(_))));
        assert_eq!(manager.progress("a").attempts, 0);
    }

    #[test]
    fn test_counter_overflow_is_rejected_without_mutation() {
        let mut manager = chain();
        manager.record_attempt("a", u32::MAX, 0, false).unwrap();
        assert!(matches!(
            manager.record_attempt("a", 1, 0, false),
            Err(PracticeError::InvalidAttempt { answered: 1, correct: 0 })
        ));
        assert_eq!(manager.progress("a").attempts, u32::MAX);
        assert_eq!(manager.progress("a").correct_answers, 0);

        let mut manager = chain();
        manager.record_attempt("a", u32::MAX, u32::MAX, true).unwrap();
        assert!(manager.record_attempt("a", 1, 1, true).is_err());
        let progress = manager.progress("a");
        assert_eq!(progress.correct_answers, u32::MAX);
        assert_eq!(progress.perfect_session_count, 1);
    }

    #[test]
    fn test_active_module_does_not_affect_unlocking() {
        let mut manager = chain();
        manager.set_active_module("c").unwrap();
        assert_eq!(manager.active_module().map(|m| m.id.as_str()), Some("c"));
        assert_eq!(manager.status(manager.module("c").unwrap()), ModuleStatus::Locked);
        assert!(manager.set_active_module("missing").is_err());
        assert_eq!(manager.active_module_id(), Some("c"));
        manager.clear_active_module();
        assert!(manager.active_module().is_none());
    }

    #[test]
    fn test_pathway_summary_counts() {
        let mut manager = chain();
        manager.record_attempt("a", 10, 10, true).unwrap();
        let summary = manager.pathway_summary(Pathway::Harmony);
        assert_eq!((summary.completed, summary.unlocked, summary.total), (1, 1, 3));
    }

    #[test]
    fn test_default_curriculum_is_consistent() {
        let modules = default_curriculum();
        let ids: BTreeSet<&str> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), modules.len(), "module ids must be unique");

        for m in &modules {
            for prereq in &m.prerequisite_ids {
                assert!(ids.contains(prereq.as_str()), "{} has unknown prerequisite {}", m.id, prereq);
            }
            assert_eq!(m.drill.validate(), Ok(()), "{} has an invalid drill", m.id);
            let questions = QuestionGenerator::seeded(1).generate(&m.drill);
            assert_eq!(questions.len(), m.drill.item_count, "{} cannot generate", m.id);
        }

        // A fresh learner can start every pathway except ear training, which
        // waits on the first harmony and interval modules.
        let manager = CurriculumManager::new(modules);
        for pathway in [Pathway::Harmony, Pathway::Scales, Pathway::Intervals] {
            let first = manager.recommended_next_module(pathway).unwrap();
            assert_eq!(first.level, 1);
        }
        assert!(manager.recommended_next_module(Pathway::EarTraining).is_none());
    }
}
