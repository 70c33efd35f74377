// src/pedagogy.rs

use crate::catalog::{Difficulty, Family};
use crate::constants::*;
use crate::curriculum::{AttemptOutcome, CurriculumManager, ModuleStatus, Pathway};
use crate::error::{PracticeError, Result};
use crate::generator::QuestionGenerator;
use crate::models::{DrillConfiguration, KeyFilter, QuestionKind, RatingState, Subject};
use crate::rating::RatingChange;
use crate::scheduler::SpacedRepetitionScheduler;
use crate::session::{Session, SessionSummary};
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

/// What the learner should practise next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrillSuggestion {
    /// Concepts whose review date has arrived, most overdue first.
    Review { concept_keys: Vec<String> },
    /// The next unlocked, unfinished curriculum module.
    Module { module_id: String },
    /// Nothing due and no module open: grind the weakest concepts.
    Cram { concept_keys: Vec<String> },
    FreePractice,
}

/// Everything a finished session changed.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub rating: RatingChange,
    /// Concepts whose schedule moved, in the order first seen.
    pub rescheduled: Vec<String>,
    pub module: Option<AttemptOutcome>,
}

// --- Public Interface ---

/// Review first, then discovery in the curriculum, then cram.
pub fn suggest_next_drill(
    scheduler: &SpacedRepetitionScheduler,
    curriculum: &CurriculumManager,
    today: NaiveDate,
) -> DrillSuggestion {
    debug!("Choosing next drill for {}", today);

    // 1. Review (memory protection)
    let mut due = scheduler.due_items(today);
    if !due.is_empty() {
        due.truncate(REVIEW_BATCH_LIMIT);
        info!("Serving Due Review: {} concepts", due.len());
        return DrillSuggestion::Review { concept_keys: due };
    }

    // 2. Discovery (resume the active module, else the first open one)
    if let Some(module) = curriculum
        .active_module()
        .filter(|m| curriculum.status(m) == ModuleStatus::Unlocked)
    {
        info!("Serving Active Module: {}", module.id);
        return DrillSuggestion::Module {
            module_id: module.id.clone(),
        };
    }
    if let Some(module) = Pathway::ALL
        .iter()
        .find_map(|&p| curriculum.recommended_next_module(p))
    {
        info!("Serving Discovery: {} ({})", module.title, module.id);
        return DrillSuggestion::Module {
            module_id: module.id.clone(),
        };
    }

    // 3. Cram (weakest concepts)
    let weak: Vec<String> = scheduler
        .weak_areas(WEAK_AREA_REPORT_SIZE)
        .into_iter()
        .map(|i| i.concept_key.clone())
        .collect();
    if !weak.is_empty() {
        warn!("No reviews or open modules. Entering Cram Mode: {}", weak.join(", "));
        return DrillSuggestion::Cram { concept_keys: weak };
    }

    info!("Nothing scheduled; free practice.");
    DrillSuggestion::FreePractice
}

/// Turns a suggestion into a ready session. `FreePractice` uses `fallback`.
pub fn start_suggested<R: Rng>(
    suggestion: &DrillSuggestion,
    curriculum: &CurriculumManager,
    generator: &mut QuestionGenerator<R>,
    fallback: &DrillConfiguration,
    now: DateTime<Utc>,
) -> Result<Session> {
    match suggestion {
        DrillSuggestion::Review { concept_keys } => start_review(generator, concept_keys, now),
        DrillSuggestion::Cram { concept_keys } => {
            let cycled: Vec<String> = concept_keys
                .iter()
                .cycle()
                .take(DEFAULT_ITEM_COUNT.max(concept_keys.len()))
                .cloned()
                .collect();
            start_review(generator, &cycled, now)
        }
        DrillSuggestion::Module { module_id } => start_module(curriculum, generator, module_id, now),
        DrillSuggestion::FreePractice => {
            let questions = generator.prepare_drill(fallback)?;
            Session::start(fallback.clone(), questions, now)
        }
    }
}

/// A drill over the given concepts, one question each.
pub fn start_review<R: Rng>(
    generator: &mut QuestionGenerator<R>,
    concept_keys: &[String],
    now: DateTime<Utc>,
) -> Result<Session> {
    let configuration = review_configuration(concept_keys);
    let questions = generator.generate_review(concept_keys, &configuration.question_kinds);
    Session::start(configuration, questions, now)
}

/// A drill from a module's configuration, linked back to the module.
pub fn start_module<R: Rng>(
    curriculum: &CurriculumManager,
    generator: &mut QuestionGenerator<R>,
    module_id: &str,
    now: DateTime<Utc>,
) -> Result<Session> {
    let module = curriculum
        .module(module_id)
        .ok_or_else(|| PracticeError::UnknownModule(module_id.to_string()))?;
    if curriculum.status(module) == ModuleStatus::Locked {
        return Err(PracticeError::ModuleLocked(module_id.to_string()));
    }
    let questions = generator.prepare_drill(&module.drill)?;
    Ok(Session::start(module.drill.clone(), questions, now)?.for_module(module_id))
}

/// Folds a finished session into rating, schedule and curriculum progress.
///
/// The curriculum is updated first so a rejected attempt leaves the rating
/// and schedule untouched. Each concept is rescheduled once per session: a
/// single miss counts as a miss. A session is applied at most once.
pub fn complete_session(
    session: &mut Session,
    rating: &mut RatingState,
    scheduler: &mut SpacedRepetitionScheduler,
    curriculum: &mut CurriculumManager,
    today: NaiveDate,
) -> Result<SessionReport> {
    if !session.is_completed() {
        return Err(PracticeError::SessionInProgress);
    }
    if session.is_applied() {
        warn!("Ignoring repeated completion of a session");
        return Err(PracticeError::SessionAlreadyApplied);
    }
    let summary = session.summary();
    info!(
        "Processing session: {}/{} correct ({:.0}%)",
        summary.correct,
        summary.answered,
        summary.accuracy * 100.0
    );

    // 1. Curriculum
    let module = match session.module_id() {
        Some(id) => Some(curriculum.record_attempt(
            id,
            summary.answered as u32,
            summary.correct as u32,
            summary.is_perfect,
        )?),
        None => None,
    };

    // 2. Rating
    let rating_change = rating.apply_session(
        summary.accuracy,
        session.configuration().difficulty,
        summary.answered,
        today,
    );

    // 3. Spaced repetition
    let mut order = Vec::new();
    let mut outcomes: BTreeMap<String, bool> = BTreeMap::new();
    for record in session.records() {
        let key = record.question.concept_key();
        let all_correct = outcomes.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            true
        });
        *all_correct &= record.is_correct;
    }

    let mut rescheduled = Vec::new();
    for key in order {
        let was_correct = outcomes[&key];
        if scheduler.record_outcome(&key, was_correct, today).is_some() {
            rescheduled.push(key);
        }
    }
    debug!("[Session Result] {} concepts rescheduled", rescheduled.len());
    session.mark_applied();

    Ok(SessionReport {
        summary,
        rating: rating_change,
        rescheduled,
        module,
    })
}

// --- Internal ---

fn review_configuration(concept_keys: &[String]) -> DrillConfiguration {
    let families: BTreeSet<Family> = concept_keys
        .iter()
        .filter_map(|k| Subject::from_concept_key(k).ok())
        .map(|s| s.family())
        .collect();
    DrillConfiguration {
        subject: families.into_iter().next().unwrap_or(Family::Chord),
        type_filter: BTreeSet::new(),
        key_filter: KeyFilter::All,
        question_kinds: BTreeSet::from([QuestionKind::AllTones]),
        item_count: concept_keys.len().max(1),
        difficulty: Difficulty::Intermediate,
    }
}
