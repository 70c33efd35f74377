// src/generator.rs

use crate::catalog::Formula;
use crate::error::{PracticeError, Result};
use crate::models::{DrillConfiguration, Prompt, Question, QuestionKind, Subject};
use log::{debug, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

pub struct QuestionGenerator<R: Rng> {
    rng: R,
}

impl QuestionGenerator<ChaCha8Rng> {
    /// Deterministic generator for tests and reproducible drills.
    pub fn seeded(seed: u64) -> Self {
        QuestionGenerator::new(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        QuestionGenerator::new(ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> QuestionGenerator<R> {
    pub fn new(rng: R) -> Self {
        QuestionGenerator { rng }
    }

    /// Produces exactly `item_count` questions, or nothing when the
    /// configuration is invalid or its filters leave an empty pool. An
    /// empty result means the drill cannot start.
    pub fn generate(&mut self, config: &DrillConfiguration) -> Vec<Question> {
        if let Err(e) = config.validate() {
            warn!("Refusing to generate from invalid configuration: {}", e);
            return Vec::new();
        }

        let formulas = config.resolve_formulas();
        let roots = config.resolve_roots();
        let kinds: Vec<QuestionKind> = config.question_kinds.iter().copied().collect();
        debug!(
            "[Generator] Pools: {} formulas, {} roots, {} kinds",
            formulas.len(),
            roots.len(),
            kinds.len()
        );

        if formulas.is_empty() || roots.is_empty() {
            warn!(
                "Empty candidate pool for {} drill (formulas: {}, roots: {})",
                config.subject,
                formulas.len(),
                roots.len()
            );
            return Vec::new();
        }

        let questions: Vec<Question> = (0..config.item_count)
            .map(|_| {
                let formula = *self.pick(&formulas);
                let root = *self.pick(&roots);
                let kind = *self.pick(&kinds);
                let prompt = self.draw_prompt(kind, formula);
                Question::new(Subject::new(root, formula), prompt)
            })
            .collect();

        info!("Generated {} {} questions", questions.len(), config.subject);
        questions
    }

    /// Like [`generate`](Self::generate) but reports why a drill cannot start.
    pub fn prepare_drill(&mut self, config: &DrillConfiguration) -> Result<Vec<Question>> {
        config.validate()?;
        let questions = self.generate(config);
        if questions.is_empty() {
            return Err(PracticeError::DrillUnavailable);
        }
        Ok(questions)
    }

    /// One question per concept key, in the given order, with kinds drawn
    /// from `kinds`. Keys that no longer resolve are skipped.
    pub fn generate_review(&mut self, concept_keys: &[String], kinds: &BTreeSet<QuestionKind>) -> Vec<Question> {
        let kinds: Vec<QuestionKind> = kinds.iter().copied().collect();
        if kinds.is_empty() {
            warn!("Review drill requested with no question kinds");
            return Vec::new();
        }

        let mut questions = Vec::with_capacity(concept_keys.len());
        for key in concept_keys {
            let subject = match Subject::from_concept_key(key) {
                Ok(subject) => subject,
                Err(e) => {
                    warn!("Skipping review item: {}", e);
                    continue;
                }
            };
            let kind = *self.pick(&kinds);
            let prompt = self.draw_prompt(kind, subject.formula);
            questions.push(Question::new(subject, prompt));
        }

        info!("Generated {} review questions", questions.len());
        questions
    }

    fn draw_prompt(&mut self, kind: QuestionKind, formula: &'static Formula) -> Prompt {
        match kind {
            QuestionKind::SingleTone => Prompt::SingleTone {
                target: *self.pick(formula.intervals),
            },
            QuestionKind::SingleDegree => Prompt::SingleDegree {
                target: *self.pick(formula.intervals),
            },
            QuestionKind::AllTones => Prompt::AllTones,
            QuestionKind::AuralQuality => Prompt::AuralQuality,
            QuestionKind::AuralSpelling => Prompt::AuralSpelling,
            QuestionKind::AllDegrees => Prompt::AllDegrees,
            QuestionKind::EarTraining => Prompt::EarTraining,
        }
    }

    // Callers guarantee `items` is non-empty.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.gen_range(0..items.len())]
    }
}
