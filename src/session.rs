// src/session.rs

use crate::audio::{self, AudioPlayer};
use crate::constants::PLAYBACK_TEMPO_BPM;
use crate::error::{PracticeError, Result};
use crate::models::{AnswerRecord, DrillConfiguration, Question, Submission};
use crate::validator::{self, Verdict};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOutcome {
    /// At least one answer was recorded; the session counts.
    Completed,
    /// Nothing was answered; the caller should drop the session.
    Discarded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_questions: usize,
    pub answered: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub average_response_time: Option<Duration>,
    /// Concepts missed at least once, in the order first missed.
    pub missed_concepts: Vec<String>,
    /// Every question answered, every answer correct.
    pub is_perfect: bool,
}

#[derive(Debug)]
pub struct Session {
    configuration: DrillConfiguration,
    module_id: Option<String>,
    questions: Vec<Question>,
    position: usize,
    records: Vec<AnswerRecord>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    applied: bool,
}

impl Session {
    /// Starts a drill. An empty question list means the generator could not
    /// satisfy the filters, so there is nothing to start.
    pub fn start(
        configuration: DrillConfiguration,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Session> {
        if questions.is_empty() {
            return Err(PracticeError::DrillUnavailable);
        }
        info!("Starting {} drill with {} questions", configuration.subject, questions.len());
        Ok(Session {
            configuration,
            module_id: None,
            questions,
            position: 0,
            records: Vec::new(),
            started_at,
            ended_at: None,
            applied: false,
        })
    }

    /// Links the session to a curriculum module so its result counts there.
    pub fn for_module(mut self, module_id: &str) -> Self {
        self.module_id = Some(module_id.to_string());
        self
    }

    pub fn configuration(&self) -> &DrillConfiguration {
        &self.configuration
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn is_completed(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Whether the result has already been folded into learner state.
    pub fn is_applied(&self) -> bool {
        self.applied
    }

    pub(crate) fn mark_applied(&mut self) {
        self.applied = true;
    }

    pub fn current_question(&self) -> Option<&Question> {
        if self.is_completed() {
            return None;
        }
        self.questions.get(self.position)
    }

    pub fn remaining(&self) -> usize {
        if self.is_completed() {
            0
        } else {
            self.questions.len() - self.position
        }
    }

    /// Plays the current question if it is an aural one.
    pub fn present_current(&self, player: &dyn AudioPlayer) {
        if let Some(question) = self.current_question() {
            if question.kind().is_aural() {
                audio::play_subject(player, &question.subject, PLAYBACK_TEMPO_BPM);
            }
        }
    }

    /// Checks an answer to the current question, logs it and advances.
    pub fn submit(
        &mut self,
        submission: Submission,
        response_time: Duration,
        answered_at: DateTime<Utc>,
    ) -> Result<Verdict> {
        let question = *self.current_question().ok_or(PracticeError::SessionFinished)?;
        let verdict = validator::evaluate(&question, &submission);

        self.records.push(AnswerRecord {
            question,
            submission,
            is_correct: verdict.is_correct,
            missed_pitch_classes: verdict.missed_pitch_classes.clone(),
            extra_pitch_classes: verdict.extra_pitch_classes.clone(),
            response_time,
            answered_at,
        });
        self.position += 1;
        debug!(
            "[Session] Answer {}/{}: {}",
            self.position,
            self.questions.len(),
            if verdict.is_correct { "correct" } else { "wrong" }
        );

        if self.position == self.questions.len() {
            self.ended_at = Some(answered_at);
            info!("Session completed: {}/{} correct", self.correct_count(), self.records.len());
        }
        Ok(verdict)
    }

    /// Ends the session early.
    pub fn quit(&mut self, now: DateTime<Utc>) -> QuitOutcome {
        if self.records.is_empty() {
            info!("Session quit before any answer; discarding");
            return QuitOutcome::Discarded;
        }
        if self.ended_at.is_none() {
            self.ended_at = Some(now);
            info!("Session quit after {} of {} questions", self.records.len(), self.questions.len());
        }
        QuitOutcome::Completed
    }

    pub fn correct_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_correct).count()
    }

    pub fn summary(&self) -> SessionSummary {
        let answered = self.records.len();
        let correct = self.correct_count();
        let accuracy = if answered == 0 {
            0.0
        } else {
            correct as f64 / answered as f64
        };

        let total: Duration = self.records.iter().map(|r| r.response_time).sum();
        let average_response_time = (answered > 0).then(|| total / answered as u32);

        let mut seen = BTreeSet::new();
        let missed_concepts = self
            .records
            .iter()
            .filter(|r| !r.is_correct)
            .map(|r| r.question.concept_key())
            .filter(|key| seen.insert(key.clone()))
            .collect();

        SessionSummary {
            total_questions: self.questions.len(),
            answered,
            correct,
            accuracy,
            average_response_time,
            missed_concepts,
            is_perfect: answered == self.questions.len() && correct == answered,
        }
    }
}
