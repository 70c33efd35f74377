// src/scheduler.rs

//! SM-2 style spaced repetition over concept keys.

use crate::constants::*;
use crate::models::SpacedRepetitionItem;
use chrono::{Days, NaiveDate};
use log::{debug, info};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct SpacedRepetitionScheduler {
    items: BTreeMap<String, SpacedRepetitionItem>,
}

impl SpacedRepetitionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<SpacedRepetitionItem>) -> Self {
        SpacedRepetitionScheduler {
            items: items.into_iter().map(|i| (i.concept_key.clone(), i)).collect(),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &SpacedRepetitionItem> {
        self.items.values()
    }

    pub fn to_items(&self) -> Vec<SpacedRepetitionItem> {
        self.items.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, concept_key: &str) -> Option<&SpacedRepetitionItem> {
        self.items.get(concept_key)
    }

    /// Zero for concepts that were never missed.
    pub fn lapse_count(&self, concept_key: &str) -> u32 {
        self.get(concept_key).map_or(0, |i| i.lapse_count)
    }

    /// Records one encounter with a concept. Returns the updated item, or
    /// `None` for a correct answer on a concept that was never missed.
    pub fn record_outcome(
        &mut self,
        concept_key: &str,
        was_correct: bool,
        as_of: NaiveDate,
    ) -> Option<&SpacedRepetitionItem> {
        if was_correct && !self.items.contains_key(concept_key) {
            debug!("[SR] {} correct and untracked, nothing to schedule", concept_key);
            return None;
        }

        let item = self
            .items
            .entry(concept_key.to_string())
            .or_insert_with(|| SpacedRepetitionItem::new(concept_key, as_of));

        let old_ease = item.ease_factor;
        let old_interval = item.interval_days;

        if was_correct {
            let grown = if item.interval_days == 0 {
                INTERVAL_INITIAL_DAYS
            } else {
                (item.interval_days as f64 * item.ease_factor).ceil() as u32
            };
            item.interval_days = grown.max(item.interval_days).min(INTERVAL_MAX_DAYS);
            item.ease_factor = (item.ease_factor + EASE_FACTOR_INCREMENT_CORRECT).clamp(EASE_FACTOR_MIN, EASE_FACTOR_MAX);
            item.review_count = item.review_count.saturating_add(1);
        } else {
            item.interval_days = INTERVAL_INITIAL_DAYS;
            item.ease_factor = (item.ease_factor - EASE_FACTOR_DECREMENT_MISS).clamp(EASE_FACTOR_MIN, EASE_FACTOR_MAX);
            item.lapse_count = item.lapse_count.saturating_add(1);
        }

        item.last_reviewed = as_of;
        item.due_date = as_of
            .checked_add_days(Days::new(item.interval_days as u64))
            .unwrap_or(NaiveDate::MAX);

        info!(
            "[SR Result] {}: Ease {:.2} -> {:.2}, Interval {}d -> {}d, due {}",
            concept_key, old_ease, item.ease_factor, old_interval, item.interval_days, item.due_date
        );
        Some(item)
    }

    /// Concept keys due on or before `as_of`, most overdue first.
    pub fn due_items(&self, as_of: NaiveDate) -> Vec<String> {
        self.due(as_of).into_iter().map(|i| i.concept_key.clone()).collect()
    }

    pub fn due_count(&self, as_of: NaiveDate) -> usize {
        self.items.values().filter(|i| i.due_date <= as_of).count()
    }

    pub fn next_due(&self, as_of: NaiveDate) -> Option<&SpacedRepetitionItem> {
        self.due(as_of).into_iter().next()
    }

    /// Concepts with at least one lapse, most lapses first.
    pub fn weak_areas(&self, limit: usize) -> Vec<&SpacedRepetitionItem> {
        let mut weak: Vec<&SpacedRepetitionItem> = self.items.values().filter(|i| i.lapse_count > 0).collect();
        weak.sort_by(|a, b| {
            b.lapse_count
                .cmp(&a.lapse_count)
                .then_with(|| a.ease_factor.total_cmp(&b.ease_factor))
                .then_with(|| a.concept_key.cmp(&b.concept_key))
        });
        weak.truncate(limit);
        weak
    }

    fn due(&self, as_of: NaiveDate) -> Vec<&SpacedRepetitionItem> {
        let mut due: Vec<&SpacedRepetitionItem> = self.items.values().filter(|i| i.due_date <= as_of).collect();
        // BTreeMap iteration is already key-ordered, so a stable sort keeps
        // keys as the tie-break.
        due.sort_by_key(|i| i.due_date);
        due
    }
}
