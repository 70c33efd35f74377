// src/rating.rs

//! Skill rating, daily streak and derived rank.

use crate::catalog::Difficulty;
use crate::constants::*;
use crate::models::RatingState;
use chrono::NaiveDate;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub level: u32,
    pub title: &'static str,
    pub min_rating: i32,
}

impl Rank {
    /// Pure function of the rating; ranks are never stored.
    pub fn for_rating(rating: i32) -> Rank {
        let index = RANK_THRESHOLDS
            .iter()
            .rposition(|&(min, _)| rating >= min)
            .unwrap_or(0);
        Self::at(index)
    }

    pub fn next(&self) -> Option<Rank> {
        let index = self.level as usize;
        (index < RANK_THRESHOLDS.len()).then(|| Self::at(index))
    }

    fn at(index: usize) -> Rank {
        let (min_rating, title) = RANK_THRESHOLDS[index];
        Rank {
            level: index as u32 + 1,
            title,
            min_rating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingChange {
    pub old_rating: i32,
    pub new_rating: i32,
    pub delta: i32,
    pub streak_count: u32,
    pub old_rank: Rank,
    pub new_rank: Rank,
}

impl RatingChange {
    pub fn ranked_up(&self) -> bool {
        self.new_rank.level > self.old_rank.level
    }
}

pub fn tier_multiplier(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Beginner => TIER_MULTIPLIER_BEGINNER,
        Difficulty::Intermediate => TIER_MULTIPLIER_INTERMEDIATE,
        Difficulty::Advanced => TIER_MULTIPLIER_ADVANCED,
        Difficulty::Expert => TIER_MULTIPLIER_EXPERT,
        Difficulty::Custom => TIER_MULTIPLIER_CUSTOM,
    }
}

/// Rating after one session, plus the applied delta.
///
/// The delta grows with the distance from 50% accuracy and with the tier,
/// shrinks for sessions shorter than a full drill, never has the opposite
/// sign of `accuracy - 0.5`, and never exceeds [`RATING_MAX_DELTA`].
pub fn apply_result(
    prior_rating: i32,
    session_accuracy: f64,
    difficulty: Difficulty,
    question_count: usize,
) -> (i32, i32) {
    if question_count == 0 || !session_accuracy.is_finite() {
        return (prior_rating, 0);
    }

    let deviation = (session_accuracy.clamp(0.0, 1.0) - RATING_BASELINE_ACCURACY) * 2.0;
    let weight = (question_count as f64 / RATING_FULL_WEIGHT_QUESTIONS).min(1.0);
    let raw = RATING_K * tier_multiplier(difficulty) * deviation * weight;
    let delta = (raw.round() as i32).clamp(-RATING_MAX_DELTA, RATING_MAX_DELTA);

    let new_rating = if delta < 0 {
        prior_rating.saturating_add(delta).max(RATING_FLOOR.min(prior_rating))
    } else {
        prior_rating.saturating_add(delta)
    };

    debug!(
        "[Rating Input] Accuracy: {:.2}, Tier: {}, Questions: {}, Raw: {:.2}",
        session_accuracy, difficulty, question_count, raw
    );
    (new_rating, new_rating - prior_rating)
}

/// Consecutive-day streak. Same day leaves it alone, the next day extends
/// it, a gap of more than one day restarts it at 1.
pub fn advance_streak(streak: u32, last_played: Option<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(last) = last_played else {
        return 1;
    };
    match (today - last).num_days() {
        0 => streak.max(1),
        1 => streak.saturating_add(1),
        d if d > 1 => 1,
        // Clock moved backwards; keep what we have.
        _ => streak,
    }
}

impl RatingState {
    pub fn rank(&self) -> Rank {
        Rank::for_rating(self.current_rating)
    }

    /// Folds a completed session into the rating state.
    pub fn apply_session(
        &mut self,
        session_accuracy: f64,
        difficulty: Difficulty,
        question_count: usize,
        played_on: NaiveDate,
    ) -> RatingChange {
        let old_rating = self.current_rating;
        let old_rank = self.rank();

        let (new_rating, delta) = apply_result(old_rating, session_accuracy, difficulty, question_count);
        self.current_rating = new_rating;
        self.last_delta = delta;
        self.streak_count = advance_streak(self.streak_count, self.last_played, played_on);
        if self.last_played.map_or(true, |last| played_on > last) {
            self.last_played = Some(played_on);
        }
        self.sessions_played = self.sessions_played.saturating_add(1);

        let new_rank = self.rank();
        info!(
            "[Rating Result] {} -> {} ({:+}), streak {}, rank {}",
            old_rating, new_rating, delta, self.streak_count, new_rank.title
        );

        RatingChange {
            old_rating,
            new_rating,
            delta,
            streak_count: self.streak_count,
            old_rank,
            new_rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_delta_sign_follows_accuracy() {
        for tier in [Difficulty::Beginner, Difficulty::Advanced, Difficulty::Expert] {
            for count in [1, 5, 10, 100] {
                assert!(apply_result(1200, 0.0, tier, count).1 <= 0);
                assert!(apply_result(1200, 0.3, tier, count).1 <= 0);
                assert!(apply_result(1200, 1.0, tier, count).1 >= 0);
                assert!(apply_result(1200, 0.8, tier, count).1 >= 0);
            }
        }
        assert_eq!(apply_result(1200, 0.5, Difficulty::Expert, 20).1, 0);
    }

    #[test]
    fn test_delta_is_capped() {
        for count in [1, 10, 1_000, 1_000_000] {
            let (_, up) = apply_result(1500, 1.0, Difficulty::Expert, count);
            let (_, down) = apply_result(1500, 0.0, Difficulty::Expert, count);
            assert!(up.abs() <= RATING_MAX_DELTA);
            assert!(down.abs() <= RATING_MAX_DELTA);
        }
        assert_eq!(apply_result(1500, 1.0, Difficulty::Expert, 50).1, RATING_MAX_DELTA);
    }

    #[test]
    fn test_harder_tiers_move_rating_more() {
        let beginner = apply_result(1000, 1.0, Difficulty::Beginner, 10).1;
        let intermediate = apply_result(1000, 1.0, Difficulty::Intermediate, 10).1;
        let advanced = apply_result(1000, 1.0, Difficulty::Advanced, 10).1;
        assert!(beginner < intermediate && intermediate < advanced);
    }

    #[test]
    fn test_short_sessions_count_less() {
        let short = apply_result(1000, 1.0, Difficulty::Intermediate, 2).1;
        let full = apply_result(1000, 1.0, Difficulty::Intermediate, 10).1;
        assert!(short < full);
        assert_eq!(apply_result(1000, 1.0, Difficulty::Intermediate, 0), (1000, 0));
    }

    #[test]
    fn test_rating_never_drops_below_floor() {
        let (rating, delta) = apply_result(10, 0.0, Difficulty::Expert, 20);
        assert_eq!(rating, RATING_FLOOR);
        assert_eq!(delta, -10);
    }

    #[test]
    fn test_extreme_ratings_saturate() {
        assert_eq!(apply_result(i32::MAX - 5, 1.0, Difficulty::Expert, 20), (i32::MAX, 5));
        assert_eq!(apply_result(i32::MIN, 0.0, Difficulty::Expert, 20), (i32::MIN, 0));

        let mut state = RatingState {
            current_rating: i32::MAX,
            streak_count: u32::MAX,
            sessions_played: u32::MAX,
            last_played: Some(day(1)),
            ..Default::default()
        };
        let change = state.apply_session(1.0, Difficulty::Expert, 20, day(2));
        assert_eq!(change.delta, 0);
        assert_eq!(state.current_rating, i32::MAX);
        assert_eq!(state.streak_count, u32::MAX);
        assert_eq!(state.sessions_played, u32::MAX);
    }

    #[test]
    fn test_streak_rules() {
        assert_eq!(advance_streak(0, None, day(1)), 1);
        assert_eq!(advance_streak(3, Some(day(1)), day(1)), 3);
        assert_eq!(advance_streak(3, Some(day(1)), day(2)), 4);
        assert_eq!(advance_streak(3, Some(day(1)), day(4)), 1);
        assert_eq!(advance_streak(3, Some(day(5)), day(4)), 3);
    }

    #[test]
    fn test_apply_session_updates_state() {
        let mut state = RatingState::default();
        let first = state.apply_session(1.0, Difficulty::Intermediate, 10, day(1));
        assert_eq!(first.old_rating, STARTING_RATING);
        assert!(first.delta > 0);
        assert_eq!(state.streak_count, 1);

        state.apply_session(0.9, Difficulty::Intermediate, 10, day(1));
        assert_eq!(state.streak_count, 1);
        state.apply_session(0.9, Difficulty::Intermediate, 10, day(2));
        assert_eq!(state.streak_count, 2);
        assert_eq!(state.sessions_played, 3);
        assert_eq!(state.last_played, Some(day(2)));
        assert_eq!(state.last_delta, apply_result(state.current_rating - state.last_delta, 0.9, Difficulty::Intermediate, 10).1);
    }

    #[test]
    fn test_rank_is_derived_from_rating() {
        assert_eq!(Rank::for_rating(-50).title, "Novice");
        assert_eq!(Rank::for_rating(999).title, "Novice");
        assert_eq!(Rank::for_rating(1000).title, "Apprentice");
        assert_eq!(Rank::for_rating(1499).level, 4);
        assert_eq!(Rank::for_rating(5000).title, "Legend");
        assert_eq!(Rank::for_rating(5000).next(), None);
        assert_eq!(Rank::for_rating(1000).next().map(|r| r.title), Some("Sideman"));
    }
}
