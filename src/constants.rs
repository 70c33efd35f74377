// src/constants.rs

// --- Music Theory ---
pub const SEMITONES_PER_OCTAVE: i32 = 12;
pub const DEFAULT_OCTAVE: i32 = 4; // Octave used when a note is written without one
pub const ROOT_OCTAVE: i32 = 4; // Drill roots sit in C4..B4
pub const MIN_OCTAVE: i32 = -1;
pub const MAX_OCTAVE: i32 = 9;
pub const MAX_ACCIDENTAL: i8 = 2; // Double sharp or double flat

// --- Rating ---
pub const STARTING_RATING: i32 = 1000;
pub const RATING_FLOOR: i32 = 0;
pub const RATING_K: f64 = 32.0; // Full-weight delta for a perfect session at multiplier 1.0
pub const RATING_BASELINE_ACCURACY: f64 = 0.5;
pub const RATING_MAX_DELTA: i32 = 40; // Hard cap per session, either direction
pub const RATING_FULL_WEIGHT_QUESTIONS: f64 = 10.0; // Sessions shorter than this count for less

pub const TIER_MULTIPLIER_BEGINNER: f64 = 0.75;
pub const TIER_MULTIPLIER_INTERMEDIATE: f64 = 1.0;
pub const TIER_MULTIPLIER_ADVANCED: f64 = 1.25;
pub const TIER_MULTIPLIER_EXPERT: f64 = 1.5;
pub const TIER_MULTIPLIER_CUSTOM: f64 = 1.0;

// Rank thresholds, ascending. Rank is always derived from the current rating.
pub const RANK_THRESHOLDS: [(i32, &str); 7] = [
    (0, "Novice"),
    (1000, "Apprentice"),
    (1150, "Sideman"),
    (1300, "Soloist"),
    (1500, "Bandleader"),
    (1750, "Virtuoso"),
    (2000, "Legend"),
];

// --- Spaced Repetition (SM-2) Parameters ---
pub const INTERVAL_INITIAL_DAYS: u32 = 1;
pub const INTERVAL_MAX_DAYS: u32 = 180;

pub const EASE_FACTOR_MIN: f64 = 1.3;
pub const EASE_FACTOR_MAX: f64 = 5.0;
pub const EASE_FACTOR_DEFAULT: f64 = 2.5;

pub const EASE_FACTOR_INCREMENT_CORRECT: f64 = 0.1;
pub const EASE_FACTOR_DECREMENT_MISS: f64 = 0.2;

// --- Presets ---
pub const PRESET_LIMIT: usize = 20;

// --- Sessions ---
pub const DEFAULT_ITEM_COUNT: usize = 10;
pub const PLAYBACK_TEMPO_BPM: u32 = 90;
pub const REVIEW_BATCH_LIMIT: usize = 20; // Most due concepts pulled into one review drill
pub const WEAK_AREA_REPORT_SIZE: usize = 5;
