// src/error.rs

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, PracticeError>;

/// Drill configuration invariant violations, caught before generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one question type must be selected")]
    EmptyQuestionTypes,

    #[error("a custom key filter needs at least one key")]
    EmptyCustomKeys,

    #[error("custom difficulty needs at least one chord, scale or interval type")]
    EmptyCustomTypes,

    #[error("a drill needs at least one question")]
    ZeroItemCount,
}

#[derive(Error, Debug)]
pub enum PracticeError {
    #[error("Invalid drill configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    /// The filters resolved to an empty chord/scale or key pool.
    #[error("Drill unavailable: no questions match the selected filters")]
    DrillUnavailable,

    #[error("Preset name must not be empty")]
    EmptyPresetName,

    #[error("A preset named '{0}' already exists")]
    DuplicatePresetName(String),

    #[error("Preset limit of {limit} reached")]
    PresetLimitReached { limit: usize },

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("Unknown curriculum module: {0}")]
    UnknownModule(String),

    #[error("Module '{0}' is locked until its prerequisites are completed")]
    ModuleLocked(String),

    #[error("Invalid attempt: {correct} correct out of {answered} answered")]
    InvalidAttempt { answered: u32, correct: u32 },

    #[error("Session already finished")]
    SessionFinished,

    #[error("Session is still in progress")]
    SessionInProgress,

    #[error("Session result was already applied")]
    SessionAlreadyApplied,

    #[error("Invalid note: '{0}'")]
    InvalidNote(String),

    #[error("Unknown concept key: '{0}'")]
    UnknownConceptKey(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
