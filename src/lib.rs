// src/lib.rs

pub mod audio;
pub mod catalog;
pub mod constants;
pub mod curriculum;
pub mod database;
pub mod error;
pub mod generator;
pub mod models;
pub mod pedagogy;
pub mod presets;
pub mod rating;
pub mod repository;
pub mod scheduler;
pub mod session;
pub mod theory;
pub mod validator;

pub use catalog::{Difficulty, Family, Formula};
pub use curriculum::{CurriculumManager, CurriculumModule, Pathway};
pub use error::{ConfigError, PracticeError, Result};
pub use generator::QuestionGenerator;
pub use models::{DrillConfiguration, KeyFilter, Question, QuestionKind, RatingState, Submission};
pub use presets::PresetCatalog;
pub use scheduler::SpacedRepetitionScheduler;
pub use session::Session;
pub use theory::Note;
