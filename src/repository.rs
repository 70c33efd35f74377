// src/repository.rs

use crate::curriculum::{CurriculumManager, CurriculumModule};
use crate::error::Result;
use crate::models::{DrillConfiguration, ModuleProgress, RatingState, SpacedRepetitionItem};
use crate::presets::{Preset, PresetCatalog};
use crate::scheduler::SpacedRepetitionScheduler;
use crate::session::Session;
use chrono::Utc;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

pub const RATING_STATE_KEY: &str = "rating_state";
pub const SCHEDULER_KEY: &str = "scheduler_items";
pub const MODULE_PROGRESS_KEY: &str = "module_progress";
pub const ACTIVE_MODULE_KEY: &str = "active_module";
pub const PRESETS_KEY: &str = "presets";
pub const LAST_CONFIGURATION_KEY: &str = "last_configuration";

/// Aggregate answer counts from the history log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnswerStats {
    pub total: i64,
    pub correct: i64,
}

// --- Generic records ---

pub fn load_record<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let raw: Option<String> = conn
        .query_row("SELECT value FROM records WHERE key = ?", [key], |row| row.get(0))
        .optional()?;
    match raw {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

pub fn save_record<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    conn.execute(
        "INSERT OR REPLACE INTO records (key, value, updated_at) VALUES (?, ?, ?)",
        params![key, json, Utc::now().timestamp()],
    )?;
    debug!("[DB] Saved record '{}' ({} bytes)", key, json.len());
    Ok(())
}

pub fn delete_record(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM records WHERE key = ?", [key])?;
    Ok(())
}

// --- Typed state ---

pub fn load_rating_state(conn: &Connection) -> Result<RatingState> {
    Ok(load_record(conn, RATING_STATE_KEY)?.unwrap_or_default())
}

pub fn save_rating_state(conn: &Connection, state: &RatingState) -> Result<()> {
    save_record(conn, RATING_STATE_KEY, state)
}

pub fn load_scheduler(conn: &Connection) -> Result<SpacedRepetitionScheduler> {
    let items: Vec<SpacedRepetitionItem> = load_record(conn, SCHEDULER_KEY)?.unwrap_or_default();
    Ok(SpacedRepetitionScheduler::from_items(items))
}

pub fn save_scheduler(conn: &Connection, scheduler: &SpacedRepetitionScheduler) -> Result<()> {
    save_record(conn, SCHEDULER_KEY, &scheduler.to_items())
}

/// Restores progress and the active module onto the given module catalog.
pub fn load_curriculum(conn: &Connection, modules: Vec<CurriculumModule>) -> Result<CurriculumManager> {
    let progress: BTreeMap<String, ModuleProgress> =
        load_record(conn, MODULE_PROGRESS_KEY)?.unwrap_or_default();
    let active: Option<String> = load_record(conn, ACTIVE_MODULE_KEY)?;
    Ok(CurriculumManager::with_progress(modules, progress, active))
}

pub fn save_curriculum(conn: &Connection, curriculum: &CurriculumManager) -> Result<()> {
    save_record(conn, MODULE_PROGRESS_KEY, curriculum.progress_map())?;
    match curriculum.active_module_id() {
        Some(id) => save_record(conn, ACTIVE_MODULE_KEY, id),
        None => delete_record(conn, ACTIVE_MODULE_KEY),
    }
}

pub fn load_presets(conn: &Connection) -> Result<PresetCatalog> {
    let presets: Vec<Preset> = load_record(conn, PRESETS_KEY)?.unwrap_or_default();
    Ok(PresetCatalog::from_presets(presets))
}

pub fn save_presets(conn: &Connection, catalog: &PresetCatalog) -> Result<()> {
    save_record(conn, PRESETS_KEY, catalog.presets())
}

pub fn load_last_configuration(conn: &Connection) -> Result<Option<DrillConfiguration>> {
    load_record(conn, LAST_CONFIGURATION_KEY)
}

pub fn save_last_configuration(conn: &Connection, configuration: &DrillConfiguration) -> Result<()> {
    save_record(conn, LAST_CONFIGURATION_KEY, configuration)
}

// --- Answer history ---

/// Appends every answer of a session to the history log.
pub fn log_answers(conn: &mut Connection, session: &Session) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO answers (concept_key, kind, correct, response_ms, timestamp) VALUES (?, ?, ?, ?, ?)",
        )?;
        for record in session.records() {
            stmt.execute(params![
                record.question.concept_key(),
                record.question.kind().as_str(),
                record.is_correct,
                record.response_time.as_millis() as i64,
                record.answered_at.timestamp(),
            ])?;
        }
    }
    tx.commit()?;
    debug!("[DB] Logged {} answers", session.records().len());
    Ok(())
}

pub fn answer_count(conn: &Connection, concept_key: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM answers WHERE concept_key = ?",
        [concept_key],
        |r| r.get(0),
    )?)
}

pub fn answer_stats(conn: &Connection) -> Result<AnswerStats> {
    Ok(conn.query_row(
        "SELECT count(*), coalesce(sum(correct), 0) FROM answers",
        [],
        |row| {
            Ok(AnswerStats {
                total: row.get(0)?,
                correct: row.get(1)?,
            })
        },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::default_curriculum;
    use crate::database;
    use crate::models::{KeyFilter, Prompt, Question, Subject, Submission};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[test]
    fn test_missing_records_load_as_defaults() {
        let conn = database::open_in_memory().unwrap();
        assert_eq!(load_rating_state(&conn).unwrap(), RatingState::default());
        assert!(load_scheduler(&conn).unwrap().is_empty());
        assert!(load_presets(&conn).unwrap().is_empty());
        assert!(load_last_configuration(&conn).unwrap().is_none());
        let curriculum = load_curriculum(&conn, default_curriculum()).unwrap();
        assert!(curriculum.progress_map().is_empty());
        assert!(curriculum.active_module_id().is_none());
    }

    #[test]
    fn test_state_survives_reload() {
        let conn = database::open_in_memory().unwrap();

        let mut rating = RatingState::default();
        rating.apply_session(1.0, crate::catalog::Difficulty::Advanced, 10, day(3));
        save_rating_state(&conn, &rating).unwrap();

        let mut scheduler = SpacedRepetitionScheduler::new();
        scheduler.record_outcome("chord:7:G", false, day(3));
        save_scheduler(&conn, &scheduler).unwrap();

        let mut curriculum = CurriculumManager::new(default_curriculum());
        curriculum.record_attempt("harmony-triads", 10, 9, false).unwrap();
        curriculum.set_active_module("harmony-triads").unwrap();
        save_curriculum(&conn, &curriculum).unwrap();

        let config = DrillConfiguration {
            key_filter: KeyFilter::Hard,
            ..Default::default()
        };
        save_last_configuration(&conn, &config).unwrap();

        assert_eq!(load_rating_state(&conn).unwrap(), rating);
        assert_eq!(load_scheduler(&conn).unwrap().get("chord:7:G"), scheduler.get("chord:7:G"));
        let restored = load_curriculum(&conn, default_curriculum()).unwrap();
        assert_eq!(restored.progress("harmony-triads").correct_answers, 9);
        assert_eq!(restored.active_module_id(), Some("harmony-triads"));
        assert_eq!(load_last_configuration(&conn).unwrap(), Some(config));

        curriculum.clear_active_module();
        save_curriculum(&conn, &curriculum).unwrap();
        let restored = load_curriculum(&conn, default_curriculum()).unwrap();
        assert!(restored.active_module_id().is_none());
    }

    #[test]
    fn test_presets_round_trip() {
        let conn = database::open_in_memory().unwrap();
        let mut catalog = PresetCatalog::new();
        catalog.save("Tritone subs", DrillConfiguration::default(), Utc::now()).unwrap();
        save_presets(&conn, &catalog).unwrap();

        let restored = load_presets(&conn).unwrap();
        assert_eq!(restored.names(), vec!["Tritone subs"]);
        assert_eq!(restored.presets(), catalog.presets());
    }

    #[test]
    fn test_overfull_presets_survive_load_and_save() {
        let conn = database::open_in_memory().unwrap();
        let stored: Vec<Preset> = (0..crate::constants::PRESET_LIMIT + 3)
            .map(|i| Preset {
                name: format!("preset {}", i),
                configuration: DrillConfiguration::default(),
                created_at: Utc::now(),
            })
            .collect();
        save_record(&conn, PRESETS_KEY, &stored).unwrap();

        let catalog = load_presets(&conn).unwrap();
        assert_eq!(catalog.len(), stored.len());
        save_presets(&conn, &catalog).unwrap();
        assert_eq!(load_presets(&conn).unwrap().len(), stored.len());
    }

    #[test]
    fn test_answers_are_logged() {
        let mut conn = database::open_in_memory().unwrap();
        let formula = crate::catalog::find(crate::catalog::Family::Chord, "m7").unwrap();
        let question = Question::new(Subject::new("D4".parse().unwrap(), formula), Prompt::AllTones);
        let mut session =
            Session::start(DrillConfiguration::default(), vec![question, question], Utc::now()).unwrap();
        session
            .submit(Submission::Notes(vec!["D".parse().unwrap()]), Duration::from_millis(1500), Utc::now())
            .unwrap();
        session
            .submit(
                Submission::from_text(question.kind(), "D F A C").unwrap(),
                Duration::from_millis(900),
                Utc::now(),
            )
            .unwrap();

        log_answers(&mut conn, &session).unwrap();
        assert_eq!(answer_count(&conn, "chord:m7:D").unwrap(), 2);
        assert_eq!(answer_count(&conn, "chord:maj:C").unwrap(), 0);
        assert_eq!(answer_stats(&conn).unwrap(), AnswerStats { total: 2, correct: 1 });
    }
}
