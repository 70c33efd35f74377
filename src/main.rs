// src/main.rs

use chrono::{Local, Utc};
use clap::{Args, Parser, Subcommand};
use harmony_trainer::audio::LoggingPlayer;
use harmony_trainer::constants::WEAK_AREA_REPORT_SIZE;
use harmony_trainer::curriculum::{default_curriculum, Pathway};
use harmony_trainer::models::CorrectAnswer;
use harmony_trainer::pedagogy::{self, DrillSuggestion, SessionReport};
use harmony_trainer::session::QuitOutcome;
use harmony_trainer::{
    database, repository, Difficulty, DrillConfiguration, Family, KeyFilter, PracticeError,
    QuestionGenerator, QuestionKind, Result, Session, Submission,
};
use log::{error, info};
use rusqlite::Connection;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "harmony-trainer", version, about = "Chord, scale and interval practice")]
struct Cli {
    /// Practice database
    #[arg(long, env = "HARMONY_TRAINER_DB", default_value = "harmony_trainer.db")]
    db: PathBuf,

    /// Seed for reproducible drills
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Practise whatever is due or recommended (the default)
    Next,
    /// Run a drill from options, a preset or the last configuration
    Drill(DrillArgs),
    /// Review concepts that are due today
    Review,
    /// Run a curriculum module's drill
    Module {
        id: String,
    },
    /// Rating, streak, schedule and curriculum overview
    Status,
    /// Manage saved drill configurations
    #[command(subcommand)]
    Preset(PresetCommand),
}

#[derive(Subcommand)]
enum PresetCommand {
    Save {
        name: String,
        #[command(flatten)]
        options: DrillOptions,
        /// Fail instead of evicting the oldest preset when full
        #[arg(long)]
        strict: bool,
    },
    List,
    Rename {
        old_name: String,
        new_name: String,
    },
    Delete {
        name: String,
    },
}

#[derive(Args)]
struct DrillArgs {
    /// Load a saved preset instead of the options below
    #[arg(long, conflicts_with = "last")]
    preset: Option<String>,

    /// Repeat the last drill configuration
    #[arg(long)]
    last: bool,

    #[command(flatten)]
    options: DrillOptions,
}

#[derive(Args)]
struct DrillOptions {
    /// chord, scale or interval
    #[arg(long, default_value = "chord")]
    subject: Family,

    /// Type symbols, e.g. maj7,m7 (empty: everything in the tier)
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// easy, medium, hard, all, or a key list such as C,F#,Bb
    #[arg(long, default_value = "easy")]
    keys: KeyFilter,

    /// Question kinds, e.g. all-tones,single-tone
    #[arg(long, value_delimiter = ',', default_value = "all-tones")]
    kinds: Vec<QuestionKind>,

    #[arg(long, default_value_t = 10)]
    count: usize,

    #[arg(long, default_value = "beginner")]
    difficulty: Difficulty,
}

impl DrillOptions {
    fn configuration(&self) -> DrillConfiguration {
        DrillConfiguration {
            subject: self.subject,
            type_filter: self.types.iter().cloned().collect(),
            key_filter: self.keys.clone(),
            question_kinds: self.kinds.iter().copied().collect(),
            item_count: self.count,
            difficulty: self.difficulty,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("Starting Harmony Trainer...");
    let mut conn = database::open(&cli.db)?;
    let mut generator = match cli.seed {
        Some(seed) => QuestionGenerator::seeded(seed),
        None => QuestionGenerator::from_entropy(),
    };

    match cli.command.unwrap_or(Command::Next) {
        Command::Next => {
            let scheduler = repository::load_scheduler(&conn)?;
            let curriculum = repository::load_curriculum(&conn, default_curriculum())?;
            let today = Local::now().date_naive();
            let suggestion = pedagogy::suggest_next_drill(&scheduler, &curriculum, today);
            println!("{}", describe_suggestion(&suggestion));

            let fallback = repository::load_last_configuration(&conn)?.unwrap_or_default();
            let session =
                pedagogy::start_suggested(&suggestion, &curriculum, &mut generator, &fallback, Utc::now())?;
            practise(&mut conn, session)
        }
        Command::Drill(args) => {
            let configuration = if let Some(name) = args.preset {
                let presets = repository::load_presets(&conn)?;
                presets
                    .get(&name)
                    .map(|p| p.configuration.clone())
                    .ok_or(PracticeError::PresetNotFound(name))?
            } else if args.last {
                repository::load_last_configuration(&conn)?.unwrap_or_default()
            } else {
                args.options.configuration()
            };
            let questions = generator.prepare_drill(&configuration)?;
            repository::save_last_configuration(&conn, &configuration)?;
            let session = Session::start(configuration, questions, Utc::now())?;
            practise(&mut conn, session)
        }
        Command::Review => {
            let scheduler = repository::load_scheduler(&conn)?;
            let due = scheduler.due_items(Local::now().date_naive());
            if due.is_empty() {
                println!("Nothing due for review.");
                return Ok(());
            }
            let session = pedagogy::start_review(&mut generator, &due, Utc::now())?;
            practise(&mut conn, session)
        }
        Command::Module { id } => {
            let mut curriculum = repository::load_curriculum(&conn, default_curriculum())?;
            let session = pedagogy::start_module(&curriculum, &mut generator, &id, Utc::now())?;
            curriculum.set_active_module(&id)?;
            repository::save_curriculum(&conn, &curriculum)?;
            practise(&mut conn, session)
        }
        Command::Status => print_status(&conn),
        Command::Preset(command) => manage_presets(&conn, command),
    }
}

// --- Interactive drill ---

fn practise(conn: &mut Connection, mut session: Session) -> Result<()> {
    let player = LoggingPlayer;
    let stdin = io::stdin();
    let total = session.questions().len();
    println!("Type your answer and press Enter. 'q' quits.");

    while let Some(question) = session.current_question().copied() {
        println!();
        println!("[{}/{}] {}", session.position() + 1, total, question.text());
        session.present_current(&player);

        let asked_at = Instant::now();
        let line = match prompt_line(&stdin)? {
            Some(line) if line.trim() != "q" => line,
            _ => {
                if session.quit(Utc::now()) == QuitOutcome::Discarded {
                    println!("Session discarded.");
                    return Ok(());
                }
                break;
            }
        };

        let submission = match Submission::from_text(question.kind(), &line) {
            Ok(submission) => submission,
            Err(e) => {
                println!("{} (try again)", e);
                continue;
            }
        };
        let verdict = session.submit(submission, asked_at.elapsed(), Utc::now())?;
        if verdict.is_correct {
            println!("Correct.");
        } else {
            println!("Not quite. Answer: {}", describe_answer(&question.correct_answer()));
        }
    }

    finish(conn, &mut session)
}

fn prompt_line(stdin: &io::Stdin) -> Result<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn finish(conn: &mut Connection, session: &mut Session) -> Result<()> {
    let mut rating = repository::load_rating_state(conn)?;
    let mut scheduler = repository::load_scheduler(conn)?;
    let mut curriculum = repository::load_curriculum(conn, default_curriculum())?;

    let report = pedagogy::complete_session(
        session,
        &mut rating,
        &mut scheduler,
        &mut curriculum,
        Local::now().date_naive(),
    )?;

    repository::save_rating_state(conn, &rating)?;
    repository::save_scheduler(conn, &scheduler)?;
    repository::save_curriculum(conn, &curriculum)?;
    repository::log_answers(conn, session)?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &SessionReport) {
    let summary = &report.summary;
    println!();
    println!(
        "{} / {} correct ({:.0}%)",
        summary.correct,
        summary.answered,
        summary.accuracy * 100.0
    );
    if let Some(avg) = summary.average_response_time {
        println!("Average response: {:.1}s", avg.as_secs_f64());
    }
    println!(
        "Rating {} -> {} ({:+}), streak {}",
        report.rating.old_rating, report.rating.new_rating, report.rating.delta, report.rating.streak_count
    );
    if report.rating.ranked_up() {
        println!("New rank: {}", report.rating.new_rank.title);
    }
    if !summary.missed_concepts.is_empty() {
        println!("Scheduled for review: {}", summary.missed_concepts.join(", "));
    }
    if let Some(outcome) = &report.module {
        if outcome.newly_completed {
            println!("Module completed: {}", outcome.progress.module_id);
        }
        for id in &outcome.newly_unlocked {
            println!("Unlocked: {}", id);
        }
    }
}

// --- Reports ---

fn print_status(conn: &Connection) -> Result<()> {
    let rating = repository::load_rating_state(conn)?;
    let scheduler = repository::load_scheduler(conn)?;
    let curriculum = repository::load_curriculum(conn, default_curriculum())?;
    let stats = repository::answer_stats(conn)?;
    let today = Local::now().date_naive();

    let rank = rating.rank();
    println!("Rating: {} ({}, level {})", rating.current_rating, rank.title, rank.level);
    if let Some(next) = rank.next() {
        println!("Next rank: {} at {}", next.title, next.min_rating);
    }
    println!("Streak: {} day(s), {} session(s) played", rating.streak_count, rating.sessions_played);
    println!("Answers logged: {} ({} correct)", stats.total, stats.correct);
    println!("Due for review: {}", scheduler.due_count(today));

    println!();
    for pathway in Pathway::ALL {
        let summary = curriculum.pathway_summary(pathway);
        println!(
            "{:<13} {}/{} completed, {} open",
            pathway.as_str(),
            summary.completed,
            summary.total,
            summary.unlocked
        );
    }
    if let Some(module) = curriculum.active_module() {
        println!("Active module: {} ({})", module.title, module.id);
    }

    let weak = scheduler.weak_areas(WEAK_AREA_REPORT_SIZE);
    if !weak.is_empty() {
        println!();
        println!("Weak areas:");
        for item in weak {
            println!("  {} ({} lapses, due {})", item.concept_key, item.lapse_count, item.due_date);
        }
    }

    println!();
    println!("{}", describe_suggestion(&pedagogy::suggest_next_drill(&scheduler, &curriculum, today)));
    Ok(())
}

fn manage_presets(conn: &Connection, command: PresetCommand) -> Result<()> {
    let mut presets = repository::load_presets(conn)?;
    match command {
        PresetCommand::Save { name, options, strict } => {
            let configuration = options.configuration();
            if strict {
                presets.try_save(&name, configuration, Utc::now())?;
            } else {
                for evicted in presets.save(&name, configuration, Utc::now())? {
                    println!("Preset limit reached; removed '{}'.", evicted.name);
                }
            }
            println!("Saved '{}'.", name.trim());
        }
        PresetCommand::List => {
            if presets.is_empty() {
                println!("No presets saved.");
            }
            for preset in presets.presets() {
                let config = &preset.configuration;
                println!(
                    "{:<24} {} / {} / {} questions / {}",
                    preset.name,
                    config.subject,
                    config.difficulty,
                    config.item_count,
                    preset.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                );
            }
            return Ok(());
        }
        PresetCommand::Rename { old_name, new_name } => {
            presets.rename(&old_name, &new_name)?;
            println!("Renamed '{}' to '{}'.", old_name.trim(), new_name.trim());
        }
        PresetCommand::Delete { name } => {
            let removed = presets.delete(&name)?;
            println!("Deleted '{}'.", removed.name);
        }
    }
    repository::save_presets(conn, &presets)
}

fn describe_suggestion(suggestion: &DrillSuggestion) -> String {
    match suggestion {
        DrillSuggestion::Review { concept_keys } => format!("Review: {} concept(s) due", concept_keys.len()),
        DrillSuggestion::Module { module_id } => format!("Next module: {}", module_id),
        DrillSuggestion::Cram { concept_keys } => format!("Cram: {}", concept_keys.join(", ")),
        DrillSuggestion::FreePractice => "Free practice".to_string(),
    }
}

fn describe_answer(answer: &CorrectAnswer) -> String {
    match answer {
        CorrectAnswer::Notes(notes) => notes.iter().map(|n| n.name()).collect::<Vec<_>>().join(" "),
        CorrectAnswer::Formula(formula) => format!("{} ({})", formula.symbol, formula.name),
    }
}
