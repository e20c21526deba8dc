use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use pexo_trainer::config::{Config, TrainerConfig};
use pexo_trainer::exam::ExamHistorySummary;
use pexo_trainer::logging;
use pexo_trainer::{
    InMemoryCatalog, Leg, MemoryStateStore, MockExam, SessionComposer, SessionKind,
    SessionRequest, SessionScope, SqliteStore, Subject, TrainerError, TrainerResult,
};

#[derive(Parser)]
#[command(name = "pexo-trainer", about = "PPL(A) theory exam trainer")]
#[command(version)]
struct Cli {
    /// Seed for question and answer shuffling
    #[arg(long, env = "TRAINER_SEED", global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show due, upcoming and unseen question counts
    Due,

    /// Compose a study session and print it
    Session {
        /// due-review, weak-area, new-material, full-practice or mock
        kind: String,

        /// Leg number (1-3); required for mock
        #[arg(long)]
        leg: Option<u8>,

        /// Restrict to subjects, by name
        #[arg(long = "subject")]
        subjects: Vec<String>,

        #[arg(long)]
        size: Option<usize>,
    },

    /// Sit a simulated mock exam for a leg and print the result
    ExamDemo {
        /// Leg number (1-3)
        leg: u8,

        /// Untimed practice mode
        #[arg(long)]
        practice: bool,

        /// Probability of answering each question correctly
        #[arg(long, default_value_t = 0.8)]
        accuracy: f64,
    },

    /// Summarise stored mock exam results
    History,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let cli = Cli::parse();
    match run(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: &Config) -> TrainerResult<()> {
    let trainer = TrainerConfig::from_env();
    let catalog = InMemoryCatalog::load_json_file(&config.question_bank_path)?
        .with_history_capacity(trainer.weak_area.history_window);
    let persistence = SqliteStore::open(&config.database_path)?;
    let mut rng = match cli.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let now = Utc::now();

    match cli.command {
        Commands::Due => {
            let ids = catalog.question_ids();
            let store = MemoryStateStore::load(&persistence, &ids, trainer.scheduler.clone())?;
            let due_set = store.due_set(now, ids.iter().copied());
            print_json(&serde_json::json!({
                "due": due_set.due.len(),
                "notDue": due_set.not_due.len(),
                "unseen": due_set.unseen.len(),
                "maturity": store.maturity_counts(ids.iter().copied()),
                "nextUp": due_set.due.iter().take(10).collect::<Vec<_>>(),
            }))
        }
        Commands::Session {
            kind,
            leg,
            subjects,
            size,
        } => {
            let leg = leg.map(parse_leg).transpose()?;
            let kind = parse_session_kind(&kind, leg)?;

            let scope = if !subjects.is_empty() {
                let parsed = subjects
                    .iter()
                    .map(|name| {
                        Subject::parse(name)
                            .ok_or_else(|| TrainerError::Usage(format!("unknown subject {name}")))
                    })
                    .collect::<TrainerResult<Vec<_>>>()?;
                SessionScope::Subjects(parsed)
            } else if let Some(leg) = leg {
                SessionScope::Leg(leg)
            } else {
                SessionScope::All
            };

            let mut request = SessionRequest::new(kind).with_scope(scope);
            if let Some(size) = size {
                request = request.with_size(size);
            }

            let ids = catalog.question_ids();
            let store = MemoryStateStore::load(&persistence, &ids, trainer.scheduler.clone())?;
            let session = SessionComposer::new(&trainer)
                .compose_with_store(&request, &catalog, &store, now, &mut rng)?;
            print_json(&session)
        }
        Commands::ExamDemo {
            leg,
            practice,
            accuracy,
        } => {
            if !(0.0..=1.0).contains(&accuracy) {
                return Err(TrainerError::Usage(format!(
                    "accuracy must be between 0 and 1, got {accuracy}"
                )));
            }
            let leg = parse_leg(leg)?;

            let mut exam = MockExam::new(&trainer);
            let count = exam.start(leg, practice, &catalog, now, &mut rng)?.len();
            for index in 0..count {
                if exam.attempt().is_none() {
                    break;
                }
                exam.jump_to(index)?;
                let Some(question) = exam.attempt().and_then(|a| a.current_question()) else {
                    break;
                };
                let choice = if rng.gen_bool(accuracy) {
                    question.correct_index
                } else {
                    (question.correct_index + 1) % question.choices.len()
                };
                exam.select_answer(choice)?;
                exam.tick(Duration::from_secs(40), now, &persistence)?;
            }

            let result = match exam.result() {
                Some(result) => result.clone(),
                None => exam.submit(now, &persistence)?,
            };
            print_json(&serde_json::json!({
                "result": result,
                "remediation": result.remediation_request(),
            }))
        }
        Commands::History => {
            let summary = ExamHistorySummary::load(&persistence)?;
            print_json(&summary)
        }
    }
}

fn parse_leg(number: u8) -> TrainerResult<Leg> {
    Leg::from_number(number)
        .ok_or_else(|| TrainerError::Usage(format!("leg must be 1, 2 or 3, got {number}")))
}

fn parse_session_kind(name: &str, leg: Option<Leg>) -> TrainerResult<SessionKind> {
    SessionKind::parse(name, leg).ok_or_else(|| {
        if SessionKind::name_requires_leg(name) {
            TrainerError::Usage(format!("session kind {name} requires --leg"))
        } else {
            TrainerError::Usage(format!("unknown session kind {name}"))
        }
    })
}

fn print_json<T: Serialize>(value: &T) -> TrainerResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
