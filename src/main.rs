use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use liftrs::config::AppConfig;
use liftrs::gateways::{ExerciseCatalog, InMemoryCatalog, StaticFeedback, StaticProfile};
use liftrs::history_store::SqliteHistoryStore;
use liftrs::logging::init_logging;
use liftrs::models::{
    CompletedExercise, CompletedSet, ExperienceLevel, FitnessGoal, MuscleGroup, MuscleRecoveryData, ReadinessStatus,
    TrainingFormat, WorkoutPlan,
};
use liftrs::allocation::LowRecoveryPolicy;
use liftrs::assembler::{PlanRequest, WorkoutPlanAssembler};
use liftrs::recovery::RecoveryEstimator;
use liftrs::rep_cache::RepRangeCache;
use liftrs::set_scheme::SchemeSuggestion;
use liftrs::time_budget::SessionTimeBudget;
use liftrs::time_estimate::ExerciseTimeEstimator;

/// LiftRS - Recovery-aware strength workout planner
///
/// Builds time-boxed workouts from the muscles you want to train, how
/// recovered they are, and your goal and experience level.
#[derive(Parser)]
#[command(name = "liftrs")]
#[command(author = "LiftRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Recovery-aware workout planner", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a workout plan
    Plan {
        /// Muscle groups to train (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        muscles: Vec<MuscleGroup>,

        /// Session length in minutes
        #[arg(short, long)]
        duration: Option<u32>,

        /// Total exercise count (sized from the time budget if omitted)
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Training goal (strength, power, hypertrophy, general, endurance, fat-loss)
        #[arg(short, long)]
        goal: Option<FitnessGoal>,

        /// Experience level (beginner, intermediate, advanced)
        #[arg(short, long)]
        experience: Option<ExperienceLevel>,

        /// Training format (straight, superset, circuit)
        #[arg(short = 'f', long)]
        format: Option<TrainingFormat>,

        /// Low-recovery policy (skip, floor)
        #[arg(long)]
        policy: Option<LowRecoveryPolicy>,

        /// Suggested sets per exercise, clamped to the template
        #[arg(long)]
        sets: Option<u32>,

        /// Suggested reps per set, clamped to the template
        #[arg(long)]
        reps: Option<u32>,

        /// Seed for candidate variety
        #[arg(long)]
        seed: Option<u64>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show per-muscle recovery from stored history
    Recovery {
        /// Muscle groups to show (all if omitted)
        #[arg(short, long, value_delimiter = ',')]
        muscles: Vec<MuscleGroup>,
    },

    /// Record a completed exercise into the stimulus history
    Log {
        /// Exercise id from the catalog
        #[arg(short = 'x', long)]
        exercise: String,

        /// Reps per completed set (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        reps: Vec<u32>,

        /// Load per set in kilograms
        #[arg(short, long)]
        weight: Option<f64>,
    },

    /// Show the time budget for a session length
    Budget {
        /// Session length in minutes
        #[arg(short, long)]
        duration: u32,
    },

    /// Configure application settings
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Exercise")]
    name: String,
    #[tabled(rename = "Muscle")]
    muscle: String,
    #[tabled(rename = "Sets x Reps")]
    volume: String,
    #[tabled(rename = "Rest")]
    rest: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Time")]
    time: String,
}

#[derive(Tabled)]
struct RecoveryRow {
    #[tabled(rename = "Muscle")]
    muscle: String,
    #[tabled(rename = "Recovery")]
    recovery: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Last worked")]
    last_worked: String,
    #[tabled(rename = "Fully recovered")]
    full_recovery: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Plan {
            muscles,
            duration,
            count,
            goal,
            experience,
            format,
            policy,
            sets,
            reps,
            seed,
            json,
        } => {
            let catalog = load_catalog(&config)?;
            let store = open_history(&config)?;
            let recovery = RecoveryEstimator::with_config(&store, config.recovery.clone());
            let cache = RepRangeCache::new(config.cache.clone());
            let schemes = config.set_scheme_planner()?;
            let profile = StaticProfile(config.profile.clone());
            let feedback = StaticFeedback::default();

            let mut planner = config.planner.clone();
            if let Some(policy) = policy {
                planner.low_recovery_policy = policy;
            }
            if seed.is_some() {
                planner.variety_seed = seed;
            }

            let request = PlanRequest {
                muscles,
                total_exercises: count,
                duration_minutes: duration.unwrap_or(planner.default_duration_minutes),
                goal,
                experience,
                format,
                phase: None,
                suggestion: (sets.is_some() || reps.is_some()).then_some(SchemeSuggestion { sets, reps }),
            };

            let assembler =
                WorkoutPlanAssembler::new(&catalog, &profile, &feedback, &recovery, &cache, &schemes).with_config(planner);
            let plan = assembler.assemble(&request, Utc::now());

            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print_plan(&plan);
            }
        }

        Commands::Recovery { muscles } => {
            let store = open_history(&config)?;
            let estimator = RecoveryEstimator::with_config(&store, config.recovery.clone());
            let muscles = if muscles.is_empty() {
                MuscleGroup::ALL.to_vec()
            } else {
                muscles
            };
            print_recovery(&estimator.snapshot(&muscles, Utc::now()));
        }

        Commands::Log { exercise, reps, weight } => {
            let catalog = load_catalog(&config)?;
            let Some(record) = catalog.lookup(&exercise) else {
                bail!("Unknown exercise id: {}", exercise);
            };

            let store = open_history(&config)?;
            let estimator = RecoveryEstimator::with_config(&store, config.recovery.clone());
            let now = Utc::now();
            let completed = CompletedExercise {
                exercise: record,
                sets: reps
                    .iter()
                    .map(|&reps| CompletedSet { reps, weight_kg: weight })
                    .collect(),
                completed_at: now,
            };

            let appended = estimator.record_workout(&[completed], config.profile.body_weight_kg, now)?;
            println!(
                "{}",
                format!("✓ Recorded {} stimulus record(s) for {}", appended, exercise).green()
            );
        }

        Commands::Budget { duration } => {
            let budget = SessionTimeBudget::for_profile(duration, &config.profile);
            let estimator = ExerciseTimeEstimator::new();
            let suggested = estimator.suggest_exercise_count(
                &budget,
                config.profile.goal,
                config.profile.experience,
                config.planner.training_format,
                config.planner.max_exercises,
            );

            println!("{}", format!("Time budget for {} minutes", duration).cyan().bold());
            for line in budget_lines(&budget, suggested) {
                println!("{}", line);
            }
        }

        Commands::Config { show, init } => {
            if init {
                let path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
                if path.exists() {
                    bail!("Config file already exists: {}", path.display());
                }
                AppConfig::default().save_to_file(&path)?;
                println!("{}", format!("✓ Wrote default config to {}", path.display()).green());
            }
            if show || !init {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Available work is the target; the max includes the permitted overrun
fn budget_lines(budget: &SessionTimeBudget, suggested: usize) -> Vec<String> {
    vec![
        format!("  Warmup:            {:>6.0}s", budget.warmup_seconds),
        format!("  Cooldown:          {:>6.0}s", budget.cooldown_seconds),
        format!("  Buffer:            {:>6.0}s", budget.buffer_seconds),
        format!("  Available work:    {:>6.0}s", budget.available_work_seconds),
        format!("  Max with overrun:  {:>6.0}s", budget.max_work_seconds),
        format!("  Suggested count:   {:>6}", suggested),
    ]
}

fn load_catalog(config: &AppConfig) -> Result<InMemoryCatalog> {
    let catalog = match &config.settings.catalog_path {
        Some(path) => InMemoryCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load exercise catalog: {}", path.display()))?,
        None => InMemoryCatalog::bundled()?,
    };
    Ok(catalog)
}

fn open_history(config: &AppConfig) -> Result<SqliteHistoryStore> {
    let path = config.history_db_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    SqliteHistoryStore::open(&path).with_context(|| format!("Failed to open history database: {}", path.display()))
}

fn print_plan(plan: &WorkoutPlan) {
    println!(
        "{}",
        format!(
            "{} workout ({}) · {} exercise(s) · ~{} min of {} requested",
            plan.goal,
            plan.experience,
            plan.exercises.len(),
            plan.actual_duration_minutes,
            plan.requested_duration_minutes
        )
        .green()
        .bold()
    );

    if !plan.exercises.is_empty() {
        let rows: Vec<PlanRow> = plan
            .exercises
            .iter()
            .enumerate()
            .map(|(i, p)| PlanRow {
                index: i + 1,
                name: p.exercise.name.clone(),
                muscle: p.muscle.to_string(),
                volume: if p.set_durations_seconds.is_empty() {
                    format!("{} x {} ({})", p.scheme.sets, p.scheme.target_reps, p.scheme.rep_range)
                } else {
                    format!("{} x {}s", p.scheme.sets, p.set_durations_seconds[0])
                },
                rest: format!("{}s", p.scheme.rest_seconds),
                load: match (p.scheme.load_percentage, p.scheme.target_rpe) {
                    (Some(load), _) => format!("{:.0}% 1RM", load),
                    (None, Some(rpe)) => format!("RPE {:.1}", rpe),
                    (None, None) => "-".to_string(),
                },
                time: format!("{:.1} min", p.time.total_seconds / 60.0),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    for note in &plan.notes {
        println!("  {} {}", "•".yellow(), note);
    }
}

fn print_recovery(data: &[MuscleRecoveryData]) {
    let rows: Vec<RecoveryRow> = data
        .iter()
        .map(|d| {
            let status = d.readiness();
            let label = match status {
                ReadinessStatus::Ready => status.to_string().green(),
                ReadinessStatus::PartiallyReady => status.to_string().yellow(),
                ReadinessStatus::Fatigued => status.to_string().red(),
            };
            RecoveryRow {
                muscle: d.muscle.to_string(),
                recovery: format!("{:.0}%", d.recovery_percentage),
                status: label.to_string(),
                last_worked: d
                    .last_worked_date
                    .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string()),
                full_recovery: d
                    .estimated_full_recovery_date
                    .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_lines_label_overrun_envelope() {
        let budget = SessionTimeBudget::new(60, true, true);
        let lines = budget_lines(&budget, 5);

        let max_line = lines.iter().find(|l| l.contains("Max with overrun")).unwrap();
        assert!(max_line.ends_with(&format!("{:.0}s", budget.max_work_seconds)));
        assert!(lines.iter().all(|l| !l.contains("ceiling")));
        assert!(budget.max_work_seconds > budget.available_work_seconds);
    }
}
