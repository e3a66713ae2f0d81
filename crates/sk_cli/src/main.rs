//! `sk` CLI
//!
//! Drives the progression engine over a JSON store file.

#[cfg(feature = "cli")]
use anyhow::{bail, Context, Result};
#[cfg(feature = "cli")]
use chrono::{NaiveDate, Utc};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use sk_cli::{load_config, new_snapshot, parse_entry, save_snapshot, starter_obstacles, Workspace};
#[cfg(feature = "cli")]
use sk_core::{AttemptData, NewComboTrick, NewTrick, SessionLog, Stance};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "sk")]
#[command(about = "Skate trick progression and challenge engine", version, long_about = None)]
struct Cli {
    /// Store file (JSON snapshot)
    #[arg(long, global = true, default_value = "sk_store.json")]
    store: PathBuf,

    /// Engine config JSON (defaults to $SK_ENGINE_CONFIG_PATH)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Create a fresh store with the starter obstacle catalog
    Init {
        /// Users to register
        #[arg(long = "user", required = true)]
        users: Vec<String>,

        /// Obstacle catalog JSON file instead of the starter set
        #[arg(long)]
        obstacles: Option<PathBuf>,

        /// Overwrite an existing store
        #[arg(long)]
        force: bool,
    },

    /// Add a trick and its initial assessment
    AddTrick {
        #[arg(long)]
        user: String,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "regular", value_parser = parse_stance)]
        stance: Stance,

        /// Obstacle types the trick is done on
        #[arg(long = "type", value_delimiter = ',')]
        obstacle_types: Vec<String>,

        /// Obstacle the trick was already landed on
        #[arg(long)]
        landed_on: Option<String>,
    },

    /// Fill the challenge board
    Generate {
        #[arg(long)]
        user: String,

        #[arg(long)]
        seed: u64,

        /// Day to generate for (YYYY-MM-DD, defaults to today UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Complete a pending challenge
    Complete {
        #[arg(long)]
        user: String,

        #[arg(long)]
        challenge: String,

        #[arg(long, requires = "attempts")]
        lands: Option<u32>,

        #[arg(long, requires = "lands")]
        attempts: Option<u32>,

        /// Name of the combo trick created by a combo challenge
        #[arg(long, conflicts_with = "lands")]
        combo_name: Option<String>,

        #[arg(long, default_value = "regular", value_parser = parse_stance)]
        stance: Stance,

        /// Component trick ids, comma separated
        #[arg(long, value_delimiter = ',', requires = "combo_name")]
        components: Vec<String>,
    },

    /// Log a practice session (obstacle:attempts:landed per entry)
    Log {
        #[arg(long)]
        user: String,

        #[arg(long)]
        trick: String,

        #[arg(long = "entry", required = true)]
        entries: Vec<String>,
    },

    /// Grant XP directly
    GrantXp {
        #[arg(long)]
        user: String,

        #[arg(long)]
        xp: u32,

        /// Show the outcome without writing the store
        #[arg(long)]
        preview: bool,
    },

    /// Show progression, board and tricks
    Status {
        #[arg(long)]
        user: String,
    },
}

#[cfg(feature = "cli")]
fn parse_stance(raw: &str) -> Result<Stance, String> {
    Stance::parse(raw).ok_or_else(|| format!("unknown stance '{}' (regular, switch, nollie, fakie)", raw))
}

#[cfg(feature = "cli")]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { users, obstacles, force } => init_store(&cli.store, &users, obstacles, force),
        command => {
            let config = load_config(cli.config.as_deref())?;
            let mut ws = Workspace::open(&cli.store, config)?;
            if run(command, &mut ws)? {
                let meta = ws.commit()?;
                tracing::info!(store = %cli.store.display(), checksum = %meta.checksum, "store updated");
            }
            Ok(())
        }
    }
}

#[cfg(feature = "cli")]
fn init_store(store: &Path, users: &[String], obstacles: Option<PathBuf>, force: bool) -> Result<()> {
    if store.exists() && !force {
        bail!("Store {} already exists (use --force to overwrite)", store.display());
    }
    let catalog = match obstacles {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read obstacle catalog: {}", path.display()))?;
            serde_json::from_str(&json).context("Failed to parse obstacle catalog")?
        }
        None => starter_obstacles(),
    };
    let meta = save_snapshot(store, &new_snapshot(users, catalog))?;
    println!("Store created: {}", store.display());
    println!("   Users:    {}", users.join(", "));
    println!("   Checksum: {}", meta.checksum);
    Ok(())
}

/// Runs one store command. Returns whether the store changed.
#[cfg(feature = "cli")]
fn run(command: Commands, ws: &mut Workspace) -> Result<bool> {
    match command {
        Commands::Init { .. } => bail!("init does not operate on an existing store"),

        Commands::AddTrick { user, name, stance, obstacle_types, landed_on } => {
            let created = ws.service.create_trick(
                NewTrick { user_id: user, name, stance, obstacle_types, landed_obstacle_id: landed_on },
                Utc::now(),
            )?;
            print_json(&created)?;
        }

        Commands::Generate { user, seed, date } => {
            let today = date.unwrap_or_else(|| Utc::now().date_naive());
            let report = ws.service.generate_for_user(&user, today, seed)?;
            print_json(&report)?;
        }

        Commands::Complete { user, challenge, lands, attempts, combo_name, stance, components } => {
            let attempt = match (lands, attempts, combo_name) {
                (Some(lands_completed), Some(attempts), _) => AttemptData::Lands { lands_completed, attempts },
                (_, _, Some(name)) => {
                    AttemptData::ComboTrick(NewComboTrick { name, stance, component_trick_ids: components })
                }
                _ => AttemptData::None,
            };
            let result = ws.service.complete(&user, &challenge, attempt)?;
            print_json(&result)?;
        }

        Commands::Log { user, trick, entries } => {
            let entries = entries.iter().map(|e| parse_entry(e)).collect::<Result<Vec<_>>>()?;
            let result = ws.service.log_session(SessionLog { user_id: user, trick_id: trick, entries }, Utc::now())?;
            print_json(&result)?;
        }

        Commands::GrantXp { user, xp, preview: true } => {
            print_json(&ws.service.project_xp(&user, xp)?)?;
            return Ok(false);
        }

        Commands::GrantXp { user, xp, preview: false } => {
            print_json(&ws.service.grant_xp(&user, xp)?)?;
        }

        Commands::Status { user } => {
            print_json(&ws.status(&user)?)?;
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("sk CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
