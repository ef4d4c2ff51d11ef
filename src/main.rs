//! Binary entrypoint for the chunkgate CLI.
//!
//! Commands:
//! - `init` - write a starter `chunkgate.toml` and create the data directory
//! - `status` - print territory and credit totals
//! - `areas` - list playable areas with size and centroid
//! - `credits <agent>` / `grant <agent> <n>` / `set-credits <agent> <n>` - inspect or adjust credits
//! - `unlock <agent> <x> <z>` / `force-unlock <agent> <x> <z>` - unlock a cell by cell coordinates
//! - `replay <script.jsonl>` - drive the engine from a JSON-lines event script
//!
//! See the library crate docs for module-level details: `chunkgate::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use chunkgate::config::Config;
use chunkgate::metrics;
use chunkgate::replay;
use chunkgate::territory::{CellAddress, RecordingHost, TerritoryEngine, UnlockOutcome};

#[derive(Parser)]
#[command(name = "chunkgate")]
#[command(about = "Credit-gated chunk territory engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "chunkgate.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show territory status and counters
    Status,
    /// List playable areas
    Areas,
    /// Show an agent's credits
    Credits { agent: Uuid },
    /// Add credits to an agent
    Grant { agent: Uuid, amount: u32 },
    /// Overwrite an agent's credit balance
    SetCredits { agent: Uuid, amount: u32 },
    /// Spend one credit to unlock a cell (cell coordinates)
    #[command(allow_negative_numbers = true)]
    Unlock { agent: Uuid, x: i32, z: i32 },
    /// Unlock a cell without spending credits (cell coordinates)
    #[command(allow_negative_numbers = true)]
    ForceUnlock { agent: Uuid, x: i32, z: i32 },
    /// Replay a JSON-lines script of host events
    Replay {
        script: String,
        /// Do not persist anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new chunkgate configuration");
            Config::create_default(&cli.config).await?;
            let cfg = Config::default();
            tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
            info!("Configuration file created at {}", cli.config);
            println!("Wrote {} (data directory {})", cli.config, cfg.storage.data_dir);
        }
        Commands::Status => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let areas = engine.areas();
            let manager = engine.manager();
            let m = metrics::snapshot();
            println!("Unlocked cells:  {}", manager.unlocked_count());
            println!("Playable areas:  {}", areas.len());
            println!("Frontier cells:  {}", manager.frontier().len());
            println!("Known agents:    {}", manager.ledger().agents().len());
            println!(
                "Credits held:    {}",
                manager
                    .ledger()
                    .agents()
                    .values()
                    .map(|p| p.available_credits as u64)
                    .sum::<u64>()
            );
            println!("Reward mode:     {:?}", engine.config().rewards.mode);
            println!("Area recomputes: {}", m.area_recomputes);
        }
        Commands::Areas => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let areas = engine.areas();
            if areas.is_empty() {
                println!("No cells unlocked yet.");
            }
            for area in areas {
                println!(
                    "#{:<4} {:>6} cell(s)  centroid {}",
                    area.id(),
                    area.len(),
                    area.centroid()
                );
            }
        }
        Commands::Credits { agent } => {
            let engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let ledger = engine.manager().ledger();
            println!(
                "{}: {} credit(s) available, {} achievement(s) rewarded",
                agent,
                ledger.available_credits(&agent),
                ledger.total_completed(&agent)
            );
        }
        Commands::Grant { agent, amount } => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let balance = engine.grant_credits(&agent, amount)?;
            engine.shutdown()?;
            println!("{} now has {} credit(s)", agent, balance);
        }
        Commands::SetCredits { agent, amount } => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            engine.set_credits(&agent, amount)?;
            engine.shutdown()?;
            println!("{} now has {} credit(s)", agent, amount);
        }
        Commands::Unlock { agent, x, z } => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let mut host = RecordingHost::new();
            let cell = CellAddress::new(x, z);
            let outcome = engine.unlock(&mut host, &agent, cell)?;
            engine.shutdown()?;
            match outcome {
                UnlockOutcome::Unlocked { remaining } => {
                    println!("Unlocked {} ({} credit(s) left)", cell, remaining)
                }
                UnlockOutcome::AlreadyUnlocked => println!("{} is already unlocked", cell),
                UnlockOutcome::NotAdjacent => {
                    println!("{} does not touch the unlocked territory", cell)
                }
                UnlockOutcome::NoCredits => println!("{} has no credits to spend", agent),
            }
        }
        Commands::ForceUnlock { agent, x, z } => {
            let mut engine = TerritoryEngine::open(require_config(pre_config, &cli.config).await?)?;
            let mut host = RecordingHost::new();
            let cell = CellAddress::new(x, z);
            let added = engine.force_unlock(&mut host, Some(agent), cell)?;
            engine.shutdown()?;
            if added {
                println!("Force-unlocked {}", cell);
            } else {
                println!("{} is already unlocked", cell);
            }
        }
        Commands::Replay { script, dry_run } => {
            let config = require_config(pre_config, &cli.config).await?;
            let engine = if dry_run {
                TerritoryEngine::in_memory(config)?
            } else {
                TerritoryEngine::open(config)?
            };
            let summary = replay::run_script(engine, &script).await?;
            println!("{}", summary);
        }
    }

    Ok(())
}

async fn require_config(loaded: Option<Config>, path: &str) -> Result<Config> {
    match loaded {
        Some(cfg) => Ok(cfg),
        None => Config::load(path).await,
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    // CLI verbosity overrides config
    let level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.clone())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Only echo to the console when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
