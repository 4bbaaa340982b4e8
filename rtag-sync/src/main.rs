//! rtag-sync - record tag synchronizer
//!
//! Slices the record fragments listed in a manifest down to each tag's time
//! window, keeps per-tag contracts in the local workspace, and plays synced
//! tags back through the record tool.
//!
//! ```bash
//! rtag-sync --config rtag.toml sync --manifest manifest.list --select "0 3"
//! rtag-sync library
//! rtag-sync play --tag 2 --partition soc1 --range 5-20
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rtag_common::config::{self, ConfigOverrides, RunConfig};
use rtag_common::events::{EventBus, SyncEvent};
use rtag_sync::backend;
use rtag_sync::services::{
    parse_range, parse_selection, ChannelCatalog, LibraryCache, ManifestStore, Player,
    PresetPrompter, RecordInspector, SyncPipeline,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Record tag synchronizer
#[derive(Parser, Debug)]
#[command(name = "rtag-sync", version, about)]
struct Cli {
    /// Config file (overrides RTAG_CONFIG and the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local destination root
    #[arg(long, global = true, value_name = "DIR")]
    dest_root: Option<PathBuf>,

    /// Vehicle name
    #[arg(long, global = true)]
    vehicle: Option<String>,

    /// Target date (YYYYMMDD)
    #[arg(long, global = true, value_name = "YYYYMMDD")]
    date: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Slice the fragments of manifest tasks into the workspace
    Sync {
        /// Manifest produced by the discovery step
        #[arg(long, value_name = "FILE")]
        manifest: PathBuf,

        /// Task selection: "1,3", "2-6", "0" (all), "0 5 7-15" (all except)
        #[arg(long, default_value = "0")]
        select: String,

        /// Channel to drop while slicing (repeatable; defaults to the configured blacklist)
        #[arg(long = "blacklist", value_name = "CHANNEL")]
        blacklist: Vec<String>,

        /// Check blacklisted channels against the fragments' channel lists first
        #[arg(long)]
        verify_channels: bool,

        /// Seconds before the tag time
        #[arg(long, allow_hyphen_values = true)]
        before: Option<i64>,

        /// Seconds after the tag time
        #[arg(long, allow_hyphen_values = true)]
        after: Option<i64>,
    },

    /// Print the catalog of synced tags
    Library {
        /// Ignore the cached index
        #[arg(long)]
        refresh: bool,

        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Play a synced tag
    Play {
        /// Tag number as listed by `library`
        #[arg(long)]
        tag: usize,

        /// Partition to play, or "all"
        #[arg(long, default_value = "all")]
        partition: String,

        /// Seconds into the window: "5", "10-20"; empty plays everything
        #[arg(long, default_value = "")]
        range: String,

        /// Channel to leave out of playback (repeatable)
        #[arg(long = "exclude", value_name = "CHANNEL")]
        exclude: Vec<String>,
    },

    /// Play loose record files back to back
    PlayFiles {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long, default_value = "")]
        range: String,

        #[arg(long = "exclude", value_name = "CHANNEL")]
        exclude: Vec<String>,
    },

    /// Print the parsed `info` summary of a record file
    Info { file: PathBuf },

    /// Write the effective configuration (defaults plus overrides) to FILE
    InitConfig { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        "rtag-sync {} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let mut raw = config::load_toml_config(config_path.as_deref())?;

    if let Command::InitConfig { file } = &cli.command {
        if let Some(dest_root) = &cli.dest_root {
            raw.host.dest_root = dest_root.clone();
        }
        if let Some(vehicle) = &cli.vehicle {
            raw.logic.vehicle = vehicle.clone();
        }
        raw.logic.target_date = cli.date.clone().or(raw.logic.target_date);
        config::write_toml_config(&raw, file)?;
        println!("Configuration written to {}", file.display());
        return Ok(());
    }

    let mut overrides = ConfigOverrides {
        dest_root: cli.dest_root.clone(),
        vehicle: cli.vehicle.clone(),
        target_date: cli.date.clone(),
        ..Default::default()
    };
    if let Command::Sync { before, after, .. } = &cli.command {
        overrides.before = *before;
        overrides.after = *after;
    }
    let run = Arc::new(RunConfig::from_toml(&raw, &overrides)?);
    info!(work_dir = %run.work_dir().display(), backend = ?run.backend.kind, "Configuration resolved");

    let exec = backend::from_config(&run.backend);

    match cli.command {
        Command::Sync {
            manifest,
            select,
            blacklist,
            verify_channels,
            ..
        } => {
            let tasks = ManifestStore::parse(&manifest)?;
            for task in &tasks {
                info!(id = %task.id, time = %task.time, name = %task.name, fragments = task.paths.len(), "Task");
            }
            let chosen = parse_selection(&select, tasks.len())?;
            let selected: Vec<_> = chosen.iter().map(|n| tasks[n - 1].clone()).collect();

            let mut blacklist = if blacklist.is_empty() {
                run.blacklist.clone()
            } else {
                blacklist
            };
            if verify_channels && !blacklist.is_empty() {
                let inspector = RecordInspector::new(exec.clone(), run.backend.tool.clone());
                let fragments: Vec<PathBuf> = selected
                    .iter()
                    .flat_map(|t| t.paths.iter().map(PathBuf::from))
                    .collect();
                let prompter = PresetPrompter::new(blacklist, true);
                blacklist = ChannelCatalog::new(&inspector)
                    .choose_excluded(&prompter, &fragments)
                    .await?;
            }

            let events = EventBus::new(256);
            let reporter = spawn_event_logger(&events);

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current fragment");
                    ctrl_c.cancel();
                }
            });

            let pipeline = SyncPipeline::new(run.clone(), exec)
                .with_events(events)
                .with_cancellation(cancel);
            let report = pipeline.sync(&selected, &blacklist).await;
            drop(pipeline);
            let _ = reporter.await;
            let report = match report {
                Ok(report) => report,
                Err(e) => {
                    if e.is_run_fatal() {
                        error!("Run rejected before any fragment was written");
                    }
                    return Err(e.into());
                }
            };

            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.cancelled {
                bail!("sync cancelled");
            }
            if !report.failed_tasks.is_empty() {
                bail!("{} task(s) failed", report.failed_tasks.len());
            }
        }

        Command::Library { refresh, json } => {
            let cache = LibraryCache::from_config(&run);
            if refresh {
                let _ = std::fs::remove_file(cache.cache_path());
            }
            let library = cache.get_library()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&library)?);
            } else if library.is_empty() {
                println!("No synced tags under {}", run.work_dir().display());
            } else {
                for (i, entry) in library.iter().enumerate() {
                    println!("{:02}  {}  {}", i + 1, entry.time, entry.tag);
                    for (partition, fragments) in &entry.partitions {
                        println!("      {}: {} fragment(s)", partition, fragments.len());
                    }
                }
            }
        }

        Command::Play {
            tag,
            partition,
            range,
            exclude,
        } => {
            let library = LibraryCache::from_config(&run).get_library()?;
            let entry = tag
                .checked_sub(1)
                .and_then(|i| library.get(i))
                .with_context(|| format!("No tag number {} ({} in library)", tag, library.len()))?;
            let partition = (partition != "all").then_some(partition);
            let (start, end) = parse_range(&range);

            let player = Player::new(exec, run.backend.tool.clone());
            let plan = player.plan_entry(entry, partition.as_deref(), start, end, &exclude)?;
            println!("{}", plan.command);
            player.play(&plan).await?;
        }

        Command::PlayFiles {
            files,
            range,
            exclude,
        } => {
            let inspector = RecordInspector::new(exec.clone(), run.backend.tool.clone());
            let (start, end) = parse_range(&range);
            let player = Player::new(exec, run.backend.tool.clone());
            let plan = player
                .plan_files(&inspector, &files, start, end, &exclude)
                .await?;
            println!("{}", plan.command);
            player.play(&plan).await?;
        }

        Command::Info { file } => {
            let inspector = RecordInspector::new(exec, run.backend.tool.clone());
            let info = inspector.info(&file).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        // Written before the run configuration is built
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

/// Log pipeline events until the bus closes or the run completes
fn spawn_event_logger(events: &EventBus) -> tokio::task::JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        let mut last_decile = 0;
        loop {
            match rx.recv().await {
                Ok(SyncEvent::Progress { fraction, .. }) => {
                    let decile = (fraction * 10.0).floor() as u32;
                    if decile > last_decile {
                        last_decile = decile;
                        info!("Progress {:.0}%", fraction * 100.0);
                    }
                }
                Ok(SyncEvent::TaskFailed { task_id, error: message }) => {
                    error!(task = %task_id, "Task failed: {}", message);
                }
                Ok(SyncEvent::RunCompleted { .. }) => break,
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
