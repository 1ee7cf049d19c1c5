//! ambiance: channel routing tool operating on a saved session

mod config;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ambiance_core::{
    migrate_legacy_record, ChannelMode, ContainerChannelProfile, ContainerId, ItemAnalysis,
    ProfileCommand, Project,
};
use ambiance_services::{ensure_ancestor_capacity, HostPort, MemoryHost, RoutingSession};
use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{config_path, load_config, save_config, AppConfig};

const DEFAULT_SESSION: &str = "ambiance-session.json";

/// Multichannel routing for ambiance containers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session file holding the host tracks and the project
    #[arg(long, short, env = "AMBIANCE_SESSION", global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Preview the track structure of a container
    Plan {
        container: String,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Regenerate containers flagged for regeneration, or the named one
    Apply {
        container: Option<String>,
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Add a container to a group, creating the group if needed
    Add { group: String, container: String },
    /// Set a container's output format (0 stereo, 1 quad, 2 5.0, 3 7.0)
    Mode { container: String, mode: u8 },
    /// List physical channel collisions between containers
    Conflicts,
    /// Suggest routings that resolve conflicts
    Fix {
        /// Store the suggestions as custom routings
        #[arg(long)]
        apply: bool,
    },
    /// Shrink container, folder and master channel counts
    Optimize,
    /// Raise every parent of a track to a channel count
    Ensure { track: String, channels: u32 },
    /// Per-channel track volume
    Volume {
        #[command(subcommand)]
        action: VolumeAction,
    },
    /// Convert a legacy preset record to the current format
    Migrate {
        record: PathBuf,
        /// Overwrite the record file
        #[arg(long)]
        write: bool,
    },
    /// Show the configuration file
    Config {
        /// Write a default configuration if none exists
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand, Debug)]
enum VolumeAction {
    Get { container: String, channel: u32 },
    Set {
        container: String,
        channel: u32,
        #[arg(allow_hyphen_values = true)]
        db: f64,
    },
}

/// Overrides for the stored item analysis
#[derive(clap::Args, Debug, Default)]
struct AnalysisArgs {
    /// Channel count of the widest source item
    #[arg(long)]
    item_channels: Option<u32>,
    /// Number of source items
    #[arg(long)]
    items: Option<usize>,
}

impl AnalysisArgs {
    fn resolve(&self, stored: Option<&ItemAnalysis>) -> ItemAnalysis {
        let base = stored.copied().unwrap_or_default();
        ItemAnalysis::new(
            self.item_channels.unwrap_or(base.max_item_channels),
            self.items.unwrap_or(base.item_count),
        )
    }
}

/// Everything persisted between invocations
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionFile {
    #[serde(default)]
    host: MemoryHost,
    #[serde(default)]
    project: Project,
    /// Item analysis per container name, as reported by generation
    #[serde(default)]
    analyses: BTreeMap<String, ItemAnalysis>,
}

impl SessionFile {
    fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Session file not found, starting empty");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    fn save(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("ambiance=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn container_id(project: &Project, name: &str) -> anyhow::Result<ContainerId> {
    project
        .find_container_by_name(name)
        .map(|c| c.id)
        .ok_or_else(|| anyhow!("no container named {name:?}"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, config_error) = match load_config() {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    };
    init_logging(&config);
    if let Some(err) = config_error {
        warn!(path = %config_path().display(), error = %err, "Malformed config, using defaults");
    }

    let session_path = args
        .session
        .clone()
        .or_else(|| config.session.default_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION));

    match args.command {
        Command::Migrate { record, write } => migrate(&record, write),
        Command::Config { init } => show_config(&config, init),
        command => run_session(&session_path, &config, command),
    }
}

fn run_session(path: &Path, config: &AppConfig, command: Command) -> anyhow::Result<()> {
    let file = SessionFile::load(path)?;
    let analyses = file.analyses;
    let mut session = RoutingSession::new(file.host, file.project);

    if run(&mut session, &analyses, config, command)? {
        let (host, project) = session.into_parts();
        SessionFile { host, project, analyses }.save(path)?;
        info!(path = %path.display(), "Session saved");
    }
    Ok(())
}

/// Execute a session command. Returns whether the session changed.
fn run(
    session: &mut RoutingSession<MemoryHost>,
    analyses: &BTreeMap<String, ItemAnalysis>,
    config: &AppConfig,
    command: Command,
) -> anyhow::Result<bool> {
    match command {
        Command::Plan { container, analysis } => {
            let id = container_id(session.project(), &container)?;
            let plan = session.plan(id, &analysis.resolve(analyses.get(&container)))?;
            println!("{container}:");
            for line in plan.describe() {
                println!("  {line}");
            }
            Ok(false)
        }
        Command::Apply { container, analysis } => {
            if config.routing.detect_conflicts_before_apply {
                for conflict in session.detect_conflicts() {
                    println!("conflict: {}", conflict.describe());
                }
            }

            let targets = match container {
                Some(name) => vec![container_id(session.project(), &name)?],
                None => session.project().containers_needing_regeneration(),
            };
            if targets.is_empty() {
                println!("Nothing to regenerate");
                return Ok(false);
            }

            for id in targets {
                let name = session
                    .project()
                    .container(id)
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                let outcome = session.regenerate(id, &analysis.resolve(analyses.get(&name)))?;
                println!(
                    "{name}: {} ({} channel tracks, {} parents raised)",
                    outcome.plan.strategy,
                    outcome.channel_tracks.len(),
                    outcome.raised
                );
                if let Some(warning) = &outcome.plan.warning {
                    println!("  warning: {warning}");
                }
            }

            if config.routing.optimize_after_apply {
                let report = session.optimize()?;
                println!("Optimized {} tracks", report.changes.len());
            }
            Ok(true)
        }
        Command::Add { group, container } => {
            if session.project().find_container_by_name(&container).is_some() {
                bail!("container {container:?} already exists");
            }
            let project = session.project_mut();
            let index = match project.groups.iter().position(|g| g.name == group) {
                Some(index) => index,
                None => project.add_group(group.as_str()),
            };
            let id = project
                .add_container(index, container.as_str())
                .ok_or_else(|| anyhow!("group {group:?} is missing"))?;
            println!("{group}/{container}: container {}", id.0);
            Ok(true)
        }
        Command::Mode { container, mode } => {
            let id = container_id(session.project(), &container)?;
            let mode = ChannelMode::try_from(mode)?;
            let change = session.apply_command(id, ProfileCommand::SetChannelMode(mode))?;
            println!("{container}: {} ({change:?})", mode.name());
            Ok(change.needs_regeneration())
        }
        Command::Conflicts => {
            let conflicts = session.detect_conflicts();
            if conflicts.is_empty() {
                println!("No routing conflicts");
            }
            for conflict in conflicts {
                println!("{}", conflict.describe());
            }
            Ok(false)
        }
        Command::Fix { apply } => {
            let suggestions = session.suggest_fixes();
            if suggestions.is_empty() {
                println!("No fixes to suggest");
                return Ok(false);
            }
            for suggestion in &suggestions {
                println!("{}", suggestion.describe());
            }
            if !apply {
                return Ok(false);
            }
            for suggestion in &suggestions {
                session.apply_fix(suggestion)?;
            }
            let report = session.end_tick();
            println!("Applied {} fixes, {} routing updates failed", suggestions.len(), report.failed);
            Ok(true)
        }
        Command::Optimize => {
            let report = session.optimize()?;
            if report.is_empty() {
                println!("Channel counts already minimal");
                return Ok(false);
            }
            for change in &report.changes {
                println!("{}: {} -> {}", change.name, change.from, change.to);
            }
            Ok(true)
        }
        Command::Ensure { track, channels } => {
            let guid = session
                .host()
                .find_by_name(&track)
                .ok_or_else(|| anyhow!("no track named {track:?}"))?;
            let raised = ensure_ancestor_capacity(session.host_mut(), &guid, channels)?;
            println!("Raised {raised} tracks");
            Ok(raised > 0)
        }
        Command::Volume { action } => match action {
            VolumeAction::Get { container, channel } => {
                let id = container_id(session.project(), &container)?;
                match session.channel_volume(id, channel) {
                    Some(db) => println!("{container} channel {channel}: {db:.2} dB"),
                    None => println!("{container} channel {channel}: no channel track"),
                }
                Ok(false)
            }
            VolumeAction::Set { container, channel, db } => {
                let id = container_id(session.project(), &container)?;
                session.apply_command(id, ProfileCommand::SetChannelVolume { track: channel, db })?;
                let report = session.end_tick();
                if report.failed > 0 {
                    bail!("volume stored but not written to the host");
                }
                Ok(true)
            }
        },
        Command::Migrate { .. } | Command::Config { .. } => Ok(false),
    }
}

fn migrate(path: &Path, write: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut record: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;

    let migrated = migrate_legacy_record(&mut record)?;
    let profile = ContainerChannelProfile::from_record(&mut record)?;
    profile.write_record(&mut record)?;

    let output = serde_json::to_string_pretty(&record)?;
    if write && migrated {
        std::fs::write(path, &output).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Record migrated");
    } else {
        println!("{output}");
    }
    if !migrated {
        println!("Record already uses the current format");
    }
    Ok(())
}

fn show_config(config: &AppConfig, init: bool) -> anyhow::Result<()> {
    let path = config_path();
    if init && !path.exists() {
        save_config(config)?;
        println!("Wrote {}", path.display());
    }
    println!("{}", path.display());
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
