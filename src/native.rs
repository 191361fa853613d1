//! Native terminal host.
//!
//! Reads one command per line from stdin, drives the [`Labeler`] and carries
//! out its effects: remote calls run synchronously through the configured
//! gateway, state is written to files under the platform data directory.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use clap::Parser;
use web_time::Instant;

use crate::app::{Labeler, Phase};
use crate::config::{AppConfig, ConfigError, LogLevel};
use crate::gateway::{self, GatewayError, MemoryGateway, RemoteGateway, SupabaseGateway};
use crate::message::{Effect, Message};
use crate::model::{DamageKind, Severity, VehicleType};
use crate::storage::{FileStorage, StateStore, StorageError};
use crate::taxonomy::{Taxonomy, TaxonomyError};

/// Interval at which timers are polled while waiting for input.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(
    name = "damage-labeler",
    version,
    about = "Label vehicle damage on photos claimed from a shared pool"
)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend project URL
    #[arg(long, env = "DAMAGE_LABELER_URL")]
    pub backend_url: Option<String>,

    /// Backend anonymous API key
    #[arg(long, env = "DAMAGE_LABELER_ANON_KEY", hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Work against an in-memory pool loaded from a JSON list of {id, url}
    #[arg(long, value_name = "IMAGES_JSON")]
    pub offline: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Directory for persisted labeler state
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Write the effective configuration to the default path and exit
    #[arg(long)]
    pub save_config: bool,
}

/// Errors that stop the native host.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No backend configured; pass --backend-url and --anon-key or use --offline")]
    MissingBackend,
}

/// Load the config file and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };
    if let Some(url) = &cli.backend_url {
        config.backend.url = url.clone();
    }
    if let Some(key) = &cli.anon_key {
        config.backend.anon_key = key.clone();
    }
    if let Some(level) = cli.log_level {
        config.preferences.log_level = level;
    }
    Ok(config)
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward to the labeler
    Send(Message),
    /// Print the current state
    Show,
    /// Print the command list
    Help,
    /// Leave the program
    Quit,
}

/// Parse one input line. Blank lines count as activity.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let send = |message| Ok(Command::Send(message));
    match words.as_slice() {
        [] => send(Message::UserActivity),
        ["v" | "vehicle", vehicle] => vehicle
            .parse::<VehicleType>()
            .map(|v| Command::Send(Message::SelectVehicle(v)))
            .map_err(|e| e.to_string()),
        ["s" | "section", section] => send(Message::SelectSection(section.to_string())),
        ["p" | "part", part] => send(Message::TogglePart(part.to_string())),
        ["d" | "damage", part, damage, rest @ ..] if rest.len() <= 1 => {
            let damage = damage.parse::<DamageKind>().map_err(|e| e.to_string())?;
            let severity = rest
                .first()
                .map(|s| s.parse::<Severity>())
                .transpose()
                .map_err(|e| e.to_string())?;
            send(Message::ToggleDamage {
                part: part.to_string(),
                damage,
                severity,
            })
        }
        ["n" | "none"] => send(Message::ToggleNoDamage),
        ["submit"] => send(Message::Submit),
        ["skip"] => send(Message::Skip),
        ["prev" | "previous"] => send(Message::Previous),
        ["next"] => send(Message::Next),
        ["refresh"] => send(Message::Refresh),
        ["show"] => Ok(Command::Show),
        ["help" | "?"] => Ok(Command::Help),
        ["q" | "quit" | "exit"] => Ok(Command::Quit),
        _ => Err(format!("unrecognized command '{}'", line.trim())),
    }
}

const HELP: &str = "\
commands:
  v <bike|scooter>            choose vehicle type (clears the annotation)
  s <section>                 open a body section
  p <part>                    expand or collapse a part
  d <part> <damage> [sev]     toggle a damage; sev is minor|major for scratch and dent
  n                           toggle 'no damage'
  submit | skip | prev | next | refresh
  show | help | quit";

/// Run the terminal host until stdin closes or the user quits.
pub fn run(cli: &Cli, config: AppConfig) -> Result<(), HostError> {
    if cli.save_config {
        config.save_to_default_path()?;
        return Ok(());
    }

    let taxonomy = match &config.taxonomy_path {
        Some(path) => Taxonomy::load(std::path::Path::new(path))?,
        None => Taxonomy::builtin(),
    };
    for (vehicle, part) in taxonomy.parts_without_damages() {
        log::debug!("Part '{}' on {} has no damage kinds", part, vehicle);
    }

    let gateway: Box<dyn RemoteGateway> = match &cli.offline {
        Some(path) => {
            let gateway = MemoryGateway::from_json(&std::fs::read_to_string(path)?)?;
            log::info!("Offline mode with {} images", gateway.pool_len());
            Box::new(gateway)
        }
        None if config.backend.is_configured() => Box::new(SupabaseGateway::new(&config.backend)),
        None => return Err(HostError::MissingBackend),
    };

    let state_dir = cli
        .state_dir
        .clone()
        .or_else(FileStorage::default_dir)
        .unwrap_or_else(|| PathBuf::from(".damage-labeler"));
    log::debug!("State directory: {:?}", state_dir);
    let store = StateStore::new(FileStorage::new(state_dir));

    let restored = store.load().unwrap_or_else(|e| {
        log::warn!("Ignoring stored state: {}", e);
        None
    });

    let mut labeler = Labeler::new(taxonomy, config);
    let effects = labeler.start(restored, Instant::now());
    let mut host = Host {
        labeler,
        gateway,
        store,
    };
    host.apply(effects);
    host.render();
    println!("{HELP}");

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        match rx.recv_timeout(TICK_INTERVAL) {
            Ok(line) => match parse_command(&line) {
                Ok(Command::Send(message)) => {
                    host.dispatch(message);
                    host.render();
                }
                Ok(Command::Show) => host.render(),
                Ok(Command::Help) => println!("{HELP}"),
                Ok(Command::Quit) => break,
                Err(e) => println!("? {e}"),
            },
            Err(RecvTimeoutError::Timeout) => {
                let before = host.labeler.phase();
                host.dispatch(Message::Tick);
                if host.labeler.phase() != before {
                    host.render();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    log::info!("Exiting");
    Ok(())
}

struct Host {
    labeler: Labeler,
    gateway: Box<dyn RemoteGateway>,
    store: StateStore<FileStorage>,
}

impl Host {
    fn dispatch(&mut self, message: Message) {
        let effects = self.labeler.update(message, Instant::now());
        self.apply(effects);
    }

    /// Carry out effects. Completions are queued and fed back after the
    /// current batch, never from inside an update.
    fn apply(&mut self, effects: Vec<Effect>) {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            match effect {
                Effect::Call(call) => {
                    let completion = gateway::execute(self.gateway.as_mut(), call);
                    pending.extend(self.labeler.update(completion, Instant::now()));
                }
                Effect::Alert(text) => println!("!! {text}"),
                Effect::Persist => {
                    if let Err(e) = self.store.save(&self.labeler.snapshot(Instant::now())) {
                        log::warn!("Failed to persist state: {}", e);
                    }
                }
                Effect::DiscardStorage => {
                    if let Err(e) = self.store.discard() {
                        log::warn!("Failed to discard state: {}", e);
                    }
                }
            }
        }
    }

    fn render(&self) {
        let labeler = &self.labeler;
        match labeler.phase() {
            Phase::Loading => println!("-- loading images..."),
            Phase::Waiting => println!("-- no image available; 'refresh' to retry"),
            Phase::AllDone => println!("-- all done: no unlabeled images left"),
            Phase::Expired => println!("-- session expired; enter any command to start over"),
            Phase::Annotating => {}
        }
        let Some(image) = labeler.current_image() else {
            return;
        };

        let queue = labeler.queue();
        println!(
            "== image {}/{} {} [{}]",
            queue.cursor() + 1,
            queue.len(),
            image.file_name(),
            image.id
        );
        println!("   {}", image.url);
        let annotation = labeler.annotation();
        let Some(vehicle) = annotation.vehicle_type else {
            println!("   vehicle: ? (v bike | v scooter)");
            return;
        };
        println!("   vehicle: {vehicle}");
        if annotation.no_damage {
            println!("   marked as no damage");
        } else {
            let taxonomy = labeler.taxonomy();
            println!("   sections: {}", taxonomy.sections(vehicle).join(", "));
            if let Some(section) = &annotation.section {
                println!(
                    "   parts in {section}: {}",
                    taxonomy.parts_by_section(vehicle, section).join(", ")
                );
            }
            if let Some(part) = &annotation.expanded_part {
                let kinds: Vec<String> = taxonomy
                    .allowed_damages(part)
                    .iter()
                    .map(|kind| {
                        if kind.requires_manual_severity() {
                            format!("{kind} <minor|major>")
                        } else {
                            kind.to_string()
                        }
                    })
                    .collect();
                println!("   damages for {part}: {}", kinds.join(", "));
            }
        }
        for entry in &annotation.damages {
            println!("   * {entry}");
        }
        if labeler.is_saving() {
            println!("   saving...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_damage_command() {
        assert_eq!(
            parse_command("d mirror_left scratch minor"),
            Ok(Command::Send(Message::ToggleDamage {
                part: "mirror_left".to_string(),
                damage: DamageKind::Scratch,
                severity: Some(Severity::Minor),
            }))
        );
        assert_eq!(
            parse_command("damage seat torn"),
            Ok(Command::Send(Message::ToggleDamage {
                part: "seat".to_string(),
                damage: DamageKind::Torn,
                severity: None,
            }))
        );
        assert!(parse_command("d seat torn huge").is_err());
        assert!(parse_command("d seat bent").is_err());
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(
            parse_command("v Scooter"),
            Ok(Command::Send(Message::SelectVehicle(VehicleType::Scooter)))
        );
        assert_eq!(parse_command("  "), Ok(Command::Send(Message::UserActivity)));
        assert_eq!(parse_command("prev"), Ok(Command::Send(Message::Previous)));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert!(parse_command("v truck").is_err());
        assert!(parse_command("fly away").is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from([
            "damage-labeler",
            "--config",
            "/nonexistent/config.json",
            "--log-level",
            "debug",
        ]);
        assert!(matches!(load_config(&cli), Err(ConfigError::IoError(_))));

        let cli = Cli::parse_from(["damage-labeler", "--log-level", "trace"]);
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert!(cli.offline.is_none());
        assert!(!cli.save_config);
    }
}
