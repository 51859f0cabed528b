use courtmix_core::model::player::{PlayerId, first_duplicate};
use courtmix_core::pairing::PlannerConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const MIN_PLAYERS: usize = 4;
const NAME_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root simulation configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub run_id: String,
    pub session: SessionConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: SimulationConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_name("run_id", &self.run_id)?;
        self.session.validate()?;
        validate_planner(&self.planner)?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve `{run_id}` placeholders into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Players, courts and the roster timeline of the simulated session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionConfig {
    pub seed: Option<u64>,
    pub rounds: usize,
    pub courts: usize,
    /// Named roster. Mutually exclusive with `player_count`.
    #[serde(default)]
    pub players: Vec<String>,
    /// Generates `p01..pNN` when no names are given.
    #[serde(default)]
    pub player_count: Option<usize>,
    #[serde(default)]
    pub arrivals: Vec<RosterEvent>,
    #[serde(default)]
    pub departures: Vec<RosterEvent>,
    #[serde(default)]
    pub volunteers: Vec<RosterEvent>,
}

/// Players affected at the start of round `round` (zero-based).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RosterEvent {
    pub round: usize,
    pub players: Vec<String>,
}

impl SessionConfig {
    /// The roster at round zero.
    pub fn initial_roster(&self) -> Vec<PlayerId> {
        if !self.players.is_empty() {
            return self.players.iter().map(|name| PlayerId::from(name.as_str())).collect();
        }
        let count = self.player_count.unwrap_or(0);
        let width = count.to_string().len().max(2);
        (1..=count)
            .map(|index| PlayerId::from(format!("p{index:0width$}")))
            .collect()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.rounds == 0 {
            return Err(invalid("session.rounds", "number of rounds must be greater than zero"));
        }

        if self.courts == 0 {
            return Err(invalid("session.courts", "at least one court is required"));
        }

        match (self.players.is_empty(), self.player_count) {
            (false, Some(_)) => {
                return Err(invalid(
                    "session.players",
                    "set either players or player_count, not both",
                ));
            }
            (true, None) => {
                return Err(invalid(
                    "session.players",
                    "a roster (players) or a player_count is required",
                ));
            }
            _ => {}
        }

        for name in &self.players {
            validate_name("session.players", name)?;
        }

        let roster = self.initial_roster();
        if roster.len() < MIN_PLAYERS {
            return Err(invalid(
                "session.players",
                format!("at least {MIN_PLAYERS} players are required, found {}", roster.len()),
            ));
        }
        if let Some(duplicate) = first_duplicate(&roster) {
            return Err(invalid(
                "session.players",
                format!("player '{duplicate}' listed more than once"),
            ));
        }

        let mut known: HashSet<&str> = roster.iter().map(PlayerId::as_str).collect();
        for (label, events) in [
            ("session.arrivals", &self.arrivals),
            ("session.departures", &self.departures),
            ("session.volunteers", &self.volunteers),
        ] {
            for event in events {
                if event.round >= self.rounds {
                    return Err(invalid(
                        label,
                        format!("round {} is outside the {} simulated rounds", event.round, self.rounds),
                    ));
                }
                for name in &event.players {
                    validate_name(label, name)?;
                }
            }
        }

        for event in &self.arrivals {
            for name in &event.players {
                if !known.insert(name.as_str()) {
                    return Err(invalid(
                        "session.arrivals",
                        format!("player '{name}' is already on the roster"),
                    ));
                }
            }
        }

        for (label, events) in [
            ("session.departures", &self.departures),
            ("session.volunteers", &self.volunteers),
        ] {
            if let Some(name) = events
                .iter()
                .flat_map(|event| event.players.iter())
                .find(|name| !known.contains(name.as_str()))
            {
                return Err(invalid(label, format!("player '{name}' never joins the session")));
            }
        }

        Ok(())
    }
}

fn validate_planner(planner: &PlannerConfig) -> Result<(), ValidationError> {
    if planner.attempts == 0 {
        return Err(invalid("planner.attempts", "attempts must be at least 1"));
    }
    if planner.lookahead == 0 {
        return Err(invalid("planner.lookahead", "lookahead must be at least 1"));
    }
    let base = planner.generator.sit_out_base_chance;
    if !(base > 0.0 && base <= 1.0) {
        return Err(invalid(
            "planner.generator.sit_out_base_chance",
            "base chance must lie in (0, 1]",
        ));
    }
    Ok(())
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(label, "path must not be empty"));
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(invalid(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_name(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "name must not be empty"));
    }

    if !value.chars().all(|c| NAME_ALLOWED.contains(c)) {
        return Err(invalid(
            field,
            format!("'{value}' may only contain alphanumeric characters, '.', '_' or '-'"),
        ));
    }

    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        message: message.into(),
    }
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary and, when enabled, the telemetry log.
    pub fn summary_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
