//! [libs/shared/config/src/lib.rs]
//! Layered configuration root (SPEC_FULL §11): compiled-in defaults, then an
//! optional TOML file, then `CORE__`-prefixed environment variables, in
//! increasing precedence — the same three-tier shape the teacher's
//! `dotenvy` + env-var bootstrap in `main.rs` establishes informally, made
//! explicit and typed here via the `config` crate.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to build layered configuration: {0}")]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PigSettings {
    pub max_nodes: usize,
    pub learning_rate: f64,
    pub confidence_threshold: f64,
}

impl Default for PigSettings {
    fn default() -> Self {
        Self { max_nodes: 1000, learning_rate: 0.01, confidence_threshold: 0.3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySettings {
    pub sample_period_seconds: u64,
    pub window_size: usize,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { sample_period_seconds: 60, window_size: 600 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrapSettings {
    pub default_horizon_minutes: u32,
    pub retrain_interval_seconds: u64,
}

impl Default for DrapSettings {
    fn default() -> Self {
        Self { default_horizon_minutes: 30, retrain_interval_seconds: 7_200 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicySettings {
    pub epsilon: f64,
    pub epsilon_floor: f64,
    pub epsilon_decay: f64,
    pub alpha: f64,
    pub gamma: f64,
    /// Cadence of the background replay trainer (§4.6 "a background replay
    /// task samples batches ... at a steady cadence") — distinct from
    /// `drap.retrain_interval_seconds`, which governs the resource
    /// regressor, not the Q-table.
    pub replay_period_seconds: u64,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self { epsilon: 1.0, epsilon_floor: 0.01, epsilon_decay: 0.995, alpha: 0.01, gamma: 0.95, replay_period_seconds: 300 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterSettings {
    pub queue_capacity: usize,
    pub drain_deadline_seconds: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self { queue_capacity: 10_000, drain_deadline_seconds: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceSettings {
    pub state_dir: PathBuf,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self { state_dir: PathBuf::from("./state") }
    }
}

/// One externally-facing connector (§4.8). `url` is optional: per §5 "each
/// may be absent" — `apps/core-daemon` skips spawning the connector task
/// when it is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ConnectorEndpoint {
    pub url: Option<String>,
    pub backoff_base_seconds: u64,
    pub backoff_cap_seconds: u64,
}

impl ConnectorEndpoint {
    fn with_defaults() -> Self {
        Self { url: None, backoff_base_seconds: 5, backoff_cap_seconds: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectorsSettings {
    pub orchestrator: ConnectorEndpoint,
    pub intent_feed: ConnectorEndpoint,
    pub behavior_feed: ConnectorEndpoint,
    pub market_feed: ConnectorEndpoint,
}

impl Default for ConnectorsSettings {
    fn default() -> Self {
        Self {
            orchestrator: ConnectorEndpoint::with_defaults(),
            intent_feed: ConnectorEndpoint::with_defaults(),
            behavior_feed: ConnectorEndpoint::with_defaults(),
            market_feed: ConnectorEndpoint::with_defaults(),
        }
    }
}

/// Single configuration root for the core. Every tunable named in
/// `spec.md` has a field here (SPEC_FULL §11).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    pub pig: PigSettings,
    pub telemetry: TelemetrySettings,
    pub drap: DrapSettings,
    pub policy: PolicySettings,
    pub router: RouterSettings,
    pub persistence: PersistenceSettings,
    pub connectors: ConnectorsSettings,
}

const DEFAULT_CONFIG_FILE: &str = "./core.toml";

impl Settings {
    /// Loads configuration in increasing precedence: compiled defaults,
    /// an optional TOML file (`cli_override_path`, else `$CORE_CONFIG_PATH`,
    /// else `./core.toml`), then `CORE__`-prefixed environment variables
    /// with `__` as the nesting separator (e.g. `CORE__PIG__MAX_NODES=500`).
    pub fn load(cli_override_path: Option<&Path>) -> Result<Settings, ConfigError> {
        let defaults = Settings::default();
        let defaults_json = serde_json::to_string(&defaults).expect("Settings always serializes");

        let config_path = cli_override_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("CORE_CONFIG_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config = Config::builder()
            .add_source(File::from_str(&defaults_json, FileFormat::Json))
            .add_source(File::from(config_path).required(false))
            .add_source(Environment::with_prefix("CORE").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
