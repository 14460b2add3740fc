//! Configuration management with validation and defaults
//!
//! Values come from defaults, an optional TOML file, then `FAIRROUND_*` environment
//! overrides, and are validated before use.

use crate::errors::{ConfigurationError, FairroundResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Complete client configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FairroundConfig {
    pub games: GameParams,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Game parameters that feed outcome derivation and bet validation.
/// These must match the server's values or verification will report mismatches.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameParams {
    /// Crash house edge in basis points
    pub crash_house_edge_bps: u32,
    pub mines_grid_size: u8,
    pub plinko_min_rows: u8,
    pub plinko_max_rows: u8,
    pub plinko_max_balls: u8,
}

impl Default for GameParams {
    fn default() -> Self {
        Self {
            crash_house_edge_bps: 100, // 1%
            mines_grid_size: 25,       // 5x5 board
            plinko_min_rows: 8,
            plinko_max_rows: 16,
            plinko_max_balls: 10,
        }
    }
}

/// Round session behaviour
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Completed rounds kept for the "recent results" panel
    pub history_limit: usize,
    /// Allow a time-seeded PRNG when the OS CSPRNG fails. Such seeds are flagged.
    pub allow_insecure_seed_fallback: bool,
    /// Log every accepted tick at debug level
    pub trace_ticks: bool,
    /// Capacity of the driver's update broadcast channel
    pub update_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            allow_insecure_seed_fallback: true,
            trace_ticks: false,
            update_channel_capacity: 256,
        }
    }
}

/// Logging output
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "fairround=info".to_string(),
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> FairroundResult<FairroundConfig> {
        let mut config = match &self.config_path {
            Some(path) => Self::load_from_file(path)?,
            None => FairroundConfig::default(),
        };

        Self::apply_env_overrides(&mut config)?;
        Self::validate(&config)?;

        Ok(config)
    }

    fn load_from_file(path: &Path) -> FairroundResult<FairroundConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(config: &mut FairroundConfig) -> FairroundResult<()> {
        if let Some(edge) = env_parse("FAIRROUND_CRASH_HOUSE_EDGE_BPS", "Invalid basis points")? {
            config.games.crash_house_edge_bps = edge;
        }
        if let Some(grid) = env_parse("FAIRROUND_MINES_GRID_SIZE", "Invalid grid size")? {
            config.games.mines_grid_size = grid;
        }
        if let Some(limit) = env_parse("FAIRROUND_HISTORY_LIMIT", "Invalid history limit")? {
            config.session.history_limit = limit;
        }
        if let Some(allow) = env_parse("FAIRROUND_ALLOW_INSECURE_SEED", "Invalid boolean value")? {
            config.session.allow_insecure_seed_fallback = allow;
        }
        if let Ok(filter) = env::var("FAIRROUND_LOG") {
            config.logging.filter = filter;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(config: &FairroundConfig) -> FairroundResult<()> {
        let games = &config.games;

        if games.crash_house_edge_bps >= 10_000 {
            return Err(invalid(
                "games.crash_house_edge_bps",
                games.crash_house_edge_bps,
                "House edge must be below 100%",
            ));
        }

        if games.mines_grid_size < 2 {
            return Err(invalid(
                "games.mines_grid_size",
                games.mines_grid_size,
                "Grid needs at least two cells",
            ));
        }

        if games.plinko_min_rows == 0 || games.plinko_min_rows > games.plinko_max_rows {
            return Err(invalid(
                "games.plinko_min_rows",
                games.plinko_min_rows,
                "Row bounds must satisfy 0 < min <= max",
            ));
        }

        if games.plinko_max_balls == 0 {
            return Err(invalid("games.plinko_max_balls", 0, "Ball limit cannot be zero"));
        }

        if config.session.update_channel_capacity == 0 {
            return Err(invalid(
                "session.update_channel_capacity",
                0,
                "Broadcast capacity cannot be zero",
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &FairroundConfig, path: &Path) -> FairroundResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path.display(), e)).into()
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, reason: &str) -> FairroundResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| {
            ConfigurationError::InvalidValue {
                field: key.to_string(),
                value: raw,
                reason: reason.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> crate::errors::FairroundError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
