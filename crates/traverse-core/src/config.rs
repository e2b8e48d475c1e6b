//! Mission configuration.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a runnable configuration. After parsing, a small set of
//! environment variables override the file:
//!
//! - `TRAVERSE_TEAMS` -- number of teams to join
//! - `TRAVERSE_RECON_TEAMS` -- extra scout-only teams for full recon
//! - `TRAVERSE_GAME_ID` -- game to join
//! - `TRAVERSE_HEURISTIC` -- `manhattan` or `euclidean`
//! - `TRAVERSE_STRATEGY` -- `escort`, `full_recon`, or `none`
//! - `TRAVERSE_BUFFER` -- pathfinding window padding
//! - `TRAVERSE_QUICK_MODE` -- `true` to skip scouting entirely

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use traverse_types::{Heuristic, ScoutStrategy};
use traverse_world::pathfinder::DEFAULT_BUFFER;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An override or setting holds an unusable value.
    #[error("invalid value for {key}: {value}")]
    Invalid {
        /// The offending setting.
        key: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Everything that shapes one mission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MissionConfig {
    /// Number of teams to join and drive.
    #[serde(default = "default_teams")]
    pub teams: u32,

    /// Extra scout-only teams joined for full recon. Their rovers never
    /// move.
    #[serde(default = "default_recon_teams")]
    pub recon_teams: u32,

    /// Game to join.
    #[serde(default = "default_game_id")]
    pub game_id: String,

    /// A* heuristic for rover paths.
    #[serde(default)]
    pub heuristic: Heuristic,

    /// Pathfinding window padding.
    #[serde(default = "default_buffer")]
    pub buffer: u32,

    /// Largest padding tried when widening after a miss.
    #[serde(default = "default_max_buffer")]
    pub max_buffer: u32,

    /// Whether to charge a penalty for changing heading.
    #[serde(default)]
    pub straight_path: bool,

    /// Penalty per heading change when `straight_path` is set.
    #[serde(default = "default_straight_penalty")]
    pub straight_penalty: u32,

    /// Penalty used for the final leg when the battery has room to spare.
    #[serde(default = "default_straight_penalty_boost")]
    pub straight_penalty_boost: u32,

    /// Battery must exceed the final leg's cost by this factor before the
    /// boosted penalty is tried.
    #[serde(default = "default_energy_margin")]
    pub energy_margin: f64,

    /// Skip scouting and plan over the low-resolution estimate.
    #[serde(default)]
    pub quick_mode: bool,

    /// How scouts are used.
    #[serde(default)]
    pub strategy: ScoutStrategy,

    /// Escort scouts skip corridors at least this well known (0.0 to 1.0).
    #[serde(default = "default_escort_coverage")]
    pub escort_coverage: f64,

    /// How many upcoming targets an escort scout looks ahead.
    #[serde(default = "default_escort_lookahead")]
    pub escort_lookahead: usize,

    /// Remote call retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Backoff while waiting for the game to start.
    #[serde(default = "default_status_poll")]
    pub status_poll: BackoffConfig,

    /// Path search retry policy.
    #[serde(default)]
    pub path: PathConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            teams: default_teams(),
            recon_teams: default_recon_teams(),
            game_id: default_game_id(),
            heuristic: Heuristic::default(),
            buffer: default_buffer(),
            max_buffer: default_max_buffer(),
            straight_path: false,
            straight_penalty: default_straight_penalty(),
            straight_penalty_boost: default_straight_penalty_boost(),
            energy_margin: default_energy_margin(),
            quick_mode: false,
            strategy: ScoutStrategy::default(),
            escort_coverage: default_escort_coverage(),
            escort_lookahead: default_escort_lookahead(),
            retry: RetryConfig::default(),
            status_poll: default_status_poll(),
            path: PathConfig::default(),
        }
    }
}

impl MissionConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRAVERSE_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("TRAVERSE_TEAMS") {
            self.teams = parse_override("TRAVERSE_TEAMS", &val)?;
        }
        if let Some(val) = lookup("TRAVERSE_RECON_TEAMS") {
            self.recon_teams = parse_override("TRAVERSE_RECON_TEAMS", &val)?;
        }
        if let Some(val) = lookup("TRAVERSE_GAME_ID") {
            self.game_id = val;
        }
        if let Some(val) = lookup("TRAVERSE_HEURISTIC") {
            self.heuristic = parse_override("TRAVERSE_HEURISTIC", &val)?;
        }
        if let Some(val) = lookup("TRAVERSE_STRATEGY") {
            self.strategy = parse_override("TRAVERSE_STRATEGY", &val)?;
        }
        if let Some(val) = lookup("TRAVERSE_BUFFER") {
            self.buffer = parse_override("TRAVERSE_BUFFER", &val)?;
        }
        if let Some(val) = lookup("TRAVERSE_QUICK_MODE") {
            self.quick_mode = parse_override("TRAVERSE_QUICK_MODE", &val)?;
        }
        Ok(())
    }

    /// Reject settings no mission could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.teams == 0 {
            return Err(invalid("teams", &self.teams));
        }
        if self.effective_strategy() == ScoutStrategy::FullRecon && self.recon_teams == 0 {
            return Err(invalid("recon_teams", &self.recon_teams));
        }
        if !(0.0..=1.0).contains(&self.escort_coverage) {
            return Err(invalid("escort_coverage", &self.escort_coverage));
        }
        if !self.energy_margin.is_finite() || self.energy_margin < 1.0 {
            return Err(invalid("energy_margin", &self.energy_margin));
        }
        if self.max_buffer < self.buffer {
            return Err(invalid("max_buffer", &self.max_buffer));
        }
        Ok(())
    }

    /// The scouting strategy in effect (`quick_mode` forces `None`).
    pub const fn effective_strategy(&self) -> ScoutStrategy {
        if self.quick_mode {
            ScoutStrategy::None
        } else {
            self.strategy
        }
    }

    /// Heading-change penalty for ordinary legs.
    pub const fn effective_straight_penalty(&self) -> u32 {
        if self.straight_path {
            self.straight_penalty
        } else {
            0
        }
    }
}

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BackoffConfig {
    /// First delay in milliseconds.
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
    /// Attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// How remote calls are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Fixed wait after a rate-limit response, in milliseconds.
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,
    /// Consecutive rover moves without progress before giving up on a leg.
    #[serde(default = "default_move_failure_limit")]
    pub move_failure_limit: u32,
    /// Backoff for transport failures.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl RetryConfig {
    /// The rate-limit wait as a [`Duration`].
    pub const fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            move_failure_limit: default_move_failure_limit(),
            backoff: BackoffConfig::default(),
        }
    }
}

/// How path searches are retried while terrain is still unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PathConfig {
    /// Failed searches (each after widening) before the rover stalls.
    #[serde(default = "default_max_path_attempts")]
    pub max_path_attempts: u32,
    /// Wait between failed searches.
    #[serde(default = "default_path_backoff")]
    pub backoff: BackoffConfig,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            max_path_attempts: default_max_path_attempts(),
            backoff: default_path_backoff(),
        }
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_invalid| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}

fn invalid(key: &'static str, value: &impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

const fn default_teams() -> u32 {
    1
}

const fn default_recon_teams() -> u32 {
    4
}

fn default_game_id() -> String {
    "n".to_owned()
}

const fn default_buffer() -> u32 {
    DEFAULT_BUFFER
}

const fn default_max_buffer() -> u32 {
    160
}

const fn default_straight_penalty() -> u32 {
    5
}

const fn default_straight_penalty_boost() -> u32 {
    25
}

const fn default_energy_margin() -> f64 {
    1.5
}

const fn default_escort_coverage() -> f64 {
    0.6
}

const fn default_escort_lookahead() -> usize {
    2
}

const fn default_initial_ms() -> u64 {
    100
}

const fn default_max_ms() -> u64 {
    5_000
}

const fn default_max_attempts() -> u32 {
    8
}

const fn default_rate_limit_delay_ms() -> u64 {
    250
}

const fn default_move_failure_limit() -> u32 {
    5
}

const fn default_max_path_attempts() -> u32 {
    10
}

const fn default_path_backoff() -> BackoffConfig {
    BackoffConfig {
        initial_ms: 200,
        max_ms: 5_000,
        max_attempts: 10,
    }
}

const fn default_status_poll() -> BackoffConfig {
    BackoffConfig {
        initial_ms: 250,
        max_ms: 5_000,
        max_attempts: 60,
    }
}
