//! Runner configuration from environment variables.
//!
//! Mission behaviour (teams, heuristics, strategies, retry budgets) lives in
//! the YAML file named by `TRAVERSE_CONFIG`; this module only covers where
//! the bot talks to and where it keeps its files.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RunnerError;

/// Process-level settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Game server root URL.
    pub server_url: String,
    /// Mission YAML; defaults apply when unset.
    pub config_path: Option<PathBuf>,
    /// Directory for terrain snapshots; caching is off when unset.
    pub cache_dir: Option<PathBuf>,
    /// Time between periodic terrain snapshots.
    pub snapshot_interval: Duration,
    /// Play against the in-process simulator instead of the server.
    pub offline: bool,
    /// Seed for the offline board.
    pub offline_seed: u64,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `TRAVERSE_SERVER_URL` -- game server root (default `http://localhost:5000`)
    /// - `TRAVERSE_CONFIG` -- path to the mission YAML
    /// - `TRAVERSE_CACHE_DIR` -- directory for terrain snapshots
    /// - `TRAVERSE_SNAPSHOT_INTERVAL_MS` -- snapshot period (default 30000)
    /// - `TRAVERSE_OFFLINE` -- use the simulator (default `false`)
    /// - `TRAVERSE_OFFLINE_SEED` -- simulator board seed (default 1)
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let server_url = lookup("TRAVERSE_SERVER_URL")
            .unwrap_or_else(|| "http://localhost:5000".to_owned());
        let config_path = lookup("TRAVERSE_CONFIG").map(PathBuf::from);
        let cache_dir = lookup("TRAVERSE_CACHE_DIR").map(PathBuf::from);

        let snapshot_interval_ms: u64 = lookup("TRAVERSE_SNAPSHOT_INTERVAL_MS")
            .unwrap_or_else(|| "30000".to_owned())
            .parse()
            .map_err(|e| {
                RunnerError::Config(format!("invalid TRAVERSE_SNAPSHOT_INTERVAL_MS: {e}"))
            })?;

        let offline: bool = lookup("TRAVERSE_OFFLINE")
            .unwrap_or_else(|| "false".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid TRAVERSE_OFFLINE: {e}")))?;

        let offline_seed: u64 = lookup("TRAVERSE_OFFLINE_SEED")
            .unwrap_or_else(|| "1".to_owned())
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid TRAVERSE_OFFLINE_SEED: {e}")))?;

        if snapshot_interval_ms == 0 {
            return Err(RunnerError::Config(
                "TRAVERSE_SNAPSHOT_INTERVAL_MS must be positive".to_owned(),
            ));
        }

        Ok(Self {
            server_url,
            config_path,
            cache_dir,
            snapshot_interval: Duration::from_millis(snapshot_interval_ms),
            offline,
            offline_seed,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert!(config.config_path.is_none());
        assert!(config.cache_dir.is_none());
        assert_eq!(config.snapshot_interval, Duration::from_secs(30));
        assert!(!config.offline);
    }

    #[test]
    fn values_are_read() {
        let config = RunnerConfig::from_lookup(lookup(&[
            ("TRAVERSE_SERVER_URL", "https://snow-rover.example"),
            ("TRAVERSE_CACHE_DIR", "/tmp/maps"),
            ("TRAVERSE_SNAPSHOT_INTERVAL_MS", "500"),
            ("TRAVERSE_OFFLINE", "true"),
            ("TRAVERSE_OFFLINE_SEED", "42"),
        ]))
        .unwrap();
        assert_eq!(config.server_url, "https://snow-rover.example");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/maps")));
        assert_eq!(config.snapshot_interval, Duration::from_millis(500));
        assert!(config.offline);
        assert_eq!(config.offline_seed, 42);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = RunnerConfig::from_lookup(lookup(&[("TRAVERSE_SNAPSHOT_INTERVAL_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("TRAVERSE_SNAPSHOT_INTERVAL_MS"));
        assert!(RunnerConfig::from_lookup(lookup(&[("TRAVERSE_SNAPSHOT_INTERVAL_MS", "0")])).is_err());
    }
}
