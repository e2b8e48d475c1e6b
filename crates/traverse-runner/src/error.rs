//! Error types for the runner binary.

/// Errors raised while preparing a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An environment variable is missing or does not parse.
    #[error("config error: {0}")]
    Config(String),
}
