//! The arbiter seam: everything the bot asks of the game server.
//!
//! The mission and the vehicles are generic over [`Arbiter`], so the same
//! code drives the HTTP client in production and the in-process
//! [`SimArbiter`](crate::sim::SimArbiter) in tests and offline runs.

use std::future::Future;

use traverse_types::{AerialMove, Direction, GameStatus, GroundMove, JoinGrant, Location};

/// Errors reported by an arbiter call, classified by how callers react.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArbiterError {
    /// Too many requests; retry the same call after a fixed delay.
    #[error("rate limited by arbiter")]
    RateLimited,

    /// The arbiter refused the request (bad token, illegal move, game over).
    #[error("arbiter rejected request: {message}")]
    Rejected {
        /// Problem detail from the arbiter.
        message: String,
    },

    /// A scout flight was longer than the arbiter allows.
    #[error("destination too far: {message}")]
    TooFar {
        /// Problem detail from the arbiter.
        message: String,
    },

    /// The request never got a usable answer (connection, timeout, 5xx).
    #[error("transport failure: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    /// The arbiter answered with something that could not be decoded.
    #[error("undecodable arbiter response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },
}

impl ArbiterError {
    /// Whether repeating the identical call may succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transport { .. })
    }
}

/// The game server, as seen by the bot.
///
/// Every method returns a `Send` future so vehicle loops can run on the
/// multi-threaded runtime. Implementations must be shareable across tasks.
pub trait Arbiter: Send + Sync {
    /// Join `game_id` as a new team called `name`.
    fn join_game(
        &self,
        game_id: &str,
        name: &str,
    ) -> impl Future<Output = Result<JoinGrant, ArbiterError>> + Send;

    /// Issue one rover command.
    fn move_ground(
        &self,
        token: &str,
        direction: Direction,
    ) -> impl Future<Output = Result<GroundMove, ArbiterError>> + Send;

    /// Fly the scout straight to `destination`.
    fn move_aerial(
        &self,
        token: &str,
        destination: Location,
    ) -> impl Future<Output = Result<AerialMove, ArbiterError>> + Send;

    /// Current game status for the team holding `token`.
    fn status(&self, token: &str) -> impl Future<Output = Result<GameStatus, ArbiterError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ArbiterError::RateLimited.is_transient());
        assert!(
            ArbiterError::Transport {
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(
            !ArbiterError::Rejected {
                message: "bad token".into()
            }
            .is_transient()
        );
        assert!(
            !ArbiterError::TooFar {
                message: "cannot fly that far".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = ArbiterError::Rejected {
            message: "game over".into(),
        };
        assert_eq!(err.to_string(), "arbiter rejected request: game over");
    }
}
