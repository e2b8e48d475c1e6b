//! [`HttpArbiter`]: the game server over HTTP.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use traverse_core::arbiter::{Arbiter, ArbiterError};
use traverse_types::{AerialMove, Direction, GameStatus, GroundMove, JoinGrant, Location};

use crate::error::{ClientError, TOO_FAR_MARKER};
use crate::wire::{JoinResponse, MoveResponse, ProblemDetail, parse_status};

const JOIN: &str = "/Game/Join";
const MOVE_GROUND: &str = "/Game/MovePerseverance";
const MOVE_AERIAL: &str = "/Game/MoveIngenuity";
const STATUS: &str = "/Game/Status";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Arbiter backed by the game server's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpArbiter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpArbiter {
    /// A client for the server at `base_url` with [`DEFAULT_TIMEOUT`].
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// A client for the server at `base_url` with a custom request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Setup(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// The server root requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a `GET` and return the body of a successful response.
    async fn get(
        &self,
        path: &'static str,
        query: &[(&str, &str)],
    ) -> Result<String, ClientError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ClientError::Request { path, source })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            debug!(path, "rate limited");
            return Err(ClientError::RateLimited { path });
        }
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Request { path, source })?;
        if !status.is_success() {
            return Err(ClientError::Status {
                path,
                status: status.as_u16(),
                detail: ProblemDetail::describe(&body),
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let body = self.get(path, query).await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Json { path, source })
    }
}

impl Arbiter for HttpArbiter {
    async fn join_game(&self, game_id: &str, name: &str) -> Result<JoinGrant, ArbiterError> {
        let response: JoinResponse = self
            .get_json(JOIN, &[("gameId", game_id), ("name", name)])
            .await?;
        Ok(response.into_grant()?)
    }

    async fn move_ground(
        &self,
        token: &str,
        direction: Direction,
    ) -> Result<GroundMove, ArbiterError> {
        let response: MoveResponse = self
            .get_json(MOVE_GROUND, &[("token", token), ("direction", direction.as_str())])
            .await?;
        Ok(response.into_ground()?)
    }

    async fn move_aerial(
        &self,
        token: &str,
        destination: Location,
    ) -> Result<AerialMove, ArbiterError> {
        // The server names the axes row/column but reads them as x/y.
        let (x, y) = (destination.x.to_string(), destination.y.to_string());
        let response: MoveResponse = self
            .get_json(
                MOVE_AERIAL,
                &[
                    ("token", token),
                    ("destinationRow", x.as_str()),
                    ("destinationColumn", y.as_str()),
                ],
            )
            .await?;
        if let Some(message) = response
            .message
            .as_deref()
            .filter(|m| m.contains(TOO_FAR_MARKER))
        {
            return Err(ArbiterError::TooFar {
                message: message.to_owned(),
            });
        }
        Ok(response.into_aerial())
    }

    async fn status(&self, token: &str) -> Result<GameStatus, ArbiterError> {
        match self.get(STATUS, &[("token", token)]).await {
            Ok(body) => Ok(parse_status(&body)),
            Err(ClientError::Status { status, .. }) if status < 500 => Ok(GameStatus::Invalid),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let arbiter = HttpArbiter::new("http://localhost:5000/").unwrap();
        assert_eq!(arbiter.base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on loopback refuses connections.
        let arbiter =
            HttpArbiter::with_timeout("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = arbiter.status("token").await.unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, ArbiterError::Transport { .. }));
    }
}
