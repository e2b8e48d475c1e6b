//! HTTP implementation of the arbiter for the Traverse rover bot.
//!
//! The game server exposes four `GET` endpoints:
//!
//! | Endpoint                 | Query                                          |
//! |--------------------------|------------------------------------------------|
//! | `/Game/Join`             | `gameId`, `name`                               |
//! | `/Game/MovePerseverance` | `token`, `direction`                           |
//! | `/Game/MoveIngenuity`    | `token`, `destinationRow`, `destinationColumn` |
//! | `/Game/Status`           | `token`                                        |
//!
//! [`HttpArbiter`] implements [`Arbiter`](traverse_core::arbiter::Arbiter)
//! over them. Responses are decoded into the wire types in [`wire`] and
//! converted into the shared grant types; failures are classified into
//! [`ArbiterError`](traverse_core::arbiter::ArbiterError) so the retry
//! policy can react to them.

pub mod error;
pub mod http;
pub mod wire;

pub use error::ClientError;
pub use http::HttpArbiter;
