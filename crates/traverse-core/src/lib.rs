//! Vehicle state machines and mission orchestration for the Traverse rover
//! bot.
//!
//! A mission joins a number of teams to one game, plans a single route
//! through the targets, and then runs one scout task and one drive task per
//! team until a rover has visited every target. All talking to the game
//! server goes through the [`Arbiter`] trait.
//!
//! # Modules
//!
//! - [`arbiter`] -- [`Arbiter`] trait and [`ArbiterError`] classification.
//! - [`cancel`] -- [`CancelScope`], cooperative parent/child cancellation.
//! - [`config`] -- Mission configuration from YAML with environment
//!   overrides.
//! - [`mission`] -- The orchestrator: joins, route, task supervision.
//! - [`names`] -- [`NameSource`] trait for team display names.
//! - [`retry`] -- Backoff schedule and the shared remote-call retry loop.
//! - [`route`] -- [`RouteLedger`] progress and the [`RouteKeeper`] that decides arrivals.
//! - [`sim`] -- [`SimArbiter`], an in-process game server.
//! - [`team`] -- A joined team: identity, token, scout, and rover.
//! - [`vehicle`] -- Scout and rover movement primitives.
//!
//! [`Arbiter`]: arbiter::Arbiter
//! [`ArbiterError`]: arbiter::ArbiterError
//! [`CancelScope`]: cancel::CancelScope
//! [`NameSource`]: names::NameSource
//! [`RouteLedger`]: route::RouteLedger
//! [`RouteKeeper`]: route::RouteKeeper
//! [`SimArbiter`]: sim::SimArbiter

pub mod arbiter;
pub mod cancel;
pub mod config;
pub mod mission;
pub mod names;
pub mod retry;
pub mod route;
pub mod sim;
pub mod team;
pub mod vehicle;
