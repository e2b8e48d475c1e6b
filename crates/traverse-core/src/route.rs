//! Per-team progress through the shared route.
//!
//! The route is planned once per mission and every team drives the same
//! sequence. Each team's remaining targets live in the [`RouteLedger`],
//! which vehicles may read at any time but never write. Rovers report
//! arrivals through a [`RouteHandle`]; the mission's [`RouteKeeper`] task is
//! the only writer and decides every report in the order it receives them.
//! A report removes the team's head target only if it names that target,
//! so a repeated or stale report never removes a second one.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::debug;
use traverse_types::{Location, TeamId};

/// Reports waiting for the keeper before senders block.
const ARRIVAL_QUEUE: usize = 64;

/// Outcome of an arrival report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// The head target was reached and removed.
    Advanced {
        /// Targets still to visit.
        remaining: usize,
    },
    /// The last target was reached and removed.
    Completed,
    /// The report did not match the head target; nothing changed.
    Stale,
    /// The keeper has stopped; no further arrivals are decided.
    Closed,
}

/// Per-team progress through one route.
#[derive(Debug)]
pub struct RouteLedger {
    route: Vec<Location>,
    progress: Mutex<HashMap<TeamId, VecDeque<Location>>>,
}

impl RouteLedger {
    fn new(route: Vec<Location>, teams: impl IntoIterator<Item = TeamId>) -> Self {
        let progress = teams
            .into_iter()
            .map(|team| (team, route.iter().copied().collect()))
            .collect();
        Self {
            route,
            progress: Mutex::new(progress),
        }
    }

    /// The full route, in visiting order.
    pub fn route(&self) -> &[Location] {
        &self.route
    }

    /// The team's next target.
    pub async fn head(&self, team: TeamId) -> Option<Location> {
        let progress = self.progress.lock().await;
        progress.get(&team).and_then(|queue| queue.front().copied())
    }

    /// Up to `n` of the team's next targets, head first.
    pub async fn upcoming(&self, team: TeamId, n: usize) -> Vec<Location> {
        let progress = self.progress.lock().await;
        progress
            .get(&team)
            .map(|queue| queue.iter().take(n).copied().collect())
            .unwrap_or_default()
    }

    /// Number of targets the team has left.
    pub async fn remaining(&self, team: TeamId) -> usize {
        let progress = self.progress.lock().await;
        progress.get(&team).map_or(0, VecDeque::len)
    }

    /// Whether the team has visited every target.
    pub async fn is_complete(&self, team: TeamId) -> bool {
        self.remaining(team).await == 0
    }

    async fn decide(&self, team: TeamId, at: Location) -> Arrival {
        let mut progress = self.progress.lock().await;
        let Some(queue) = progress.get_mut(&team) else {
            return Arrival::Stale;
        };
        if queue.front() != Some(&at) {
            return Arrival::Stale;
        }
        queue.pop_front();
        let remaining = queue.len();
        debug!(team = %team, target = %at, remaining, "target reached");
        if remaining == 0 {
            Arrival::Completed
        } else {
            Arrival::Advanced { remaining }
        }
    }
}

#[derive(Debug)]
struct ArrivalReport {
    team: TeamId,
    at: Location,
    reply: oneshot::Sender<Arrival>,
}

/// A vehicle's view of the route: read the ledger, report arrivals.
#[derive(Debug, Clone)]
pub struct RouteHandle {
    ledger: Arc<RouteLedger>,
    reports: mpsc::Sender<ArrivalReport>,
}

impl RouteHandle {
    /// Read access to the shared progress.
    pub fn ledger(&self) -> &RouteLedger {
        &self.ledger
    }

    /// Report that `team` stands on `at` and wait for the keeper's decision.
    pub async fn report_arrival(&self, team: TeamId, at: Location) -> Arrival {
        let (reply, decision) = oneshot::channel();
        if self
            .reports
            .send(ArrivalReport { team, at, reply })
            .await
            .is_err()
        {
            return Arrival::Closed;
        }
        decision.await.unwrap_or(Arrival::Closed)
    }
}

/// The single writer of a [`RouteLedger`].
#[derive(Debug)]
pub struct RouteKeeper {
    ledger: Arc<RouteLedger>,
    reports: mpsc::Receiver<ArrivalReport>,
}

impl RouteKeeper {
    /// A keeper over `route` with every team at its start, and the handle
    /// vehicles report through.
    pub fn new(route: Vec<Location>, teams: impl IntoIterator<Item = TeamId>) -> (Self, RouteHandle) {
        let ledger = Arc::new(RouteLedger::new(route, teams));
        let (sender, reports) = mpsc::channel(ARRIVAL_QUEUE);
        let handle = RouteHandle {
            ledger: Arc::clone(&ledger),
            reports: sender,
        };
        (Self { ledger, reports }, handle)
    }

    /// Decide reports one at a time until every handle is dropped.
    ///
    /// Returns the number of targets removed.
    pub async fn run(mut self) -> usize {
        let mut removed: usize = 0;
        while let Some(report) = self.reports.recv().await {
            let arrival = self.ledger.decide(report.team, report.at).await;
            if matches!(arrival, Arrival::Advanced { .. } | Arrival::Completed) {
                removed = removed.saturating_add(1);
            }
            if report.reply.send(arrival).is_err() {
                debug!(team = %report.team, "arrival reporter went away");
            }
        }
        removed
    }
}
