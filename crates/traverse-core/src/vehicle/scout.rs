//! The aerial scout: fast, orientation-free, used to reveal terrain.
//!
//! A flight from the current position to a target is split into hops along
//! the straight line: the line is sampled once per unit of distance and
//! every second sample is requested, then the target itself. If the
//! arbiter answers a hop with "too far", the scout tries the midpoint of
//! that hop first and continues from there.

use std::sync::Arc;

use tracing::{debug, info};
use traverse_types::{AerialMove, Location};
use traverse_world::KnowledgeBase;
use traverse_world::line::{midpoint, sample_line};

use super::{Progress, VehicleError};
use crate::arbiter::{Arbiter, ArbiterError};
use crate::cancel::CancelScope;
use crate::config::RetryConfig;
use crate::retry::call_with_retry;

/// Lifecycle of a scout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoutState {
    /// Not moving.
    Idle,
    /// A flight is in progress.
    EnRoute,
    /// The scout's scope was cancelled; it will not move again.
    Cancelled,
}

/// One team's scout.
#[derive(Debug)]
pub struct Scout<A> {
    arbiter: Arc<A>,
    knowledge: Arc<KnowledgeBase>,
    token: String,
    location: Location,
    state: ScoutState,
    scope: CancelScope,
    retry: RetryConfig,
    hops: u64,
}

impl<A: Arbiter> Scout<A> {
    /// A scout at `start`, acting for the team holding `token`.
    pub fn new(
        arbiter: Arc<A>,
        knowledge: Arc<KnowledgeBase>,
        token: String,
        start: Location,
        scope: CancelScope,
        retry: RetryConfig,
    ) -> Self {
        Self {
            arbiter,
            knowledge,
            token,
            location: start,
            state: ScoutState::Idle,
            scope,
            retry,
            hops: 0,
        }
    }

    /// Last reported position.
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> ScoutState {
        self.state
    }

    /// The scout's cancellation scope.
    pub const fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Accepted flights so far.
    pub const fn hops(&self) -> u64 {
        self.hops
    }

    /// Fly to `target` in hops along the straight line.
    pub async fn move_to_point(&mut self, target: Location) -> Result<Progress, VehicleError> {
        if self.location == target {
            return Ok(Progress::Arrived);
        }
        self.state = ScoutState::EnRoute;
        let waypoints = sample_line(self.location, target);
        let result = self.fly_via(waypoints.into_iter().skip(2).step_by(2), target).await;
        self.state = match result {
            Ok(Progress::Cancelled) => ScoutState::Cancelled,
            _ => ScoutState::Idle,
        };
        result
    }

    /// Visit every location in `targets`, always flying to the nearest
    /// remaining one (Manhattan distance) next.
    pub async fn fly_to_targets(
        &mut self,
        mut targets: Vec<Location>,
    ) -> Result<Progress, VehicleError> {
        while !targets.is_empty() {
            if self.scope.is_cancelled() {
                self.state = ScoutState::Cancelled;
                return Ok(Progress::Cancelled);
            }
            let here = self.location;
            let Some(nearest) = targets
                .iter()
                .enumerate()
                .min_by_key(|(_, t)| here.manhattan_distance(**t))
                .map(|(i, _)| i)
            else {
                break;
            };
            let next = targets.swap_remove(nearest);
            if self.move_to_point(next).await? == Progress::Cancelled {
                return Ok(Progress::Cancelled);
            }
        }
        Ok(Progress::Arrived)
    }

    async fn fly_via(
        &mut self,
        waypoints: impl Iterator<Item = Location>,
        target: Location,
    ) -> Result<Progress, VehicleError> {
        for waypoint in waypoints.chain(std::iter::once(target)) {
            if self.scope.is_cancelled() {
                return Ok(Progress::Cancelled);
            }
            if self.hop(waypoint).await? == Progress::Cancelled {
                return Ok(Progress::Cancelled);
            }
        }
        Ok(Progress::Arrived)
    }

    /// Reach `destination`, halving the hop whenever the arbiter says it is
    /// too far.
    async fn hop(&mut self, destination: Location) -> Result<Progress, VehicleError> {
        let mut pending = vec![destination];
        while let Some(&next) = pending.last() {
            if next == self.location {
                pending.pop();
                continue;
            }
            let reply = call_with_retry(&self.scope, &self.retry, "move_aerial", || {
                self.arbiter.move_aerial(&self.token, next)
            })
            .await;
            match reply {
                Ok(Some(reply)) => {
                    self.record(reply);
                    pending.pop();
                }
                Ok(None) => return Ok(Progress::Cancelled),
                Err(ArbiterError::TooFar { .. }) => {
                    let mid = midpoint(self.location, next);
                    if mid == self.location || mid == next {
                        return Err(VehicleError::Unreachable {
                            from: self.location,
                            to: next,
                        });
                    }
                    debug!(from = %self.location, to = %next, via = %mid, "hop too far, splitting");
                    pending.push(mid);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(Progress::Arrived)
    }

    fn record(&mut self, reply: AerialMove) {
        self.location = reply.location;
        self.hops = self.hops.saturating_add(1);
        let discovered = self.knowledge.merge(&reply.terrain);
        if discovered > 0 {
            debug!(at = %self.location, discovered, "scout revealed terrain");
        }
        if !reply.message.is_empty() {
            info!(at = %self.location, message = %reply.message, "arbiter message");
        }
    }
}
