//! The ground rover: slow, heading-constrained, battery-limited.
//!
//! # Driving rules
//!
//! To reach a point the rover first closes the `y` gap, then the `x` gap.
//! For each axis it turns right until its heading lies along that axis,
//! then drives forward or in reverse, whichever moves toward the goal.
//! Commands are chosen from the position and heading the arbiter last
//! reported, never from where the rover expected to be.
//!
//! # Driving a route
//!
//! [`Rover::drive_to_targets`] repeatedly takes the team's next target from
//! the route ledger, plans a path over the knowledge base, follows it cell
//! by cell, and reports the arrival to the mission's route keeper, which
//! decides whether the target is done. When no path
//! exists yet (terrain still unknown), it widens the search window and
//! waits with exponential backoff for scouts to reveal more, giving up as
//! [`DriveOutcome::Stalled`] after the configured number of attempts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use traverse_types::{Direction, GroundMove, Heuristic, Location, Orientation, TeamId};
use traverse_world::pathfinder::{PathPlan, PathQuery, find_path_widening};
use traverse_world::KnowledgeBase;

use super::{Progress, VehicleError};
use crate::arbiter::Arbiter;
use crate::cancel::CancelScope;
use crate::config::{BackoffConfig, MissionConfig, RetryConfig};
use crate::retry::{Backoff, call_with_retry};
use crate::route::{Arrival, RouteHandle};

/// Lifecycle of a rover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoverState {
    /// Not moving.
    Idle,
    /// Rotating in place.
    Turning,
    /// Moving forward or in reverse.
    Driving,
    /// The rover's scope was cancelled; it will not move again.
    Cancelled,
}

/// How a rover's run through the route ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// Every target was visited.
    Won,
    /// The scope was cancelled first.
    Cancelled,
    /// No path to `target` was found within the attempt budget.
    Stalled {
        /// The target that could not be planned to.
        target: Location,
    },
}

/// Path planning parameters for one rover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanningConfig {
    /// A* heuristic.
    pub heuristic: Heuristic,
    /// Initial window padding.
    pub buffer: u32,
    /// Largest padding tried before waiting.
    pub max_buffer: u32,
    /// Heading-change penalty for ordinary legs.
    pub straight_penalty: u32,
    /// Heading-change penalty tried on the final leg.
    pub straight_penalty_boost: u32,
    /// Battery to path-energy ratio required before boosting.
    pub energy_margin: f64,
    /// Failed searches before stalling.
    pub max_path_attempts: u32,
    /// Wait schedule between failed searches.
    pub path_backoff: BackoffConfig,
}

impl From<&MissionConfig> for PlanningConfig {
    fn from(config: &MissionConfig) -> Self {
        Self {
            heuristic: config.heuristic,
            buffer: config.buffer,
            max_buffer: config.max_buffer,
            straight_penalty: config.effective_straight_penalty(),
            straight_penalty_boost: config.straight_penalty_boost,
            energy_margin: config.energy_margin,
            max_path_attempts: config.path.max_path_attempts,
            path_backoff: config.path.backoff,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self::from(&MissionConfig::default())
    }
}

/// The next command that moves a rover at `location` facing `heading`
/// toward `target`, or `None` if it is already there.
pub fn drive_command(
    location: Location,
    heading: Orientation,
    target: Location,
) -> Option<Direction> {
    let dy = i64::from(target.y) - i64::from(location.y);
    let dx = i64::from(target.x) - i64::from(location.x);
    let (gap, wants_vertical) = if dy != 0 {
        (dy, true)
    } else if dx != 0 {
        (dx, false)
    } else {
        return None;
    };
    if heading.is_vertical() != wants_vertical {
        return Some(Direction::Right);
    }
    // Positive gap means +y (North) or +x (East).
    let facing_positive = matches!(heading, Orientation::North | Orientation::East);
    if (gap > 0) == facing_positive {
        Some(Direction::Forward)
    } else {
        Some(Direction::Reverse)
    }
}

/// One team's rover.
#[derive(Debug)]
pub struct Rover<A> {
    arbiter: Arc<A>,
    knowledge: Arc<KnowledgeBase>,
    team: TeamId,
    token: String,
    location: Location,
    orientation: Orientation,
    battery: u32,
    state: RoverState,
    scope: CancelScope,
    retry: RetryConfig,
    planning: PlanningConfig,
    commands: u64,
}

impl<A: Arbiter> Rover<A> {
    /// A rover as described by the team's join grant.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arbiter: Arc<A>,
        knowledge: Arc<KnowledgeBase>,
        team: TeamId,
        token: String,
        start: (Location, Orientation, u32),
        scope: CancelScope,
        retry: RetryConfig,
        planning: PlanningConfig,
    ) -> Self {
        let (location, orientation, battery) = start;
        Self {
            arbiter,
            knowledge,
            team,
            token,
            location,
            orientation,
            battery,
            state: RoverState::Idle,
            scope,
            retry,
            planning,
            commands: 0,
        }
    }

    /// Last reported position.
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Last reported heading.
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Last reported battery.
    pub const fn battery(&self) -> u32 {
        self.battery
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> RoverState {
        self.state
    }

    /// The rover's cancellation scope.
    pub const fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Commands accepted by the arbiter so far.
    pub const fn commands(&self) -> u64 {
        self.commands
    }

    /// Drive to `target`: close the `y` gap, then the `x` gap.
    ///
    /// Fails with [`VehicleError::NoProgress`] if the configured number of
    /// consecutive commands leaves position and heading unchanged (for
    /// example, when the battery cannot pay for the next cell).
    pub async fn drive_to_point(&mut self, target: Location) -> Result<Progress, VehicleError> {
        let limit = self.retry.move_failure_limit.max(1);
        let mut stuck: u32 = 0;
        loop {
            if self.scope.is_cancelled() {
                self.state = RoverState::Cancelled;
                return Ok(Progress::Cancelled);
            }
            let Some(command) = drive_command(self.location, self.orientation, target) else {
                self.state = RoverState::Idle;
                return Ok(Progress::Arrived);
            };
            self.state = if command.is_turn() {
                RoverState::Turning
            } else {
                RoverState::Driving
            };
            let before = (self.location, self.orientation);
            let reply = call_with_retry(&self.scope, &self.retry, "move_ground", || {
                self.arbiter.move_ground(&self.token, command)
            })
            .await;
            match reply {
                Ok(Some(reply)) => self.record(reply),
                Ok(None) => {
                    self.state = RoverState::Cancelled;
                    return Ok(Progress::Cancelled);
                }
                Err(err) => {
                    self.state = RoverState::Idle;
                    return Err(err.into());
                }
            }
            if (self.location, self.orientation) == before {
                stuck = stuck.saturating_add(1);
                if stuck >= limit {
                    self.state = RoverState::Idle;
                    return Err(VehicleError::NoProgress {
                        at: self.location,
                        target,
                        attempts: stuck,
                    });
                }
            } else {
                stuck = 0;
            }
        }
    }

    /// Follow `path` cell by cell. A cell is dequeued only once the rover
    /// stands on it.
    pub async fn drive_along_path(&mut self, path: &[Location]) -> Result<Progress, VehicleError> {
        let mut waypoints: VecDeque<Location> = path.iter().copied().collect();
        while let Some(&next) = waypoints.front() {
            if self.location == next {
                waypoints.pop_front();
                continue;
            }
            if self.drive_to_point(next).await? == Progress::Cancelled {
                return Ok(Progress::Cancelled);
            }
        }
        Ok(Progress::Arrived)
    }

    /// Visit the team's remaining targets in route order.
    pub async fn drive_to_targets(
        &mut self,
        route: &RouteHandle,
    ) -> Result<DriveOutcome, VehicleError> {
        let mut failures: u32 = 0;
        let mut backoff = Backoff::new(self.planning.path_backoff);
        loop {
            if self.scope.is_cancelled() {
                self.state = RoverState::Cancelled;
                return Ok(DriveOutcome::Cancelled);
            }
            let Some(target) = route.ledger().head(self.team).await else {
                return Ok(DriveOutcome::Won);
            };
            if self.location == target {
                match route.report_arrival(self.team, target).await {
                    Arrival::Completed => {
                        info!(team = %self.team, battery = self.battery, "route complete");
                        return Ok(DriveOutcome::Won);
                    }
                    Arrival::Closed => {
                        self.state = RoverState::Cancelled;
                        return Ok(DriveOutcome::Cancelled);
                    }
                    Arrival::Advanced { .. } | Arrival::Stale => continue,
                }
            }

            let final_leg = route.ledger().remaining(self.team).await == 1;
            let Some(plan) = self.plan_leg(target, final_leg) else {
                failures = failures.saturating_add(1);
                if failures >= self.planning.max_path_attempts.max(1) {
                    warn!(
                        team = %self.team,
                        at = %self.location,
                        target = %target,
                        failures,
                        "no path, stalling"
                    );
                    return Ok(DriveOutcome::Stalled { target });
                }
                let delay = backoff
                    .next_delay()
                    .unwrap_or_else(|| Duration::from_millis(self.planning.path_backoff.max_ms));
                debug!(
                    team = %self.team,
                    target = %target,
                    failures,
                    wait_ms = delay.as_millis(),
                    "no path yet"
                );
                if !self.scope.sleep(delay).await {
                    self.state = RoverState::Cancelled;
                    return Ok(DriveOutcome::Cancelled);
                }
                continue;
            };
            failures = 0;
            backoff.reset();

            debug!(
                team = %self.team,
                from = %self.location,
                target = %target,
                steps = plan.steps(),
                cost = plan.cost,
                "driving leg"
            );
            if self.drive_along_path(&plan.path).await? == Progress::Cancelled {
                return Ok(DriveOutcome::Cancelled);
            }
            match route.report_arrival(self.team, self.location).await {
                Arrival::Completed => {
                    info!(team = %self.team, battery = self.battery, "route complete");
                    return Ok(DriveOutcome::Won);
                }
                Arrival::Advanced { remaining } => {
                    info!(
                        team = %self.team,
                        target = %target,
                        remaining,
                        battery = self.battery,
                        "target reached"
                    );
                }
                Arrival::Stale => {}
                Arrival::Closed => {
                    self.state = RoverState::Cancelled;
                    return Ok(DriveOutcome::Cancelled);
                }
            }
        }
    }

    /// Plan a path from the current position to `target`.
    ///
    /// On the final leg, when the battery comfortably covers the plain
    /// path, a straighter path (boosted heading-change penalty) is tried
    /// and kept if the battery still covers it.
    pub fn plan_leg(&self, target: Location, final_leg: bool) -> Option<PathPlan> {
        let query = PathQuery::new(self.location, target)
            .heuristic(self.planning.heuristic)
            .buffer(self.planning.buffer)
            .straight_penalty(self.planning.straight_penalty);
        let plan = find_path_widening(&self.knowledge, &query, self.planning.max_buffer)?;

        let boost = self.planning.straight_penalty_boost;
        if !final_leg || boost <= self.planning.straight_penalty {
            return Some(plan);
        }
        let battery = f64::from(self.battery);
        if battery < self.planning.energy_margin * f64::from(self.path_energy(&plan.path)) {
            return Some(plan);
        }
        let boosted = find_path_widening(
            &self.knowledge,
            &query.straight_penalty(boost),
            self.planning.max_buffer,
        );
        match boosted {
            Some(straight) if self.path_energy(&straight.path) <= self.battery => {
                debug!(
                    team = %self.team,
                    plain = plan.cost,
                    straight = straight.cost,
                    "using straighter final leg"
                );
                Some(straight)
            }
            _ => Some(plan),
        }
    }

    /// Battery needed to drive `path` (entered-cell difficulties).
    fn path_energy(&self, path: &[Location]) -> u32 {
        path.iter()
            .skip(1)
            .filter_map(|loc| self.knowledge.get(*loc))
            .fold(0_u32, |sum, cell| sum.saturating_add(cell.difficulty))
    }

    fn record(&mut self, reply: GroundMove) {
        self.location = reply.location;
        self.orientation = reply.orientation;
        self.battery = reply.battery;
        self.commands = self.commands.saturating_add(1);
        self.knowledge.merge(&reply.terrain);
        if !reply.message.is_empty() {
            debug!(team = %self.team, at = %self.location, message = %reply.message, "arbiter message");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::route::RouteKeeper;
    use crate::sim::{SimArbiter, SimConfig, SimGrid};

    struct Fixture {
        arbiter: Arc<SimArbiter>,
        kb: Arc<KnowledgeBase>,
        rover: Rover<SimArbiter>,
    }

    async fn fixture(grid: SimGrid, config: SimConfig, reveal_all: bool) -> Fixture {
        let arbiter = Arc::new(SimArbiter::new(grid, config));
        let grant = arbiter.join_game("g", "rover").await.unwrap();
        let kb = Arc::new(KnowledgeBase::new());
        kb.merge(&grant.terrain);
        if reveal_all {
            kb.merge(&arbiter.grid().cells());
        }
        let rover = Rover::new(
            Arc::clone(&arbiter),
            Arc::clone(&kb),
            TeamId::new(),
            grant.token,
            (grant.start, grant.orientation, grant.battery),
            CancelScope::new(),
            RetryConfig {
                rate_limit_delay_ms: 5,
                move_failure_limit: 3,
                ..RetryConfig::default()
            },
            PlanningConfig {
                max_path_attempts: 3,
                path_backoff: BackoffConfig {
                    initial_ms: 10,
                    max_ms: 40,
                    max_attempts: 5,
                },
                ..PlanningConfig::default()
            },
        );
        Fixture { arbiter, kb, rover }
    }

    fn keeper(targets: Vec<Location>, team: TeamId) -> RouteHandle {
        let (keeper, route) = RouteKeeper::new(targets, [team]);
        tokio::spawn(keeper.run());
        route
    }

    #[test]
    fn commands_close_y_then_x() {
        let origin = Location::new(0, 0);
        let target = Location::new(2, 2);
        assert_eq!(drive_command(origin, Orientation::North, target), Some(Direction::Forward));
        assert_eq!(drive_command(origin, Orientation::South, target), Some(Direction::Reverse));
        assert_eq!(drive_command(origin, Orientation::East, target), Some(Direction::Right));
        assert_eq!(drive_command(origin, Orientation::West, target), Some(Direction::Right));
        let level = Location::new(0, 2);
        assert_eq!(drive_command(level, Orientation::North, target), Some(Direction::Right));
        assert_eq!(drive_command(level, Orientation::East, target), Some(Direction::Forward));
        assert_eq!(drive_command(level, Orientation::West, target), Some(Direction::Reverse));
        assert_eq!(drive_command(target, Orientation::West, target), None);
    }

    #[tokio::test(start_paused = true)]
    async fn drives_to_point_on_uniform_grid() {
        let mut f = fixture(SimGrid::uniform(3, 3, 1), SimConfig::default(), true).await;
        let outcome = f.rover.drive_to_point(Location::new(2, 2)).await;
        assert_eq!(outcome, Ok(Progress::Arrived));
        assert_eq!(f.rover.location(), Location::new(2, 2));
        // Two forward, one turn, two forward.
        assert_eq!(f.rover.commands(), 5);
        assert_eq!(f.rover.orientation(), Orientation::East);
        assert_eq!(f.rover.state(), RoverState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn follows_path_and_reports_battery() {
        let mut f = fixture(SimGrid::uniform(3, 3, 1), SimConfig::default(), true).await;
        let plan = f.rover.plan_leg(Location::new(2, 2), false).unwrap();
        assert_eq!(plan.cost, 4);
        assert_eq!(plan.path.len(), 5);
        assert_eq!(f.rover.drive_along_path(&plan.path).await, Ok(Progress::Arrived));
        assert_eq!(f.rover.location(), Location::new(2, 2));
        let (at, _, battery) = f.arbiter.rover("sim-1").unwrap();
        assert_eq!(at, Location::new(2, 2));
        assert_eq!(f.rover.battery(), battery);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_battery_is_no_progress() {
        let config = SimConfig {
            battery: 1,
            ..SimConfig::default()
        };
        let mut f = fixture(SimGrid::uniform(5, 5, 1), config, true).await;
        let outcome = f.rover.drive_to_point(Location::new(0, 3)).await;
        assert!(matches!(outcome, Err(VehicleError::NoProgress { attempts: 3, .. })));
        assert_eq!(f.rover.location(), Location::new(0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn drives_the_whole_route() {
        let mut f = fixture(SimGrid::uniform(8, 8, 1), SimConfig::default(), true).await;
        let targets = vec![Location::new(2, 3), Location::new(6, 1), Location::new(7, 7)];
        let route = keeper(targets, f.rover.team);
        let outcome = f.rover.drive_to_targets(&route).await;
        assert_eq!(outcome, Ok(DriveOutcome::Won));
        assert_eq!(f.rover.location(), Location::new(7, 7));
        assert!(route.ledger().is_complete(f.rover.team).await);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_terrain_stalls_after_budget() {
        let mut f = fixture(SimGrid::uniform(20, 20, 1), SimConfig::default(), false).await;
        let route = keeper(vec![Location::new(15, 15)], f.rover.team);
        let outcome = f.rover.drive_to_targets(&route).await;
        assert_eq!(
            outcome,
            Ok(DriveOutcome::Stalled {
                target: Location::new(15, 15)
            })
        );
        assert_eq!(f.arbiter.stats().ground_moves, 0);
        assert!(f.kb.len() < 400);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_rover_stops_before_next_command() {
        let mut f = fixture(SimGrid::uniform(5, 5, 1), SimConfig::default(), true).await;
        f.rover.scope().cancel();
        let route = keeper(vec![Location::new(4, 4)], f.rover.team);
        assert_eq!(f.rover.drive_to_targets(&route).await, Ok(DriveOutcome::Cancelled));
        assert_eq!(f.arbiter.stats().ground_moves, 0);
        assert_eq!(f.rover.state(), RoverState::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn final_leg_prefers_straight_path_when_battery_allows() {
        // Row y = 0 is pricier than the detour through y = 1, but straight.
        let grid = SimGrid::from_fn(5, 2, |loc| if loc.y == 0 && (1..=3).contains(&loc.x) { 2 } else { 1 });
        let config = SimConfig {
            orientation: Orientation::East,
            ..SimConfig::default()
        };
        let f = fixture(grid, config, true).await;
        let target = Location::new(4, 0);
        let ordinary = f.rover.plan_leg(target, false).unwrap();
        assert_eq!(ordinary.cost, 6);
        let last = f.rover.plan_leg(target, true).unwrap();
        assert!(last.path.iter().all(|loc| loc.y == 0));
    }
}
