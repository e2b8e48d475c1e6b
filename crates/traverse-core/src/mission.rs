//! The mission orchestrator.
//!
//! A [`Mission`] owns one game session from the first join to the end:
//!
//! 1. [`Mission::join_teams`] joins the driving teams one after another,
//!    and [`Mission::join_recon_teams`] joins the scout-only teams used by
//!    full recon. The first grant fixes the board and the route; every
//!    grant's terrain goes into the knowledge base.
//! 2. [`Mission::await_playing`] polls the game status with bounded
//!    backoff until the game starts.
//! 3. [`Mission::play`] runs the scouting strategy and one drive task per
//!    team on [`JoinSet`]s, and collects a [`MissionReport`].
//!
//! # Session states
//!
//! ```text
//! Joining --> Playing --> Won | Stalled | Abandoned
//!    |                        ^
//!    +------------------------+  (status Invalid, poll budget exhausted)
//! ```
//!
//! Arrivals are decided by one [`RouteKeeper`] task that the mission owns;
//! rovers only report. The first rover to report `Won` cancels scouting for
//! every team. The remaining rovers keep driving to completion.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use traverse_types::{Board, GameStatus, JoinGrant, Location, MissionState, ScoutStrategy, TeamId};
use traverse_world::{KnowledgeBase, PlannedRoute, plan_route};

use crate::arbiter::Arbiter;
use crate::cancel::CancelScope;
use crate::config::MissionConfig;
use crate::names::NameSource;
use crate::retry::{Backoff, call_with_retry};
use crate::route::{RouteHandle, RouteKeeper};
use crate::team::Team;
use crate::vehicle::{DriveOutcome, PlanningConfig, Progress, Rover, Scout, VehicleError};

/// How long an escort scout with nothing to do waits before looking again.
const ESCORT_IDLE_POLL: Duration = Duration::from_millis(200);

/// Padding around an escort corridor when measuring its coverage.
const ESCORT_CORRIDOR_BUFFER: u32 = 2;

/// Errors that end a mission before it can play.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissionError {
    /// Every join attempt failed.
    #[error("no team could join game {game_id}")]
    NoTeams {
        /// The game that was joined.
        game_id: String,
    },
}

/// How one team's rover finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoverOutcome {
    /// Visited every target.
    Won,
    /// Ran out of path-finding attempts toward `target`.
    Stalled {
        /// The target it could not plan to.
        target: Location,
    },
    /// Stopped by cancellation.
    Cancelled,
    /// Aborted by an arbiter or movement error.
    Failed {
        /// The error, rendered.
        error: String,
    },
    /// The game never started, so the rover never departed.
    Idle,
    /// The drive task never reported (panicked or was aborted).
    Lost,
}

/// Final state of one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamReport {
    /// Local team identity.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// How the rover finished.
    pub outcome: RoverOutcome,
    /// Last reported rover position.
    pub location: Location,
    /// Last reported rover battery.
    pub battery: u32,
    /// Accepted rover commands.
    pub commands: u64,
}

/// What one scout-only team did during full recon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconReport {
    /// Local team identity.
    pub id: TeamId,
    /// Display name.
    pub name: String,
    /// Accepted scout flights.
    pub flights: u64,
}

/// Summary of a finished mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionReport {
    /// Terminal session state.
    pub state: MissionState,
    /// When the mission was created.
    pub started_at: DateTime<Utc>,
    /// When the last task finished.
    pub finished_at: DateTime<Utc>,
    /// One entry per driving team, in join order.
    pub teams: Vec<TeamReport>,
    /// One entry per scout-only team, in join order.
    pub recon: Vec<ReconReport>,
    /// The first team whose rover visited every target.
    pub winner: Option<TeamId>,
    /// Targets in visiting order.
    pub route: Vec<Location>,
    /// Planned route length.
    pub route_distance: f64,
    /// Cells in the knowledge base at the end.
    pub known_cells: usize,
}

/// What a drive task hands back.
struct RoverRun {
    team: TeamId,
    result: Result<DriveOutcome, VehicleError>,
    location: Location,
    battery: u32,
    commands: u64,
}

/// One game session driven by this bot.
#[derive(Debug)]
pub struct Mission<A, N> {
    arbiter: Arc<A>,
    knowledge: Arc<KnowledgeBase>,
    config: MissionConfig,
    names: N,
    scope: CancelScope,
    state: MissionState,
    teams: Vec<Team>,
    recon: Vec<Team>,
    recon_flights: HashMap<TeamId, u64>,
    board: Option<Board>,
    route: PlannedRoute,
    started_at: DateTime<Utc>,
}

impl<A, N> Mission<A, N>
where
    A: Arbiter + 'static,
    N: NameSource,
{
    /// A mission that has not joined anything yet.
    pub fn new(
        arbiter: Arc<A>,
        knowledge: Arc<KnowledgeBase>,
        config: MissionConfig,
        names: N,
    ) -> Self {
        Self {
            arbiter,
            knowledge,
            config,
            names,
            scope: CancelScope::new(),
            state: MissionState::Joining,
            teams: Vec::new(),
            recon: Vec::new(),
            recon_flights: HashMap::new(),
            board: None,
            route: PlannedRoute::default(),
            started_at: Utc::now(),
        }
    }

    /// The root scope; cancelling it stops every task of the mission.
    pub const fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Current session state.
    pub const fn state(&self) -> MissionState {
        self.state
    }

    /// Driving teams joined so far.
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Scout-only teams joined so far.
    pub fn recon_teams(&self) -> &[Team] {
        &self.recon
    }

    /// Board geometry, known after the first join.
    pub const fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// The planned route (empty before the first join).
    pub const fn route(&self) -> &PlannedRoute {
        &self.route
    }

    /// The shared knowledge base.
    pub const fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    /// Join the configured teams, then play.
    pub async fn run(mut self) -> Result<MissionReport, MissionError> {
        self.join_configured().await?;
        Ok(self.play().await)
    }

    /// Join `config.teams` driving teams and, for full recon,
    /// `config.recon_teams` scout-only teams.
    pub async fn join_configured(&mut self) -> Result<usize, MissionError> {
        let game_id = self.config.game_id.clone();
        let joined = self.join_teams(self.config.teams, &game_id).await?;
        if self.config.effective_strategy() == ScoutStrategy::FullRecon {
            self.join_recon_teams(self.config.recon_teams, &game_id).await;
        }
        Ok(joined)
    }

    /// Join `n` driving teams to `game_id`, one after another.
    ///
    /// A failed join is logged and skipped. Returns the number of driving
    /// teams that joined.
    pub async fn join_teams(&mut self, n: u32, game_id: &str) -> Result<usize, MissionError> {
        let joined = self.join_many(n, game_id).await;
        self.teams.extend(joined);
        if self.teams.is_empty() {
            return Err(MissionError::NoTeams {
                game_id: game_id.to_owned(),
            });
        }
        info!(game_id, teams = self.teams.len(), requested = n, "teams joined");
        Ok(self.teams.len())
    }

    /// Join `n` scout-only teams for full recon. Their rovers are never
    /// driven. Returns the number that joined.
    pub async fn join_recon_teams(&mut self, n: u32, game_id: &str) -> usize {
        let joined = self.join_many(n, game_id).await;
        self.recon.extend(joined);
        info!(game_id, recon_teams = self.recon.len(), requested = n, "recon teams joined");
        self.recon.len()
    }

    async fn join_many(&mut self, n: u32, game_id: &str) -> Vec<Team> {
        self.state = MissionState::Joining;
        let mut joined = Vec::new();
        for attempt in 0..n {
            if self.scope.is_cancelled() {
                break;
            }
            let name = self.names.next_name();
            let grant = call_with_retry(&self.scope, &self.config.retry, "join_game", || {
                self.arbiter.join_game(game_id, &name)
            })
            .await;
            match grant {
                Ok(Some(grant)) => joined.push(self.admit(name, &grant)),
                Ok(None) => break,
                Err(err) => {
                    warn!(game_id, name = %name, attempt, error = %err, "join failed");
                }
            }
        }
        joined
    }

    fn admit(&mut self, name: String, grant: &JoinGrant) -> Team {
        let discovered = self.knowledge.merge(&grant.terrain);
        if self.board.is_none() {
            let board = Board::from_grant(grant);
            self.route = plan_route(&board.targets, Some((board.width, board.height)));
            info!(
                width = board.width,
                height = board.height,
                tiles = board.tiles.len(),
                targets = board.targets.len(),
                distance = self.route.distance,
                anchor = ?self.route.anchor,
                "route planned"
            );
            self.board = Some(board);
        }
        let team = Team::from_grant(name, grant, &self.scope);
        info!(team = %team.id, name = %team.name, start = %team.start, discovered, "team joined");
        team
    }

    /// Poll the game status until it is `Playing`.
    ///
    /// Returns the resulting state: `Playing`, or `Abandoned` if the status
    /// is `Invalid`, the poll budget runs out, or the mission is cancelled.
    pub async fn await_playing(&mut self) -> MissionState {
        self.state = self.poll_status().await;
        self.state
    }

    async fn poll_status(&self) -> MissionState {
        let Some(token) = self.teams.first().map(|team| team.token.clone()) else {
            return MissionState::Abandoned;
        };
        let mut backoff = Backoff::new(self.config.status_poll);
        loop {
            let status = call_with_retry(&self.scope, &self.config.retry, "status", || {
                self.arbiter.status(&token)
            })
            .await;
            match status {
                Ok(Some(GameStatus::Playing)) => {
                    info!("game is playing");
                    return MissionState::Playing;
                }
                Ok(Some(GameStatus::Joining)) => {
                    let Some(delay) = backoff.next_delay() else {
                        warn!(polls = backoff.attempts(), "game never started");
                        return MissionState::Abandoned;
                    };
                    debug!(wait_ms = delay.as_millis(), "waiting for game to start");
                    if !self.scope.sleep(delay).await {
                        return MissionState::Abandoned;
                    }
                }
                Ok(Some(GameStatus::Invalid)) => {
                    warn!("game status invalid");
                    return MissionState::Abandoned;
                }
                Ok(None) => return MissionState::Abandoned,
                Err(err) => {
                    warn!(error = %err, "status poll failed");
                    return MissionState::Abandoned;
                }
            }
        }
    }

    /// Wait for the game to start, then scout and drive until every rover
    /// has finished.
    pub async fn play(mut self) -> MissionReport {
        if self.state == MissionState::Joining {
            self.await_playing().await;
        }
        if self.state != MissionState::Playing {
            return self.report(MissionState::Abandoned, None, HashMap::new(), &RoverOutcome::Idle);
        }

        let (keeper, route) =
            RouteKeeper::new(self.route.targets.clone(), self.teams.iter().map(|team| team.id));
        let keeper = tokio::spawn(keeper.run());

        let strategy = self.config.effective_strategy();
        info!(
            ?strategy,
            teams = self.teams.len(),
            recon_teams = self.recon.len(),
            targets = route.ledger().route().len(),
            "mission playing"
        );
        let mut scouts: JoinSet<()> = JoinSet::new();
        match strategy {
            ScoutStrategy::None => self.seed_from_tiles(),
            ScoutStrategy::FullRecon => self.full_recon().await,
            ScoutStrategy::Escort => self.spawn_escorts(&mut scouts, &route),
        }

        let mut rovers: JoinSet<RoverRun> = JoinSet::new();
        let planning = PlanningConfig::from(&self.config);
        for team in &self.teams {
            let rover = team.rover(&self.arbiter, &self.knowledge, self.config.retry, planning);
            rovers.spawn(drive(rover, team.id, route.clone()));
        }

        let mut winner: Option<TeamId> = None;
        let mut runs: HashMap<TeamId, RoverRun> = HashMap::new();
        while let Some(joined) = rovers.join_next().await {
            let run = match joined {
                Ok(run) => run,
                Err(err) => {
                    warn!(error = %err, "drive task did not finish");
                    continue;
                }
            };
            if winner.is_none() && matches!(run.result, Ok(DriveOutcome::Won)) {
                info!(team = %run.team, "first rover completed the route, stopping scouts");
                winner = Some(run.team);
                self.cancel_all_scouting();
            }
            runs.insert(run.team, run);
        }

        self.cancel_all_scouting();
        while let Some(joined) = scouts.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "scout task did not finish");
            }
        }
        drop(route);
        match keeper.await {
            Ok(removed) => debug!(removed, "route keeper stopped"),
            Err(err) => warn!(error = %err, "route keeper did not finish"),
        }

        let stalled = runs
            .values()
            .any(|run| matches!(run.result, Ok(DriveOutcome::Stalled { .. })));
        let state = if winner.is_some() {
            MissionState::Won
        } else if stalled {
            MissionState::Stalled
        } else {
            MissionState::Abandoned
        };
        self.state = state;
        self.report(state, winner, runs, &RoverOutcome::Lost)
    }

    fn cancel_all_scouting(&self) {
        self.teams
            .iter()
            .chain(&self.recon)
            .for_each(Team::cancel_scouting);
    }

    /// Give every cell the difficulty of its low-resolution tile, without
    /// overwriting cells already discovered.
    fn seed_from_tiles(&self) {
        let Some(board) = &self.board else {
            return;
        };
        let seeded: usize = board
            .tiles
            .iter()
            .map(|tile| self.knowledge.merge(&tile.default_cells().collect::<Vec<_>>()))
            .sum();
        info!(seeded, "knowledge base seeded from low-resolution tiles");
    }

    /// Sweep every tile centre with the scout-only teams before any rover
    /// departs.
    async fn full_recon(&mut self) {
        let centres: Vec<Location> = self
            .board
            .as_ref()
            .map(|board| board.tiles.iter().map(|tile| tile.center()).collect())
            .unwrap_or_default();
        if self.recon.is_empty() {
            warn!(tiles = centres.len(), "no recon team joined, rovers start on partial terrain");
            return;
        }
        info!(tiles = centres.len(), scouts = self.recon.len(), "full reconnaissance started");
        let pool = Arc::new(Mutex::new(centres));
        let mut recon: JoinSet<(TeamId, u64)> = JoinSet::new();
        for team in &self.recon {
            let scout = team.scout(&self.arbiter, &self.knowledge, self.config.retry);
            recon.spawn(sweep(scout, team.id, Arc::clone(&pool)));
        }
        while let Some(joined) = recon.join_next().await {
            match joined {
                Ok((team, flights)) => {
                    self.recon_flights.insert(team, flights);
                }
                Err(err) => warn!(error = %err, "recon task did not finish"),
            }
        }
        info!(known_cells = self.knowledge.len(), "full reconnaissance finished");
    }

    fn spawn_escorts(&self, scouts: &mut JoinSet<()>, route: &RouteHandle) {
        for team in &self.teams {
            let scout = team.scout(&self.arbiter, &self.knowledge, self.config.retry);
            scouts.spawn(escort(
                scout,
                EscortPlan {
                    team: team.id,
                    start: team.start,
                    route: route.clone(),
                    knowledge: Arc::clone(&self.knowledge),
                    coverage: self.config.escort_coverage,
                    lookahead: self.config.escort_lookahead.max(1),
                },
            ));
        }
    }

    fn report(
        &self,
        state: MissionState,
        winner: Option<TeamId>,
        mut runs: HashMap<TeamId, RoverRun>,
        missing: &RoverOutcome,
    ) -> MissionReport {
        let teams = self
            .teams
            .iter()
            .map(|team| {
                let run = runs.remove(&team.id);
                let outcome = match run.as_ref().map(|run| &run.result) {
                    Some(Ok(DriveOutcome::Won)) => RoverOutcome::Won,
                    Some(Ok(DriveOutcome::Stalled { target })) => {
                        RoverOutcome::Stalled { target: *target }
                    }
                    Some(Ok(DriveOutcome::Cancelled)) => RoverOutcome::Cancelled,
                    Some(Err(err)) => RoverOutcome::Failed {
                        error: err.to_string(),
                    },
                    None => missing.clone(),
                };
                TeamReport {
                    id: team.id,
                    name: team.name.clone(),
                    outcome,
                    location: run.as_ref().map_or(team.start, |run| run.location),
                    battery: run.as_ref().map_or(team.battery, |run| run.battery),
                    commands: run.as_ref().map_or(0, |run| run.commands),
                }
            })
            .collect();
        let recon = self
            .recon
            .iter()
            .map(|team| ReconReport {
                id: team.id,
                name: team.name.clone(),
                flights: self.recon_flights.get(&team.id).copied().unwrap_or_default(),
            })
            .collect();
        let report = MissionReport {
            state,
            started_at: self.started_at,
            finished_at: Utc::now(),
            teams,
            recon,
            winner,
            route: self.route.targets.clone(),
            route_distance: self.route.distance,
            known_cells: self.knowledge.len(),
        };
        info!(
            state = ?report.state,
            winner = ?report.winner,
            known_cells = report.known_cells,
            elapsed_ms = report
                .finished_at
                .signed_duration_since(report.started_at)
                .num_milliseconds(),
            "mission finished"
        );
        report
    }
}

/// Drive one rover through the route.
async fn drive<A: Arbiter>(mut rover: Rover<A>, team: TeamId, route: RouteHandle) -> RoverRun {
    let result = rover.drive_to_targets(&route).await;
    match &result {
        Ok(outcome) => info!(team = %team, ?outcome, battery = rover.battery(), "rover finished"),
        Err(err) => warn!(team = %team, at = %rover.location(), error = %err, "rover aborted"),
    }
    RoverRun {
        team,
        result,
        location: rover.location(),
        battery: rover.battery(),
        commands: rover.commands(),
    }
}

/// Claim the nearest unvisited tile centre, fly there, repeat. Returns the
/// team and its accepted flights.
async fn sweep<A: Arbiter>(
    mut scout: Scout<A>,
    team: TeamId,
    pool: Arc<Mutex<Vec<Location>>>,
) -> (TeamId, u64) {
    while let Some(centre) = claim_nearest(&pool, scout.location()) {
        match scout.move_to_point(centre).await {
            Ok(Progress::Arrived) => debug!(team = %team, centre = %centre, "tile surveyed"),
            Ok(Progress::Cancelled) => break,
            Err(err) => {
                warn!(team = %team, centre = %centre, error = %err, "recon flight failed");
                break;
            }
        }
    }
    (team, scout.hops())
}

fn claim_nearest(pool: &Mutex<Vec<Location>>, here: Location) -> Option<Location> {
    let mut pool = pool.lock();
    let index = pool
        .iter()
        .enumerate()
        .min_by_key(|(_, centre)| here.manhattan_distance(**centre))
        .map(|(index, _)| index)?;
    Some(pool.swap_remove(index))
}

/// What an escort scout needs to follow its rover's route.
struct EscortPlan {
    team: TeamId,
    start: Location,
    route: RouteHandle,
    knowledge: Arc<KnowledgeBase>,
    coverage: f64,
    lookahead: usize,
}

impl EscortPlan {
    /// The corridors the rover will drive next: from the last reached point
    /// (or the start) through the next `lookahead` targets.
    async fn corridors(&self, lookahead: usize) -> Vec<(Location, Location)> {
        let ledger = self.route.ledger();
        let upcoming = ledger.upcoming(self.team, lookahead).await;
        let remaining = ledger.remaining(self.team).await;
        let route = ledger.route();
        let previous = route
            .len()
            .checked_sub(remaining)
            .and_then(|done| done.checked_sub(1))
            .and_then(|index| route.get(index))
            .copied()
            .unwrap_or(self.start);
        std::iter::once(previous)
            .chain(upcoming.iter().copied())
            .zip(upcoming.iter().copied())
            .collect()
    }

    /// Whether a corridor is still worth a flight.
    fn needs_flying(
        &self,
        flown: &HashSet<(Location, Location)>,
        corridor: (Location, Location),
    ) -> bool {
        !flown.contains(&corridor)
            && self.knowledge.coverage(corridor.0, corridor.1, ESCORT_CORRIDOR_BUFFER)
                < self.coverage
    }
}

/// Fly ahead of the team's rover over corridors that are still mostly
/// unknown. Stops when scouting is cancelled or no corridor left on the
/// route needs flying.
async fn escort<A: Arbiter>(mut scout: Scout<A>, plan: EscortPlan) {
    let mut flown: HashSet<(Location, Location)> = HashSet::new();
    loop {
        if scout.scope().is_cancelled() {
            return;
        }
        let next = plan
            .corridors(plan.lookahead)
            .await
            .into_iter()
            .find(|corridor| plan.needs_flying(&flown, *corridor));
        let Some((from, to)) = next else {
            let whole_route = plan.corridors(usize::MAX).await;
            if !whole_route.iter().any(|corridor| plan.needs_flying(&flown, *corridor)) {
                debug!(team = %plan.team, flown = flown.len(), "route known well enough, escort done");
                return;
            }
            if !scout.scope().sleep(ESCORT_IDLE_POLL).await {
                return;
            }
            continue;
        };
        flown.insert((from, to));
        debug!(team = %plan.team, from = %from, to = %to, "escorting corridor");
        for waypoint in [from, to] {
            match scout.move_to_point(waypoint).await {
                Ok(Progress::Arrived) => {}
                Ok(Progress::Cancelled) => return,
                Err(err) => {
                    warn!(team = %plan.team, to = %waypoint, error = %err, "escort flight failed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use traverse_types::Cell;

    use super::*;
    use crate::config::RetryConfig;
    use crate::sim::{SimArbiter, SimConfig, SimGrid};

    fn plan(route: RouteHandle, team: TeamId, knowledge: Arc<KnowledgeBase>) -> EscortPlan {
        EscortPlan {
            team,
            start: Location::new(0, 0),
            route,
            knowledge,
            coverage: 0.5,
            lookahead: 2,
        }
    }

    #[test]
    fn nearest_centre_is_claimed_once() {
        let pool = Mutex::new(vec![Location::new(10, 10), Location::new(2, 2), Location::new(5, 5)]);
        let here = Location::new(0, 0);
        assert_eq!(claim_nearest(&pool, here), Some(Location::new(2, 2)));
        assert_eq!(claim_nearest(&pool, here), Some(Location::new(5, 5)));
        assert_eq!(claim_nearest(&pool, here), Some(Location::new(10, 10)));
        assert_eq!(claim_nearest(&pool, here), None);
    }

    #[tokio::test]
    async fn corridors_start_from_last_reached_point() {
        let targets = vec![Location::new(2, 2), Location::new(6, 2), Location::new(6, 8)];
        let team = TeamId::new();
        let (keeper, route) = RouteKeeper::new(targets, [team]);
        tokio::spawn(keeper.run());
        let plan = plan(route.clone(), team, Arc::new(KnowledgeBase::new()));
        assert_eq!(
            plan.corridors(plan.lookahead).await,
            vec![
                (Location::new(0, 0), Location::new(2, 2)),
                (Location::new(2, 2), Location::new(6, 2)),
            ]
        );
        route.report_arrival(team, Location::new(2, 2)).await;
        assert_eq!(
            plan.corridors(plan.lookahead).await,
            vec![
                (Location::new(2, 2), Location::new(6, 2)),
                (Location::new(6, 2), Location::new(6, 8)),
            ]
        );
        assert_eq!(plan.corridors(usize::MAX).await.len(), 2);
    }

    #[tokio::test]
    async fn flown_or_known_corridors_need_no_flight() {
        let team = TeamId::new();
        let (_keeper, route) = RouteKeeper::new(vec![Location::new(4, 0)], [team]);
        let knowledge = Arc::new(KnowledgeBase::new());
        let plan = plan(route, team, Arc::clone(&knowledge));
        let corridor = (Location::new(0, 0), Location::new(4, 0));
        let mut flown = HashSet::new();
        assert!(plan.needs_flying(&flown, corridor));
        flown.insert(corridor);
        assert!(!plan.needs_flying(&flown, corridor));

        let cells: Vec<Cell> = (-2..=2)
            .flat_map(|y| (-2..=6).map(move |x| Cell::new(x, y, 1)))
            .collect();
        knowledge.merge(&cells);
        assert!(!plan.needs_flying(&HashSet::new(), corridor));
    }

    #[tokio::test(start_paused = true)]
    #[allow(clippy::unwrap_used)]
    async fn escort_ends_once_the_route_is_known() {
        let arbiter = Arc::new(SimArbiter::new(SimGrid::uniform(10, 10, 1), SimConfig::default()));
        let grant = arbiter.join_game("g", "escort").await.unwrap();
        let knowledge = Arc::new(KnowledgeBase::new());
        let cells: Vec<Cell> = (-2..12)
            .flat_map(|y| (-2..12).map(move |x| Cell::new(x, y, 1)))
            .collect();
        knowledge.merge(&cells);
        let team = TeamId::new();
        let (keeper, route) =
            RouteKeeper::new(vec![Location::new(4, 0), Location::new(8, 6)], [team]);
        tokio::spawn(keeper.run());
        let scout = Scout::new(
            Arc::clone(&arbiter),
            Arc::clone(&knowledge),
            grant.token,
            grant.start,
            CancelScope::new(),
            RetryConfig::default(),
        );
        let plan = plan(route, team, knowledge);
        tokio::time::timeout(Duration::from_secs(5), escort(scout, plan))
            .await
            .unwrap();
        assert_eq!(arbiter.stats().aerial_moves, 0);
    }
}
