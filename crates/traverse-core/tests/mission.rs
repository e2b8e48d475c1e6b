//! Whole missions against the simulated arbiter.
//!
//! Every test runs on paused tokio time, so retry and backoff waits cost
//! nothing and results do not depend on machine speed.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use traverse_core::arbiter::{Arbiter, ArbiterError};
use traverse_core::config::{BackoffConfig, MissionConfig, PathConfig, RetryConfig};
use traverse_core::mission::{Mission, MissionError, RoverOutcome};
use traverse_core::names::FixedNames;
use traverse_core::sim::{SimArbiter, SimConfig, SimGrid};
use traverse_types::{
    AerialMove, Cell, Direction, GameStatus, GroundMove, JoinGrant, Location, MissionState,
    ScoutStrategy,
};
use traverse_world::KnowledgeBase;

fn targets() -> Vec<Location> {
    vec![Location::new(17, 17), Location::new(4, 11), Location::new(14, 3)]
}

fn sim(config: SimConfig) -> Arc<SimArbiter> {
    Arc::new(SimArbiter::new(SimGrid::random(20, 20, 5, 7), config))
}

fn sim_with_targets() -> Arc<SimArbiter> {
    sim(SimConfig {
        targets: targets(),
        ..SimConfig::default()
    })
}

fn config(strategy: ScoutStrategy, teams: u32) -> MissionConfig {
    MissionConfig {
        teams,
        strategy,
        escort_coverage: 1.0,
        retry: RetryConfig {
            rate_limit_delay_ms: 10,
            ..RetryConfig::default()
        },
        ..MissionConfig::default()
    }
}

fn mission<A: Arbiter + 'static>(
    arbiter: &Arc<A>,
    config: MissionConfig,
) -> Mission<A, FixedNames> {
    Mission::new(
        Arc::clone(arbiter),
        Arc::new(KnowledgeBase::new()),
        config,
        FixedNames::numbered("team"),
    )
}

#[tokio::test(start_paused = true)]
async fn escorted_rovers_visit_every_target() {
    let arbiter = sim_with_targets();
    let report = mission(&arbiter, config(ScoutStrategy::Escort, 2))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, MissionState::Won);
    assert!(report.winner.is_some());
    assert_eq!(report.route.len(), 3);
    assert_eq!(report.teams.len(), 2);
    for team in &report.teams {
        assert_eq!(team.outcome, RoverOutcome::Won);
        assert!(targets().contains(&team.location));
    }
    assert!(arbiter.stats().aerial_moves > 0);
    assert_eq!(arbiter.team_names(), vec!["team-1", "team-2"]);
}

#[tokio::test(start_paused = true)]
async fn full_recon_reveals_the_board_before_driving() {
    let arbiter = Arc::new(SimArbiter::new(
        SimGrid::random(15, 15, 5, 3),
        SimConfig {
            targets: vec![Location::new(12, 2), Location::new(3, 13)],
            ..SimConfig::default()
        },
    ));
    let config = MissionConfig {
        recon_teams: 3,
        ..config(ScoutStrategy::FullRecon, 2)
    };
    let report = mission(&arbiter, config).run().await.unwrap();

    assert_eq!(report.state, MissionState::Won);
    assert_eq!(report.teams.len(), 2);
    assert_eq!(report.recon.len(), 3);
    // Radius 2 around each 5 x 5 tile centre covers the whole tile.
    assert_eq!(report.known_cells, 225);
}

#[tokio::test(start_paused = true)]
async fn recon_teams_fly_but_never_drive() {
    let arbiter = Arc::new(Recorder::new(SimArbiter::new(
        SimGrid::random(15, 15, 5, 3),
        SimConfig {
            targets: vec![Location::new(12, 2), Location::new(3, 13)],
            ..SimConfig::default()
        },
    )));
    let config = MissionConfig {
        recon_teams: 2,
        ..config(ScoutStrategy::FullRecon, 1)
    };
    let report = mission(&arbiter, config).run().await.unwrap();

    assert_eq!(report.state, MissionState::Won);
    assert_eq!(report.teams.len(), 1);
    assert_eq!(report.recon.len(), 2);
    assert!(report.recon.iter().all(|team| team.flights > 0));
    assert_eq!(arbiter.sim.team_names(), vec!["team-1", "team-2", "team-3"]);
    // Driving teams join first, so the recon teams hold the later tokens.
    for token in ["sim-2", "sim-3"] {
        assert!(arbiter.moves(token, Call::Aerial) > 0);
        assert_eq!(arbiter.moves(token, Call::Ground), 0);
    }
    assert_eq!(arbiter.moves("sim-1", Call::Aerial), 0);
    assert!(arbiter.moves("sim-1", Call::Ground) > 0);
    assert_eq!(report.known_cells, 225);
}

#[tokio::test(start_paused = true)]
async fn first_win_stops_every_scout() {
    let corners = vec![
        Location::new(2, 2),
        Location::new(17, 2),
        Location::new(17, 17),
        Location::new(2, 17),
    ];
    let mut recorder = Recorder::new(SimArbiter::new(
        SimGrid::uniform(20, 20, 1),
        SimConfig {
            targets: corners,
            latency: Duration::from_millis(10),
            ..SimConfig::default()
        },
    ));
    recorder.slow_ground = Some(("sim-2", Duration::from_millis(200)));
    recorder.aerial_delay = Duration::from_millis(100);
    let arbiter = Arc::new(recorder);

    // The edges of the square are known, so rovers drive at once while the
    // scouts still have the corridors' surroundings to fly.
    let knowledge = Arc::new(KnowledgeBase::new());
    let ring: Vec<Cell> = (2..=17)
        .flat_map(|i| {
            [
                Cell::new(i, 2, 1),
                Cell::new(i, 17, 1),
                Cell::new(2, i, 1),
                Cell::new(17, i, 1),
            ]
        })
        .collect();
    knowledge.merge(&ring);
    let config = MissionConfig {
        escort_lookahead: 4,
        ..config(ScoutStrategy::Escort, 2)
    };
    let report = Mission::new(
        Arc::clone(&arbiter),
        knowledge,
        config,
        FixedNames::numbered("team"),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(report.state, MissionState::Won);
    let fast = report.teams.first().unwrap();
    assert_eq!(report.winner, Some(fast.id));
    assert!(report.teams.iter().all(|team| team.outcome == RoverOutcome::Won));

    let won_at = arbiter.last_completed("sim-1", Call::Ground).unwrap();
    assert!(arbiter.moves("sim-2", Call::Aerial) > 0);
    assert_eq!(arbiter.issued_after(None, Call::Aerial, won_at), 0);
    // The slow rover kept driving after the win.
    assert!(arbiter.issued_after(Some("sim-2"), Call::Ground, won_at) > 0);
}

#[tokio::test(start_paused = true)]
async fn quick_mode_plans_over_tile_estimates() {
    let arbiter = sim_with_targets();
    let config = MissionConfig {
        quick_mode: true,
        ..config(ScoutStrategy::Escort, 1)
    };
    let report = mission(&arbiter, config).run().await.unwrap();

    assert_eq!(report.state, MissionState::Won);
    assert_eq!(report.known_cells, 400);
    assert_eq!(arbiter.stats().aerial_moves, 0);
}

#[tokio::test(start_paused = true)]
async fn rate_limits_are_absorbed() {
    let arbiter = sim(SimConfig {
        targets: targets(),
        rate_limit_every: Some(3),
        ..SimConfig::default()
    });
    let report = mission(&arbiter, config(ScoutStrategy::None, 1))
        .run()
        .await
        .unwrap();

    assert_eq!(report.state, MissionState::Won);
    assert!(arbiter.stats().rate_limited > 0);
}

#[tokio::test(start_paused = true)]
async fn blind_rover_stalls() {
    // Every flight is refused, so the rover never learns the far terrain.
    let arbiter = sim(SimConfig {
        targets: vec![Location::new(15, 15)],
        max_flight: Some(0),
        ..SimConfig::default()
    });
    let config = MissionConfig {
        path: PathConfig {
            max_path_attempts: 3,
            backoff: BackoffConfig {
                initial_ms: 10,
                max_ms: 40,
                max_attempts: 5,
            },
        },
        ..config(ScoutStrategy::Escort, 1)
    };
    let report = mission(&arbiter, config).run().await.unwrap();

    assert_eq!(report.state, MissionState::Stalled);
    assert_eq!(report.winner, None);
    assert_eq!(
        report.teams.first().map(|t| t.outcome.clone()),
        Some(RoverOutcome::Stalled {
            target: Location::new(15, 15)
        })
    );
    assert_eq!(arbiter.stats().ground_moves, 0);
}

#[tokio::test(start_paused = true)]
async fn game_that_never_starts_is_abandoned() {
    let arbiter = sim(SimConfig {
        targets: targets(),
        polls_until_playing: 50,
        ..SimConfig::default()
    });
    let config = MissionConfig {
        status_poll: BackoffConfig {
            initial_ms: 10,
            max_ms: 20,
            max_attempts: 3,
        },
        ..config(ScoutStrategy::None, 1)
    };
    let report = mission(&arbiter, config).run().await.unwrap();

    assert_eq!(report.state, MissionState::Abandoned);
    assert_eq!(
        report.teams.first().map(|t| t.outcome.clone()),
        Some(RoverOutcome::Idle)
    );
    assert_eq!(arbiter.stats().ground_moves, 0);
}

/// Which move a [`Recorder`] entry is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Ground,
    Aerial,
}

#[derive(Debug, Clone)]
struct Entry {
    token: String,
    call: Call,
    issued: Instant,
    completed: Instant,
}

/// Delegates to the simulator, logs every move request, and can hold back
/// replies to make one rover or every scout slower.
struct Recorder {
    sim: SimArbiter,
    slow_ground: Option<(&'static str, Duration)>,
    aerial_delay: Duration,
    log: Mutex<Vec<Entry>>,
}

impl Recorder {
    fn new(sim: SimArbiter) -> Self {
        Self {
            sim,
            slow_ground: None,
            aerial_delay: Duration::ZERO,
            log: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, token: &str, call: Call, issued: Instant) {
        self.log.lock().push(Entry {
            token: token.to_owned(),
            call,
            issued,
            completed: Instant::now(),
        });
    }

    fn moves(&self, token: &str, call: Call) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.token == token && entry.call == call)
            .count()
    }

    fn last_completed(&self, token: &str, call: Call) -> Option<Instant> {
        self.log
            .lock()
            .iter()
            .filter(|entry| entry.token == token && entry.call == call)
            .map(|entry| entry.completed)
            .max()
    }

    fn issued_after(&self, token: Option<&str>, call: Call, after: Instant) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|entry| token.is_none_or(|token| entry.token == token))
            .filter(|entry| entry.call == call && entry.issued > after)
            .count()
    }
}

impl Arbiter for Recorder {
    async fn join_game(&self, game_id: &str, name: &str) -> Result<JoinGrant, ArbiterError> {
        self.sim.join_game(game_id, name).await
    }

    async fn move_ground(
        &self,
        token: &str,
        direction: Direction,
    ) -> Result<GroundMove, ArbiterError> {
        let issued = Instant::now();
        let reply = self.sim.move_ground(token, direction).await;
        if let Some((_, delay)) = self.slow_ground.filter(|(slow, _)| *slow == token) {
            tokio::time::sleep(delay).await;
        }
        self.record(token, Call::Ground, issued);
        reply
    }

    async fn move_aerial(
        &self,
        token: &str,
        destination: Location,
    ) -> Result<AerialMove, ArbiterError> {
        let issued = Instant::now();
        let reply = self.sim.move_aerial(token, destination).await;
        tokio::time::sleep(self.aerial_delay).await;
        self.record(token, Call::Aerial, issued);
        reply
    }

    async fn status(&self, token: &str) -> Result<GameStatus, ArbiterError> {
        self.sim.status(token).await
    }
}

/// Delegates to the simulator but reports every game as invalid.
struct FinishedGame(SimArbiter);

impl Arbiter for FinishedGame {
    async fn join_game(&self, game_id: &str, name: &str) -> Result<JoinGrant, ArbiterError> {
        self.0.join_game(game_id, name).await
    }

    async fn move_ground(
        &self,
        token: &str,
        direction: Direction,
    ) -> Result<GroundMove, ArbiterError> {
        self.0.move_ground(token, direction).await
    }

    async fn move_aerial(
        &self,
        token: &str,
        destination: Location,
    ) -> Result<AerialMove, ArbiterError> {
        self.0.move_aerial(token, destination).await
    }

    async fn status(&self, _token: &str) -> Result<GameStatus, ArbiterError> {
        Ok(GameStatus::Invalid)
    }
}

#[tokio::test(start_paused = true)]
async fn invalid_game_is_abandoned() {
    let arbiter = Arc::new(FinishedGame(SimArbiter::new(
        SimGrid::uniform(10, 10, 1),
        SimConfig {
            targets: vec![Location::new(5, 5)],
            ..SimConfig::default()
        },
    )));
    let report = mission(&arbiter, config(ScoutStrategy::Escort, 1))
        .run()
        .await
        .unwrap();
    assert_eq!(report.state, MissionState::Abandoned);
    assert_eq!(arbiter.0.stats().ground_moves, 0);
}

#[tokio::test(start_paused = true)]
async fn rejected_joins_are_skipped() {
    let arbiter = sim_with_targets();
    let mut mission = Mission::new(
        Arc::clone(&arbiter),
        Arc::new(KnowledgeBase::new()),
        config(ScoutStrategy::None, 3),
        FixedNames::new(["alpha", "alpha", "bravo"]),
    );
    let joined = mission.join_teams(3, "n").await.unwrap();
    assert_eq!(joined, 2);
    let names: Vec<&str> = mission.teams().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "bravo"]);
    assert_eq!(mission.route().targets.len(), 3);
    assert!(mission.board().is_some());
}

#[tokio::test(start_paused = true)]
async fn no_joined_team_is_an_error() {
    let arbiter = sim_with_targets();
    arbiter.join_game("n", "alpha").await.unwrap();
    let mut mission = Mission::new(
        Arc::clone(&arbiter),
        Arc::new(KnowledgeBase::new()),
        config(ScoutStrategy::None, 1),
        FixedNames::new(["alpha"]),
    );
    let err = mission.join_teams(1, "n").await.unwrap_err();
    assert_eq!(
        err,
        MissionError::NoTeams {
            game_id: "n".to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn cancelling_the_mission_stops_the_rovers() {
    let arbiter = sim(SimConfig {
        targets: targets(),
        latency: Duration::from_millis(10),
        ..SimConfig::default()
    });
    let mut mission = mission(&arbiter, config(ScoutStrategy::None, 1));
    mission.join_teams(1, "n").await.unwrap();

    let scope = mission.scope().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        scope.cancel();
    });
    let report = mission.play().await;

    assert_eq!(report.state, MissionState::Abandoned);
    assert_eq!(
        report.teams.first().map(|t| t.outcome.clone()),
        Some(RoverOutcome::Cancelled)
    );
    let moves = arbiter.stats().ground_moves;
    assert!(moves > 0);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(arbiter.stats().ground_moves, moves);
}
