//! A joined team: one scout and one rover sharing a session token.

use std::sync::Arc;

use traverse_types::{JoinGrant, Location, Orientation, TeamId};
use traverse_world::KnowledgeBase;

use crate::arbiter::Arbiter;
use crate::cancel::CancelScope;
use crate::config::RetryConfig;
use crate::vehicle::{PlanningConfig, Rover, Scout};

/// Identity and starting state of a team, plus its cancellation scopes.
///
/// The team scope is a child of the mission scope; the scout and rover
/// scopes are children of the team scope, so scouting can be stopped
/// without touching the rover.
#[derive(Debug, Clone)]
pub struct Team {
    /// Local identity, used in logs and the route ledger.
    pub id: TeamId,
    /// Display name the team joined with.
    pub name: String,
    /// Session token issued by the arbiter.
    pub token: String,
    /// Where both vehicles start.
    pub start: Location,
    /// Initial rover heading.
    pub orientation: Orientation,
    /// Initial rover battery.
    pub battery: u32,
    scope: CancelScope,
    scout_scope: CancelScope,
    rover_scope: CancelScope,
}

impl Team {
    /// Build a team from its join grant, scoped under `mission`.
    pub fn from_grant(name: String, grant: &JoinGrant, mission: &CancelScope) -> Self {
        let scope = mission.child();
        let scout_scope = scope.child();
        let rover_scope = scope.child();
        Self {
            id: TeamId::new(),
            name,
            token: grant.token.clone(),
            start: grant.start,
            orientation: grant.orientation,
            battery: grant.battery,
            scope,
            scout_scope,
            rover_scope,
        }
    }

    /// The team's own scope.
    pub const fn scope(&self) -> &CancelScope {
        &self.scope
    }

    /// Stop the scout after its current flight.
    pub fn cancel_scouting(&self) {
        self.scout_scope.cancel();
    }

    /// The team's scout, at the start location.
    pub fn scout<A: Arbiter>(
        &self,
        arbiter: &Arc<A>,
        knowledge: &Arc<KnowledgeBase>,
        retry: RetryConfig,
    ) -> Scout<A> {
        Scout::new(
            Arc::clone(arbiter),
            Arc::clone(knowledge),
            self.token.clone(),
            self.start,
            self.scout_scope.clone(),
            retry,
        )
    }

    /// The team's rover, as described by the grant.
    pub fn rover<A: Arbiter>(
        &self,
        arbiter: &Arc<A>,
        knowledge: &Arc<KnowledgeBase>,
        retry: RetryConfig,
        planning: PlanningConfig,
    ) -> Rover<A> {
        Rover::new(
            Arc::clone(arbiter),
            Arc::clone(knowledge),
            self.id,
            self.token.clone(),
            (self.start, self.orientation, self.battery),
            self.rover_scope.clone(),
            retry,
            planning,
        )
    }
}
