//! Vehicle movement primitives.
//!
//! Each vehicle owns its last reported position and a [`CancelScope`].
//! Every movement primitive takes `&mut self`, so a vehicle never has more
//! than one movement in flight. The arbiter's reply is authoritative: after
//! every call the vehicle adopts the reported position (and, for the rover,
//! heading and battery) and merges the revealed terrain into the shared
//! knowledge base before deciding its next command.
//!
//! [`CancelScope`]: crate::cancel::CancelScope

pub mod rover;
pub mod scout;

use traverse_types::Location;

use crate::arbiter::ArbiterError;

pub use rover::{DriveOutcome, PlanningConfig, Rover, RoverState, drive_command};
pub use scout::{Scout, ScoutState};

/// How a movement primitive ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The vehicle stands on the requested location.
    Arrived,
    /// The vehicle's scope was cancelled first.
    Cancelled,
}

/// Errors that end a movement primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VehicleError {
    /// The arbiter refused a call, or transport retries ran out.
    #[error(transparent)]
    Arbiter(#[from] ArbiterError),

    /// The rover kept issuing commands without moving or turning.
    #[error("no progress from {at} toward {target} after {attempts} commands")]
    NoProgress {
        /// Where the rover is stuck.
        at: Location,
        /// Where it was trying to go.
        target: Location,
        /// Consecutive commands that changed nothing.
        attempts: u32,
    },

    /// A flight could not be shortened enough to be accepted.
    #[error("scout cannot reach {to} from {from}")]
    Unreachable {
        /// Where the scout is.
        from: Location,
        /// Where it was trying to fly.
        to: Location,
    },
}
