// Closed-loop motion primitives for the base.
//
// Two leaf controllers share this module: a PID heading-hold loop for
// driving straight and a pivot turn that polls the gyro until the base
// crosses an absolute heading. Exactly one of them may own the drive pair
// at a time. Both suspend cooperatively between iterations so other tasks
// (a watchdog, a button poll) can interleave; a loop body always runs to
// completion between yields.

pub mod heading_hold;
pub mod pivot;
pub mod stop;

#[cfg(test)]
pub(crate) mod sim;

pub use heading_hold::PidGains;

use std::time::{Duration, Instant};

use crate::BoxError;

/// Live yaw reading, in signed degrees relative to a caller-reset zero.
pub trait HeadingSensor {
    fn heading_degrees(&mut self) -> Result<f32, BoxError>;
}

/// Two-motor differential actuator.
///
/// `steer` takes one steering scalar plus one common velocity; splitting
/// them across the wheels is the implementation's job. All commands issue
/// and return immediately.
pub trait DrivePair {
    fn steer(&mut self, steering: f32, velocity: i16) -> Result<(), BoxError>;
    fn tank(&mut self, left: i16, right: i16) -> Result<(), BoxError>;
    /// Actively resist motion; plain power-off would coast.
    fn brake_hold(&mut self) -> Result<(), BoxError>;
}

/// Accumulated drive-wheel shaft position, in signed degrees.
pub trait WheelEncoder {
    fn position_degrees(&mut self) -> Result<i32, BoxError>;
}

/// Hardware context for the motion primitives: one heading sensor, one
/// drive pair, threaded explicitly rather than reached through globals.
pub struct Base<H, D> {
    heading: H,
    drive: D,
    max_maneuver: Option<Duration>,
}

impl<H: HeadingSensor, D: DrivePair> Base<H, D> {
    pub fn new(heading: H, drive: D) -> Self {
        Self {
            heading,
            drive,
            max_maneuver: None,
        }
    }

    /// Bound every subsequent maneuver to `limit`. Off by default; with
    /// no limit, an unreachable stop condition spins forever.
    pub fn with_maneuver_timeout(mut self, limit: Duration) -> Self {
        self.max_maneuver = Some(limit);
        self
    }

    fn deadline(&self) -> Option<Instant> {
        self.max_maneuver.map(|limit| Instant::now() + limit)
    }
}

pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|at| Instant::now() >= at)
}
