// Heading-hold drive: PID on heading error while travelling at a fixed
// speed, until the caller's stop predicate turns false.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Base, DrivePair, HeadingSensor, expired};
use crate::BoxError;

/// Gains for the heading-hold loop.
///
/// `kp` must match the travel direction: positive for forward speeds,
/// negative for reverse, or the steering correction pushes the drift the
/// wrong way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Pure-proportional gains, the usual starting point when tuning.
    pub const fn proportional(kp: f32) -> Self {
        Self::new(kp, 0.0, 0.0)
    }

    /// The same gains for the opposite travel direction.
    pub const fn reversed(self) -> Self {
        Self::new(-self.kp, -self.ki, -self.kd)
    }
}

impl<H: HeadingSensor, D: DrivePair> Base<H, D> {
    /// Drive at `speed` holding `target_angle`, correcting drift with a PID
    /// on heading error, until `keep_going` returns false. Always finishes
    /// with a hold-stop so the base does not coast past the stop point.
    ///
    /// `pacing` suspends each iteration for a fixed delay; with no pacing
    /// the loop still yields to the scheduler between iterations. The
    /// predicate is evaluated at the top of every iteration, before any
    /// sensor read or actuation.
    pub async fn drive_holding_heading<F>(
        &mut self,
        gains: PidGains,
        speed: i16,
        target_angle: f32,
        pacing: Option<Duration>,
        mut keep_going: F,
    ) -> Result<(), BoxError>
    where
        F: FnMut() -> bool,
    {
        let deadline = self.deadline();

        // Loop-local PID state: a fresh invocation never inherits integral
        // or derivative history from an earlier run.
        let mut integral = 0.0f32;
        let mut last_error = 0.0f32;

        debug!(speed, target_angle, "heading hold start");
        while keep_going() {
            if expired(deadline) {
                warn!(target_angle, "heading hold hit the maneuver timeout");
                break;
            }

            let current = self.heading.heading_degrees()?;
            let error = current - target_angle;
            integral += error;
            let derivative = error - last_error;
            last_error = error;

            let steering = gains.kp * error + gains.ki * integral + gains.kd * derivative;
            self.drive.steer(steering, speed)?;

            match pacing {
                Some(delay) => sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
        }

        self.drive.brake_hold()
    }
}
