// Pivot turn to an absolute heading.
//
// Wheel speeds are commanded once (open loop); only the stop condition is
// closed on the gyro. The threshold is directional, chosen from the
// heading at call time; a call that is already past its target falls
// through without commanding the wheels.

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Base, DrivePair, HeadingSensor, expired};
use crate::BoxError;
use crate::config::PIVOT_POLL_TICK;

/// Which side of the threshold the turn still has to cross, fixed from the
/// starting heading.
#[derive(Clone, Copy)]
enum Threshold {
    /// Target 0 approached from a positive heading.
    AboveZero,
    /// Heading magnitude shrinking toward the target magnitude.
    ShrinkTo(f32),
    /// Heading magnitude growing toward the target magnitude.
    GrowTo(f32),
}

impl Threshold {
    /// None means the starting heading is already at or past the target.
    fn select(start: f32, target_angle: f32) -> Option<Self> {
        if target_angle == 0.0 {
            if start > 0.0 {
                Some(Self::AboveZero)
            } else {
                None
            }
        } else {
            let target = target_angle.abs();
            if start.abs() > target {
                Some(Self::ShrinkTo(target))
            } else if start.abs() < target {
                Some(Self::GrowTo(target))
            } else {
                None
            }
        }
    }

    fn still_turning(self, heading: f32) -> bool {
        match self {
            Self::AboveZero => heading >= 0.0,
            Self::ShrinkTo(target) => heading.abs() >= target,
            Self::GrowTo(target) => heading.abs() <= target,
        }
    }
}

impl<H: HeadingSensor, D: DrivePair> Base<H, D> {
    /// Tank-turn at the given wheel speeds until the gyro crosses
    /// `target_angle`, then hold-stop if `brake` is set (otherwise the
    /// wheels keep running at the commanded speeds and the caller must
    /// stop them).
    ///
    /// Opposite-sign speeds spin in place; same-sign speeds of different
    /// magnitude arc.
    pub async fn pivot_to_heading(
        &mut self,
        left_speed: i16,
        right_speed: i16,
        target_angle: f32,
        brake: bool,
    ) -> Result<(), BoxError> {
        let deadline = self.deadline();
        let start = self.heading.heading_degrees()?;
        debug!(left_speed, right_speed, target_angle, start, "pivot start");

        if let Some(threshold) = Threshold::select(start, target_angle) {
            self.drive.tank(left_speed, right_speed)?;
            loop {
                if expired(deadline) {
                    warn!(target_angle, "pivot hit the maneuver timeout");
                    break;
                }
                let heading = self.heading.heading_degrees()?;
                if !threshold.still_turning(heading) {
                    break;
                }
                sleep(PIVOT_POLL_TICK).await;
            }
        }

        if brake {
            self.drive.brake_hold()?;
        }
        Ok(())
    }

    /// Arc turn around the stationary left wheel.
    pub async fn turn_left(
        &mut self,
        speed: i16,
        target_angle: f32,
        brake: bool,
    ) -> Result<(), BoxError> {
        self.pivot_to_heading(0, speed, target_angle, brake).await
    }

    /// Arc turn around the stationary right wheel.
    pub async fn turn_right(
        &mut self,
        speed: i16,
        target_angle: f32,
        brake: bool,
    ) -> Result<(), BoxError> {
        self.pivot_to_heading(speed, 0, target_angle, brake).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::control::sim::{DriveCall, RecordingDrive, ScriptedHeading};

    fn base(script: &[f32]) -> Base<ScriptedHeading, RecordingDrive> {
        Base::new(ScriptedHeading::new(script), RecordingDrive::default())
    }

    #[tokio::test]
    async fn test_pivot_waits_for_zero_crossing_from_positive() {
        let mut base = base(&[30.0, 20.0, 10.0, 5.0, -1.0]);
        base.pivot_to_heading(100, -100, 0.0, true).await.unwrap();

        assert_eq!(
            base.drive.calls,
            vec![
                DriveCall::Tank {
                    left: 100,
                    right: -100
                },
                DriveCall::BrakeHold,
            ]
        );
        // Polled through the whole script: still turning at +5, done at -1.
        assert_eq!(base.heading.reads, 5);
    }

    #[tokio::test]
    async fn test_pivot_past_zero_target_returns_on_first_check() {
        let mut base = base(&[-5.0]);
        base.pivot_to_heading(100, -100, 0.0, true).await.unwrap();

        // Already past the target: one heading read, no wheel command,
        // just the requested hold-stop.
        assert_eq!(base.heading.reads, 1);
        assert_eq!(base.drive.calls, vec![DriveCall::BrakeHold]);
    }

    #[tokio::test]
    async fn test_pivot_past_zero_target_without_brake_never_actuates() {
        let mut base = base(&[-5.0]);
        base.pivot_to_heading(100, -100, 0.0, false).await.unwrap();

        assert!(base.drive.calls.is_empty());
    }

    #[tokio::test]
    async fn test_pivot_polls_until_magnitude_reached() {
        let mut base = base(&[10.0, 25.0, 45.0, 70.0, 88.0, 92.0]);
        base.pivot_to_heading(200, -200, 90.0, true).await.unwrap();

        // Must not stop at 45; only the 92 reading ends the turn.
        assert_eq!(base.heading.reads, 6);
        assert_eq!(
            base.drive.calls,
            vec![
                DriveCall::Tank {
                    left: 200,
                    right: -200
                },
                DriveCall::BrakeHold,
            ]
        );
    }

    #[tokio::test]
    async fn test_pivot_shrinks_magnitude_when_starting_outside() {
        let mut base = base(&[120.0, 110.0, 95.0, 89.0]);
        base.pivot_to_heading(-150, 150, 90.0, true).await.unwrap();

        assert_eq!(base.heading.reads, 4);
        assert_eq!(
            base.drive.calls.first(),
            Some(&DriveCall::Tank {
                left: -150,
                right: 150
            })
        );
    }

    #[tokio::test]
    async fn test_pivot_without_brake_leaves_wheels_running() {
        let mut base = base(&[30.0, 10.0, -2.0]);
        base.pivot_to_heading(100, -100, 0.0, false).await.unwrap();

        assert_eq!(
            base.drive.calls,
            vec![DriveCall::Tank {
                left: 100,
                right: -100
            }]
        );
    }

    #[tokio::test]
    async fn test_pivot_timeout_ends_a_stuck_turn() {
        // Heading never crosses; the configured limit ends the turn.
        let mut base = base(&[30.0]).with_maneuver_timeout(Duration::ZERO);
        base.pivot_to_heading(100, -100, 0.0, true).await.unwrap();

        assert_eq!(
            base.drive.calls,
            vec![
                DriveCall::Tank {
                    left: 100,
                    right: -100
                },
                DriveCall::BrakeHold,
            ]
        );
    }

    #[tokio::test]
    async fn test_turn_wrappers_hold_one_wheel() {
        {
            let mut base = base(&[10.0, 50.0]);
            base.turn_left(200, 45.0, true).await.unwrap();
            assert_eq!(
                base.drive.calls.first(),
                Some(&DriveCall::Tank {
                    left: 0,
                    right: 200
                })
            );
        }

        let mut base = base(&[10.0, 50.0]);
        base.turn_right(-200, 45.0, true).await.unwrap();
        assert_eq!(
            base.drive.calls.first(),
            Some(&DriveCall::Tank {
                left: -200,
                right: 0
            })
        );
    }
}
