// Ports, unit ids, physical constants, and the PID tuning profile.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::BoxError;
use crate::control::PidGains;

// Serial port of the base controller board
pub const HUB_PORT: &str = "/dev/ttyACM0";

// Scale from the IMU's raw yaw register (tenths of a degree, opposite
// sign) to heading degrees
pub const GYRO_SCALE: f32 = -0.1;

// Drive wheel circumference
pub const WHEEL_CIRCUMFERENCE_CM: f32 = 17.584;

// Poll tick for the pivot-turn stop condition
pub const PIVOT_POLL_TICK: Duration = Duration::from_millis(10);

// Gyro settle polling: tick length and attempt cap. Initialization
// proceeds after the cap even if the gyro never reports settled.
pub const GYRO_SETTLE_TICK: Duration = Duration::from_millis(10);
pub const GYRO_SETTLE_TRIES: u32 = 100;

/// PID gains for the heading-hold loop, loadable from a JSON file so field
/// tuning doesn't require a rebuild.
///
/// `kp` is stated for forward travel; use [`PidGains::reversed`] when
/// driving backward.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Tuning {
    pub kp: f32,
    #[serde(default)]
    pub ki: f32,
    #[serde(default)]
    pub kd: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            kp: 1.45,
            ki: 0.0,
            kd: 0.0,
        }
    }
}

impl Tuning {
    /// Load a tuning profile from a JSON file, e.g. `{"kp": 1.45}`.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        let raw = std::fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub fn gains(&self) -> PidGains {
        PidGains::new(self.kp, self.ki, self.kd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_defaults() {
        let tuning = Tuning::default();
        assert_eq!(tuning.kp, 1.45);
        assert_eq!(tuning.ki, 0.0);
        assert_eq!(tuning.kd, 0.0);
    }

    #[test]
    fn test_tuning_parses_partial_profile() {
        let tuning: Tuning = serde_json::from_str(r#"{"kp": 2.0}"#).unwrap();
        assert_eq!(tuning.kp, 2.0);
        assert_eq!(tuning.ki, 0.0);
        assert_eq!(tuning.kd, 0.0);
    }
}
