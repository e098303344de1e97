// High-level driver for the two-wheel base.
//
// Owns the bus behind a shared lock and hands out per-concern handles so a
// stop predicate can read the wheel encoder while a motion primitive owns
// the drive path. The lock is uncontended in practice: only one motion
// primitive runs at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::bus::{HubBus, HubError, OperatingMode, Register};
use super::kinematics::steer_to_tank;
use crate::BoxError;
use crate::config::{GYRO_SCALE, GYRO_SETTLE_TICK, GYRO_SETTLE_TRIES};
use crate::control::{DrivePair, HeadingSensor, WheelEncoder};

/// Bus unit ids as configured on the base board.
pub const MOTOR_ID_LEFT: u8 = 1;
pub const MOTOR_ID_RIGHT: u8 = 2;
pub const IMU_ID: u8 = 10;

type SharedBus = Arc<Mutex<HubBus>>;

fn lock(bus: &SharedBus) -> Result<MutexGuard<'_, HubBus>, HubError> {
    bus.lock().map_err(|_| HubError::Poisoned)
}

pub struct HubDriver {
    bus: SharedBus,
    left: u8,
    right: u8,
    imu: u8,
}

impl HubDriver {
    pub fn open(port: &str) -> Result<Self, HubError> {
        Self::with_unit_ids(port, MOTOR_ID_LEFT, MOTOR_ID_RIGHT, IMU_ID)
    }

    pub fn with_unit_ids(port: &str, left: u8, right: u8, imu: u8) -> Result<Self, HubError> {
        info!("Opening base controller bus on {}", port);
        let bus = HubBus::open(port)?;
        Ok(Self {
            bus: Arc::new(Mutex::new(bus)),
            left,
            right,
            imu,
        })
    }

    /// Put the wheel servos into velocity mode with torque held.
    ///
    /// Torque must be dropped before the mode change and re-enabled after;
    /// a unit that fails to answer a ping aborts initialization.
    pub fn initialize(&self) -> Result<(), HubError> {
        let mut bus = lock(&self.bus)?;
        info!(
            "Initializing units: wheels {} and {}, imu {}",
            self.left, self.right, self.imu
        );

        for id in [self.left, self.right, self.imu] {
            match bus.ping(id)? {
                true => debug!(id, "unit responding"),
                false => {
                    warn!(id, "unit not responding to ping");
                    return Err(HubError::Timeout { id });
                }
            }
        }

        for id in [self.left, self.right] {
            bus.set_torque(id, false)?;
        }
        for id in [self.left, self.right] {
            bus.set_operating_mode(id, OperatingMode::Velocity)?;
        }
        for id in [self.left, self.right] {
            bus.set_torque(id, true)?;
        }

        info!("Wheel servos ready for velocity control");
        Ok(())
    }

    /// Re-zero the yaw reference, then poll until the gyro reports settled.
    ///
    /// The wait is capped; past the cap initialization proceeds anyway
    /// with a warning rather than failing the run.
    pub async fn settle_gyro(&self) -> Result<(), HubError> {
        lock(&self.bus)?.write_u8(self.imu, Register::YawReset, 1)?;

        for tick in 0..GYRO_SETTLE_TRIES {
            let status = lock(&self.bus)?.read_u8(self.imu, Register::MotionStatus)?;
            if status & 0x01 != 0 {
                debug!(ticks = tick, "gyro settled");
                return Ok(());
            }
            sleep(GYRO_SETTLE_TICK).await;
        }

        warn!("gyro never reported settled, proceeding anyway");
        Ok(())
    }

    pub fn drive_pair(&self) -> HubDrivePair {
        HubDrivePair {
            bus: self.bus.clone(),
            left: self.left,
            right: self.right,
        }
    }

    pub fn heading_sensor(&self) -> HubHeadingSensor {
        HubHeadingSensor {
            bus: self.bus.clone(),
            imu: self.imu,
        }
    }

    /// Encoder handle for the left drive wheel, the one distance
    /// predicates are calibrated against.
    pub fn wheel_encoder(&self) -> HubWheelEncoder {
        HubWheelEncoder {
            bus: self.bus.clone(),
            id: self.left,
        }
    }

    /// Drop torque on both wheels so the base can be pushed by hand.
    pub fn release(&self) -> Result<(), HubError> {
        let mut bus = lock(&self.bus)?;
        info!("Releasing wheel torque");
        for id in [self.left, self.right] {
            bus.set_torque(id, false)?;
        }
        Ok(())
    }
}

impl Drop for HubDriver {
    fn drop(&mut self) {
        // Stop the wheels when the driver goes away (safety measure).
        let Ok(mut bus) = self.bus.lock() else {
            return;
        };
        let stopped = (|| {
            bus.sync_write_i16(Register::GoalVelocity, &[(self.left, 0), (self.right, 0)])?;
            bus.set_torque(self.left, false)?;
            bus.set_torque(self.right, false)
        })();
        if let Err(e) = stopped {
            warn!("Failed to stop wheels on drop: {}", e);
        }
    }
}

/// Drive-pair handle over the shared bus.
pub struct HubDrivePair {
    bus: SharedBus,
    left: u8,
    right: u8,
}

impl HubDrivePair {
    fn write_wheels(&mut self, left: i16, right: i16) -> Result<(), HubError> {
        lock(&self.bus)?.sync_write_i16(
            Register::GoalVelocity,
            &[(self.left, left), (self.right, right)],
        )
    }
}

impl DrivePair for HubDrivePair {
    fn steer(&mut self, steering: f32, velocity: i16) -> Result<(), BoxError> {
        let wheels = steer_to_tank(steering, velocity);
        debug!(left = wheels.left, right = wheels.right, "steer split");
        self.write_wheels(wheels.left, wheels.right)?;
        Ok(())
    }

    fn tank(&mut self, left: i16, right: i16) -> Result<(), BoxError> {
        self.write_wheels(left, right)?;
        Ok(())
    }

    fn brake_hold(&mut self) -> Result<(), BoxError> {
        // Zero velocity with torque still enabled: the servos actively
        // resist being pushed, unlike a torque release which coasts.
        self.write_wheels(0, 0)?;
        Ok(())
    }
}

/// Heading handle over the shared bus.
pub struct HubHeadingSensor {
    bus: SharedBus,
    imu: u8,
}

impl HeadingSensor for HubHeadingSensor {
    fn heading_degrees(&mut self) -> Result<f32, BoxError> {
        let raw = lock(&self.bus)?.read_i16(self.imu, Register::YawAngle)?;
        Ok(f32::from(raw) * GYRO_SCALE)
    }
}

/// Encoder handle over the shared bus.
pub struct HubWheelEncoder {
    bus: SharedBus,
    id: u8,
}

impl WheelEncoder for HubWheelEncoder {
    fn position_degrees(&mut self) -> Result<i32, BoxError> {
        Ok(lock(&self.bus)?.read_i32(self.id, Register::PresentPosition)?)
    }
}
