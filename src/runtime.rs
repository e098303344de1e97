// Bring-up and field check for the base.
//
// Opens the hub, configures the wheel servos, waits for the gyro to
// settle, then drives a short out-and-back pattern to verify both
// closed-loop primitives against a live setup before anything heavier
// runs on top of them.

use std::time::Duration;

use tracing::info;

use crate::BoxError;
use crate::config::Tuning;
use crate::control::{Base, stop};
use crate::hub::{HubDriver, degrees_for_distance};

// A stuck stop condition should end a check leg, not strand the base.
const MANEUVER_TIMEOUT: Duration = Duration::from_secs(10);

const CHECK_SPEED: i16 = 400;
const CHECK_LEG_CM: f32 = 30.0;
const PIVOT_SPEED: i16 = 200;

pub async fn run(port: &str, tuning: Tuning) -> Result<(), BoxError> {
    let driver = HubDriver::open(port)?;
    driver.initialize()?;

    info!("Waiting for the gyro to settle...");
    driver.settle_gyro().await?;

    let gains = tuning.gains();
    let mut base = Base::new(driver.heading_sensor(), driver.drive_pair())
        .with_maneuver_timeout(MANEUVER_TIMEOUT);

    info!("Field check: outbound leg, {} cm at heading 0", CHECK_LEG_CM);
    let leg = stop::for_distance(driver.wheel_encoder(), degrees_for_distance(CHECK_LEG_CM))?;
    base.drive_holding_heading(gains, CHECK_SPEED, 0.0, None, leg)
        .await?;

    info!("Field check: pivot to 90");
    base.pivot_to_heading(PIVOT_SPEED, -PIVOT_SPEED, 90.0, true)
        .await?;

    info!("Field check: pivot back to 0");
    base.pivot_to_heading(-PIVOT_SPEED, PIVOT_SPEED, 0.0, true)
        .await?;

    info!("Field check: return leg, {} cm in reverse", CHECK_LEG_CM);
    let leg = stop::for_distance(driver.wheel_encoder(), degrees_for_distance(CHECK_LEG_CM))?;
    base.drive_holding_heading(gains.reversed(), -CHECK_SPEED, 0.0, None, leg)
        .await?;

    driver.release()?;
    info!("Field check complete");
    Ok(())
}
