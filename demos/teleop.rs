// Keyboard teleop: W/S drive, A/D steer, R/F speed, Q quit.
//
// Usage: cargo run --example teleop -- [port]
//
// Commands go straight to the drive pair at a fixed rate; velocities zero
// themselves when no key has been seen for a moment, so letting go of the
// keyboard stops the base.

use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;

use gyrodrive_runtime::config::HUB_PORT;
use gyrodrive_runtime::control::DrivePair;
use gyrodrive_runtime::hub::{HubDrivePair, HubDriver};

const SPEEDS: [i16; 3] = [200, 500, 900];
const STEERINGS: [f32; 3] = [20.0, 35.0, 50.0];
const INPUT_TIMEOUT_MS: u64 = 100; // Zero velocities after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let port = std::env::args().nth(1).unwrap_or_else(|| HUB_PORT.to_string());

    let driver = HubDriver::open(&port)?;
    driver.initialize()?;
    let drive = driver.drive_pair();

    info!("Controls: W/S=drive, A/D=steer, R/F=speed, Q=quit");
    info!("Speed: LOW");

    enable_raw_mode()?;
    let result = run_teleop(drive).await;
    disable_raw_mode()?;

    driver.release()?;
    result
}

async fn run_teleop(
    mut drive: HubDrivePair,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;

    // Persistent command state
    let mut velocity: i16 = 0;
    let mut steering: f32 = 0.0;
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for a key with a 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('w') if pressed => {
                        velocity = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        velocity = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        steering = -STEERINGS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        steering = STEERINGS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }

                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Stale input means the operator let go: stop steering and driving
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            velocity = 0;
            steering = 0.0;
        }

        drive.steer(steering, velocity)?;
    }

    drive.brake_hold()?;
    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
