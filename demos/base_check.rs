// Base check: careful, step-by-step hardware verification.
//
// Usage: cargo run --example base_check -- [port]
//
// Safety features:
// - Explicit confirmation before any writes
// - Starts with zero velocity
// - Very slow test speeds
// - Easy abort with Ctrl+C

use std::io::{self, Write};
use std::thread::sleep;
use std::time::Duration;

use gyrodrive_runtime::config::{GYRO_SCALE, HUB_PORT};
use gyrodrive_runtime::hub::{
    HubBus, IMU_ID, MOTOR_ID_LEFT, MOTOR_ID_RIGHT, OperatingMode, Register, TankVelocities,
};

const WHEEL_IDS: [u8; 2] = [MOTOR_ID_LEFT, MOTOR_ID_RIGHT];
const WHEEL_NAMES: [&str; 2] = ["Left", "Right"];

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    io::stdout().flush().unwrap();
    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    input.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let port = std::env::args().nth(1).unwrap_or_else(|| HUB_PORT.to_string());

    println!("Base check (WITH WRITES) on {}", port);
    println!("This tool WILL spin the wheels. Put the base on blocks first.");
    println!();

    if !confirm("Are the wheels OFF THE GROUND?") {
        println!("Elevate the base so the wheels can spin freely, then rerun.");
        return Ok(());
    }

    println!("Opening serial port...");
    let mut bus = HubBus::open(&port)?;
    println!("Connected");
    println!();

    // Step 1: read-only communication check
    println!("Step 1: pinging units (read-only)...");
    for (name, id) in WHEEL_NAMES.iter().zip(WHEEL_IDS) {
        match bus.ping(id)? {
            true => println!("  {} wheel (unit {}) responding", name, id),
            false => {
                println!("  {} wheel (unit {}) NOT responding - aborting", name, id);
                return Ok(());
            }
        }
    }
    match bus.ping(IMU_ID)? {
        true => println!("  IMU (unit {}) responding", IMU_ID),
        false => {
            println!("  IMU (unit {}) NOT responding - aborting", IMU_ID);
            return Ok(());
        }
    }
    println!();

    // Step 2: velocity mode
    println!("Step 2: configuring wheels for velocity mode");
    println!("  (torque off -> velocity mode -> torque on)");
    if !confirm("Proceed with configuration?") {
        println!("Aborted.");
        return Ok(());
    }
    for id in WHEEL_IDS {
        bus.set_torque(id, false)?;
    }
    for id in WHEEL_IDS {
        bus.set_operating_mode(id, OperatingMode::Velocity)?;
    }
    for id in WHEEL_IDS {
        bus.set_torque(id, true)?;
    }
    println!("  done");
    println!();

    // Step 3: zero velocity should hold still
    println!("Step 3: sending ZERO velocity (no movement expected)...");
    send_wheels(&mut bus, TankVelocities::zero())?;
    sleep(Duration::from_millis(500));
    for (name, id) in WHEEL_NAMES.iter().zip(WHEEL_IDS) {
        println!(
            "  {} wheel velocity: {} (should be ~0)",
            name,
            bus.get_velocity(id)?
        );
    }
    println!();

    // Step 4: slow spins
    println!("Step 4: slow motion test, watch the wheels");
    if !confirm("Proceed with motion test?") {
        release(&mut bus)?;
        return Ok(());
    }

    let tests = [
        ("Forward", TankVelocities::new(150, 150)),
        ("Backward", TankVelocities::new(-150, -150)),
        ("Spin left", TankVelocities::new(-150, 150)),
        ("Spin right", TankVelocities::new(150, -150)),
    ];
    for (name, wheels) in tests {
        println!("  {}: left={}, right={}", name, wheels.left, wheels.right);
        send_wheels(&mut bus, wheels)?;
        sleep(Duration::from_millis(300));
        send_wheels(&mut bus, TankVelocities::zero())?;
        sleep(Duration::from_millis(500));
    }
    println!();

    // Step 5: gyro readout while stationary
    println!("Step 5: gyro readout, base stationary (values should sit near a constant)");
    for _ in 0..10 {
        let raw = bus.read_i16(IMU_ID, Register::YawAngle)?;
        println!("  heading: {:.1} deg (raw {})", f32::from(raw) * GYRO_SCALE, raw);
        sleep(Duration::from_millis(200));
    }
    println!();

    println!("Cleaning up: stopping wheels and releasing torque");
    release(&mut bus)?;
    println!("Base check complete. If everything moved as expected, run the field check: cargo run");

    Ok(())
}

fn send_wheels(bus: &mut HubBus, wheels: TankVelocities) -> Result<(), Box<dyn std::error::Error>> {
    bus.sync_write_i16(
        Register::GoalVelocity,
        &[(MOTOR_ID_LEFT, wheels.left), (MOTOR_ID_RIGHT, wheels.right)],
    )?;
    Ok(())
}

fn release(bus: &mut HubBus) -> Result<(), Box<dyn std::error::Error>> {
    send_wheels(bus, TankVelocities::zero())?;
    for id in WHEEL_IDS {
        let _ = bus.set_torque(id, false); // ignore errors on cleanup
    }
    Ok(())
}
