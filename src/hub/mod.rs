// Hardware access for the base.
//
// Provides:
// - The serial register protocol shared by the wheel servos and IMU unit
// - A high-level driver handing out drive/heading/encoder handles
// - Differential steering math and distance conversion

mod driver;
pub mod bus;
pub mod kinematics;

pub use bus::{HubBus, HubError, OperatingMode, Register};
pub use driver::{
    HubDrivePair, HubDriver, HubHeadingSensor, HubWheelEncoder, IMU_ID, MOTOR_ID_LEFT,
    MOTOR_ID_RIGHT,
};
pub use kinematics::{MAX_RAW, TankVelocities, degrees_for_distance, steer_to_tank};
