// Gyro-stabilized motion runtime for a small two-wheel differential base.
//
// The closed-loop motion primitives live in `control`; `hub` talks to the
// wheel servos and the IMU unit over a shared serial bus.

pub mod config;
pub mod control;
pub mod hub;
pub mod runtime;

/// Boxed error type used at the runtime seams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
