use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gyrodrive_runtime::config::{self, Tuning};

/// Gyro-stabilized drive runtime for the two-wheel base.
#[derive(Parser)]
struct Args {
    /// Serial port of the base controller board
    #[arg(long, default_value = config::HUB_PORT)]
    port: String,

    /// JSON tuning profile overriding the default PID gains
    #[arg(long)]
    tuning: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => match Tuning::load(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                eprintln!("Failed to load tuning profile: {}", e);
                std::process::exit(1);
            }
        },
        None => Tuning::default(),
    };

    if let Err(e) = gyrodrive_runtime::runtime::run(&args.port, tuning).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
