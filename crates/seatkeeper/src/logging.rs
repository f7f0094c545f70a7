//! Tracing setup for binaries built on Seatkeeper.
//!
//! The library crates only emit `tracing` events; installing a
//! subscriber is left to the binary, usually through [`init_tracing`].

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back
/// to `default_level` for the Seatkeeper crates and the calling binary.
///
/// # Errors
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// seatkeeper::init_tracing("robot_table", "debug").expect("first init");
/// ```
pub fn init_tracing(binary_name: &str, default_level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "seatkeeper={default_level},seatkeeper_room={default_level},\
             seatkeeper_session={default_level},{binary_name}={default_level}"
        ))
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    tracing::debug!(binary = binary_name, level = default_level, "tracing initialized");
    Ok(())
}
