//! Tracing setup for the command-line front end.
//!
//! The engine only emits `tracing` events; nothing is printed unless a
//! subscriber is installed. `RUST_LOG` takes precedence over the level passed
//! here, e.g. `RUST_LOG=charge_sim::engine=trace chargesim run`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a stderr subscriber so stdout stays reserved for run output.
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("charge_sim={}", level)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .try_init();
}
