//! Telemetry initialization module (tracing fmt subscriber + env filter).
//!
//! Structured logging only; there is no trace export. Logs go to stderr so
//! they never interleave with command output on stdout, and `RUST_LOG`
//! controls verbosity (default `warn` to keep the interactive shell quiet).

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing for the process
///
/// This function sets up tracing-subscriber with:
/// - An env filter honoring `RUST_LOG` (default "warn")
/// - Console output on stderr (fmt layer)
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}
