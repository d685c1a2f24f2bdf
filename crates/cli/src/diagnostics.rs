//! Diagnostics output for the demo binary itself.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize JSON diagnostics on standard error.
///
/// # Arguments
/// * `filter` - Optional filter directive override (e.g., "debug", "ctxlog=trace")
pub fn init_diagnostics(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = match filter {
        Some(directive) => EnvFilter::try_new(directive)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}
