//! Tracing subscriber bootstrap.

use anyhow::Context;
use staybook_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured filter.
///
/// Fails if a global subscriber is already installed.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = build_filter(settings)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match settings.log_format {
        LogFormat::Pretty => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to install pretty subscriber")?,
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
            .context("failed to install json subscriber")?,
    }

    tracing::info!(
        target: "staybook-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

fn build_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => {
            EnvFilter::try_new(&directives).with_context(|| format!("invalid RUST_LOG '{directives}'"))
        }
        _ => EnvFilter::try_new(&settings.filter)
            .with_context(|| format!("invalid telemetry filter '{}'", settings.filter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let settings = TelemetrySettings::default();
        assert!(EnvFilter::try_new(&settings.filter).is_ok());
    }

    #[test]
    fn bogus_filter_is_rejected() {
        assert!(EnvFilter::try_new("staybook=notalevel").is_err());
    }
}
