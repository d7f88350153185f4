//! Logging setup.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Telemetry setup errors.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("Invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// A global subscriber was already installed.
    #[error("Failed to set tracing subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `filter` when set.
pub fn init(filter: &str) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => build_filter(filter)?,
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Filter for the configured directives.
pub fn build_filter(filter: &str) -> Result<EnvFilter, TelemetryError> {
    Ok(EnvFilter::try_new(directives(filter))?)
}

#[cfg(not(feature = "debug-tracing"))]
fn directives(filter: &str) -> String {
    filter.to_string()
}

#[cfg(feature = "debug-tracing")]
fn directives(filter: &str) -> String {
    format!("{},commit_beacon=debug", filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("commit_beacon=debug,tokio=warn").is_ok());
    }

    #[test]
    fn test_bad_filter_rejected() {
        assert!(matches!(
            build_filter("commit_beacon=loud"),
            Err(TelemetryError::Filter(_))
        ));
    }
}
