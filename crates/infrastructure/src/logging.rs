//! Tracing bootstrap for the exporter binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel};

/// Installs the global subscriber, writing to stdout.
///
/// The configured level seeds the filter; a `RUST_LOG` value replaces
/// it entirely, including per-target directives. Panics if a global
/// subscriber is already installed, so the binary calls this once,
/// before any task is spawned.
pub fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::new(level.as_str()),
    };

    // One line per event. JSON flattens the event fields to the top
    // level so aggregators index them without an unwrapping step.
    let sink: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_ansi(false)
            .boxed(),
        LogFormat::Text => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry().with(sink).with(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_level_seeds_a_parsable_filter() {
        for level in [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ] {
            assert!(
                EnvFilter::try_new(level.as_str()).is_ok(),
                "unparsable level directive: {}",
                level.as_str()
            );
        }
    }
}
