//! Process-wide constants.

use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kdp-exporter/config.yaml";

/// Default exposition port.
pub const DEFAULT_HTTP_PORT: u16 = 9112;

/// Environment variable that overrides `appliance.secret_key`.
pub const SECRET_KEY_ENV: &str = "KDP_SECRET_KEY";

/// How long to wait for in-flight scrapes to drain on shutdown.
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
