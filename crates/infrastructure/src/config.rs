//! Exporter configuration: parsing, validation, secret handling.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_HTTP_PORT, SECRET_KEY_ENV};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub appliance: ApplianceConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub exporter: ExporterSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    /// Base URL of the management API.
    pub url: String,
    pub client_id: u64,
    pub user_id: u64,
    /// Shared signing secret. `KDP_SECRET_KEY` in the environment takes
    /// precedence over this field.
    #[serde(default)]
    pub secret_key: String,
    /// 10 for English, 77 for Russian.
    #[serde(default = "default_locale_id")]
    pub locale_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub cycle_deadline_secs: u64,
    pub max_concurrent_resources: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            request_timeout_secs: 10,
            cycle_deadline_secs: 50,
            max_concurrent_resources: 4,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_secs(self.cycle_deadline_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HttpConfig {
    pub bind_address: String,
    pub port: u16,
    pub empty_scrape: EmptyScrape,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_HTTP_PORT,
            empty_scrape: EmptyScrape::Empty,
        }
    }
}

/// What `/metrics` serves before the first snapshot exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyScrape {
    /// 200 with an empty body.
    Empty,
    /// 503.
    Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ExporterSection {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for ExporterSection {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

fn default_locale_id() -> u32 {
    10
}

impl ExporterConfig {
    /// Load config from a YAML file.
    ///
    /// Applies the `KDP_SECRET_KEY` environment override, then
    /// validates. On Unix, warns if the file is world-readable since it
    /// holds the signing secret.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        warn_if_world_readable(path, "config file");
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yaml_ng::from_str(&content)?;
        config.apply_secret_override(std::env::var(SECRET_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a YAML string (no environment override).
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Environment beats the file for the signing secret.
    pub fn apply_secret_override(&mut self, secret: Option<String>) {
        if let Some(secret) = secret {
            self.appliance.secret_key = secret;
        }
    }

    /// Return a copy with the signing secret masked, for logging.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut sanitized = self.clone();
        if !sanitized.appliance.secret_key.is_empty() {
            sanitized.appliance.secret_key = "***".to_string();
        }
        sanitized
    }

    /// Validate the config after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let appliance = &self.appliance;
        if appliance.url.is_empty() {
            return Err(invalid("appliance.url", "must not be empty"));
        }
        if !appliance.url.starts_with("http://") && !appliance.url.starts_with("https://") {
            return Err(invalid(
                "appliance.url",
                format!("'{}' must use http or https", appliance.url),
            ));
        }
        if appliance.client_id == 0 {
            return Err(invalid("appliance.client_id", "must be non-zero"));
        }
        if appliance.user_id == 0 {
            return Err(invalid("appliance.user_id", "must be non-zero"));
        }
        if appliance.secret_key.is_empty() {
            return Err(invalid(
                "appliance.secret_key",
                format!("must be set (or via {SECRET_KEY_ENV})"),
            ));
        }

        let poll = &self.poll;
        if poll.interval_secs == 0 {
            return Err(invalid("poll.interval_secs", "must be non-zero"));
        }
        if poll.request_timeout_secs == 0 {
            return Err(invalid("poll.request_timeout_secs", "must be non-zero"));
        }
        if poll.cycle_deadline_secs == 0 {
            return Err(invalid("poll.cycle_deadline_secs", "must be non-zero"));
        }
        if poll.cycle_deadline_secs > poll.interval_secs {
            return Err(invalid(
                "poll.cycle_deadline_secs",
                format!(
                    "{} exceeds poll.interval_secs {}",
                    poll.cycle_deadline_secs, poll.interval_secs
                ),
            ));
        }
        if poll.max_concurrent_resources == 0 {
            return Err(invalid("poll.max_concurrent_resources", "must be non-zero"));
        }
        if self.http.bind_address.is_empty() {
            return Err(invalid("http.bind_address", "must not be empty"));
        }
        Ok(())
    }
}

/// Log a warning if a file is world-readable (Unix only). The config
/// carries the signing secret, so 0640 or stricter is expected.
#[cfg(unix)]
fn warn_if_world_readable(path: &Path, label: &str) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = std::fs::metadata(path) {
        let mode = metadata.permissions().mode();
        if mode & 0o004 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{mode:04o}"),
                "{label} is world-readable, consider chmod 640 or stricter",
            );
        }
    }
}

#[cfg(not(unix))]
fn warn_if_world_readable(_path: &Path, _label: &str) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r"
appliance:
  url: https://kdp.example.com/api
  client_id: 1
  user_id: 2
  secret_key: s3cret
";

    #[test]
    fn minimal_config_gets_defaults() {
        let config = ExporterConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.appliance.locale_id, 10);
        assert_eq!(config.poll.interval_secs, 60);
        assert_eq!(config.poll.interval(), Duration::from_secs(60));
        assert_eq!(config.http.port, DEFAULT_HTTP_PORT);
        assert_eq!(config.http.empty_scrape, EmptyScrape::Empty);
        assert_eq!(config.exporter.log_level, LogLevel::Info);
        assert_eq!(config.exporter.log_format, LogFormat::Json);
    }

    #[test]
    fn full_config_round_trips() {
        let yaml = r"
appliance:
  url: https://kdp.example.com/api
  client_id: 7
  user_id: 8
  secret_key: s3cret
  locale_id: 77
poll:
  interval_secs: 120
  request_timeout_secs: 15
  cycle_deadline_secs: 100
  max_concurrent_resources: 8
http:
  bind_address: 0.0.0.0
  port: 9999
  empty_scrape: unavailable
exporter:
  log_level: debug
  log_format: text
";
        let config = ExporterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.appliance.locale_id, 77);
        assert_eq!(config.poll.cycle_deadline_secs, 100);
        assert_eq!(config.http.empty_scrape, EmptyScrape::Unavailable);
        assert_eq!(config.exporter.log_format, LogFormat::Text);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let yaml = format!("{MINIMAL}\nextra_section: {{}}\n");
        assert!(matches!(
            ExporterConfig::from_yaml(&yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn missing_secret_fails_validation() {
        let yaml = r"
appliance:
  url: https://kdp.example.com/api
  client_id: 1
  user_id: 2
";
        let err = ExporterConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("secret_key"), "{err}");
    }

    #[test]
    fn env_override_beats_the_file() {
        let mut config: ExporterConfig = serde_yaml_ng::from_str(MINIMAL).unwrap();
        config.apply_secret_override(Some("from-env".to_string()));
        assert_eq!(config.appliance.secret_key, "from-env");
        config.validate().unwrap();
    }

    #[test]
    fn bad_url_scheme_is_rejected() {
        let yaml = MINIMAL.replace("https://kdp.example.com/api", "ftp://kdp.example.com");
        let err = ExporterConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("appliance.url"), "{err}");
    }

    #[test]
    fn deadline_must_fit_in_the_interval() {
        let yaml = format!(
            "{MINIMAL}poll:\n  interval_secs: 30\n  cycle_deadline_secs: 31\n"
        );
        let err = ExporterConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("cycle_deadline_secs"), "{err}");
    }

    #[test]
    fn sanitized_masks_the_secret() {
        let config = ExporterConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.sanitized().appliance.secret_key, "***");
        // Original untouched.
        assert_eq!(config.appliance.secret_key, "s3cret");
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = ExporterConfig::load(file.path()).unwrap();
        assert_eq!(config.appliance.client_id, 1);
    }
}
