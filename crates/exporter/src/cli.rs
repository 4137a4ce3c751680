use clap::{Parser, Subcommand};
use infrastructure::config::{LogFormat, LogLevel};
use infrastructure::constants::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(
    name = "kdp-exporter",
    about = "Prometheus exporter for Kaspersky DDoS Prevention appliances",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Log level override (takes precedence over config file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Log format: json (default, production) or text (development)
    #[arg(long)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Display version information
    Version,

    /// Parse and validate the configuration file, then exit
    CheckConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn cli_default_config_path() {
        let cli = Cli::try_parse_from(["kdp-exporter"]).unwrap();
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
        assert!(cli.log_level.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_custom_config_path() {
        let cli = Cli::try_parse_from(["kdp-exporter", "--config", "/tmp/test.yaml"]).unwrap();
        assert_eq!(cli.config, "/tmp/test.yaml");
    }

    #[test]
    fn cli_log_level_override() {
        let cli = Cli::try_parse_from(["kdp-exporter", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn cli_log_format_text() {
        let cli = Cli::try_parse_from(["kdp-exporter", "--log-format", "text"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Text));
    }

    #[test]
    fn cli_version_subcommand() {
        let cli = Cli::try_parse_from(["kdp-exporter", "version"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Version)));
    }

    #[test]
    fn cli_check_config_subcommand() {
        let cli = Cli::try_parse_from(["kdp-exporter", "check-config"]).unwrap();
        assert!(matches!(cli.command, Some(Command::CheckConfig)));
    }

    #[test]
    fn cli_invalid_log_level_rejected() {
        let result = Cli::try_parse_from(["kdp-exporter", "--log-level", "banana"]);
        assert!(result.is_err());
    }
}
