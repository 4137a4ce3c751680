#![forbid(unsafe_code)]

mod cli;
mod startup;

use std::path::Path;

use anyhow::Result;

use cli::Command;
use infrastructure::config::ExporterConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::parse();

    match cli.command {
        Some(Command::Version) => {
            println!("kdp-exporter {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }

        Some(Command::CheckConfig) => {
            let config = ExporterConfig::load(Path::new(&cli.config))?;
            println!("{}: configuration is valid", cli.config);
            println!(
                "  appliance: {} (client {})",
                config.appliance.url, config.appliance.client_id
            );
            println!(
                "  poll: every {}s, per-request timeout {}s",
                config.poll.interval_secs, config.poll.request_timeout_secs
            );
            println!("  listen: {}:{}", config.http.bind_address, config.http.port);
            Ok(())
        }

        // No subcommand = run the exporter daemon
        None => startup::run(&cli).await,
    }
}
