use clap::Parser;
use regional_portal::cli::TriggerCli;
use regional_portal::trigger;
use std::process::ExitCode;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let cli = TriggerCli::parse();
    match trigger::run(&cli).await {
        Ok(body) => {
            println!("{body:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error triggering scrape: {e:#}");
            ExitCode::FAILURE
        }
    }
}
