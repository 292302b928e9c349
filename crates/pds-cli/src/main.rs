use clap::Parser;
use pds_cli::cli::Cli;
use pds_cli::config::load_config;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    // Config errors are reported after logging is up, at the default level.
    let config = load_config(cli.config.as_deref());
    let level = match (&cli.log_level, &config) {
        (Some(level), _) => *level,
        (None, Ok(config)) => config.log_level().unwrap_or(tracing::Level::INFO),
        (None, Err(_)) => tracing::Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {err}");
    }

    let config = match config {
        Ok(config) => config,
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    };

    let Some(command) = &cli.command else {
        info!("no command given; run `pds --help` for usage");
        return;
    };

    if let Err(err) = commands::handle(command, &config) {
        error!("{err:#}");
        std::process::exit(1);
    }
}
