//! The binary entry point for the ShadowWalker client.

mod params;
mod session;

use std::process::ExitCode;

use clap::Parser;
use walker_config::{CliArgs, Config, ConfigError, default_config_dir};
use walker_net::{OpcodeMapError, WalkerClient};

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to install logger: {0}")]
    Logging(#[from] walker_log::TryInitError),
    #[error("invalid opcode table: {0}")]
    Dialect(#[from] OpcodeMapError),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("shadow-walker: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &CliArgs) -> Result<(), AppError> {
    let config_dir = match &args.config {
        Some(dir) => dir.clone(),
        None => default_config_dir()?,
    };
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(args);

    let log_dir = config_dir.join("logs");
    walker_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config))?;
    tracing::info!("config: {}", config_dir.display());

    let client = WalkerClient::new(params::client_params(&config), walker_proto::dialect()?);
    client.start();
    session::run(&client, params::login_request(&config.profile));
    Ok(())
}
