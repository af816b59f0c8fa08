pub mod cli;
pub mod core;
pub mod providers;
pub mod strength;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::{debug, info};

pub use crate::core::error::StrengthError;
pub use crate::strength::{StrengthComparator, StrengthQuery, StrengthReport};

pub enum AppCommand {
    Check {
        counter: String,
        base: Option<String>,
        access_key: Option<String>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Stronger starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!(base_currency = ?config.base_currency, "Loaded config");

    match command {
        AppCommand::Check {
            counter,
            base,
            access_key,
        } => cli::check::run(&config, &counter, base.as_deref(), access_key.as_deref()).await,
    }
}
