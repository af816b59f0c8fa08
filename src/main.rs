use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use stronger::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Check whether a currency is stronger than thirty days ago
    Check {
        /// Counter currency code, e.g. EUR
        counter: String,

        /// Base currency code; defaults to base_currency from the config
        #[arg(short, long)]
        base: Option<String>,

        /// Rate provider access key; defaults to the configured key
        #[arg(short, long)]
        access_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => stronger::cli::setup::setup(),
        Some(Commands::Check {
            counter,
            base,
            access_key,
        }) => {
            let command = stronger::AppCommand::Check {
                counter,
                base,
                access_key,
            };
            stronger::run_command(command, cli.config_path.as_deref()).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
