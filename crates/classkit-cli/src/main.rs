//! Classkit CLI entrypoint.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod config;
mod handlers;

use commands::{CodeCommands, Commands, ConfigCommands, TrialCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "classkit")]
#[command(author, version, about = "Classkit license and trial command-line interface", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = CliConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Status => handlers::status(&config).await?,
        Commands::Activate { code } => handlers::activate(&config, &code).await?,
        Commands::Deactivate => handlers::deactivate(&config).await?,
        Commands::License => handlers::license(&config).await?,
        Commands::Verify => handlers::verify(&config).await?,
        Commands::DeviceInfo => handlers::device_info(&config).await?,
        Commands::Check { action, count } => handlers::check(&config, &action, count).await?,
        Commands::Codes { command } => match command {
            CodeCommands::Generate {
                prefix,
                max_devices,
            } => handlers::generate_code(&config, &prefix, max_devices).await?,
            CodeCommands::Customer { info } => handlers::customer_code(&config, &info)?,
            CodeCommands::Pattern { pattern, info } => {
                handlers::pattern_code(&config, &pattern, &info)?
            }
            CodeCommands::Bulk { file } => handlers::bulk_codes(&config, &file)?,
            CodeCommands::Validate { code } => handlers::validate_code(&code)?,
            CodeCommands::Stats => handlers::code_stats(&config).await?,
            CodeCommands::Revoke { code, yes } => handlers::revoke_code(&config, &code, yes).await?,
            CodeCommands::ResetDevice { code, device_id } => {
                handlers::reset_device(&config, &code, &device_id).await?
            }
        },
        Commands::Trial { command } => match command {
            TrialCommands::Reset { yes } => handlers::reset_trial(&config, yes).await?,
        },
        Commands::Serve { config: path } => handlers::serve(path.as_deref()).await?,
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::show_config(&config)?,
            ConfigCommands::Set { key, value } => handlers::set_config(&key, &value)?,
        },
    }

    Ok(())
}
