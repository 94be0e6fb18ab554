//! `backend-core` command line.
//!
//! Inspects the resolved settings and checks database connectivity using
//! the same code path a service would use at startup.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use backend_core::{config::Settings, db::Engine, telemetry, ResultExt};

#[derive(Parser)]
#[command(name = "backend-core", version, about = "Settings and database diagnostics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved settings as JSON, secrets redacted.
    Settings,

    /// Open a session and run a health query against the database.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error:");
            match e.field_errors() {
                [] => eprintln!("  {e}"),
                errors => errors.iter().for_each(|field| eprintln!("  {field}")),
            }
            return Ok(ExitCode::FAILURE);
        }
    };

    telemetry::init_tracing(&settings);
    telemetry::log_config_warnings(settings.warnings());

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %settings.mode(),
        project = %settings.project_slug(),
        debug = settings.debug(),
        "Settings loaded"
    );

    match cli.command {
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            let engine = Engine::new(&settings);
            let status = match engine.health_check().await.log("database health check") {
                Ok(()) => {
                    tracing::info!(stats = ?engine.stats(), "Database reachable");
                    ExitCode::SUCCESS
                }
                Err(_) => ExitCode::FAILURE,
            };
            engine.close().await;
            Ok(status)
        }
    }
}
