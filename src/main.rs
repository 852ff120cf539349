//! # RiverForo
//!
//! Backend for the RiverForo.com fan forum.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - HTTP/WebSocket server, or a one-off database seed

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use riverforo::config::Settings;
use riverforo::infrastructure::database;
use riverforo::shared::snowflake::SnowflakeGenerator;
use riverforo::startup::Application;

#[derive(Debug, Parser)]
#[command(name = "riverforo", version, about = "RiverForo forum backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create the admin user, starter categories and ad placements
    Seed {
        /// Admin password
        #[arg(long, env = "SEED_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from environment and config files
    let settings = Settings::load()?;

    riverforo::telemetry::init_tracing(&settings.log_format);
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Seed { admin_password } => seed(settings, &admin_password).await,
    }
}

async fn serve(settings: Settings) -> Result<()> {
    info!("Starting RiverForo...");

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await
}

async fn seed(settings: Settings, admin_password: &str) -> Result<()> {
    let db = database::create_pool(&settings.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    database::run_migrations(&db)
        .await
        .context("Failed to run migrations")?;

    let snowflake = SnowflakeGenerator::new(
        settings.snowflake.machine_id as u64,
        settings.snowflake.node_id as u64,
    );
    let report = riverforo::seed::run(&db, &snowflake, admin_password).await?;

    info!(
        admin_created = report.admin_created,
        categories_created = report.categories_created,
        ads_created = report.ads_created,
        "Seed complete"
    );
    Ok(())
}
