//! Isolation Demo - Main Application Entry Point
//!
//! A command-line walkthrough of SQL transaction isolation. It opens pairs of MySQL connections, interleaves statements between their transactions and prints the anomalies the server lets through: dirty reads, non-repeatable reads, deadlocks and lost updates.
//!
//! # Architecture
//!
//! - **Database**: MySQL/InnoDB with sqlx (async queries over dedicated connections)
//! - **Runtime**: tokio
//! - **Output**: narration on stdout, logs on stderr
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Optionally create and seed the `accounts` table
//! 3. Run every demonstration in order, each under a numbered heading
//! 4. Print a demonstration's error and continue with the next one

mod config;
mod db;
mod error;
mod models;
mod services;

use services::isolation_service::Demonstration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    // Logs go to stderr so stdout carries only the narration
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = config::Config::from_env().map_err(error::AppError::from)?;
    tracing::info!(host = %config.host, port = config.port, database = %config.database, "Configuration loaded");

    if config.prepare_schema {
        db::prepare_schema(&config).await?;
        tracing::info!("Accounts table prepared");
    }

    for (index, demonstration) in Demonstration::ALL.into_iter().enumerate() {
        if index > 0 {
            println!();
        }
        println!("{}. {}", index + 1, demonstration.title());

        tracing::info!(demonstration = demonstration.title(), "Running demonstration");

        // Errors end only the current demonstration
        match demonstration.run(&config).await {
            Ok(narration) => tracing::debug!(
                demonstration = demonstration.title(),
                readings = narration.observations.len(),
                "Demonstration finished"
            ),
            Err(e) => {
                tracing::warn!(demonstration = demonstration.title(), "Demonstration failed: {}", e);
                println!("Error: {e}");
            }
        }
    }

    Ok(())
}
