//! # catpointd — catpoint daemon
//!
//! Composition root that wires all adapters together and runs the console.
//!
//! ## Responsibilities
//! - Load configuration (`catpoint.toml`, env vars)
//! - Install the tracing subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the repository and classifier adapters
//! - Construct the security service, injecting adapters via port traits
//! - Log every security event published on the bus
//! - Run the text console on stdin/stdout until `quit` or end of input
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod console;

use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use catpoint_adapter_fake_classifier::FakeImageClassifier;
use catpoint_adapter_storage_sqlite_sqlx::{Config as DbConfig, SqliteSecurityRepository};
use catpoint_app::event_bus::InProcessEventBus;
use catpoint_app::services::security_service::SecurityService;

use crate::config::Config;
use crate::console::Console;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let repo = SqliteSecurityRepository::new(db.pool().clone());

    // Classifier
    let mode = config.classifier_mode()?;
    let classifier = FakeImageClassifier::new(mode);

    // Event bus
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let mut events = event_bus.subscribe();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::info!(id = %event.id, "{event}"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Service
    let service = SecurityService::new(repo, classifier, Arc::clone(&event_bus))
        .with_confidence_threshold(config.classifier.confidence_threshold)?;

    tracing::info!(
        database = config.database_url(),
        classifier = %mode,
        threshold = service.confidence_threshold(),
        "catpointd ready"
    );

    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"catpoint ready, type `help` for commands\n").await?;
    Console::new(&service)
        .run(BufReader::new(tokio::io::stdin()), &mut stdout)
        .await?;

    drop(service);
    drop(event_bus);
    listener.await?;
    tracing::info!("catpointd stopped");

    Ok(())
}
