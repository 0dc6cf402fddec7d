use std::sync::Arc;

use tracing::info;

use threadkit_db::{Database, StoreOptions, SystemClock};
use threadkit_server::sweeper::spawn_typing_sweeper;
use threadkit_server::{Config, Dispatcher, ThreadService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadkit=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let options = StoreOptions {
        typing_ttl: config.typing_ttl,
        ..StoreOptions::default()
    };
    let db = Database::open_with(&config.db_path, Arc::new(SystemClock), options)?;

    let service = ThreadService::new(db, Dispatcher::new(config.event_buffer));
    let sweeper = spawn_typing_sweeper(service.clone(), config.sweep_interval);

    info!(
        "threadkit running against {} (typing ttl {:?}, sweep every {:?})",
        config.db_path.display(),
        config.typing_ttl,
        config.sweep_interval
    );

    tokio::signal::ctrl_c().await?;
    sweeper.abort();
    info!("threadkit shutting down");

    Ok(())
}
