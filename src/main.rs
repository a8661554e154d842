// region:    --- Imports
use sothebeat_auction::app::{build_router, AppState};
use sothebeat_auction::config::Config;
use sothebeat_auction::database::DatabaseManager;
use sothebeat_auction::scheduler::AuctionScheduler;
use sothebeat_auction::store::{AuctionStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;

    // store selection
    let store: Arc<dyn AuctionStore> = match &config.database_url {
        Some(database_url) => {
            let db_manager =
                Arc::new(DatabaseManager::new(database_url, config.db_max_connections).await?);
            if let Err(e) = db_manager.initialize_database().await {
                error!("{:<12} --> schema setup failed: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> schema ready", "Main");
            Arc::new(PostgresStore::new(db_manager))
        }
        None => {
            warn!(
                "{:<12} --> DATABASE_URL not set, state lives in memory only",
                "Main"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let mut state = AppState::new(store, config.auction_rules(), &config.admin_secret);
    state.sse_keepalive = Duration::from_secs(config.sse_keepalive_secs);

    if config.auto_close_lots {
        AuctionScheduler::new(
            Arc::clone(&state.store),
            state.notifier.clone(),
            state.rules,
        )
        .start();
    }

    let routes_all = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
