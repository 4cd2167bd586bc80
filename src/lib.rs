pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;

pub use api::handlers;
pub use api::routes;

pub use logic::{ListPets, PetError, PetOperations, ValidationErrors};

pub use model::*;

pub use store::{MemoryStore, PostgresStore, Store};

use crate::api::handlers::AppState;
use crate::config::{AppConfig, StoreBackend};

/// Bind and serve the API with the configured store backend
pub async fn run_server(config: &AppConfig) -> anyhow::Result<()> {
    match config.database.backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url()?;
            let max_connections = config.database.max_connections.unwrap_or(20);

            log::info!("Connecting to PostgreSQL...");
            let store = PostgresStore::new(&database_url, max_connections).await?;

            log::info!("Running database migrations...");
            store.migrate().await?;

            serve_store(store, config).await
        }
        StoreBackend::Memory => {
            log::warn!("Using the in-memory store; data is lost on shutdown");
            serve_store(MemoryStore::new(), config).await
        }
    }
}

async fn serve_store<S: Store>(store: S, config: &AppConfig) -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    let state = AppState::shared(store, config.pagination.clone());
    let app = crate::api::routes::create_router::<S>().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Pet registry running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
