use axum::{routing::get, Router};
use rusqlite::Connection;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::storage::ConnectionProvider;
use crate::{Error, Result};

pub mod routes;

/// Server state
pub struct AppState {
    pub provider: Arc<ConnectionProvider>,
    pub image_path: PathBuf,
}

impl AppState {
    pub fn new(provider: Arc<ConnectionProvider>, image_path: PathBuf) -> Self {
        Self { provider, image_path }
    }

    /// Run `f` as one unit of work on a pooled connection, off the async
    /// runtime. The pool is created on first use.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let provider = self.provider.clone();
        tokio::task::spawn_blocking(move || provider.pool()?.read_scope(f))
            .await
            .map_err(|e| Error::Task(e.to_string()))?
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let image = ServeFile::new(&state.image_path);

    Router::new()
        .route("/", get(routes::health))
        .route_service("/img", image)
        .route("/terms/{term}/studies", get(routes::term_studies))
        .route("/locations/{coords}/studies", get(routes::location_studies))
        .route("/dissociate/terms/{term_a}/{term_b}", get(routes::dissociate_terms))
        .route("/dissociate/terms/{term_a}/{term_b}/records", get(routes::dissociate_terms_records))
        .route("/dissociate/locations/{coords_a}/{coords_b}", get(routes::dissociate_locations))
        .route(
            "/dissociate/locations/{coords_a}/{coords_b}/records",
            get(routes::dissociate_locations_records),
        )
        .route("/debug/terms", get(routes::debug_terms))
        .route("/debug/search_term/{keyword}", get(routes::debug_search_term))
        .route("/test_db", get(routes::test_db))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &ServiceConfig) -> anyhow::Result<()> {
    let provider = Arc::new(ConnectionProvider::new(config.clone()));
    let state = Arc::new(AppState::new(provider, config.image_path.clone()));
    let app = router(state);

    let ip: std::net::IpAddr = config.bind.parse()?;
    let addr = SocketAddr::from((ip, config.port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
