//! Web layer module
//!
//! The HTTP surface Teams for Linux talks to. Teams version 1 requests
//! everything from the server root, version 2 prefixes every path with
//! `/evergreen-assets/backgroundimages`; both layouts are always routed so a
//! client upgrade does not require a restart.

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::{Config, TeamsVersion},
    services::CatalogService,
};

pub mod extractors;
pub mod handlers;
pub mod utils;

pub use extractors::RequestContext;

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config, catalog: Arc<CatalogService>) -> Result<Self> {
        let ip: IpAddr = config
            .listen_address
            .parse()
            .with_context(|| format!("Invalid listen_address {}", config.listen_address))?;
        let addr = SocketAddr::new(ip, config.port);

        let app = Self::create_router(AppState {
            config: Arc::new(config),
            catalog,
        });

        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::index::index))
            .route("/health", get(handlers::health::health_check))
            .merge(Self::asset_routes())
            .nest(TeamsVersion::V2.url_prefix(), Self::asset_routes())
            // Teams loads the catalog from a different origin
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Catalog, image and thumbnail routes, mounted at the root and the v2 prefix
    fn asset_routes() -> Router<AppState> {
        Router::new()
            .route("/config.json", get(handlers::catalog::config_json))
            .route("/images", get(handlers::images::list_images))
            .route("/images/{*path}", get(handlers::images::serve_image))
            .route("/thumbnails", get(handlers::images::list_thumbnails))
            .route("/thumbnails/{*path}", get(handlers::images::serve_thumbnail))
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogService>,
}
