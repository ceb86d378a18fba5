//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: product use cases and store selection
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use catalog_infra::{AppConfig, CorsConfig, StoreError};

use crate::cors;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, StoreError> {
    let services = services::build_services(config).await?;
    Ok(router(Arc::new(services), &config.cors))
}

/// Router over already-built services.
pub fn router(services: Arc<services::AppServices>, cors_config: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors::cors_layer(cors_config))
                .layer(Extension(services)),
        )
}
