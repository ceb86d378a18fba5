use axum::Router;

pub mod products;
pub mod system;

/// Router for the product catalog endpoints.
pub fn router() -> Router {
    Router::new().nest("/products", products::router())
}
