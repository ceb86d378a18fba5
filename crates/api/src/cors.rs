//! CORS policy built from [`CorsConfig`].

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

use catalog_infra::{AllowList, CorsConfig};

/// Entries that are not valid header values or method names are skipped
/// with a warning.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = match &config.allowed_origins {
        AllowList::Any => AllowOrigin::from(Any),
        AllowList::List(list) => AllowOrigin::list(parse_all::<HeaderValue>("origin", list)),
    };
    let headers = match &config.allowed_headers {
        AllowList::Any => AllowHeaders::from(Any),
        AllowList::List(list) => AllowHeaders::list(parse_all::<HeaderName>("header", list)),
    };
    let methods = match &config.allowed_methods {
        AllowList::Any => AllowMethods::from(Any),
        AllowList::List(list) => AllowMethods::list(parse_all::<Method>("method", list)),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}

fn parse_all<T>(kind: &str, items: &[String]) -> Vec<T>
where
    T: std::str::FromStr,
{
    items
        .iter()
        .filter_map(|item| match item.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(%item, kind, "ignoring invalid CORS entry");
                None
            }
        })
        .collect()
}
