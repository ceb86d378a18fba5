use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use catalog_core::ProductId;
use catalog_products::ProductFields;

use crate::app::{dto, errors};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_id(id: &str) -> Result<ProductId, axum::response::Response> {
    id.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"))
}

fn body_error(rejection: JsonRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.get_all().await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<ProductFields>, JsonRejection>,
) -> axum::response::Response {
    let Json(fields) = match body {
        Ok(v) => v,
        Err(rejection) => return body_error(rejection),
    };

    match services.products.create(fields).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.get_by_id(product_id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(product)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Result<Json<ProductFields>, JsonRejection>,
) -> axum::response::Response {
    let product_id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(fields) = match body {
        Ok(v) => v,
        Err(rejection) => return body_error(rejection),
    };

    match services.products.update(product_id, fields).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.delete(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<dto::SearchParams>, QueryRejection>,
) -> axum::response::Response {
    let params = match query {
        Ok(Query(v)) => v,
        Err(rejection) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_query", rejection.body_text());
        }
    };
    let (filter, page) = match params.into_parts() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.search(&filter, &page).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
