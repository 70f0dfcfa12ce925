//! Interactive API reference, served outside production

use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{http::StatusCode, routing::get, Extension, Json};

use crate::types::Environment;

const OPENAPI_PATH: &str = "/openapi.json";

/// Scalar UI at `/docs`, reading the generated document from [`OPENAPI_PATH`]
pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .route(
            "/docs",
            Scalar::new(OPENAPI_PATH)
                .with_title("Shop Backend API")
                .axum_route(),
        )
        .route(OPENAPI_PATH, get(openapi_document))
}

#[allow(clippy::unused_async)]
async fn openapi_document(
    Extension(environment): Extension<Environment>,
    Extension(openapi): Extension<OpenApi>,
) -> Result<Json<OpenApi>, StatusCode> {
    environment
        .show_api_docs()
        .then_some(Json(openapi))
        .ok_or(StatusCode::NOT_FOUND)
}
