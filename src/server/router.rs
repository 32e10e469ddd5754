use axum::{
    Json, Router,
    http::{Method, StatusCode, header},
};
use tower_http::{cors::CorsLayer, normalize_path::NormalizePath, trace::TraceLayer};

use crate::resources::{API_PREFIX, department, employee};
use crate::{AppState, server::crud::crud_router};

/// The served application: the router behind trailing-slash normalization.
pub type App = NormalizePath<Router>;

/// Wraps [`create_router`] so `/api/v1/departments/` routes like
/// `/api/v1/departments`.
///
/// Normalization has to run before routing, so it wraps the router instead
/// of being added with `Router::layer`.
pub fn create_app(state: AppState) -> App {
    NormalizePath::trim_trailing_slash(create_router(state))
}

/// Creates and configures the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .nest(
            &format!("{}/{}", API_PREFIX, department::COLLECTION),
            crud_router(state.departments),
        )
        .nest(
            &format!("{}/{}", API_PREFIX, employee::COLLECTION),
            crud_router(state.employees),
        )
        .fallback(fallback_handler);

    let router = match state.allowed_origin {
        Some(origin) => router.layer(cors_layer(origin)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: axum::http::HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Unknown paths still answer with a JSON array.
async fn fallback_handler() -> (StatusCode, Json<Vec<String>>) {
    (StatusCode::NOT_FOUND, Json(Vec::new()))
}
