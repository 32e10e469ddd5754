use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use std::sync::Arc;

use crate::error::ClassifiedError;
use crate::model::{Document, Fields, ResourceModel};

/// Shared handle to the collection a router serves.
pub type ModelHandle = Arc<dyn ResourceModel>;

/// Every response carries a JSON array: documents, messages, or nothing.
type Listing = (StatusCode, Json<Vec<Document>>);

fn listing(status: StatusCode, documents: Vec<Document>) -> Listing {
    (status, Json(documents))
}

fn not_found() -> Listing {
    listing(StatusCode::NOT_FOUND, Vec::new())
}

/// Builds the five CRUD routes for one collection
///
/// Mount the result under the collection's base path with `Router::nest`:
///
/// | Route          | Success             | Missing  |
/// |----------------|---------------------|----------|
/// | `GET /`        | 200, all documents  |          |
/// | `GET /{id}`    | 200, `[document]`   | 404, `[]`|
/// | `POST /`       | 201, `[document]`   |          |
/// | `PATCH /{id}`  | 200, `[document]`   | 404, `[]`|
/// | `DELETE /{id}` | 200, `[]`           | 404, `[]`|
///
/// Store failures are classified into 400/500 responses with a JSON array
/// of messages. Other methods on these paths get 405 with `[]`.
pub fn crud_router(model: ModelHandle) -> Router {
    Router::new()
        .route("/", get(list_handler).post(create_handler))
        .route(
            "/{id}",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(model)
}

async fn method_not_allowed() -> (StatusCode, Json<Vec<String>>) {
    (StatusCode::METHOD_NOT_ALLOWED, Json(Vec::new()))
}

pub async fn list_handler(State(model): State<ModelHandle>) -> Result<Listing, ClassifiedError> {
    let documents = model.find_all().await?;

    tracing::debug!(model = model.name(), count = documents.len(), "List request");

    Ok(listing(StatusCode::OK, documents))
}

pub async fn get_handler(
    State(model): State<ModelHandle>,
    Path(id): Path<String>,
) -> Result<Listing, ClassifiedError> {
    match model.find_by_id(&id).await? {
        Some(document) => Ok(listing(StatusCode::OK, vec![document])),
        None => {
            tracing::debug!(model = model.name(), id = %id, "Document not found");
            Ok(not_found())
        }
    }
}

pub async fn create_handler(
    State(model): State<ModelHandle>,
    body: Result<Json<Fields>, JsonRejection>,
) -> Result<Listing, ClassifiedError> {
    let Json(fields) = body?;
    let document = model.create(fields).await?;

    tracing::info!(model = model.name(), id = %document.id, "Document created");

    Ok(listing(StatusCode::CREATED, vec![document]))
}

pub async fn update_handler(
    State(model): State<ModelHandle>,
    Path(id): Path<String>,
    body: Result<Json<Fields>, JsonRejection>,
) -> Result<Listing, ClassifiedError> {
    let Json(fields) = body?;

    match model.update_by_id(&id, fields).await? {
        Some(document) => {
            tracing::info!(model = model.name(), id = %id, "Document updated");
            Ok(listing(StatusCode::OK, vec![document]))
        }
        None => Ok(not_found()),
    }
}

pub async fn delete_handler(
    State(model): State<ModelHandle>,
    Path(id): Path<String>,
) -> Result<Listing, ClassifiedError> {
    match model.delete_by_id(&id).await? {
        Some(_) => {
            tracing::info!(model = model.name(), id = %id, "Document deleted");
            Ok(listing(StatusCode::OK, Vec::new()))
        }
        None => Ok(not_found()),
    }
}
