use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::store::StoreError;

/// Replacement for any field message reporting a failed date cast.
pub const DATE_FORMAT_INVALID: &str = "Date format invalid";

/// A failed request as the client sees it: a status and a non-empty list of
/// messages, rendered as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ClassifiedError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            messages: vec![message.into()],
        }
    }
}

/// Maps a store failure to the response the client receives.
///
/// Rules apply in order and the first match wins: a message mentioning
/// "taken", field validation, identifier cast, backend failure, anything
/// else.
pub fn classify(error: &StoreError) -> ClassifiedError {
    let message = error.to_string();

    if message.contains("taken") {
        tracing::warn!(error_type = "Duplicate", error = %message, "Request failed: value taken");
        return ClassifiedError::new(StatusCode::BAD_REQUEST, message);
    }

    match error {
        StoreError::Validation(validation) => {
            let messages = validation
                .errors
                .iter()
                .map(|e| {
                    if e.message.contains("Cast to date") {
                        DATE_FORMAT_INVALID.to_string()
                    } else {
                        e.message.clone()
                    }
                })
                .collect::<Vec<_>>();

            tracing::warn!(
                error_type = "Validation",
                model = %validation.model,
                field_count = messages.len(),
                "Request failed: validation"
            );

            ClassifiedError {
                status: StatusCode::BAD_REQUEST,
                messages,
            }
        }
        StoreError::Cast { value, .. } => {
            tracing::warn!(error_type = "Cast", value = %value, "Request failed: invalid ID");
            ClassifiedError::new(StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", value))
        }
        StoreError::Backend(_) => {
            tracing::error!(error_type = "Backend", error = %message, "Request failed: database error");
            ClassifiedError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", message),
            )
        }
        StoreError::Duplicate(_) | StoreError::Unexpected(_) => {
            tracing::error!(error_type = "Unexpected", error = %message, "Request failed: unexpected error");
            let text = if message.is_empty() {
                "Unexpected error".to_string()
            } else {
                format!("Unexpected error: {}", message)
            };
            ClassifiedError::new(StatusCode::INTERNAL_SERVER_ERROR, text)
        }
    }
}

impl From<StoreError> for ClassifiedError {
    fn from(err: StoreError) -> Self {
        classify(&err)
    }
}

/// Bodies that are not a JSON object never reach the store.
impl From<JsonRejection> for ClassifiedError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!(error_type = "Body", error = %rejection, "Request failed: unreadable body");
        ClassifiedError::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ClassifiedError {
    fn into_response(self) -> Response {
        (self.status, Json(self.messages)).into_response()
    }
}
