use std::fmt;

use thiserror::Error;

/// A single failed field in a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field name the failure belongs to
    pub path: String,
    /// User-facing message for this field
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// All field failures from one validation pass, in schema declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub model: String,
    pub errors: Vec<FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed", self.model)?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { ", " };
            write!(f, "{}{}: {}", sep, error.path, error.message)?;
        }
        Ok(())
    }
}

/// Failures surfaced by the document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique field collided with an existing document. Carries the
    /// schema's message, e.g. "Code taken".
    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Validation(ValidationError),

    /// A value could not be converted to the type its path expects.
    #[error("Cast to {kind} failed for value \"{value}\" (type string) at path \"{path}\"")]
    Cast {
        kind: &'static str,
        value: String,
        path: String,
    },

    /// The connection or storage engine itself failed.
    #[error("{0}")]
    Backend(String),

    #[error("{0}")]
    Unexpected(String),
}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_message_lists_fields_in_order() {
        let err = StoreError::from(ValidationError {
            model: "Department".to_string(),
            errors: vec![
                FieldError::new("name", "Name required"),
                FieldError::new("code", "Code required"),
            ],
        });

        assert_eq!(
            err.to_string(),
            "Department validation failed: name: Name required, code: Code required"
        );
    }

    #[test]
    fn test_cast_error_message_names_value_and_path() {
        let err = StoreError::Cast {
            kind: "ObjectId",
            value: "123a".to_string(),
            path: "_id".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Cast to ObjectId failed for value \"123a\" (type string) at path \"_id\""
        );
    }
}
