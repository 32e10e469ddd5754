//! The capability set a resource collection exposes to the HTTP layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::object_id::ObjectId;
use crate::store::StoreError;

/// Field name to value, in insertion order.
pub type Fields = Map<String, Value>;

/// A stored document: its identity plus whatever fields the schema kept.
///
/// Serializes flat, with `_id` first:
/// `{"_id": "65a1f0c2b3d4e5f601234567", "name": "IT", ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: ObjectId, fields: Fields) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Store operations the CRUD router needs from a collection.
///
/// Identifiers arrive as raw path segments; converting them (and reporting
/// malformed ones as [`StoreError::Cast`]) is the implementation's job.
/// `None` means no document has that identity.
#[async_trait]
pub trait ResourceModel: Send + Sync {
    /// Model name used in logs, e.g. "Department"
    fn name(&self) -> &str;

    async fn find_all(&self) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Validates and inserts a new document.
    async fn create(&self, fields: Fields) -> Result<Document, StoreError>;

    /// Sets the given fields on an existing document, leaving the rest
    /// untouched, and returns the document as it is after the update.
    /// Validation runs on the supplied fields.
    async fn update_by_id(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError>;

    /// Removes a document and returns what was removed.
    async fn delete_by_id(&self, id: &str) -> Result<Option<Document>, StoreError>;
}
