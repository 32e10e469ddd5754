//! Validation configurations for the collections the service exposes.

pub mod department;
pub mod employee;

use crate::schema::Schema;
use crate::store::{Database, Model};

/// Base path every collection is mounted under.
pub const API_PREFIX: &str = "/api/v1";

/// A collection name paired with the schema its documents follow.
pub struct Resource {
    pub collection: &'static str,
    pub schema: Schema,
}

impl Resource {
    /// Where the collection's routes are mounted, e.g. `/api/v1/departments`.
    pub fn base_path(&self) -> String {
        format!("{}/{}", API_PREFIX, self.collection)
    }

    pub fn bind(self, db: &Database) -> Model {
        db.model(self.collection, self.schema)
    }
}
