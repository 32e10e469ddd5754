//! Embedded document store.
//!
//! A [`Database`] is an explicitly opened connection that owns every
//! collection. Binding a [`Schema`] to a collection name yields a [`Model`],
//! which is what the HTTP layer talks to through
//! [`ResourceModel`](crate::model::ResourceModel).

mod error;
mod model;

pub use error::{FieldError, StoreError, ValidationError};
pub use model::Model;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use url::Url;

use crate::model::Document;
use crate::schema::Schema;

/// URI scheme accepted by [`Database::connect`].
pub const MEMORY_SCHEME: &str = "memory";

/// Documents of every collection, keyed by collection name, in insertion
/// order.
pub(crate) type Collections = HashMap<String, Vec<Document>>;

struct Inner {
    name: String,
    open: AtomicBool,
    collections: RwLock<Collections>,
}

/// A handle to an open store. Clones share the same collections.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl Database {
    /// Opens a store from a URI such as `memory://staff`.
    ///
    /// The host (or, failing that, the path) names the database.
    pub fn connect(uri: &str) -> Result<Self, StoreError> {
        let url = Url::parse(uri)
            .map_err(|e| StoreError::Backend(format!("invalid database URI {}: {}", uri, e)))?;

        if url.scheme() != MEMORY_SCHEME {
            return Err(StoreError::Backend(format!(
                "unsupported database scheme: {}",
                url.scheme()
            )));
        }

        let name = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| url.path().trim_matches('/').to_string());

        tracing::info!(database = %name, "Connected to document store");

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                open: AtomicBool::new(true),
                collections: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Closes the connection. Every later operation on this database, or on
    /// models bound to it, fails with [`StoreError::Backend`].
    pub async fn close(&self) {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            let collections = self.inner.collections.read().await;
            let documents: usize = collections.values().map(Vec::len).sum();
            tracing::info!(
                database = %self.inner.name,
                collections = collections.len(),
                documents = documents,
                "Document store connection closed"
            );
        }
    }

    /// Binds `schema` to the named collection.
    pub fn model(&self, collection: &str, schema: Schema) -> Model {
        Model::new(self.clone(), collection, schema)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Backend("connection is closed".to_string()))
        }
    }

    // The open flag is checked once the lock is held, so callers queued
    // behind a writer still observe a close that happened while they waited.
    pub(crate) async fn read(
        &self,
    ) -> Result<tokio::sync::RwLockReadGuard<'_, Collections>, StoreError> {
        let guard = self.inner.collections.read().await;
        self.ensure_open()?;
        Ok(guard)
    }

    pub(crate) async fn write(
        &self,
    ) -> Result<tokio::sync::RwLockWriteGuard<'_, Collections>, StoreError> {
        let guard = self.inner.collections.write().await;
        self.ensure_open()?;
        Ok(guard)
    }
}
