use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{Collections, Database, StoreError, ValidationError};
use crate::model::{Document, Fields, ResourceModel};
use crate::object_id::ObjectId;
use crate::schema::{Schema, format_timestamp};

const CREATED_AT: &str = "createdAt";
const UPDATED_AT: &str = "updatedAt";
const VERSION_KEY: &str = "__v";

/// A collection bound to its schema.
#[derive(Clone)]
pub struct Model {
    db: Database,
    collection: String,
    schema: Arc<Schema>,
}

impl Model {
    pub(super) fn new(db: Database, collection: &str, schema: Schema) -> Self {
        Self {
            db,
            collection: collection.to_string(),
            schema: Arc::new(schema),
        }
    }

    fn parse_id(&self, id: &str) -> Result<ObjectId, StoreError> {
        id.parse().map_err(|_| StoreError::Cast {
            kind: "ObjectId",
            value: id.to_string(),
            path: "_id".to_string(),
        })
    }

    /// Validates `body` against the schema, resolving references in the
    /// current collections.
    fn validate(
        &self,
        collections: &Collections,
        body: &Fields,
        all_fields: bool,
    ) -> Result<Fields, StoreError> {
        let input = self.schema.retain_known(body);

        self.schema
            .validate(&input, all_fields, |reference, id| {
                collections
                    .get(&reference.collection)
                    .is_some_and(|docs| docs.iter().any(|d| d.id.to_string() == id))
            })
            .map_err(|errors| {
                StoreError::from(ValidationError {
                    model: self.schema.model.clone(),
                    errors,
                })
            })
    }

    /// Compares unique fields against every document except `own_id`.
    fn check_unique(
        &self,
        collections: &Collections,
        fields: &Fields,
        own_id: Option<ObjectId>,
    ) -> Result<(), StoreError> {
        let existing = collections.get(&self.collection);
        for spec in self.schema.fields.iter() {
            let (Some(message), Some(value)) = (&spec.unique, fields.get(&spec.name)) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let taken = existing.is_some_and(|docs| {
                docs.iter()
                    .any(|d| Some(d.id) != own_id && d.get(&spec.name) == Some(value))
            });
            if taken {
                return Err(StoreError::Duplicate(message.clone()));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ResourceModel for Model {
    fn name(&self) -> &str {
        &self.schema.model
    }

    async fn find_all(&self) -> Result<Vec<Document>, StoreError> {
        let collections = self.db.read().await?;
        let documents = collections
            .get(&self.collection)
            .cloned()
            .unwrap_or_default();

        tracing::debug!(
            collection = %self.collection,
            count = documents.len(),
            "Listed documents"
        );

        Ok(documents)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let id = self.parse_id(id)?;
        let collections = self.db.read().await?;

        Ok(collections
            .get(&self.collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn create(&self, fields: Fields) -> Result<Document, StoreError> {
        let mut collections = self.db.write().await?;
        let mut fields = self.validate(&collections, &fields, true)?;
        self.check_unique(&collections, &fields, None)?;

        self.schema.apply_defaults(&mut fields);
        let mut fields = self.schema.ordered(fields);

        if self.schema.timestamps {
            let now = Value::String(format_timestamp(Utc::now()));
            fields.insert(CREATED_AT.to_string(), now.clone());
            fields.insert(UPDATED_AT.to_string(), now);
        }
        fields.insert(VERSION_KEY.to_string(), Value::from(0));

        let document = Document::new(ObjectId::new(), fields);
        collections
            .entry(self.collection.clone())
            .or_default()
            .push(document.clone());

        tracing::debug!(
            collection = %self.collection,
            id = %document.id,
            "Inserted document"
        );

        Ok(document)
    }

    async fn update_by_id(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<Option<Document>, StoreError> {
        let id = self.parse_id(id)?;
        let mut collections = self.db.write().await?;
        let updates = self.validate(&collections, &fields, false)?;

        let exists = collections
            .get(&self.collection)
            .is_some_and(|docs| docs.iter().any(|d| d.id == id));
        if !exists {
            return Ok(None);
        }
        self.check_unique(&collections, &updates, Some(id))?;

        let Some(document) = collections
            .get_mut(&self.collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
        else {
            return Ok(None);
        };

        for (name, value) in updates {
            document.fields.insert(name, value);
        }
        if self.schema.timestamps {
            document.fields.insert(
                UPDATED_AT.to_string(),
                Value::String(format_timestamp(Utc::now())),
            );
        }
        document.fields = self.schema.ordered(std::mem::take(&mut document.fields));

        tracing::debug!(collection = %self.collection, id = %id, "Updated document");

        Ok(Some(document.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let id = self.parse_id(id)?;
        let mut collections = self.db.write().await?;

        let removed = collections.get_mut(&self.collection).and_then(|docs| {
            docs.iter()
                .position(|d| d.id == id)
                .map(|index| docs.remove(index))
        });

        if removed.is_some() {
            tracing::debug!(collection = %self.collection, id = %id, "Deleted document");
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn body(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn widgets(db: &Database) -> Model {
        db.model(
            "widgets",
            Schema::new("Widget")
                .field(
                    FieldSpec::string("code")
                        .required("Code required")
                        .unique("Code taken"),
                )
                .field(FieldSpec::string("label"))
                .field(FieldSpec::boolean("isActive").default_value(json!(true)))
                .timestamps(),
        )
    }

    fn parts(db: &Database) -> Model {
        db.model(
            "parts",
            Schema::new("Part").field(
                FieldSpec::object_id("widgetId")
                    .required("Widget required")
                    .references("widgets", "Invalid widget"),
            ),
        )
    }

    #[tokio::test]
    async fn test_create_applies_defaults_timestamps_and_version() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        let doc = model
            .create(body(json!({"label": "first", "code": "A1", "unknown": 5})))
            .await
            .unwrap();

        let keys: Vec<&str> = doc.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["code", "label", "isActive", "createdAt", "updatedAt", "__v"]);
        assert_eq!(doc.get("isActive"), Some(&json!(true)));
        assert_eq!(doc.get("createdAt"), doc.get("updatedAt"));
        assert_eq!(doc.get("__v"), Some(&json!(0)));
    }

    #[tokio::test]
    async fn test_find_all_in_insertion_order() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        assert!(model.find_all().await.unwrap().is_empty());

        let a = model.create(body(json!({"code": "A"}))).await.unwrap();
        let b = model.create(body(json!({"code": "B"}))).await.unwrap();

        let all = model.find_all().await.unwrap();
        assert_eq!(all, vec![a, b]);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_unique_value() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        model.create(body(json!({"code": "A"}))).await.unwrap();
        let err = model.create(body(json!({"code": "A"}))).await.unwrap_err();

        assert_eq!(err, StoreError::Duplicate("Code taken".to_string()));
    }

    #[tokio::test]
    async fn test_create_reports_validation_failures() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        let err = model
            .create(body(json!({"isActive": "perhaps"})))
            .await
            .unwrap_err();

        let validation = match err {
            StoreError::Validation(validation) => validation,
            other => panic!("expected validation error, got {:?}", other),
        };
        assert_eq!(validation.model, "Widget");
        let paths: Vec<&str> = validation.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["code", "isActive"]);
    }

    #[tokio::test]
    async fn test_find_by_id_casts_identity() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        let doc = model.create(body(json!({"code": "A"}))).await.unwrap();

        let found = model.find_by_id(&doc.id.to_string()).await.unwrap();
        assert_eq!(found, Some(doc));

        let missing = model.find_by_id(&ObjectId::new().to_string()).await.unwrap();
        assert_eq!(missing, None);

        let err = model.find_by_id("123a").await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Cast {
                kind: "ObjectId",
                value: "123a".to_string(),
                path: "_id".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_update_sets_only_supplied_fields() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        let doc = model
            .create(body(json!({"code": "A", "label": "old"})))
            .await
            .unwrap();

        let updated = model
            .update_by_id(&doc.id.to_string(), body(json!({"label": "new"})))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, doc.id);
        assert_eq!(updated.get("code"), Some(&json!("A")));
        assert_eq!(updated.get("label"), Some(&json!("new")));
        assert_eq!(updated.get("createdAt"), doc.get("createdAt"));

        let stored = model.find_by_id(&doc.id.to_string()).await.unwrap();
        assert_eq!(stored, Some(updated));
    }

    #[tokio::test]
    async fn test_update_validates_supplied_fields() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        let a = model.create(body(json!({"code": "A"}))).await.unwrap();
        model.create(body(json!({"code": "B"}))).await.unwrap();

        let err = model
            .update_by_id(&a.id.to_string(), body(json!({"code": ""})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = model
            .update_by_id(&a.id.to_string(), body(json!({"code": "B"})))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Duplicate("Code taken".to_string()));

        // keeping its own value is not a collision
        let same = model
            .update_by_id(&a.id.to_string(), body(json!({"code": "A"})))
            .await
            .unwrap();
        assert!(same.is_some());
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        let result = model
            .update_by_id(&ObjectId::new().to_string(), body(json!({"label": "x"})))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_update_missing_document_ignores_unique_collision() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        model.create(body(json!({"code": "A"}))).await.unwrap();

        let result = model
            .update_by_id(&ObjectId::new().to_string(), body(json!({"code": "A"})))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        let doc = model.create(body(json!({"code": "A"}))).await.unwrap();
        let id = doc.id.to_string();

        assert_eq!(model.delete_by_id(&id).await.unwrap(), Some(doc));
        assert_eq!(model.delete_by_id(&id).await.unwrap(), None);
        assert_eq!(model.find_by_id(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reference_checked_against_other_collection() {
        let db = Database::connect("memory://test").unwrap();
        let widgets = widgets(&db);
        let parts = parts(&db);

        let err = parts
            .create(body(json!({"widgetId": ObjectId::new().to_string()})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid widget"));

        let widget = widgets.create(body(json!({"code": "W"}))).await.unwrap();
        let part = parts
            .create(body(json!({"widgetId": widget.id.to_string()})))
            .await
            .unwrap();
        assert_eq!(part.get("widgetId"), Some(&json!(widget.id.to_string())));
    }

    #[tokio::test]
    async fn test_operations_after_close_are_backend_errors() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);
        db.close().await;

        let err = model.find_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        let err = model.create(body(json!({"code": "A"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn test_writer_queued_before_close_sees_closed_store() {
        let db = Database::connect("memory://test").unwrap();
        let model = widgets(&db);

        let guard = db.write().await.unwrap();

        let pending = tokio::spawn({
            let model = model.clone();
            async move { model.create(body(json!({"code": "A"}))).await }
        });
        tokio::task::yield_now().await;

        let closing = tokio::spawn({
            let db = db.clone();
            async move { db.close().await }
        });
        tokio::task::yield_now().await;
        assert!(!db.is_open());

        drop(guard);

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err, StoreError::Backend("connection is closed".to_string()));
        closing.await.unwrap();
    }
}
