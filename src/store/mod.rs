pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::models::{CollectionSpec, Resource, Stored, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Number of documents returned by the recency listings.
pub const RECENT_LIMIT: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database is not connected")]
    NotConnected,

    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("stored document is malformed: {0}")]
    Decode(String),
}

/// Untyped document persistence, one call per store round trip.
///
/// Documents cross this boundary as JSON objects. Implementations assign
/// `_id` and maintain `createdAt`/`updatedAt`; callers never send those keys.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert(&self, spec: &CollectionSpec, doc: Map<String, Value>) -> Result<Value, StoreError>;

    async fn find_all(&self, spec: &CollectionSpec) -> Result<Vec<Value>, StoreError>;

    /// Ids that are not valid identifiers resolve to `None`, like unknown ids.
    async fn find_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<Option<Value>, StoreError>;

    /// Sets the given fields and returns the updated document.
    async fn update_by_id(
        &self,
        spec: &CollectionSpec,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError>;

    /// Returns whether a document was removed.
    async fn delete_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<bool, StoreError>;

    /// Newest first by `createdAt`.
    async fn find_recent(&self, spec: &CollectionSpec, limit: usize) -> Result<Vec<Value>, StoreError>;

    /// Documents whose date `field` is at or after `from`, oldest first.
    async fn find_from(
        &self,
        spec: &CollectionSpec,
        field: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Value>, StoreError>;
}

/// Typed access to the collection that backs `R`.
pub struct Documents<'a, R> {
    store: &'a dyn DocumentStore,
    _resource: PhantomData<R>,
}

impl<'a, R: Resource> Documents<'a, R> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    pub async fn create(&self, document: &R) -> Result<Stored<R>, StoreError> {
        let saved = self.store.insert(&R::COLLECTION, to_fields(document)?).await?;
        decode(saved)
    }

    pub async fn list(&self) -> Result<Vec<Stored<R>>, StoreError> {
        decode_all(self.store.find_all(&R::COLLECTION).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Stored<R>>, StoreError> {
        self.store
            .find_by_id(&R::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Overwrites every model field of the document with `document`.
    pub async fn replace(&self, id: &str, document: &R) -> Result<Option<Stored<R>>, StoreError> {
        self.store
            .update_by_id(&R::COLLECTION, id, to_fields(document)?)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete_by_id(&R::COLLECTION, id).await
    }

    pub async fn recent(&self) -> Result<Vec<Stored<R>>, StoreError> {
        decode_all(self.store.find_recent(&R::COLLECTION, RECENT_LIMIT).await?)
    }

    pub async fn from_date(&self, field: &str, from: DateTime<Utc>) -> Result<Vec<Stored<R>>, StoreError> {
        decode_all(self.store.find_from(&R::COLLECTION, field, from).await?)
    }
}

/// Removes the keys the store owns from a caller-supplied object.
pub fn strip_reserved(fields: &mut Map<String, Value>) {
    for key in [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD] {
        fields.remove(key);
    }
}

fn to_fields<R: Resource>(document: &R) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(document) {
        Ok(Value::Object(mut fields)) => {
            strip_reserved(&mut fields);
            Ok(fields)
        }
        Ok(other) => Err(StoreError::Decode(format!(
            "{} documents must serialize to objects, got {other}",
            R::COLLECTION.name
        ))),
        Err(e) => Err(StoreError::Decode(e.to_string())),
    }
}

fn decode<R: Resource>(value: Value) -> Result<Stored<R>, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Decode(format!("{}: {e}", R::COLLECTION.name)))
}

fn decode_all<R: Resource>(values: Vec<Value>) -> Result<Vec<Stored<R>>, StoreError> {
    values.into_iter().map(decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HazardDetection, LocalAlert};
    use serde_json::json;

    #[tokio::test]
    async fn create_then_get_returns_the_same_document() {
        let store = MemoryStore::new();
        let hazards = Documents::<HazardDetection>::new(&store);

        let detection: HazardDetection = serde_json::from_value(json!({
            "status": "hazard_detected",
            "dangerLevel": "high"
        }))
        .unwrap();

        let created = hazards.create(&detection).await.unwrap();
        let fetched = hazards.get(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.document, detection);
    }

    #[tokio::test]
    async fn reserved_keys_in_extra_content_are_not_stored() {
        let store = MemoryStore::new();
        let alerts = Documents::<LocalAlert>::new(&store);

        let alert: LocalAlert = serde_json::from_value(json!({
            "date": "2030-01-01T00:00:00Z",
            "_id": "not-mine",
            "createdAt": "1999-01-01T00:00:00Z"
        }))
        .unwrap();

        let created = alerts.create(&alert).await.unwrap();
        assert_ne!(created.id, "not-mine");
        assert!(created.created_at.timestamp() > 946_684_800);
        assert!(created.document.extra.is_empty());
    }
}
