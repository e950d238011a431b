use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use mongodb::bson::oid::ObjectId;
use serde_json::{Map, Value};

use super::{strip_reserved, DocumentStore, StoreError};
use crate::models::{CollectionSpec, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

/// Process-local store for tests and database-less runs. Documents are kept
/// in insertion order per collection.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<&'static str, Vec<Map<String, Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in the collection.
    pub fn count(&self, spec: &CollectionSpec) -> usize {
        self.lock().get(spec.name).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<&'static str, Vec<Map<String, Value>>>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn date_of(doc: &Map<String, Value>, field: &str) -> Option<DateTime<Utc>> {
    doc.get(field)?.as_str()?.parse().ok()
}

fn id_of(doc: &Map<String, Value>) -> &str {
    doc.get(ID_FIELD).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, spec: &CollectionSpec, mut doc: Map<String, Value>) -> Result<Value, StoreError> {
        strip_reserved(&mut doc);
        let now = timestamp(Utc::now());
        doc.insert(ID_FIELD.to_string(), Value::String(ObjectId::new().to_hex()));
        doc.insert(CREATED_AT_FIELD.to_string(), now.clone());
        doc.insert(UPDATED_AT_FIELD.to_string(), now);

        self.lock().entry(spec.name).or_default().push(doc.clone());
        Ok(Value::Object(doc))
    }

    async fn find_all(&self, spec: &CollectionSpec) -> Result<Vec<Value>, StoreError> {
        let collections = self.lock();
        Ok(collections
            .get(spec.name)
            .map(|docs| docs.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default())
    }

    async fn find_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.lock();
        Ok(collections
            .get(spec.name)
            .and_then(|docs| docs.iter().find(|doc| id_of(doc) == id))
            .cloned()
            .map(Value::Object))
    }

    async fn update_by_id(
        &self,
        spec: &CollectionSpec,
        id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        strip_reserved(&mut fields);
        let mut collections = self.lock();
        let Some(doc) = collections
            .get_mut(spec.name)
            .and_then(|docs| docs.iter_mut().find(|doc| id_of(doc) == id))
        else {
            return Ok(None);
        };

        doc.extend(fields);
        doc.insert(UPDATED_AT_FIELD.to_string(), timestamp(Utc::now()));
        Ok(Some(Value::Object(doc.clone())))
    }

    async fn delete_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.lock();
        let Some(docs) = collections.get_mut(spec.name) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| id_of(doc) != id);
        Ok(docs.len() != before)
    }

    async fn find_recent(&self, spec: &CollectionSpec, limit: usize) -> Result<Vec<Value>, StoreError> {
        let collections = self.lock();
        let Some(docs) = collections.get(spec.name) else {
            return Ok(Vec::new());
        };

        // Insertion order breaks ties between documents created in the same millisecond.
        let mut ordered: Vec<(usize, &Map<String, Value>)> = docs.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            date_of(b, CREATED_AT_FIELD)
                .cmp(&date_of(a, CREATED_AT_FIELD))
                .then(ib.cmp(ia))
        });

        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|(_, doc)| Value::Object(doc.clone()))
            .collect())
    }

    async fn find_from(
        &self,
        spec: &CollectionSpec,
        field: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Value>, StoreError> {
        let collections = self.lock();
        let Some(docs) = collections.get(spec.name) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<(DateTime<Utc>, &Map<String, Value>)> = docs
            .iter()
            .filter_map(|doc| date_of(doc, field).map(|at| (at, doc)))
            .filter(|(at, _)| *at >= from)
            .collect();
        matching.sort_by_key(|(at, _)| *at);

        Ok(matching
            .into_iter()
            .map(|(_, doc)| Value::Object(doc.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SPEC: CollectionSpec = CollectionSpec {
        name: "things",
        date_fields: &["date"],
    };

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let store = MemoryStore::new();
        let saved = store.insert(&SPEC, object(json!({ "name": "a" }))).await.unwrap();

        assert_eq!(saved["name"], "a");
        assert_eq!(saved["_id"].as_str().unwrap().len(), 24);
        assert_eq!(saved["createdAt"], saved["updatedAt"]);
        assert_eq!(store.count(&SPEC), 1);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_ids() {
        let store = MemoryStore::new();
        let missing = ObjectId::new().to_hex();

        assert!(store
            .update_by_id(&SPEC, &missing, object(json!({ "name": "b" })))
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_by_id(&SPEC, &missing).await.unwrap());
    }

    #[tokio::test]
    async fn update_sets_fields_and_keeps_the_rest() {
        let store = MemoryStore::new();
        let saved = store
            .insert(&SPEC, object(json!({ "name": "a", "size": 1 })))
            .await
            .unwrap();
        let id = saved["_id"].as_str().unwrap();

        let updated = store
            .update_by_id(&SPEC, id, object(json!({ "size": 2, "_id": "hijack" })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated["_id"], saved["_id"]);
        assert_eq!(updated["name"], "a");
        assert_eq!(updated["size"], 2);
        assert_eq!(updated["createdAt"], saved["createdAt"]);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store.insert(&SPEC, object(json!({ "n": n }))).await.unwrap();
        }

        let recent = store.find_recent(&SPEC, 3).await.unwrap();
        let order: Vec<i64> = recent.iter().map(|d| d["n"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn find_from_filters_and_sorts_by_the_date_field() {
        let store = MemoryStore::new();
        for date in ["2030-03-01T00:00:00Z", "2020-01-01T00:00:00Z", "2030-01-01T00:00:00Z"] {
            store.insert(&SPEC, object(json!({ "date": date }))).await.unwrap();
        }

        let from = "2025-01-01T00:00:00Z".parse().unwrap();
        let found = store.find_from(&SPEC, "date", from).await.unwrap();
        let dates: Vec<&str> = found.iter().map(|d| d["date"].as_str().unwrap()).collect();
        assert_eq!(dates, vec!["2030-01-01T00:00:00Z", "2030-03-01T00:00:00Z"]);
    }
}
