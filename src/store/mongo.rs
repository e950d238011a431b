use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection, Database};
use serde_json::{Map, Value};
use tracing::{error, info};

use super::{strip_reserved, DocumentStore, StoreError};
use crate::models::{CollectionSpec, CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD};

const DEFAULT_DATABASE: &str = "roadwatch";

/// MongoDB-backed store. Holds no database handle when the connection string
/// could not be parsed; every call then fails with `StoreError::NotConnected`.
#[derive(Clone)]
pub struct MongoStore {
    db: Option<Database>,
}

impl MongoStore {
    /// Connects and pings once. Failures are logged and never abort startup.
    pub async fn connect(url: &str, database: Option<&str>) -> Self {
        let client = match Client::with_uri_str(url).await {
            Ok(client) => client,
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                return Self { db: None };
            }
        };

        let db = match database {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };

        match db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => info!(database = db.name(), "MongoDB connected"),
            Err(e) => error!("MongoDB connection failed: {}", e),
        }

        Self { db: Some(db) }
    }

    fn collection(&self, spec: &CollectionSpec) -> Result<Collection<Document>, StoreError> {
        self.db
            .as_ref()
            .map(|db| db.collection::<Document>(spec.name))
            .ok_or(StoreError::NotConnected)
    }
}

fn now() -> bson::DateTime {
    bson::DateTime::from_millis(Utc::now().timestamp_millis())
}

/// Converts a JSON object into a BSON document, turning the collection's date
/// fields from RFC 3339 strings into native dates.
pub(crate) fn to_document(spec: &CollectionSpec, fields: Map<String, Value>) -> Result<Document, StoreError> {
    let mut document = bson::to_document(&fields)?;
    for field in spec.date_fields {
        let parsed = match document.get_str(*field) {
            Ok(raw) => raw
                .parse::<DateTime<Utc>>()
                .map_err(|e| StoreError::Decode(format!("{field}: {e}")))?,
            Err(_) => continue,
        };
        document.insert(*field, bson::DateTime::from_millis(parsed.timestamp_millis()));
    }
    Ok(document)
}

/// Inverse of [`to_document`]: ids become hex strings and dates RFC 3339
/// strings before the rest is rendered as relaxed extended JSON.
pub(crate) fn from_document(spec: &CollectionSpec, mut document: Document) -> Value {
    if let Some(Bson::ObjectId(id)) = document.get(ID_FIELD) {
        let hex = id.to_hex();
        document.insert(ID_FIELD, hex);
    }

    let date_fields = spec
        .date_fields
        .iter()
        .copied()
        .chain([CREATED_AT_FIELD, UPDATED_AT_FIELD]);
    for field in date_fields {
        if let Some(Bson::DateTime(at)) = document.get(field) {
            let rendered = DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis())
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));
            if let Some(rendered) = rendered {
                document.insert(field, rendered);
            }
        }
    }

    Bson::Document(document).into_relaxed_extjson()
}

fn id_filter(id: &str) -> Option<Document> {
    ObjectId::parse_str(id).ok().map(|oid| doc! { ID_FIELD: oid })
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn insert(&self, spec: &CollectionSpec, mut fields: Map<String, Value>) -> Result<Value, StoreError> {
        let collection = self.collection(spec)?;
        strip_reserved(&mut fields);

        let mut document = to_document(spec, fields)?;
        let at = now();
        document.insert(ID_FIELD, ObjectId::new());
        document.insert(CREATED_AT_FIELD, at);
        document.insert(UPDATED_AT_FIELD, at);

        collection.insert_one(&document).await?;
        Ok(from_document(spec, document))
    }

    async fn find_all(&self, spec: &CollectionSpec) -> Result<Vec<Value>, StoreError> {
        let cursor = self.collection(spec)?.find(doc! {}).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(|d| from_document(spec, d)).collect())
    }

    async fn find_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<Option<Value>, StoreError> {
        let collection = self.collection(spec)?;
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        Ok(collection
            .find_one(filter)
            .await?
            .map(|d| from_document(spec, d)))
    }

    async fn update_by_id(
        &self,
        spec: &CollectionSpec,
        id: &str,
        mut fields: Map<String, Value>,
    ) -> Result<Option<Value>, StoreError> {
        let collection = self.collection(spec)?;
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        strip_reserved(&mut fields);

        let mut set = to_document(spec, fields)?;
        set.insert(UPDATED_AT_FIELD, now());

        let updated = collection
            .find_one_and_update(filter, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated.map(|d| from_document(spec, d)))
    }

    async fn delete_by_id(&self, spec: &CollectionSpec, id: &str) -> Result<bool, StoreError> {
        let collection = self.collection(spec)?;
        let Some(filter) = id_filter(id) else {
            return Ok(false);
        };
        let result = collection.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    async fn find_recent(&self, spec: &CollectionSpec, limit: usize) -> Result<Vec<Value>, StoreError> {
        let cursor = self
            .collection(spec)?
            .find(doc! {})
            .sort(doc! { CREATED_AT_FIELD: -1, ID_FIELD: -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(|d| from_document(spec, d)).collect())
    }

    async fn find_from(
        &self,
        spec: &CollectionSpec,
        field: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<Value>, StoreError> {
        let from = bson::DateTime::from_millis(from.timestamp_millis());
        let cursor = self
            .collection(spec)?
            .find(doc! { field: { "$gte": from } })
            .sort(doc! { field: 1 })
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(|d| from_document(spec, d)).collect())
    }
}
