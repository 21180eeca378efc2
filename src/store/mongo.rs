//! MongoDB content store
//!
//! Wraps the driver with the same conventions as the rest of the store
//! layer: a startup ping with short timeouts so an unreachable store fails
//! fast, an index on each collection's order column, and created/updated
//! timestamps stamped into a `metadata` subdocument that never leaves the
//! server.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use futures_util::StreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, IndexModel};
use serde_json::{Map, Value};
use tracing::{error, info};

use super::{ContentStore, OrderAssignment, Row};
use crate::catalog;
use crate::types::{AtriumError, Result};

/// Subdocument holding server-side timestamps; stripped from responses
const METADATA_FIELD: &str = "metadata";

/// MongoDB-backed store
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db_name: String,
}

impl MongoStore {
    /// Connect and verify the connection with a ping
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| AtriumError::Store(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AtriumError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        let store = Self {
            client,
            db_name: db_name.to_string(),
        };
        store.apply_indexes().await?;
        Ok(store)
    }

    /// Index every catalog collection on its order column
    async fn apply_indexes(&self) -> Result<()> {
        for spec in catalog::COLLECTIONS {
            let index = IndexModel::builder()
                .keys(doc! { spec.order_field: 1 })
                .options(IndexOptions::builder().build())
                .build();

            self.collection(spec.name)
                .create_indexes(vec![index])
                .await
                .map_err(|e| {
                    AtriumError::Store(format!(
                        "Failed to create index on '{}': {}",
                        spec.name, e
                    ))
                })?;
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.client.database(&self.db_name).collection(name)
    }

    /// Order column for a collection; defaults to `order` for anything the
    /// catalog does not know (the service layer rejects those earlier)
    fn order_field(collection: &str) -> &'static str {
        catalog::find(collection)
            .map(|spec| spec.order_field)
            .unwrap_or("order")
    }

    fn parse_id(id: &str) -> Result<ObjectId> {
        ObjectId::parse_str(id)
            .map_err(|_| AtriumError::Validation(format!("Invalid id '{}'", id)))
    }

    /// Highest order value currently in the collection, if any
    async fn max_order(&self, collection: &str) -> Result<Option<i64>> {
        let order_field = Self::order_field(collection);
        let options = FindOptions::builder()
            .sort(doc! { order_field: -1 })
            .limit(1)
            .build();

        let mut cursor = self
            .collection(collection)
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| AtriumError::Store(format!("Find failed: {}", e)))?;

        match cursor.next().await {
            Some(Ok(document)) => Ok(Some(read_order(&document, order_field))),
            Some(Err(e)) => Err(AtriumError::Store(format!("Find failed: {}", e))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ContentStore for MongoStore {
    async fn list(&self, collection: &str) -> Result<Vec<Row>> {
        let order_field = Self::order_field(collection);
        let options = FindOptions::builder()
            .sort(doc! { order_field: 1, "_id": 1 })
            .build();

        let cursor = self
            .collection(collection)
            .find(doc! {})
            .with_options(options)
            .await
            .map_err(|e| AtriumError::Store(format!("Find failed: {}", e)))?;

        let documents: Vec<Document> = cursor
            .filter_map(|item| async {
                match item {
                    Ok(document) => Some(document),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(documents
            .iter()
            .map(|document| document_to_row(document, order_field))
            .collect())
    }

    async fn create(
        &self,
        collection: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row> {
        let order_field = Self::order_field(collection);

        let order = match order {
            Some(order) => order,
            None => self.max_order(collection).await?.unwrap_or(0) + 1,
        };

        let mut document = fields_to_document(&fields)?;
        document.insert(order_field, order);
        document.insert(
            METADATA_FIELD,
            doc! { "created_at": DateTime::now(), "updated_at": DateTime::now() },
        );

        let result = self
            .collection(collection)
            .insert_one(document)
            .await
            .map_err(|e| AtriumError::Store(format!("Insert failed: {}", e)))?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| AtriumError::Store("Failed to get inserted id".into()))?;

        Ok(Row {
            id: id.to_hex(),
            order,
            fields,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row> {
        let order_field = Self::order_field(collection);
        let oid = Self::parse_id(id)?;

        let mut set = fields_to_document(&fields)?;
        if let Some(order) = order {
            set.insert(order_field, order);
        }
        set.insert(format!("{}.updated_at", METADATA_FIELD), DateTime::now());

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        let updated = self
            .collection(collection)
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
            .with_options(options)
            .await
            .map_err(|e| AtriumError::Store(format!("Update failed: {}", e)))?
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        Ok(document_to_row(&updated, order_field))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Row> {
        let order_field = Self::order_field(collection);
        let oid = Self::parse_id(id)?;

        let deleted = self
            .collection(collection)
            .find_one_and_delete(doc! { "_id": oid })
            .await
            .map_err(|e| AtriumError::Store(format!("Delete failed: {}", e)))?
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        Ok(document_to_row(&deleted, order_field))
    }

    async fn resequence(&self, collection: &str, pairs: &[OrderAssignment]) -> Result<()> {
        let order_field = Self::order_field(collection);

        // One update per pair, abort on the first failure. Not transactional:
        // pairs already written stay written.
        for pair in pairs {
            let oid = Self::parse_id(&pair.id)?;
            let result = self
                .collection(collection)
                .update_one(
                    doc! { "_id": oid },
                    doc! { "$set": {
                        order_field: pair.order,
                        format!("{}.updated_at", METADATA_FIELD): DateTime::now(),
                    }},
                )
                .await
                .map_err(|e| AtriumError::Store(format!("Order update failed: {}", e)))?;

            if result.matched_count == 0 {
                return Err(AtriumError::NotFound(format!(
                    "No row with id '{}'",
                    pair.id
                )));
            }
        }

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AtriumError::Store(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }
}

/// Convert the JSON field bag to a BSON document
fn fields_to_document(fields: &Map<String, Value>) -> Result<Document> {
    let mut document = Document::new();
    for (key, value) in fields {
        let bson = bson::to_bson(value)
            .map_err(|e| AtriumError::Validation(format!("Field '{}' not storable: {}", key, e)))?;
        document.insert(key, bson);
    }
    Ok(document)
}

/// Convert a stored document back to a Row, stripping `_id`, the order
/// column, and server metadata from the field bag
fn document_to_row(document: &Document, order_field: &str) -> Row {
    let id = document
        .get_object_id("_id")
        .map(|oid| oid.to_hex())
        .unwrap_or_default();
    let order = read_order(document, order_field);

    let mut fields = Map::new();
    for (key, value) in document {
        if key == "_id" || key == order_field || key == METADATA_FIELD {
            continue;
        }
        fields.insert(key.clone(), value.clone().into_relaxed_extjson());
    }

    Row { id, order, fields }
}

/// Read the order column as i64, tolerating Int32/Double written by older clients
fn read_order(document: &Document, order_field: &str) -> i64 {
    match document.get(order_field) {
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_order_tolerates_numeric_types() {
        let document = doc! { "order": 5_i32 };
        assert_eq!(read_order(&document, "order"), 5);
        let document = doc! { "order": 7_i64 };
        assert_eq!(read_order(&document, "order"), 7);
        let document = doc! { "order": 3.0_f64 };
        assert_eq!(read_order(&document, "order"), 3);
        let document = doc! {};
        assert_eq!(read_order(&document, "order"), 0);
    }

    #[test]
    fn test_document_to_row_strips_internal_fields() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "order_index": 4_i64,
            "title": "Groundbreaking",
            "metadata": { "created_at": DateTime::now() },
        };

        let row = document_to_row(&document, "order_index");
        assert_eq!(row.id, oid.to_hex());
        assert_eq!(row.order, 4);
        assert_eq!(row.fields.len(), 1);
        assert_eq!(row.fields["title"], serde_json::json!("Groundbreaking"));
    }
}
