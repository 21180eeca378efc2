//! In-memory content store
//!
//! Backend for dev mode (no MongoDB required) and for the test suite.
//! Collections are created lazily on first write; ids are v4 UUIDs.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{display_cmp, ContentStore, OrderAssignment, Row};
use crate::types::{AtriumError, Result};

/// DashMap-backed store, one entry per collection
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<Row>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently held for a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|rows| rows.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Row>> {
        let mut rows = self
            .collections
            .get(collection)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        rows.sort_by(display_cmp);
        Ok(rows)
    }

    async fn create(
        &self,
        collection: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row> {
        let mut entry = self.collections.entry(collection.to_string()).or_default();

        let order = order.unwrap_or_else(|| {
            entry.iter().map(|row| row.order).max().unwrap_or(0) + 1
        });

        let row = Row {
            id: Uuid::new_v4().to_string(),
            order,
            fields,
        };
        entry.push(row.clone());

        debug!(collection = collection, id = %row.id, order = row.order, "Row created");
        Ok(row)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row> {
        let mut entry = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        let row = entry
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        if let Some(order) = order {
            row.order = order;
        }
        for (k, v) in fields {
            row.fields.insert(k, v);
        }

        Ok(row.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<Row> {
        let mut entry = self
            .collections
            .get_mut(collection)
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        let pos = entry
            .iter()
            .position(|row| row.id == id)
            .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", id)))?;

        let row = entry.remove(pos);
        debug!(collection = collection, id = %row.id, "Row deleted");
        Ok(row)
    }

    async fn resequence(&self, collection: &str, pairs: &[OrderAssignment]) -> Result<()> {
        // A collection with no writes yet has no map entry; an empty batch
        // against it is still a successful no-op, as on the Mongo backend.
        let mut entry = match self.collections.get_mut(collection) {
            Some(entry) => entry,
            None if pairs.is_empty() => return Ok(()),
            None => {
                return Err(AtriumError::NotFound(format!(
                    "No row with id '{}'",
                    pairs[0].id
                )))
            }
        };

        // Sequential, abort on first unknown id; earlier pairs stay applied.
        for pair in pairs {
            let row = entry
                .iter_mut()
                .find(|row| row.id == pair.id)
                .ok_or_else(|| AtriumError::NotFound(format!("No row with id '{}'", pair.id)))?;
            row.order = pair.order;
        }

        debug!(collection = collection, rows = pairs.len(), "Collection resequenced");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_create_assigns_order_one_when_empty() {
        let store = MemoryStore::new();
        let row = store
            .create("projects", None, fields(&[("title", json!("A"))]))
            .await
            .unwrap();
        assert_eq!(row.order, 1);
    }

    #[tokio::test]
    async fn test_create_appends_after_max_order() {
        let store = MemoryStore::new();
        for order in [1, 2, 5] {
            store
                .create("projects", Some(order), fields(&[("title", json!("x"))]))
                .await
                .unwrap();
        }

        let row = store
            .create("projects", None, fields(&[("title", json!("B"))]))
            .await
            .unwrap();
        assert_eq!(row.order, 6);
    }

    #[tokio::test]
    async fn test_list_sorts_by_order_then_id() {
        let store = MemoryStore::new();
        let a = store
            .create("projects", Some(3), fields(&[("title", json!("first"))]))
            .await
            .unwrap();
        let b = store
            .create("projects", Some(1), fields(&[("title", json!("second"))]))
            .await
            .unwrap();
        let c = store
            .create("projects", Some(2), fields(&[("title", json!("third"))]))
            .await
            .unwrap();

        let listed = store.list("projects").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec![b.id.as_str(), c.id.as_str(), a.id.as_str()]);

        // Equal orders fall back to id order
        let d = store
            .create("projects", Some(2), fields(&[("title", json!("tie"))]))
            .await
            .unwrap();
        let listed = store.list("projects").await.unwrap();
        let tied: Vec<&str> = listed[1..3].iter().map(|row| row.id.as_str()).collect();
        let mut expected = [c.id.as_str(), d.id.as_str()];
        expected.sort();
        assert_eq!(tied, expected);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = MemoryStore::new();
        let row = store
            .create("team_members", None, fields(&[("name", json!("Dana"))]))
            .await
            .unwrap();

        let updated = store
            .update(
                "team_members",
                &row.id,
                None,
                fields(&[("role", json!("Architect"))]),
            )
            .await
            .unwrap();
        assert_eq!(updated.fields["name"], json!("Dana"));
        assert_eq!(updated.fields["role"], json!("Architect"));
        assert_eq!(updated.order, row.order);
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        store
            .create("projects", None, fields(&[("title", json!("A"))]))
            .await
            .unwrap();

        let err = store
            .update("projects", "missing", None, fields(&[("title", json!("B"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_returns_row() {
        let store = MemoryStore::new();
        let row = store
            .create("quotes", None, fields(&[("text", json!("Build well"))]))
            .await
            .unwrap();

        let deleted = store.delete("quotes", &row.id).await.unwrap();
        assert_eq!(deleted.id, row.id);
        assert!(store.is_empty("quotes"));
    }

    #[tokio::test]
    async fn test_resequence_partial_leaves_others_untouched() {
        let store = MemoryStore::new();
        let a = store
            .create("projects", Some(3), fields(&[("title", json!("a"))]))
            .await
            .unwrap();
        let b = store
            .create("projects", Some(1), fields(&[("title", json!("b"))]))
            .await
            .unwrap();
        let c = store
            .create("projects", Some(2), fields(&[("title", json!("c"))]))
            .await
            .unwrap();

        store
            .resequence(
                "projects",
                &[
                    OrderAssignment { id: b.id.clone(), order: 5 },
                    OrderAssignment { id: c.id.clone(), order: 6 },
                ],
            )
            .await
            .unwrap();

        let listed = store.list("projects").await.unwrap();
        let got: Vec<(&str, i64)> = listed.iter().map(|r| (r.id.as_str(), r.order)).collect();
        assert_eq!(
            got,
            vec![(a.id.as_str(), 3), (b.id.as_str(), 5), (c.id.as_str(), 6)]
        );
    }

    #[tokio::test]
    async fn test_resequence_is_idempotent() {
        let store = MemoryStore::new();
        let a = store
            .create("projects", Some(1), fields(&[("title", json!("a"))]))
            .await
            .unwrap();
        let b = store
            .create("projects", Some(2), fields(&[("title", json!("b"))]))
            .await
            .unwrap();

        let pairs = vec![
            OrderAssignment { id: a.id.clone(), order: 2 },
            OrderAssignment { id: b.id.clone(), order: 1 },
        ];
        store.resequence("projects", &pairs).await.unwrap();
        let once = store.list("projects").await.unwrap();

        store.resequence("projects", &pairs).await.unwrap();
        let twice = store.list("projects").await.unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_resequence_empty_batch_on_untouched_collection_is_noop() {
        let store = MemoryStore::new();
        store.resequence("projects", &[]).await.unwrap();

        let err = store
            .resequence(
                "projects",
                &[OrderAssignment { id: "missing".into(), order: 1 }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_resequence_aborts_on_unknown_id() {
        let store = MemoryStore::new();
        let a = store
            .create("projects", Some(1), fields(&[("title", json!("a"))]))
            .await
            .unwrap();
        let b = store
            .create("projects", Some(2), fields(&[("title", json!("b"))]))
            .await
            .unwrap();

        let err = store
            .resequence(
                "projects",
                &[
                    OrderAssignment { id: a.id.clone(), order: 9 },
                    OrderAssignment { id: "missing".into(), order: 10 },
                    OrderAssignment { id: b.id.clone(), order: 11 },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AtriumError::NotFound(_)));

        // Abort-and-report: the pair before the failure stays applied,
        // the one after it was never reached.
        let listed = store.list("projects").await.unwrap();
        let by_id = |id: &str| listed.iter().find(|r| r.id == id).unwrap().order;
        assert_eq!(by_id(&a.id), 9);
        assert_eq!(by_id(&b.id), 2);
    }
}
