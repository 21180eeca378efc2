//! Content storage for Atrium
//!
//! One trait, two backends: `MongoStore` against the hosted store in
//! production, `MemoryStore` for dev mode and tests. Same trait-seam
//! approach as the rest of the codebase so routes and services never know
//! which backend they are talking to.
//!
//! ## Ordering contract
//!
//! Every collection row carries an integer order value (stored under the
//! collection's own column name, see `catalog`). `list` always returns rows
//! sorted by order ascending, ties broken by id ascending. That sequence is
//! the user-arranged display order; `resequence` is how the admin panel
//! persists a rearrangement.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::types::Result;

/// One row of a content collection
///
/// `order` is held separately from the field bag: the column name differs
/// per collection, so the wire/store name is applied at the boundary via
/// [`Row::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Stable identifier assigned by the store
    pub id: String,
    /// Display rank within the collection; not necessarily contiguous or unique
    pub order: i64,
    /// Remaining fields, passed through untouched
    pub fields: Map<String, Value>,
}

impl Row {
    /// Serialize with the collection's order column name
    pub fn to_json(&self, order_field: &str) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(self.id.clone()));
        out.insert(order_field.to_string(), Value::from(self.order));
        for (k, v) in &self.fields {
            out.insert(k.clone(), v.clone());
        }
        Value::Object(out)
    }
}

/// One (id, order) pair of a resequence request
#[derive(Debug, Clone)]
pub struct OrderAssignment {
    pub id: String,
    pub order: i64,
}

/// Comparison used everywhere a list is materialized: order asc, id asc
pub fn display_cmp(a: &Row, b: &Row) -> std::cmp::Ordering {
    a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
}

/// Storage backend for content collections
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All rows of a collection in display order
    async fn list(&self, collection: &str) -> Result<Vec<Row>>;

    /// Insert a row. The store assigns the id. When `order` is `None`, the
    /// row is appended: it gets `max(existing order) + 1`, or 1 for an
    /// empty collection.
    async fn create(
        &self,
        collection: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row>;

    /// Merge `fields` (and optionally a new order) into the row with this
    /// id and return the updated row. Unknown id is `NotFound`.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        order: Option<i64>,
        fields: Map<String, Value>,
    ) -> Result<Row>;

    /// Remove the row and return it. Unknown id is `NotFound`.
    async fn delete(&self, collection: &str, id: &str) -> Result<Row>;

    /// Persist new order values, one row per pair.
    ///
    /// Pairs are applied sequentially; the first failure (unknown id or
    /// store error) aborts the loop and is returned, and pairs already
    /// applied stay applied. There is no rollback - the write is not
    /// transactional on any backend. Pairs covering only a subset of the
    /// collection are accepted and leave omitted rows untouched.
    async fn resequence(&self, collection: &str, pairs: &[OrderAssignment]) -> Result<()>;

    /// Whether the backend is reachable, for readiness probes
    async fn ping(&self) -> Result<()>;
}
