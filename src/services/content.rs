//! Content operations
//!
//! `ContentService` implements the one protocol every admin editor speaks:
//! list a collection in display order, create/update/delete single rows,
//! and resequence the whole list after the user rearranges it. Validation
//! happens here; the routes only parse HTTP and the stores only move data.
//!
//! ## Resequencing
//!
//! The reorder path is optimistic the same way the admin panel is: the
//! cached list re-sorts before the store write is confirmed, and a failed
//! write leaves the cache ahead of the store until the entry expires or a
//! caller refreshes. Concurrent resequences race last-writer-wins per row;
//! there is no optimistic-concurrency token.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::ContentCache;
use crate::catalog::{self, CollectionSpec};
use crate::normalize;
use crate::store::{ContentStore, OrderAssignment, Row};
use crate::types::{AtriumError, Result};

/// Coordinates store access, validation, and cache reconciliation
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    cache: Arc<ContentCache>,
}

impl ContentService {
    pub fn new(store: Arc<dyn ContentStore>, cache: Arc<ContentCache>) -> Self {
        Self { store, cache }
    }

    /// Rows of a collection in display order, serialized with the
    /// collection's own order column name
    pub async fn list(&self, collection: &str, refresh: bool) -> Result<Vec<Value>> {
        let spec = lookup(collection)?;

        if !refresh {
            if let Some(rows) = self.cache.get(collection).await {
                return Ok(serialize(&rows, spec));
            }
        }

        let rows = self.store.list(collection).await?;
        self.cache.put_list(collection, rows.clone()).await;
        Ok(serialize(&rows, spec))
    }

    /// Create a row from a JSON body. The order value may be supplied under
    /// the collection's order column name; otherwise the row is appended.
    pub async fn create(&self, collection: &str, body: Value) -> Result<Value> {
        let spec = lookup(collection)?;
        let mut fields = as_object(body)?;
        strip_server_fields(&mut fields);
        let order = take_order(&mut fields, spec)?;

        for required in spec.required_fields {
            if !has_value(&fields, required) {
                return Err(AtriumError::Validation(format!(
                    "'{}' is required",
                    required
                )));
            }
        }
        normalize_tags(&mut fields, spec)?;

        let row = self.store.create(collection, order, fields).await?;
        self.cache.apply_row(collection, &row).await;

        info!(collection = collection, id = %row.id, order = row.order, "Row created");
        Ok(row.to_json(spec.order_field))
    }

    /// Update a row from a JSON body carrying `id` plus the fields to change
    pub async fn update(&self, collection: &str, body: Value) -> Result<Value> {
        let spec = lookup(collection)?;
        let mut fields = as_object(body)?;
        let id = take_id(&mut fields)?;
        let order = take_order(&mut fields, spec)?;
        strip_server_fields(&mut fields);

        if fields.is_empty() && order.is_none() {
            return Err(AtriumError::Validation("No fields to update".into()));
        }
        normalize_tags(&mut fields, spec)?;

        let row = self.store.update(collection, &id, order, fields).await?;
        self.cache.apply_row(collection, &row).await;

        info!(collection = collection, id = %row.id, "Row updated");
        Ok(row.to_json(spec.order_field))
    }

    /// Delete a row by the `id` in the JSON body; returns the deleted row
    pub async fn delete(&self, collection: &str, body: Value) -> Result<Value> {
        let spec = lookup(collection)?;
        let mut fields = as_object(body)?;
        let id = take_id(&mut fields)?;

        let row = self.store.delete(collection, &id).await?;
        self.cache.remove_by_id(collection, &id).await;

        info!(collection = collection, id = %id, "Row deleted");
        Ok(row.to_json(spec.order_field))
    }

    /// Persist a new display order from a JSON array of `{id, order}` pairs.
    ///
    /// Returns the number of rows written. The caller is expected to send
    /// the full set of ids it knows about; a subset is accepted and leaves
    /// the omitted rows' order values as they were.
    pub async fn resequence(&self, collection: &str, body: Value) -> Result<usize> {
        let spec = lookup(collection)?;
        let pairs = parse_pairs(body, spec)?;

        // Optimistic: the cached list re-sorts now, whatever the store says.
        self.cache.apply_orders(collection, &pairs).await;

        if let Err(e) = self.store.resequence(collection, &pairs).await {
            warn!(collection = collection, error = %e, "Resequence failed; cached order not rolled back");
            return Err(e);
        }

        info!(collection = collection, rows = pairs.len(), "Collection resequenced");
        Ok(pairs.len())
    }
}

fn lookup(collection: &str) -> Result<&'static CollectionSpec> {
    catalog::find(collection)
        .ok_or_else(|| AtriumError::NotFound(format!("Unknown collection '{}'", collection)))
}

fn serialize(rows: &[Row], spec: &CollectionSpec) -> Vec<Value> {
    rows.iter().map(|row| row.to_json(spec.order_field)).collect()
}

fn as_object(body: Value) -> Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AtriumError::Validation("Body must be a JSON object".into())),
    }
}

/// Drop server-owned keys. Editors resubmit rows verbatim, so a create body
/// can carry the `id` and `metadata` of the row it was copied from; neither
/// may reach the field bag, where they would shadow the store-assigned
/// values on every later read.
fn strip_server_fields(fields: &mut Map<String, Value>) {
    fields.remove("id");
    fields.remove("metadata");
}

fn take_id(fields: &mut Map<String, Value>) -> Result<String> {
    match fields.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id),
        Some(_) => Err(AtriumError::Validation("'id' must be a string".into())),
        None => Err(AtriumError::Validation("'id' is required".into())),
    }
}

/// Pull the order value out of the field bag, if the caller supplied one
fn take_order(fields: &mut Map<String, Value>, spec: &CollectionSpec) -> Result<Option<i64>> {
    match fields.remove(spec.order_field) {
        None => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            AtriumError::Validation(format!("'{}' must be an integer", spec.order_field))
        }),
    }
}

fn has_value(fields: &Map<String, Value>, key: &str) -> bool {
    match fields.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

fn normalize_tags(fields: &mut Map<String, Value>, spec: &CollectionSpec) -> Result<()> {
    if let Some(tag_field) = spec.tag_field {
        if let Some(raw) = fields.get(tag_field) {
            let tags = normalize::hashtags(raw)?;
            fields.insert(tag_field.to_string(), Value::from(tags));
        }
    }
    Ok(())
}

/// Parse `[{id, order}]`. The canonical key is `order`, but the collection's
/// own order column name is accepted too since some editors send rows back
/// verbatim.
fn parse_pairs(body: Value, spec: &CollectionSpec) -> Result<Vec<OrderAssignment>> {
    let items = match body {
        Value::Array(items) => items,
        _ => {
            return Err(AtriumError::Validation(
                "Body must be a JSON array of {id, order} pairs".into(),
            ))
        }
    };

    let mut pairs = Vec::with_capacity(items.len());
    for item in items {
        let mut fields = as_object(item)?;
        let id = take_id(&mut fields)?;
        let order = fields
            .get("order")
            .or_else(|| fields.get(spec.order_field))
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                AtriumError::Validation(format!("'order' is required for id '{}'", id))
            })?;
        pairs.push(OrderAssignment { id, order });
    }
    Ok(pairs)
}
