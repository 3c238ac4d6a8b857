//! In-memory [`KeyValueStore`].
//!
//! Every table is a `BTreeMap` behind one `RwLock`, so each call observes
//! and mutates a consistent snapshot. Updates apply all of their operations
//! under a single write guard, which gives `Append` and `Increment` the same
//! per-item atomicity the managed store provides.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::{AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp};
use crate::error::DatabaseError;

type Table = BTreeMap<String, Item>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of items currently held in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Table::len)
    }
}

fn apply_op(item: &mut Item, op: &UpdateOp) -> Result<(), DatabaseError> {
    match op {
        UpdateOp::Set(attribute, value) => {
            item.insert(attribute.clone(), value.clone());
        }
        UpdateOp::Increment(attribute, delta) => {
            let current = match item.get(attribute) {
                None => 0,
                Some(AttrValue::N(raw)) => raw.parse::<i64>().map_err(|e| {
                    DatabaseError::Serialization(format!("attribute '{attribute}' = '{raw}': {e}"))
                })?,
                Some(other) => {
                    return Err(DatabaseError::Serialization(format!(
                        "cannot increment attribute '{attribute}' of type {}",
                        other.type_name()
                    )));
                }
            };
            item.insert(attribute.clone(), AttrValue::int(current + delta));
        }
        UpdateOp::Append(attribute, values) => match item.get_mut(attribute) {
            None => {
                item.insert(attribute.clone(), AttrValue::L(values.clone()));
            }
            Some(AttrValue::L(existing)) => existing.extend(values.iter().cloned()),
            Some(other) => {
                return Err(DatabaseError::Serialization(format!(
                    "cannot append to attribute '{attribute}' of type {}",
                    other.type_name()
                )));
            }
        },
    }
    Ok(())
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError> {
        Ok(self
            .tables
            .read()
            .await
            .get(table)
            .and_then(|t| t.get(key))
            .cloned())
    }

    async fn scan_eq(
        &self,
        table: &str,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<Vec<Item>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|t| {
                t.values()
                    .filter(|item| item.get(attribute) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put(&self, table: &str, item: Item) -> Result<(), DatabaseError> {
        let key = match item.get(PRIMARY_KEY) {
            Some(AttrValue::S(key)) => key.clone(),
            _ => {
                return Err(DatabaseError::Serialization(format!(
                    "item for '{table}' has no string '{PRIMARY_KEY}'"
                )));
            }
        };
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        key: &str,
        ops: &[UpdateOp],
    ) -> Result<Option<Item>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(existing) = tables.get_mut(table).and_then(|t| t.get_mut(key)) else {
            return Ok(None);
        };

        // Apply to a copy so a failing op leaves the stored item untouched.
        let mut updated = existing.clone();
        for op in ops {
            if op.attribute() == PRIMARY_KEY {
                return Err(DatabaseError::Backend(format!(
                    "cannot update key attribute '{PRIMARY_KEY}'"
                )));
            }
            apply_op(&mut updated, op)?;
        }
        *existing = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError> {
        Ok(self
            .tables
            .write()
            .await
            .get_mut(table)
            .and_then(|t| t.remove(key)))
    }
}
