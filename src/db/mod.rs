//! Key-value store abstraction.
//!
//! Records are schemaless [`Item`]s keyed by the `_id` attribute. The
//! [`KeyValueStore`] trait is the only seam between the repositories and a
//! concrete backend:
//!
//! - `dynamodb` (feature `aws`, default): one DynamoDB table per entity
//! - `memory`: process-local maps, used by tests and local development
//!
//! Backends are constructed once in [`connect_from_config`] and handed to the
//! repositories explicitly as part of a [`StoreClient`].

#[cfg(feature = "aws")]
pub mod dynamodb;
pub mod memory;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::blob::BlobStore;
use crate::config::{StorageConfig, StoreBackend};
use crate::error::DatabaseError;

/// Primary key attribute shared by every table.
pub const PRIMARY_KEY: &str = "_id";

/// A single attribute value, mirroring the store's native type system.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    S(String),
    /// Numbers travel as their decimal string form.
    N(String),
    Bool(bool),
    L(Vec<AttrValue>),
    M(Item),
    Null,
}

/// One stored record.
pub type Item = HashMap<String, AttrValue>;

impl AttrValue {
    pub fn s(value: impl Into<String>) -> Self {
        Self::S(value.into())
    }

    pub fn int(value: i64) -> Self {
        Self::N(value.to_string())
    }

    pub fn float(value: f64) -> Self {
        Self::N(value.to_string())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::Bool(_) => "BOOL",
            Self::L(_) => "L",
            Self::M(_) => "M",
            Self::Null => "NULL",
        }
    }
}

/// A partial-attribute mutation applied by [`KeyValueStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Overwrite one attribute.
    Set(String, AttrValue),
    /// Atomically add `delta` to a numeric attribute (missing counts as 0).
    Increment(String, i64),
    /// Atomically append to a list attribute (missing counts as empty).
    Append(String, Vec<AttrValue>),
}

impl UpdateOp {
    pub fn set(attribute: &str, value: AttrValue) -> Self {
        Self::Set(attribute.to_string(), value)
    }

    pub fn attribute(&self) -> &str {
        match self {
            Self::Set(name, _) | Self::Increment(name, _) | Self::Append(name, _) => name,
        }
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Point lookup on the primary key.
    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError>;

    /// Full scan keeping only items whose `attribute` equals `value`.
    async fn scan_eq(
        &self,
        table: &str,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<Vec<Item>, DatabaseError>;

    /// Unconditional write of a whole item.
    async fn put(&self, table: &str, item: Item) -> Result<(), DatabaseError>;

    /// Apply `ops` to an existing item and return the updated item.
    ///
    /// Returns `Ok(None)` without writing anything when `key` does not exist.
    async fn update(
        &self,
        table: &str,
        key: &str,
        ops: &[UpdateOp],
    ) -> Result<Option<Item>, DatabaseError>;

    /// Delete by primary key, returning the removed item if there was one.
    async fn delete(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError>;
}

/// Scan for an attribute that is supposed to be unique.
///
/// Zero matches is `Ok(None)`; more than one is an integrity violation.
pub async fn scan_unique(
    store: &dyn KeyValueStore,
    table: &str,
    attribute: &str,
    value: &str,
) -> Result<Option<Item>, DatabaseError> {
    let mut items = store
        .scan_eq(table, attribute, &AttrValue::s(value))
        .await?;
    match items.len() {
        0 => Ok(None),
        1 => Ok(items.pop()),
        matches => {
            tracing::error!(
                "{} records in {} share {} = {}",
                matches,
                table,
                attribute,
                value
            );
            Err(DatabaseError::Integrity {
                table: table.to_string(),
                attribute: attribute.to_string(),
                value: value.to_string(),
                matches,
            })
        }
    }
}

fn missing(attribute: &str) -> DatabaseError {
    DatabaseError::Serialization(format!("missing attribute '{attribute}'"))
}

fn mistyped(attribute: &str, expected: &str, found: &AttrValue) -> DatabaseError {
    DatabaseError::Serialization(format!(
        "attribute '{attribute}' has type {}, expected {expected}",
        found.type_name()
    ))
}

pub fn get_s(item: &Item, attribute: &str) -> Result<String, DatabaseError> {
    match item.get(attribute) {
        Some(AttrValue::S(value)) => Ok(value.clone()),
        Some(other) => Err(mistyped(attribute, "S", other)),
        None => Err(missing(attribute)),
    }
}

/// Read a numeric attribute back through string parsing.
pub fn get_n<T>(item: &Item, attribute: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match item.get(attribute) {
        Some(AttrValue::N(raw)) => raw.parse::<T>().map_err(|e| {
            DatabaseError::Serialization(format!("attribute '{attribute}' = '{raw}': {e}"))
        }),
        Some(other) => Err(mistyped(attribute, "N", other)),
        None => Err(missing(attribute)),
    }
}

pub fn get_bool(item: &Item, attribute: &str) -> Result<bool, DatabaseError> {
    match item.get(attribute) {
        Some(AttrValue::Bool(value)) => Ok(*value),
        Some(other) => Err(mistyped(attribute, "BOOL", other)),
        None => Err(missing(attribute)),
    }
}

pub fn get_list<'a>(item: &'a Item, attribute: &str) -> Result<&'a [AttrValue], DatabaseError> {
    match item.get(attribute) {
        Some(AttrValue::L(values)) => Ok(values),
        Some(other) => Err(mistyped(attribute, "L", other)),
        None => Err(missing(attribute)),
    }
}

pub fn get_string_list(item: &Item, attribute: &str) -> Result<Vec<String>, DatabaseError> {
    get_list(item, attribute)?
        .iter()
        .map(|value| match value {
            AttrValue::S(s) => Ok(s.clone()),
            other => Err(mistyped(attribute, "L<S>", other)),
        })
        .collect()
}

pub fn as_map<'a>(value: &'a AttrValue, attribute: &str) -> Result<&'a Item, DatabaseError> {
    match value {
        AttrValue::M(map) => Ok(map),
        other => Err(mistyped(attribute, "M", other)),
    }
}

/// Process-wide store handles, built once at startup and shared by every
/// repository.
#[derive(Clone)]
pub struct StoreClient {
    pub kv: Arc<dyn KeyValueStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl StoreClient {
    /// Fresh in-memory backends.
    pub fn memory(bucket: &str) -> Self {
        Self {
            kv: Arc::new(memory::MemoryStore::new()),
            blobs: Arc::new(crate::blob::memory::MemoryBlobStore::new(bucket)),
        }
    }
}

/// Build the store client for the configured backend.
pub async fn connect_from_config(config: &StorageConfig) -> Result<StoreClient, DatabaseError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Ok(StoreClient::memory(&config.bucket))
        }
        #[cfg(feature = "aws")]
        StoreBackend::DynamoDb => {
            let sdk_config = dynamodb::load_sdk_config(config).await;
            let kv =
                dynamodb::DynamoStore::from_sdk_config(&sdk_config, config.endpoint_url.as_deref());
            let blobs = crate::blob::s3::S3BlobStore::new(
                aws_sdk_s3::Client::new(&sdk_config),
                config.bucket.clone(),
                config.public_base_url.clone(),
            );
            tracing::info!(
                "Connected to DynamoDB in {} (bucket {})",
                config.region,
                config.bucket
            );
            Ok(StoreClient {
                kv: Arc::new(kv),
                blobs: Arc::new(blobs),
            })
        }
        #[cfg(not(feature = "aws"))]
        StoreBackend::DynamoDb => Err(DatabaseError::Backend(
            "DynamoDB backend unavailable. Enable the 'aws' feature.".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pairs: &[(&str, AttrValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn numeric_attributes_parse_from_strings() {
        let record = item(&[
            ("number_files", AttrValue::N("7".to_string())),
            ("relevancy", AttrValue::float(0.25)),
        ]);
        assert_eq!(get_n::<i64>(&record, "number_files").expect("int"), 7);
        assert_eq!(get_n::<f64>(&record, "relevancy").expect("float"), 0.25);
    }

    #[test]
    fn missing_attribute_fails_instead_of_defaulting() {
        let record = item(&[("_id", AttrValue::s("abc"))]);
        let err = get_s(&record, "email").expect_err("missing");
        let DatabaseError::Serialization(message) = err else {
            panic!("expected Serialization");
        };
        assert!(message.contains("email"), "unexpected message: {message}");
        assert!(get_bool(&record, "stored").is_err());
        assert!(get_n::<f64>(&record, "relevancy").is_err());
    }

    #[test]
    fn mistyped_attribute_is_rejected() {
        let record = item(&[("stored", AttrValue::s("false"))]);
        let err = get_bool(&record, "stored").expect_err("wrong type");
        assert!(err.to_string().contains("expected BOOL"));
    }

    #[test]
    fn garbage_number_is_a_serialization_error() {
        let record = item(&[("relevancy", AttrValue::N("high".to_string()))]);
        assert!(matches!(
            get_n::<f64>(&record, "relevancy"),
            Err(DatabaseError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn scan_unique_reports_duplicates_as_integrity_violation() {
        let store = memory::MemoryStore::new();
        for id in ["u1", "u2"] {
            store
                .put(
                    "users",
                    item(&[
                        (PRIMARY_KEY, AttrValue::s(id)),
                        ("email", AttrValue::s("dup@example.com")),
                    ]),
                )
                .await
                .expect("put");
        }

        let found = scan_unique(&store, "users", "email", "nobody@example.com")
            .await
            .expect("scan");
        assert!(found.is_none());

        let err = scan_unique(&store, "users", "email", "dup@example.com")
            .await
            .expect_err("duplicate");
        let DatabaseError::Integrity { matches, attribute, .. } = err else {
            panic!("expected Integrity");
        };
        assert_eq!(matches, 2);
        assert_eq!(attribute, "email");
    }
}
