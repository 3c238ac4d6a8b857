//! DynamoDB-backed [`KeyValueStore`].
//!
//! Table schema (one table per entity):
//!
//! ```text
//! Primary key:
//!   - _id (String, Partition Key)
//! ```
//!
//! Every other attribute is schemaless. `scan_eq` follows
//! `LastEvaluatedKey` until the scan is exhausted, so it always sees the
//! whole table.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};

use crate::config::StorageConfig;
use crate::db::{AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp};
use crate::error::DatabaseError;

/// Load shared AWS configuration for the DynamoDB and S3 clients.
pub async fn load_sdk_config(config: &StorageConfig) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .load()
        .await
}

pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from shared configuration, honoring an endpoint
    /// override (DynamoDB Local, LocalStack) for DynamoDB only.
    pub fn from_sdk_config(sdk_config: &aws_config::SdkConfig, endpoint_url: Option<&str>) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint_url {
            tracing::info!("Using custom DynamoDB endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

fn to_sdk(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::S(s) => AttributeValue::S(s.clone()),
        AttrValue::N(n) => AttributeValue::N(n.clone()),
        AttrValue::Bool(b) => AttributeValue::Bool(*b),
        AttrValue::L(values) => AttributeValue::L(values.iter().map(to_sdk).collect()),
        AttrValue::M(map) => AttributeValue::M(to_sdk_item(map)),
        AttrValue::Null => AttributeValue::Null(true),
    }
}

fn to_sdk_item(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter().map(|(k, v)| (k.clone(), to_sdk(v))).collect()
}

fn from_sdk(value: &AttributeValue) -> Result<AttrValue, DatabaseError> {
    Ok(match value {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::L(values) => {
            AttrValue::L(values.iter().map(from_sdk).collect::<Result<_, _>>()?)
        }
        AttributeValue::M(map) => AttrValue::M(from_sdk_item(map)?),
        AttributeValue::Null(_) => AttrValue::Null,
        other => {
            return Err(DatabaseError::Serialization(format!(
                "unsupported attribute value {other:?}"
            )));
        }
    })
}

fn from_sdk_item(item: &HashMap<String, AttributeValue>) -> Result<Item, DatabaseError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_sdk(v)?)))
        .collect()
}

fn backend_error<E>(operation: &str, table: &str, err: E) -> DatabaseError
where
    E: std::error::Error,
{
    let message = format!("{operation} on {table} failed: {}", DisplayErrorContext(&err));
    tracing::error!("{}", message);
    DatabaseError::Backend(message)
}

/// Expression pieces for one `UpdateItem` call.
#[derive(Debug, Default, PartialEq)]
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttrValue>,
}

fn build_update_expression(ops: &[UpdateOp]) -> UpdateExpression {
    let mut out = UpdateExpression::default();
    let mut set_clauses = Vec::new();
    let mut add_clauses = Vec::new();

    for (i, op) in ops.iter().enumerate() {
        let name = format!("#a{i}");
        let value = format!(":v{i}");
        out.names.insert(name.clone(), op.attribute().to_string());
        match op {
            UpdateOp::Set(_, v) => {
                set_clauses.push(format!("{name} = {value}"));
                out.values.insert(value, v.clone());
            }
            UpdateOp::Increment(_, delta) => {
                add_clauses.push(format!("{name} {value}"));
                out.values.insert(value, AttrValue::int(*delta));
            }
            UpdateOp::Append(_, items) => {
                set_clauses.push(format!(
                    "{name} = list_append(if_not_exists({name}, :empty), {value})"
                ));
                out.values
                    .insert(":empty".to_string(), AttrValue::L(Vec::new()));
                out.values.insert(value, AttrValue::L(items.clone()));
            }
        }
    }

    let mut parts = Vec::new();
    if !set_clauses.is_empty() {
        parts.push(format!("SET {}", set_clauses.join(", ")));
    }
    if !add_clauses.is_empty() {
        parts.push(format!("ADD {}", add_clauses.join(", ")));
    }
    out.expression = parts.join(" ");
    out.names.insert("#pk".to_string(), PRIMARY_KEY.to_string());
    out
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn get(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError> {
        tracing::debug!("GetItem {} {}", table, key);
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(PRIMARY_KEY, AttributeValue::S(key.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend_error("GetItem", table, e))?;
        output.item().map(from_sdk_item).transpose()
    }

    async fn scan_eq(
        &self,
        table: &str,
        attribute: &str,
        value: &AttrValue,
    ) -> Result<Vec<Item>, DatabaseError> {
        tracing::debug!("Scan {} where {} = {:?}", table, attribute, value);
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .filter_expression("#attr = :value")
                .expression_attribute_names("#attr", attribute)
                .expression_attribute_values(":value", to_sdk(value))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| backend_error("Scan", table, e))?;

            for raw in output.items() {
                items.push(from_sdk_item(raw)?);
            }

            match output.last_evaluated_key() {
                Some(last) if !last.is_empty() => start_key = Some(last.clone()),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn put(&self, table: &str, item: Item) -> Result<(), DatabaseError> {
        tracing::debug!("PutItem {}", table);
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(to_sdk_item(&item)))
            .send()
            .await
            .map_err(|e| backend_error("PutItem", table, e))?;
        Ok(())
    }

    async fn update(
        &self,
        table: &str,
        key: &str,
        ops: &[UpdateOp],
    ) -> Result<Option<Item>, DatabaseError> {
        let update = build_update_expression(ops);
        tracing::debug!("UpdateItem {} {}: {}", table, key, update.expression);

        let values = update
            .values
            .iter()
            .map(|(k, v)| (k.clone(), to_sdk(v)))
            .collect();
        let result = self
            .client
            .update_item()
            .table_name(table)
            .key(PRIMARY_KEY, AttributeValue::S(key.to_string()))
            .update_expression(update.expression)
            .condition_expression("attribute_exists(#pk)")
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values(Some(values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        match result {
            Ok(output) => output.attributes().map(from_sdk_item).transpose(),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(backend_error("UpdateItem", table, err)),
        }
    }

    async fn delete(&self, table: &str, key: &str) -> Result<Option<Item>, DatabaseError> {
        tracing::debug!("DeleteItem {} {}", table, key);
        let output = self
            .client
            .delete_item()
            .table_name(table)
            .key(PRIMARY_KEY, AttributeValue::S(key.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| backend_error("DeleteItem", table, e))?;
        output.attributes().map(from_sdk_item).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_expression_groups_set_and_add_clauses() {
        let update = build_update_expression(&[
            UpdateOp::set("relevancy", AttrValue::float(0.5)),
            UpdateOp::Increment("number_files".to_string(), 1),
        ]);
        assert_eq!(update.expression, "SET #a0 = :v0 ADD #a1 :v1");
        assert_eq!(update.names.get("#a1").map(String::as_str), Some("number_files"));
        assert_eq!(update.names.get("#pk").map(String::as_str), Some(PRIMARY_KEY));
        assert_eq!(update.values.get(":v1"), Some(&AttrValue::int(1)));
    }

    #[test]
    fn append_uses_list_append_with_empty_default() {
        let update = build_update_expression(&[UpdateOp::Append(
            "messages".to_string(),
            vec![AttrValue::s("hi")],
        )]);
        assert_eq!(
            update.expression,
            "SET #a0 = list_append(if_not_exists(#a0, :empty), :v0)"
        );
        assert_eq!(update.values.get(":empty"), Some(&AttrValue::L(Vec::new())));
    }

    #[test]
    fn sdk_conversion_preserves_nested_values() {
        let mut message = Item::new();
        message.insert("text".to_string(), AttrValue::s("hello"));
        let value = AttrValue::L(vec![AttrValue::M(message), AttrValue::Bool(false)]);

        let back = from_sdk(&to_sdk(&value)).expect("convert");
        assert_eq!(back, value);
    }
}
