//! Identity store backed by one DynamoDB table per collection.
//!
//! Table layout: table name == collection name, hash key `face-id` (S),
//! one more string attribute `name`.

use crate::request_error;
use async_trait::async_trait;
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use facer_core::{CollectionId, FaceId, IdentityEntry, IdentityStore, ServiceError};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const KEY_ATTRIBUTE: &str = "face-id";
pub const NAME_ATTRIBUTE: &str = "name";

/// Provisioning and readiness settings for newly created tables.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub read_capacity: i64,
    pub write_capacity: i64,
    /// How long to wait for a new table to become ACTIVE.
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            read_capacity: 5,
            write_capacity: 5,
            ready_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(2),
        }
    }
}

pub struct DynamoIdentityStore {
    client: Client,
    options: TableOptions,
}

impl DynamoIdentityStore {
    pub fn new(client: Client, options: TableOptions) -> Self {
        Self { client, options }
    }

    /// Poll until the table reports ACTIVE; writes to a CREATING table fail.
    async fn wait_until_active(&self, collection: &CollectionId) -> Result<(), ServiceError> {
        let started = Instant::now();
        loop {
            let out = self
                .client
                .describe_table()
                .table_name(collection.as_str())
                .send()
                .await
                .map_err(|err| request_error("DescribeTable", err))?;

            let status = out.table().and_then(|t| t.table_status());
            if status == Some(&TableStatus::Active) {
                tracing::debug!(
                    table = %collection,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "table active"
                );
                return Ok(());
            }
            if started.elapsed() >= self.options.ready_timeout {
                return Err(ServiceError::NotReady {
                    table: collection.to_string(),
                    waited_secs: self.options.ready_timeout.as_secs(),
                });
            }

            tracing::debug!(table = %collection, status = ?status, "waiting for table");
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }
}

fn invalid(err: BuildError) -> ServiceError {
    ServiceError::InvalidRequest(err.to_string())
}

fn table_not_found(collection: &CollectionId) -> ServiceError {
    ServiceError::NotFound {
        kind: "table",
        name: collection.to_string(),
    }
}

/// Rebuild an identity entry from a stored item.
pub(crate) fn entry_from_item(
    collection: &CollectionId,
    face_id: &FaceId,
    item: &HashMap<String, AttributeValue>,
) -> Result<IdentityEntry, ServiceError> {
    let name = item
        .get(NAME_ATTRIBUTE)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| ServiceError::Request {
            operation: "GetItem",
            message: format!("item {face_id} in {collection} has no string '{NAME_ATTRIBUTE}'"),
        })?;
    Ok(IdentityEntry::new(
        collection.clone(),
        face_id.clone(),
        name.clone(),
    ))
}

#[async_trait]
impl IdentityStore for DynamoIdentityStore {
    async fn create_table(&self, collection: &CollectionId) -> Result<(), ServiceError> {
        let key_definition = AttributeDefinition::builder()
            .attribute_name(KEY_ATTRIBUTE)
            .attribute_type(ScalarAttributeType::S)
            .build()
            .map_err(invalid)?;
        let key_schema = KeySchemaElement::builder()
            .attribute_name(KEY_ATTRIBUTE)
            .key_type(KeyType::Hash)
            .build()
            .map_err(invalid)?;
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(self.options.read_capacity)
            .write_capacity_units(self.options.write_capacity)
            .build()
            .map_err(invalid)?;

        self.client
            .create_table()
            .table_name(collection.as_str())
            .attribute_definitions(key_definition)
            .key_schema(key_schema)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_in_use_exception())
                {
                    ServiceError::AlreadyExists {
                        kind: "table",
                        name: collection.to_string(),
                    }
                } else {
                    request_error("CreateTable", err)
                }
            })?;

        tracing::info!(table = %collection, "dynamodb table creating");
        self.wait_until_active(collection).await
    }

    async fn put(&self, entry: &IdentityEntry) -> Result<(), ServiceError> {
        self.client
            .put_item()
            .table_name(entry.collection.as_str())
            .item(KEY_ATTRIBUTE, AttributeValue::S(entry.face_id.to_string()))
            .item(NAME_ATTRIBUTE, AttributeValue::S(entry.name.clone()))
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    table_not_found(&entry.collection)
                } else {
                    request_error("PutItem", err)
                }
            })?;
        Ok(())
    }

    async fn get(
        &self,
        collection: &CollectionId,
        face_id: &FaceId,
    ) -> Result<Option<IdentityEntry>, ServiceError> {
        let out = self
            .client
            .get_item()
            .table_name(collection.as_str())
            .key(KEY_ATTRIBUTE, AttributeValue::S(face_id.to_string()))
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception())
                {
                    table_not_found(collection)
                } else {
                    request_error("GetItem", err)
                }
            })?;

        out.item()
            .map(|item| entry_from_item(collection, face_id, item))
            .transpose()
    }
}
