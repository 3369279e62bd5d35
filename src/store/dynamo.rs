use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    DeleteRequest, PutRequest, ReturnConsumedCapacity, Select, WriteRequest as SdkWriteRequest,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::{Cursor, KeySchema, KeyValueStore, Page, Projection, WriteRequest};

/// DynamoDB-backed store
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a store from the global client, or from the default AWS config
    /// pointed at `endpoint_url` when one is given
    pub async fn connect(endpoint_url: Option<&str>) -> Self {
        match endpoint_url {
            Some(endpoint) => {
                let config = crate::aws_config_defaults().await;
                let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&config)
                    .endpoint_url(endpoint)
                    .build();
                debug!(endpoint = %endpoint, "Using custom DynamoDB endpoint");
                Self::new(Client::from_conf(dynamo_config))
            }
            None => Self::new(crate::dynamodb_client().await.clone()),
        }
    }

    /// The underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl KeyValueStore for DynamoStore {
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema> {
        let output = match self.client.describe_table().table_name(table).send().await {
            Ok(output) => output,
            Err(e) => {
                if matches!(
                    e.as_service_error(),
                    Some(DescribeTableError::ResourceNotFoundException(_))
                ) {
                    return Err(Error::schema_unavailable(table, "table not found"));
                }
                return Err(e.into());
            }
        };

        let description = output
            .table
            .ok_or_else(|| Error::schema_unavailable(table, "table not found"))?;

        KeySchema::new(
            description
                .key_schema
                .unwrap_or_default()
                .into_iter()
                .map(|element| element.attribute_name),
        )
        .ok_or_else(|| Error::schema_unavailable(table, "table has no key schema"))
    }

    async fn scan(
        &self,
        table: &str,
        projection: &Projection,
        page_size: u32,
        cursor: Option<Cursor>,
    ) -> Result<Page> {
        let mut builder = self
            .client
            .scan()
            .table_name(table)
            .limit(i32::try_from(page_size).unwrap_or(i32::MAX))
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .set_exclusive_start_key(cursor.map(Cursor::into_inner));

        builder = match projection {
            Projection::FullItem => builder.select(Select::AllAttributes),
            Projection::KeysOnly(key_schema) => {
                // Key names go through placeholders, reserved words included
                let mut placeholders = Vec::with_capacity(key_schema.attribute_names().len());
                for (index, name) in key_schema.attribute_names().iter().enumerate() {
                    let placeholder = format!("#k{index}");
                    builder = builder.expression_attribute_names(placeholder.clone(), name);
                    placeholders.push(placeholder);
                }
                builder
                    .select(Select::SpecificAttributes)
                    .projection_expression(placeholders.join(", "))
            }
        };

        let output = builder.send().await?;

        if let Some(capacity) = output.consumed_capacity.as_ref() {
            debug!(
                table = %table,
                capacity_units = ?capacity.capacity_units,
                scanned_count = output.scanned_count,
                "Scan consumed capacity"
            );
        }

        Ok(Page::new(
            output.items.unwrap_or_default(),
            output.last_evaluated_key.map(Cursor::new),
        ))
    }

    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let write_ops = requests
            .into_iter()
            .map(to_sdk_request)
            .collect::<Result<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, write_ops)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await?;

        if let Some(capacities) = output.consumed_capacity.as_ref() {
            let units: f64 = capacities.iter().filter_map(|c| c.capacity_units).sum();
            debug!(table = %table, capacity_units = units, "BatchWriteItem consumed capacity");
        }

        let unprocessed = output
            .unprocessed_items
            .unwrap_or_default()
            .remove(table)
            .unwrap_or_default();

        Ok(unprocessed.into_iter().filter_map(from_sdk_request).collect())
    }
}

fn to_sdk_request(request: WriteRequest) -> Result<SdkWriteRequest> {
    let request = match request {
        WriteRequest::Put(item) => SdkWriteRequest::builder()
            .set_put_request(Some(PutRequest::builder().set_item(Some(item)).build()?))
            .build(),
        WriteRequest::Delete(key) => SdkWriteRequest::builder()
            .set_delete_request(Some(DeleteRequest::builder().set_key(Some(key)).build()?))
            .build(),
    };
    Ok(request)
}

fn from_sdk_request(request: SdkWriteRequest) -> Option<WriteRequest> {
    if let Some(put_request) = request.put_request {
        return Some(WriteRequest::Put(put_request.item));
    }
    request
        .delete_request
        .map(|delete_request| WriteRequest::Delete(delete_request.key))
}
