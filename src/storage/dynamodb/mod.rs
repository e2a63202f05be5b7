use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::storage::{MetadataStore, MetadataStoreTrait, extract_sdk_error_details};
use crate::types::error::RefreshError;
use crate::types::{ContinuationToken, Page, Record};

fn is_provisioned_throughput_exceeded(e: &SdkError<ScanError>) -> bool {
    e.as_service_error()
        .is_some_and(|service_err| service_err.is_provisioned_throughput_exceeded_exception())
}

/// Metadata store backed by a DynamoDB table.
#[derive(Clone)]
pub struct DynamoDbMetadataStore {
    client: Client,
}

impl std::fmt::Debug for DynamoDbMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbMetadataStore").finish()
    }
}

impl DynamoDbMetadataStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn boxed(client: Client) -> MetadataStore {
        Box::new(Self::new(client))
    }
}

#[async_trait]
impl MetadataStoreTrait for DynamoDbMetadataStore {
    async fn scan_page(
        &self,
        table: &str,
        limit: i32,
        continuation_token: Option<ContinuationToken>,
    ) -> Result<Page> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .limit(limit)
            .set_exclusive_start_key(continuation_token.map(ContinuationToken::into_inner))
            .send()
            .await
            .map_err(|e| {
                let (error_code, error_message) = extract_sdk_error_details(&e);
                if is_provisioned_throughput_exceeded(&e) {
                    tracing::warn!(
                        table = table,
                        error_code = error_code,
                        error_message = error_message,
                        "DynamoDB Scan throttled on table '{}': {} ({}).",
                        table,
                        error_code,
                        error_message,
                    );
                    return anyhow!(RefreshError::Throttled(error_message));
                }

                tracing::error!(
                    table = table,
                    error_code = error_code,
                    error_message = error_message,
                    "DynamoDB Scan API call failed on table '{}': {} ({}).",
                    table,
                    error_code,
                    error_message,
                );
                anyhow!(RefreshError::Store(format!("{error_code}: {error_message}")))
            })?;

        let items = output.items().iter().cloned().map(Record::new).collect();
        let continuation_token =
            ContinuationToken::from_last_evaluated_key(output.last_evaluated_key());

        Ok(Page::new(items, continuation_token))
    }

    async fn partial_update(
        &self,
        table: &str,
        key: HashMap<String, AttributeValue>,
        fields: HashMap<String, AttributeValue>,
    ) -> Result<()> {
        let update = UpdateExpression::from_fields(fields);

        self.client
            .update_item()
            .table_name(table)
            .set_key(Some(key))
            .update_expression(update.expression)
            .set_expression_attribute_names(Some(update.names))
            .set_expression_attribute_values(Some(update.values))
            .send()
            .await
            .map_err(|e| {
                let (error_code, error_message) = extract_sdk_error_details(&e);
                tracing::warn!(
                    table = table,
                    error_code = error_code,
                    error_message = error_message,
                    "DynamoDB UpdateItem API call failed on table '{}': {} ({}).",
                    table,
                    error_code,
                    error_message,
                );
                anyhow!(RefreshError::Store(format!("{error_code}: {error_message}")))
            })?;

        Ok(())
    }
}

/// `SET` expression over placeholder names and values, so attribute names
/// never collide with DynamoDB reserved words.
#[derive(Debug, PartialEq)]
struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    fn from_fields(fields: HashMap<String, AttributeValue>) -> Self {
        let mut fields: Vec<(String, AttributeValue)> = fields.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let mut assignments = Vec::with_capacity(fields.len());
        let mut names = HashMap::with_capacity(fields.len());
        let mut values = HashMap::with_capacity(fields.len());

        for (index, (name, value)) in fields.into_iter().enumerate() {
            let name_placeholder = format!("#f{index}");
            let value_placeholder = format!(":v{index}");
            assignments.push(format!("{name_placeholder} = {value_placeholder}"));
            names.insert(name_placeholder, name);
            values.insert(value_placeholder, value);
        }

        Self {
            expression: format!("SET {}", assignments.join(", ")),
            names,
            values,
        }
    }
}
