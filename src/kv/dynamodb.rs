use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use tokio::time::sleep;
use tracing::warn;

use super::{
    backoff_delay, chunked, ExpectedStatus, KvError, Page, ProofRecord, ProofsTable, RootRecord,
    RootsTable, WhitelistStatus, BATCH_WRITE_CHUNK_SIZE,
};

const PK: &str = "WhitelistName";
const SK: &str = "WhitelistAddress";
const ROOT_ATTR: &str = "MerkleRoot";
const STATUS_ATTR: &str = "WhitelistStatus";
const AMOUNT_ATTR: &str = "WhitelistAmountWei";
const PROOF_ATTR: &str = "MerkleProof";

/// Rewrite any access-denied message to a fixed constant before it
/// reaches the caller.
fn map_provider_error(message: &str, is_access_denied: bool, is_throttled: bool) -> KvError {
    if is_access_denied {
        return KvError::AccessDenied;
    }
    if is_throttled {
        return KvError::Throttled(message.to_string());
    }
    KvError::InternalError(message.to_string())
}

fn classify_dynamo_error<E: std::fmt::Display>(err: &SdkError<E>) -> KvError
where
    E: std::error::Error + 'static,
{
    let message = err.to_string();
    let lower = message.to_lowercase();
    let is_access_denied = lower.contains("access") && lower.contains("denied");
    let is_throttled = lower.contains("throttl") || lower.contains("provisionedthroughput");
    if lower.contains("resourcenotfound") {
        return KvError::ResourceNotFound;
    }
    if lower.contains("transactionconflict") || lower.contains("conflict") {
        return KvError::Conflict(message);
    }
    map_provider_error(&message, is_access_denied, is_throttled)
}

fn is_conditional_check_failed(err: &SdkError<PutItemError>) -> bool {
    matches!(
        err,
        SdkError::ServiceError(svc) if svc.err().is_conditional_check_failed_exception()
    )
}

fn root_record_from_item(item: &HashMap<String, AttributeValue>) -> Option<RootRecord> {
    let whitelist_name = item.get(PK)?.as_s().ok()?.clone();
    let merkle_root = item.get(ROOT_ATTR)?.as_s().ok()?.clone();
    let status = item.get(STATUS_ATTR)?.as_s().ok()?.parse().ok()?;
    Some(RootRecord {
        whitelist_name,
        merkle_root,
        status,
    })
}

fn proof_record_from_item(item: &HashMap<String, AttributeValue>) -> Option<ProofRecord> {
    Some(ProofRecord {
        whitelist_name: item.get(PK)?.as_s().ok()?.clone(),
        whitelist_address: item.get(SK)?.as_s().ok()?.clone(),
        whitelist_amount_wei: item.get(AMOUNT_ATTR)?.as_s().ok()?.clone(),
        merkle_proof: item.get(PROOF_ATTR)?.as_s().ok()?.clone(),
    })
}

fn proof_to_item(record: &ProofRecord) -> HashMap<String, AttributeValue> {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(record.whitelist_name.clone())),
        (SK.to_string(), AttributeValue::S(record.whitelist_address.clone())),
        (
            AMOUNT_ATTR.to_string(),
            AttributeValue::S(record.whitelist_amount_wei.clone()),
        ),
        (PROOF_ATTR.to_string(), AttributeValue::S(record.merkle_proof.clone())),
    ])
}

/// DynamoDB-backed KV adapter, generalizing a `Storage`-trait-shaped
/// error taxonomy to DynamoDB's batch-write and transact APIs.
pub struct DynamoDbKvStore {
    client: Client,
    roots_table: String,
    proofs_table: String,
}

impl DynamoDbKvStore {
    pub fn new(client: Client, roots_table: String, proofs_table: String) -> Self {
        Self {
            client,
            roots_table,
            proofs_table,
        }
    }

    pub async fn from_env(roots_table: String, proofs_table: String) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), roots_table, proofs_table)
    }

    async fn put_item_conditional(
        &self,
        table: &str,
        item: HashMap<String, AttributeValue>,
        condition_expression: Option<String>,
        expression_values: HashMap<String, AttributeValue>,
    ) -> Result<(), KvError> {
        let mut request = self.client.put_item().table_name(table).set_item(Some(item));
        if let Some(expr) = condition_expression {
            request = request
                .condition_expression(expr)
                .set_expression_attribute_values(Some(expression_values));
        }
        request.send().await.map_err(|err| {
            if is_conditional_check_failed(&err) {
                KvError::ConditionalCheckFailed
            } else {
                classify_dynamo_error(&err)
            }
        })?;
        Ok(())
    }

    /// Bulk-write via `batch_write_item`, chunked at
    /// `BATCH_WRITE_CHUNK_SIZE`, retrying unprocessed items with a
    /// `10ms * 2^i` backoff. Returns
    /// `KvError::PartialBatch` rather than silently dropping items when
    /// the retry budget is exhausted.
    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
        max_retries: u32,
    ) -> Result<(), KvError> {
        for chunk in chunked(requests, BATCH_WRITE_CHUNK_SIZE) {
            let mut pending = chunk;
            let mut attempt = 0;
            loop {
                if pending.is_empty() {
                    break;
                }
                let response = self
                    .client
                    .batch_write_item()
                    .request_items(table, pending.clone())
                    .send()
                    .await
                    .map_err(|err| classify_dynamo_error(&err))?;

                let unprocessed = response
                    .unprocessed_items
                    .and_then(|mut map| map.remove(table))
                    .unwrap_or_default();

                if unprocessed.is_empty() {
                    break;
                }
                if attempt >= max_retries {
                    return Err(KvError::PartialBatch(unprocessed.len()));
                }
                warn!(table, attempt, remaining = unprocessed.len(), "retrying unprocessed batch write items");
                sleep(backoff_delay(attempt)).await;
                pending = unprocessed;
                attempt += 1;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RootsTable for DynamoDbKvStore {
    async fn get(&self, whitelist_name: &str) -> Result<Option<RootRecord>, KvError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.roots_table)
            .key(PK, AttributeValue::S(whitelist_name.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| classify_dynamo_error(&err))?;

        Ok(output.item.as_ref().and_then(root_record_from_item))
    }

    async fn insert_creating(
        &self,
        whitelist_name: &str,
        merkle_root: &str,
    ) -> Result<(), KvError> {
        let item = HashMap::from([
            (PK.to_string(), AttributeValue::S(whitelist_name.to_string())),
            (ROOT_ATTR.to_string(), AttributeValue::S(merkle_root.to_string())),
            (
                STATUS_ATTR.to_string(),
                AttributeValue::S(WhitelistStatus::Creating.to_string()),
            ),
        ]);
        self.put_item_conditional(
            &self.roots_table,
            item,
            Some(format!("attribute_not_exists({PK})")),
            HashMap::new(),
        )
        .await
    }

    async fn transition(
        &self,
        whitelist_name: &str,
        expected_root: &str,
        from: ExpectedStatus,
        to: WhitelistStatus,
    ) -> Result<(), KvError> {
        let item = HashMap::from([
            (PK.to_string(), AttributeValue::S(whitelist_name.to_string())),
            (
                ROOT_ATTR.to_string(),
                AttributeValue::S(expected_root.to_string()),
            ),
            (STATUS_ATTR.to_string(), AttributeValue::S(to.to_string())),
        ]);

        let (status_condition, values) = match from {
            ExpectedStatus::Exactly(status) => (
                format!("{ROOT_ATTR} = :root AND {STATUS_ATTR} = :status0"),
                HashMap::from([(
                    ":status0".to_string(),
                    AttributeValue::S(status.to_string()),
                )]),
            ),
            ExpectedStatus::OneOf(statuses) => {
                let clauses: Vec<String> = statuses
                    .iter()
                    .enumerate()
                    .map(|(i, _)| format!("{STATUS_ATTR} = :status{i}"))
                    .collect();
                let values = statuses
                    .iter()
                    .enumerate()
                    .map(|(i, status)| {
                        (format!(":status{i}"), AttributeValue::S(status.to_string()))
                    })
                    .collect::<HashMap<_, _>>();
                (
                    format!("{ROOT_ATTR} = :root AND ({})", clauses.join(" OR ")),
                    values,
                )
            }
        };

        let mut expression_values = values;
        expression_values.insert(
            ":root".to_string(),
            AttributeValue::S(expected_root.to_string()),
        );

        self.put_item_conditional(&self.roots_table, item, Some(status_condition), expression_values)
            .await
    }

    async fn delete(&self, whitelist_name: &str) -> Result<(), KvError> {
        self.client
            .delete_item()
            .table_name(&self.roots_table)
            .key(PK, AttributeValue::S(whitelist_name.to_string()))
            .send()
            .await
            .map_err(|err| classify_dynamo_error(&err))?;
        Ok(())
    }

    async fn scan(
        &self,
        page_size: u32,
        starting_token: Option<&str>,
    ) -> Result<Page<RootRecord>, KvError> {
        let mut request = self
            .client
            .scan()
            .table_name(&self.roots_table)
            .consistent_read(true)
            .limit(page_size as i32);

        if let Some(token) = starting_token {
            request = request.exclusive_start_key(
                PK.to_string(),
                AttributeValue::S(token.to_string()),
            );
        }

        let output = request.send().await.map_err(|err| classify_dynamo_error(&err))?;

        let items = output
            .items
            .unwrap_or_default()
            .iter()
            .filter_map(root_record_from_item)
            .collect();

        let next_token = output.last_evaluated_key.and_then(|mut key| {
            key.remove(PK).and_then(|v| v.as_s().ok().cloned())
        });

        Ok(Page { items, next_token })
    }
}

#[async_trait]
impl ProofsTable for DynamoDbKvStore {
    async fn get(
        &self,
        whitelist_name: &str,
        whitelist_address: &str,
    ) -> Result<Option<ProofRecord>, KvError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.proofs_table)
            .key(PK, AttributeValue::S(whitelist_name.to_string()))
            .key(SK, AttributeValue::S(whitelist_address.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| classify_dynamo_error(&err))?;

        Ok(output.item.as_ref().and_then(proof_record_from_item))
    }

    async fn query_all(&self, whitelist_name: &str) -> Result<Vec<ProofRecord>, KvError> {
        let mut items = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.proofs_table)
                .consistent_read(true)
                .key_condition_expression(format!("{PK} = :name"))
                .expression_attribute_values(
                    ":name",
                    AttributeValue::S(whitelist_name.to_string()),
                );

            if let Some(key) = exclusive_start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let output = request.send().await.map_err(|err| classify_dynamo_error(&err))?;

            items.extend(output.items.unwrap_or_default().iter().filter_map(proof_record_from_item));

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => exclusive_start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn batch_insert(
        &self,
        records: Vec<ProofRecord>,
        max_retries: u32,
    ) -> Result<(), KvError> {
        let requests = records
            .iter()
            .map(|record| {
                WriteRequest::builder()
                    .put_request(
                        PutRequest::builder()
                            .set_item(Some(proof_to_item(record)))
                            .build()
                            .expect("put request always has item")
                    )
                    .build()
            })
            .collect();

        self.batch_write(&self.proofs_table, requests, max_retries).await
    }

    async fn batch_delete(
        &self,
        whitelist_name: &str,
        whitelist_addresses: Vec<String>,
        max_retries: u32,
    ) -> Result<(), KvError> {
        let requests = whitelist_addresses
            .into_iter()
            .map(|address| {
                let key = HashMap::from([
                    (PK.to_string(), AttributeValue::S(whitelist_name.to_string())),
                    (SK.to_string(), AttributeValue::S(address)),
                ]);
                WriteRequest::builder()
                    .delete_request(DeleteRequest::builder().set_key(Some(key)).build().expect("key always set"))
                    .build()
            })
            .collect();

        self.batch_write(&self.proofs_table, requests, max_retries).await
    }
}
