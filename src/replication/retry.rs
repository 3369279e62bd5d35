use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, warn};

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::replication::backoff::retry_delay;
use crate::replication::chunk::BATCH_WRITE_SIZE;
use crate::store::{Item, KeyValueStore, WriteKind, WriteRequest};

/// Write requests of one kind bound to one table, at most [`BATCH_WRITE_SIZE`] long
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    table: String,
    requests: Vec<WriteRequest>,
}

impl Batch {
    /// Turn `items` into a batch of `kind` requests against `table`
    pub fn new(table: impl Into<String>, kind: WriteKind, items: Vec<Item>) -> Result<Self> {
        if items.len() > BATCH_WRITE_SIZE {
            return Err(Error::BatchTooLarge {
                size: items.len(),
                limit: BATCH_WRITE_SIZE,
            });
        }

        Ok(Self {
            table: table.into(),
            requests: items
                .into_iter()
                .map(|item| WriteRequest::new(kind, item))
                .collect(),
        })
    }

    /// Target table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of requests
    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

/// Result of writing one batch, retries included
#[must_use = "the outcome reports requests dropped after the retry limit"]
#[derive(Debug)]
pub struct BatchWriteOutcome {
    /// Requests in the original batch
    pub submitted: usize,
    /// Batched-write calls issued (first try plus retries)
    pub calls: u32,
    /// Requests still unprocessed when the retry limit was reached
    pub dropped: Vec<WriteRequest>,
    /// Total execution time including backoff
    pub total_duration: Duration,
}

impl BatchWriteOutcome {
    /// Number of retries issued after the first call
    pub fn retries(&self) -> u32 {
        self.calls.saturating_sub(1)
    }

    /// Number of requests the store applied
    pub fn written(&self) -> usize {
        self.submitted - self.dropped.len()
    }

    /// Check if every request was applied
    pub fn is_success(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Writes batches, resubmitting only the requests the store leaves unprocessed
#[derive(Debug)]
pub struct BatchWriter<'a, S: ?Sized> {
    store: &'a S,
    policy: &'a RetryPolicy,
}

impl<'a, S> BatchWriter<'a, S>
where
    S: KeyValueStore + ?Sized,
{
    /// Create a writer over `store` following `policy`
    pub fn new(store: &'a S, policy: &'a RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Write `batch`, retrying unprocessed requests up to the retry limit
    ///
    /// Store failures are returned as errors. Requests still unprocessed after
    /// the last retry are logged and reported in
    /// [`BatchWriteOutcome::dropped`]; they are not an error.
    pub async fn write(&self, batch: Batch) -> Result<BatchWriteOutcome> {
        let start_time = Instant::now();
        let Batch { table, requests } = batch;

        let submitted = requests.len();
        let mut remaining = requests;
        let mut attempt: u32 = 0;

        loop {
            if attempt > 0 {
                let delay = retry_delay(self.policy.base_delay, attempt);
                debug!(
                    table = %table,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Backing off before retry"
                );
                sleep(delay).await;
            }

            let unprocessed = self.store.batch_write(&table, remaining).await?;

            if unprocessed.is_empty() {
                return Ok(BatchWriteOutcome {
                    submitted,
                    calls: attempt + 1,
                    dropped: Vec::new(),
                    total_duration: start_time.elapsed(),
                });
            }

            if attempt >= self.policy.retry_limit {
                error!(
                    table = %table,
                    unprocessed = unprocessed.len(),
                    retry_limit = self.policy.retry_limit,
                    "Retry limit reached. UnprocessedItems.length: {}.",
                    unprocessed.len()
                );
                return Ok(BatchWriteOutcome {
                    submitted,
                    calls: attempt + 1,
                    dropped: unprocessed,
                    total_duration: start_time.elapsed(),
                });
            }

            warn!(
                table = %table,
                unprocessed = unprocessed.len(),
                attempt,
                "UnprocessedItems.length: {}.",
                unprocessed.len()
            );

            remaining = unprocessed;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeySchema, MemoryStore, StoreCall};
    use aws_sdk_dynamodb::types::AttributeValue;

    fn item(pk: &str) -> Item {
        [("pk".to_string(), AttributeValue::S(pk.to_string()))]
            .into_iter()
            .collect()
    }

    fn policy(retry_limit: u32) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            retry_limit,
            ..RetryPolicy::default()
        }
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("dest", KeySchema::new(["pk"]));
        store
    }

    fn three_puts() -> Batch {
        Batch::new("dest", WriteKind::Put, vec![item("a"), item("b"), item("c")]).unwrap()
    }

    #[test]
    fn test_batch_rejects_more_than_limit() {
        let items = (0..26).map(|i| item(&i.to_string())).collect();
        let err = Batch::new("dest", WriteKind::Delete, items).unwrap_err();
        assert!(matches!(err, Error::BatchTooLarge { size: 26, limit: 25 }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_processed_first_try() {
        let store = store();
        let policy = policy(10);

        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.retries(), 0);
        assert_eq!(outcome.written(), 3);
        assert_eq!(store.items("dest").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_unprocessed_requests_are_resubmitted() {
        let store = store();
        store.push_unprocessed(1);
        let policy = policy(10);

        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.calls, 2);
        let writes = store.batch_writes("dest");
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].len(), 3);
        assert_eq!(writes[1], vec![WriteRequest::Put(item("c"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_limit_drops_remaining_requests() {
        let store = store();
        store.always_unprocessed(1);
        let policy = policy(2);

        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        assert_eq!(outcome.calls, 3);
        assert_eq!(outcome.dropped, vec![WriteRequest::Put(item("c"))]);
        assert_eq!(outcome.written(), 2);

        let writes = store.batch_writes("dest");
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[1], vec![WriteRequest::Put(item("c"))]);
        assert_eq!(writes[2], writes[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backs_off_before_each_retry() {
        let store = store();
        store.always_unprocessed(1);
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            retry_limit: 2,
            ..RetryPolicy::default()
        };

        let start = Instant::now();
        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        // At least the base delay before each of the two retries
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(outcome.total_duration >= Duration::from_millis(200));
        assert_eq!(outcome.retries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_does_not_wait() {
        let store = store();
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(5),
            ..RetryPolicy::default()
        };

        let start = Instant::now();
        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(outcome.total_duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retry_limit_makes_single_call() {
        let store = store();
        store.always_unprocessed(2);
        let policy = policy(0);

        let outcome = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap();

        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.dropped.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failure_propagates() {
        let store = store();
        store.fail_writes_to("dest");
        let policy = policy(10);

        let err = BatchWriter::new(&store, &policy).write(three_puts()).await.unwrap_err();

        assert!(err.is_store_error());
        assert!(matches!(
            store.calls().as_slice(),
            [StoreCall::BatchWrite { .. }]
        ));
    }
}
