use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Error, Result};
use crate::store::{Cursor, Item, KeySchema, KeyValueStore, Page, Projection, WriteRequest};

/// A call received by a [`MemoryStore`]
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    /// `describe_key_schema`
    DescribeKeySchema {
        /// Table described
        table: String,
    },
    /// `scan`
    Scan {
        /// Table scanned
        table: String,
        /// Requested projection
        projection: Projection,
        /// Requested page size
        page_size: u32,
        /// Start token, if any
        cursor: Option<Cursor>,
    },
    /// `batch_write`
    BatchWrite {
        /// Target table
        table: String,
        /// Requests as submitted
        requests: Vec<WriteRequest>,
    },
}

impl StoreCall {
    /// Table the call was addressed to
    pub fn table(&self) -> &str {
        match self {
            StoreCall::DescribeKeySchema { table }
            | StoreCall::Scan { table, .. }
            | StoreCall::BatchWrite { table, .. } => table,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    key_schema: Option<KeySchema>,
    items: BTreeMap<String, Item>,
}

impl MemoryTable {
    fn key_of(&self, item: &Item) -> Item {
        match &self.key_schema {
            Some(schema) => schema.key_of(item),
            None => item.clone(),
        }
    }
}

/// Total order over keys, so a scan can resume after a key that was deleted
fn order_of(key: &Item) -> String {
    let sorted: BTreeMap<&String, &AttributeValue> = key.iter().collect();
    format!("{sorted:?}")
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, MemoryTable>,
    calls: Vec<StoreCall>,
    scripted_unprocessed: VecDeque<usize>,
    always_unprocessed: Option<usize>,
    failing_scans: HashSet<String>,
    failing_writes: HashSet<String>,
}

/// In-process store holding tables ordered by key
///
/// Every call is recorded, and batched writes can be told to leave their
/// trailing requests unprocessed, which makes the store suitable for driving
/// the retry path deterministically.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or reset) `table` with the given key schema
    ///
    /// A table created with `None` exists but reports no key schema.
    pub fn create_table(&self, table: &str, key_schema: Option<KeySchema>) {
        let _ = self.lock().tables.insert(
            table.to_string(),
            MemoryTable {
                key_schema,
                items: BTreeMap::new(),
            },
        );
    }

    /// Add items to `table`, replacing any with the same key
    pub fn insert(&self, table: &str, items: impl IntoIterator<Item = Item>) {
        let mut state = self.lock();
        let memory_table = state.tables.entry(table.to_string()).or_default();
        for item in items {
            put(memory_table, item);
        }
    }

    /// Snapshot of the items of `table`, empty if it does not exist
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// The request lists of every batched write addressed to `table`
    pub fn batch_writes(&self, table: &str) -> Vec<Vec<WriteRequest>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::BatchWrite {
                    table: target,
                    requests,
                } if target == table => Some(requests.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Leave the last `count` requests of the next batched write unprocessed
    ///
    /// Calls queue up: each one scripts one future batched write.
    pub fn push_unprocessed(&self, count: usize) {
        self.lock().scripted_unprocessed.push_back(count);
    }

    /// Leave the last `count` requests of every unscripted batched write unprocessed
    pub fn always_unprocessed(&self, count: usize) {
        self.lock().always_unprocessed = Some(count);
    }

    /// Make every scan of `table` fail
    pub fn fail_scans_of(&self, table: &str) {
        let _ = self.lock().failing_scans.insert(table.to_string());
    }

    /// Make every batched write to `table` fail
    pub fn fail_writes_to(&self, table: &str) {
        let _ = self.lock().failing_writes.insert(table.to_string());
    }
}

fn put(memory_table: &mut MemoryTable, item: Item) {
    let order = order_of(&memory_table.key_of(&item));
    let _ = memory_table.items.insert(order, item);
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema> {
        let mut state = self.lock();
        state.calls.push(StoreCall::DescribeKeySchema {
            table: table.to_string(),
        });

        let memory_table = state
            .tables
            .get(table)
            .ok_or_else(|| Error::schema_unavailable(table, "table not found"))?;

        memory_table
            .key_schema
            .clone()
            .ok_or_else(|| Error::schema_unavailable(table, "table has no key schema"))
    }

    async fn scan(
        &self,
        table: &str,
        projection: &Projection,
        page_size: u32,
        cursor: Option<Cursor>,
    ) -> Result<Page> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Scan {
            table: table.to_string(),
            projection: projection.clone(),
            page_size,
            cursor: cursor.clone(),
        });

        if state.failing_scans.contains(table) {
            return Err(Error::Store(format!("scan of {table} failed")));
        }

        let memory_table = state
            .tables
            .get(table)
            .ok_or_else(|| Error::Store(format!("table {table} not found")))?;

        let lower = match &cursor {
            Some(cursor) => Bound::Excluded(order_of(cursor.as_item())),
            None => Bound::Unbounded,
        };
        let mut remaining = memory_table.items.range((lower, Bound::Unbounded));

        let page: Vec<&Item> = remaining
            .by_ref()
            .take(page_size as usize)
            .map(|(_, item)| item)
            .collect();
        let next = match (page.last(), remaining.next()) {
            (Some(last), Some(_)) => Some(Cursor::new(memory_table.key_of(last))),
            _ => None,
        };

        let items = page
            .into_iter()
            .map(|item| match projection {
                Projection::FullItem => item.clone(),
                Projection::KeysOnly(schema) => schema.key_of(item),
            })
            .collect();

        Ok(Page::new(items, next))
    }

    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> Result<Vec<WriteRequest>> {
        let mut state = self.lock();
        state.calls.push(StoreCall::BatchWrite {
            table: table.to_string(),
            requests: requests.clone(),
        });

        if state.failing_writes.contains(table) {
            return Err(Error::Store(format!("batch write to {table} failed")));
        }

        let unprocessed_count = state
            .scripted_unprocessed
            .pop_front()
            .or(state.always_unprocessed)
            .unwrap_or(0)
            .min(requests.len());

        let memory_table = state
            .tables
            .get_mut(table)
            .ok_or_else(|| Error::Store(format!("table {table} not found")))?;

        let mut requests = requests;
        let unprocessed = requests.split_off(requests.len() - unprocessed_count);

        for request in requests {
            match request {
                WriteRequest::Put(item) => put(memory_table, item),
                WriteRequest::Delete(key) => {
                    let order = order_of(&memory_table.key_of(&key));
                    let _ = memory_table.items.remove(&order);
                }
            }
        }

        Ok(unprocessed)
    }
}
