//! Store boundary used by the replication engine.
//!
//! The engine only needs three capabilities from a key-value store: describe a
//! table's key schema, scan a table one page at a time, and apply a batch of
//! put/delete requests while reporting the requests it did not apply.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::{MemoryStore, StoreCall};

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::Result;

/// A single item: attribute name to DynamoDB-encoded value
pub type Item = HashMap<String, AttributeValue>;

/// Ordered attribute names that identify an item within a table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySchema {
    attributes: Vec<String>,
}

impl KeySchema {
    /// Build a key schema, or `None` when no attribute is named
    pub fn new<I, A>(attributes: I) -> Option<Self>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        if attributes.is_empty() {
            None
        } else {
            Some(Self { attributes })
        }
    }

    /// Attribute names, hash key first
    pub fn attribute_names(&self) -> &[String] {
        &self.attributes
    }

    /// Project `item` onto the key attributes it carries
    pub fn key_of(&self, item: &Item) -> Item {
        self.attributes
            .iter()
            .filter_map(|name| item.get(name).map(|value| (name.clone(), value.clone())))
            .collect()
    }
}

/// Opaque continuation token returned by a scan
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor(Item);

impl Cursor {
    /// Wrap a store-issued start key
    pub fn new(start_key: Item) -> Self {
        Self(start_key)
    }

    /// Borrow the wrapped start key
    pub fn as_item(&self) -> &Item {
        &self.0
    }

    /// Unwrap into the start key to hand back to the store
    pub fn into_inner(self) -> Item {
        self.0
    }
}

/// One step of a scan
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Items in scan order
    pub items: Vec<Item>,
    /// Where the next request resumes; `None` once the table is exhausted
    pub cursor: Option<Cursor>,
}

impl Page {
    /// Create a page
    pub fn new(items: Vec<Item>, cursor: Option<Cursor>) -> Self {
        Self { items, cursor }
    }

    /// Whether this is the final page of the scan
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }
}

/// Which attributes a scan returns
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Every attribute of every item
    FullItem,
    /// Only the attributes named by the key schema
    KeysOnly(KeySchema),
}

/// Kind of write a replication phase issues
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// Insert or replace the whole item
    Put,
    /// Remove the item identified by its key
    Delete,
}

/// A single request inside a batched write
#[derive(Clone, Debug, PartialEq)]
pub enum WriteRequest {
    /// Put a full item
    Put(Item),
    /// Delete the item with this key
    Delete(Item),
}

impl WriteRequest {
    /// Build a request of `kind` for `item`
    pub fn new(kind: WriteKind, item: Item) -> Self {
        match kind {
            WriteKind::Put => WriteRequest::Put(item),
            WriteKind::Delete => WriteRequest::Delete(item),
        }
    }

    /// The kind of this request
    pub fn kind(&self) -> WriteKind {
        match self {
            WriteRequest::Put(_) => WriteKind::Put,
            WriteRequest::Delete(_) => WriteKind::Delete,
        }
    }

    /// The item (for puts) or key (for deletes)
    pub fn item(&self) -> &Item {
        match self {
            WriteRequest::Put(item) | WriteRequest::Delete(item) => item,
        }
    }
}

/// Paginated-scan / batched-write store
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Resolve the key schema of `table`
    ///
    /// Fails with [`crate::Error::SchemaUnavailable`] when the table does not
    /// exist or has no key schema.
    async fn describe_key_schema(&self, table: &str) -> Result<KeySchema>;

    /// Read one page of at most `page_size` items, resuming after `cursor`
    async fn scan(
        &self,
        table: &str,
        projection: &Projection,
        page_size: u32,
        cursor: Option<Cursor>,
    ) -> Result<Page>;

    /// Apply `requests` to `table` and return the ones that were not applied
    async fn batch_write(&self, table: &str, requests: Vec<WriteRequest>)
    -> Result<Vec<WriteRequest>>;
}
