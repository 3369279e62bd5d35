use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use thiserror::Error;

type DynamoDescribeTableError = SdkError<DescribeTableError, Response>;
type DynamoScanError = SdkError<ScanError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type DynamoCreateTableError = SdkError<CreateTableError, Response>;

/// Replication error
///
/// Only store failures and schema failures are fatal to a job. Items a store
/// leaves unprocessed after the retry limit are reported, never raised.
#[derive(Debug, Error)]
pub enum Error {
    /// The table does not exist or carries no key schema
    #[error("table {table} has no usable key schema: {reason}")]
    SchemaUnavailable {
        /// Table that was described
        table: String,
        /// What was missing
        reason: String,
    },
    /// A write batch was built with more requests than one batched write accepts
    #[error("batch of {size} write requests exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Number of requests in the rejected batch
        size: usize,
        /// Maximum number of requests per batch
        limit: usize,
    },
    /// DynamoDB DescribeTable operation error
    #[error("DynamoDB DescribeTable operation failed: {0}")]
    DynamoDescribeTableError(#[from] DynamoDescribeTableError),
    /// DynamoDB Scan operation error
    #[error("DynamoDB Scan operation failed: {0}")]
    DynamoScanError(#[from] DynamoScanError),
    /// DynamoDB BatchWriteItem operation error
    #[error("DynamoDB BatchWriteItem operation failed: {0}")]
    DynamoBatchWriteItemError(#[from] DynamoBatchWriteItemError),
    /// DynamoDB CreateTable operation error
    #[error("DynamoDB CreateTable operation failed: {0}")]
    DynamoCreateTableError(#[from] DynamoCreateTableError),
    /// DynamoDB request builder error
    #[error("DynamoDB request builder error: {0}")]
    BuildError(#[from] BuildError),
    /// Failure reported by a non-DynamoDB store
    #[error("store operation failed: {0}")]
    Store(String),
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    /// Configuration loaded but holds an unusable value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Job descriptor could not be parsed
    #[error("invalid job descriptor: {0}")]
    Job(#[from] serde_json::Error),
    /// IO error while reading a job descriptor
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::SchemaUnavailable`] for `table`
    pub fn schema_unavailable(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaUnavailable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is a missing table or key schema
    pub fn is_schema_unavailable(&self) -> bool {
        matches!(self, Error::SchemaUnavailable { .. })
    }

    /// Check if the error came from a store call (transport or service failure)
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Error::DynamoDescribeTableError(_)
                | Error::DynamoScanError(_)
                | Error::DynamoBatchWriteItemError(_)
                | Error::DynamoCreateTableError(_)
                | Error::Store(_)
        )
    }

    /// Format the error followed by its source chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for replication operations
pub type Result<T> = std::result::Result<T, Error>;
