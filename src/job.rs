use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Job descriptor received from the host invocation
///
/// ```
/// use dynamo_replicate::ReplicationJob;
///
/// let job = ReplicationJob::from_json(
///     r#"{"sourceTableName":"orders","destinationTableName":"orders-copy","migrate":true}"#,
/// )
/// .unwrap();
/// assert!(job.migrate);
/// assert!(!job.cleanup_destination_table);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationJob {
    /// Table items are read from
    pub source_table_name: String,
    /// Table items are written to (and deleted from during cleanup)
    pub destination_table_name: String,
    /// Delete every item of the destination table before migrating
    #[serde(default)]
    pub cleanup_destination_table: bool,
    /// Copy the source table into the destination table
    #[serde(default)]
    pub migrate: bool,
}

impl ReplicationJob {
    /// A job between two tables with both phases disabled
    pub fn new(source_table_name: impl Into<String>, destination_table_name: impl Into<String>) -> Self {
        Self {
            source_table_name: source_table_name.into(),
            destination_table_name: destination_table_name.into(),
            cleanup_destination_table: false,
            migrate: false,
        }
    }

    /// Enable or disable the cleanup phase
    pub fn with_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup_destination_table = enabled;
        self
    }

    /// Enable or disable the migrate phase
    pub fn with_migrate(mut self, enabled: bool) -> Self {
        self.migrate = enabled;
        self
    }

    /// Parse a JSON job descriptor
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
