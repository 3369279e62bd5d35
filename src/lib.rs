//! # DynamoDB Table Replication
//!
//! Copies every item of a source table into a destination table as a
//! short-lived batch job, optionally deleting everything in the destination
//! first.
//!
//! - Paginated scans driven by the store's continuation cursor
//! - Batched writes of at most 25 requests
//! - Retry of unprocessed requests with randomized exponential backoff
//! - Pluggable store: DynamoDB, or in-memory for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_replicate::{DynamoStore, ReplicationJob, Replicator, RetryPolicy};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dynamo_replicate::Error> {
//!     let store = DynamoStore::connect(None).await;
//!     let replicator = Replicator::new(store, RetryPolicy::default());
//!
//!     let job = ReplicationJob::new("orders", "orders-copy")
//!         .with_cleanup(true)
//!         .with_migrate(true);
//!
//!     let report = replicator.run(&job).await?;
//!     assert_eq!(report.items_dropped(), 0);
//!     Ok(())
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{Error, Result};

/// Engine configuration
pub mod config;

/// Top-level job handler
pub mod handler;

/// Job descriptor
pub mod job;

/// Scan, chunk and batched-write pipeline
pub mod replication;

/// Table setup utilities for testing
pub mod setup;

/// Store boundary and implementations
pub mod store;

/// Tracing initialization
pub mod telemetry;

pub use config::{RetryPolicy, Settings};
pub use handler::handle;
pub use job::ReplicationJob;
pub use replication::{PhaseReport, ReplicationReport, Replicator};
pub use store::{DynamoStore, KeyValueStore, MemoryStore};

// Re-export aws-config types for configuration
pub use aws_config::{BehaviorVersion, Region, SdkConfig, defaults};

use aws_config::meta::region::RegionProviderChain;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Region used when neither the environment nor a profile names one
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Default AWS configuration for the global client
///
/// It configures:
/// - Region from `AWS_REGION` / `AWS_DEFAULT_REGION` / profile, else [`DEFAULT_REGION`]
/// - Adaptive retry mode with 3 max attempts
/// - Exponential backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
/// - LocalStack support via AWS_PROFILE=localstack
pub(crate) async fn aws_config_defaults() -> SdkConfig {
    use aws_types::sdk_config::{RetryConfig, TimeoutConfig};
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let region = RegionProviderChain::default_provider().or_else(Region::new(DEFAULT_REGION));

    let mut loader = defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    // Support LocalStack via AWS_PROFILE=localstack
    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// Has no effect once the client is initialized.
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Initializes the client with the crate defaults (adaptive retry, timeouts,
/// region fallback, LocalStack profile) on first use unless [`init`] or
/// [`init_with_client`] ran before.
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
