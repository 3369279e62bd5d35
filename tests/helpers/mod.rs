/// Test helpers and fixtures for replication integration tests
///
/// This module provides common test utilities, fixtures, and helper functions
/// used across all integration tests.
pub mod fixtures;

#[allow(unused_imports)]
pub use dynamo_replicate::store::{Item, KeySchema, MemoryStore, StoreCall, WriteKind, WriteRequest};
#[allow(unused_imports)]
pub use dynamo_replicate::{Error, ReplicationJob, Replicator, RetryPolicy};

// Re-export common fixtures
#[allow(unused_imports)]
pub use fixtures::{TestObject, items, key_schema, objects};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

/// Retry policy with short delays for tests
#[allow(dead_code)]
pub fn fast_policy(retry_limit: u32, scan_page_size: u32) -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_millis(1),
        retry_limit,
        scan_page_size,
    }
}

/// Memory store with the fixture tables `source` and `destination`
#[allow(dead_code)]
pub fn store_with_tables(source: &str, destination: &str) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table(source, Some(key_schema()));
    store.create_table(destination, Some(key_schema()));
    store
}

/// One captured log event
#[derive(Clone, Debug)]
pub struct LogLine {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

/// Log events recorded by [`capture_logs`]
#[derive(Clone, Debug, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<LogLine>>>);

#[allow(dead_code)]
impl CapturedLogs {
    pub fn lines(&self) -> Vec<LogLine> {
        self.0.lock().expect("log lock").clone()
    }

    pub fn at(&self, level: Level) -> Vec<LogLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .collect()
    }

    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.at(level).iter().any(|line| line.message == message)
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = self
                .fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = self
                .fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

struct CaptureLayer(CapturedLogs);

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        (self.0).0.lock().expect("log lock").push(LogLine {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Record every log event of the current thread until the guard drops
#[allow(dead_code)]
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(logs.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
