//! Replication engine: scan a table page by page, chunk every page into
//! bounded batches and write them with retry of unprocessed requests.

mod backoff;
mod chunk;
mod retry;
mod scan;

pub use backoff::{retry_delay, retry_delay_with};
pub use chunk::{BATCH_WRITE_SIZE, chunk};
pub use retry::{Batch, BatchWriteOutcome, BatchWriter};
pub use scan::pages;

use futures_util::{TryStreamExt, pin_mut};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::config::RetryPolicy;
use crate::error::Result;
use crate::job::ReplicationJob;
use crate::store::{KeyValueStore, Projection, WriteKind};

/// The two phases of a replication job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Delete every key of the destination table
    Cleanup,
    /// Copy every item of the source table into the destination table
    Migrate,
}

impl Phase {
    /// Write kind this phase issues
    pub fn write_kind(self) -> WriteKind {
        match self {
            Phase::Cleanup => WriteKind::Delete,
            Phase::Migrate => WriteKind::Put,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Cleanup => write!(f, "cleanup"),
            Phase::Migrate => write!(f, "migrate"),
        }
    }
}

/// Progress of a phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseState {
    /// Not started
    Idle,
    /// Destination key schema resolved (cleanup only)
    SchemaResolved,
    /// Waiting on a scan page
    Scanning,
    /// Writing the batches of the current page
    Draining,
    /// Scan exhausted and every batch written
    Done,
}

impl fmt::Display for PhaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseState::Idle => "idle",
            PhaseState::SchemaResolved => "schema_resolved",
            PhaseState::Scanning => "scanning",
            PhaseState::Draining => "draining",
            PhaseState::Done => "done",
        };
        f.write_str(name)
    }
}

fn transition(phase: Phase, state: PhaseState) {
    trace!(phase = %phase, state = %state, "Phase transition");
}

/// Counters of one phase
#[must_use = "phase reports carry the number of dropped items"]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseReport {
    /// Phase the report belongs to
    pub phase: Phase,
    /// Scan pages received
    pub pages: usize,
    /// Items (or keys) received from the scan
    pub items_scanned: usize,
    /// Batches written
    pub batches: usize,
    /// Retries issued across all batches
    pub retries: u64,
    /// Requests applied by the store
    pub items_written: usize,
    /// Requests left unprocessed after the retry limit
    pub items_dropped: usize,
    /// Time spent in batched writes, backoff included
    pub write_duration: Duration,
    /// Wall-clock time of the phase
    pub duration: Duration,
}

impl PhaseReport {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            pages: 0,
            items_scanned: 0,
            batches: 0,
            retries: 0,
            items_written: 0,
            items_dropped: 0,
            write_duration: Duration::ZERO,
            duration: Duration::ZERO,
        }
    }

    fn record(&mut self, outcome: &BatchWriteOutcome) {
        self.batches += 1;
        self.retries += u64::from(outcome.retries());
        self.items_written += outcome.written();
        self.items_dropped += outcome.dropped.len();
        self.write_duration += outcome.total_duration;
    }

    /// Check if every scanned item was written
    pub fn is_complete(&self) -> bool {
        self.items_dropped == 0
    }
}

/// Outcome of a whole job; a phase is `None` when it was not enabled
#[must_use = "replication reports carry the number of dropped items"]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    /// Cleanup phase counters
    pub cleanup: Option<PhaseReport>,
    /// Migrate phase counters
    pub migrate: Option<PhaseReport>,
}

impl ReplicationReport {
    /// Requests dropped across both phases
    pub fn items_dropped(&self) -> usize {
        [&self.cleanup, &self.migrate]
            .into_iter()
            .flatten()
            .map(|report| report.items_dropped)
            .sum()
    }
}

/// Runs replication jobs against a store
#[derive(Debug)]
pub struct Replicator<S> {
    store: S,
    policy: RetryPolicy,
}

impl<S> Replicator<S>
where
    S: KeyValueStore,
{
    /// Create a replicator over `store`
    pub fn new(store: S, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// The store jobs run against
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The retry and paging policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run cleanup (if enabled) to completion, then migrate (if enabled)
    ///
    /// The first store or schema error aborts the job.
    pub async fn run(&self, job: &ReplicationJob) -> Result<ReplicationReport> {
        let cleanup = self.cleanup_destination_table(job).await?;
        let migrate = self.migrate(job).await?;

        let report = ReplicationReport { cleanup, migrate };
        info!(
            source = %job.source_table_name,
            destination = %job.destination_table_name,
            items_dropped = report.items_dropped(),
            "Replication finished"
        );
        Ok(report)
    }

    /// Delete every item of the destination table
    ///
    /// Returns `Ok(None)` without touching the store when the job does not
    /// enable cleanup.
    pub async fn cleanup_destination_table(
        &self,
        job: &ReplicationJob,
    ) -> Result<Option<PhaseReport>> {
        if !job.cleanup_destination_table {
            debug!("Skipping cleanup of destination table");
            return Ok(None);
        }

        let phase = Phase::Cleanup;
        transition(phase, PhaseState::Idle);

        let key_schema = self
            .store
            .describe_key_schema(&job.destination_table_name)
            .await?;
        transition(phase, PhaseState::SchemaResolved);
        debug!(
            table = %job.destination_table_name,
            key_schema = ?key_schema.attribute_names(),
            "Resolved destination key schema"
        );

        let report = self
            .drain(
                phase,
                &job.destination_table_name,
                Projection::KeysOnly(key_schema),
                &job.destination_table_name,
            )
            .await?;
        Ok(Some(report))
    }

    /// Copy every item of the source table into the destination table
    ///
    /// Returns `Ok(None)` without touching the store when the job does not
    /// enable migration.
    pub async fn migrate(&self, job: &ReplicationJob) -> Result<Option<PhaseReport>> {
        if !job.migrate {
            debug!("Skipping migration of data");
            return Ok(None);
        }

        let phase = Phase::Migrate;
        transition(phase, PhaseState::Idle);

        let report = self
            .drain(
                phase,
                &job.source_table_name,
                Projection::FullItem,
                &job.destination_table_name,
            )
            .await?;
        Ok(Some(report))
    }

    async fn drain(
        &self,
        phase: Phase,
        scanned_table: &str,
        projection: Projection,
        target_table: &str,
    ) -> Result<PhaseReport> {
        let start_time = Instant::now();
        let kind = phase.write_kind();
        let writer = BatchWriter::new(&self.store, &self.policy);
        let mut report = PhaseReport::new(phase);

        let pages = pages(
            &self.store,
            scanned_table,
            &projection,
            self.policy.scan_page_size,
        );
        pin_mut!(pages);

        transition(phase, PhaseState::Scanning);
        while let Some(page) = pages.try_next().await? {
            transition(phase, PhaseState::Draining);
            report.pages += 1;
            report.items_scanned += page.items.len();
            debug!(
                phase = %phase,
                table = %scanned_table,
                items = page.items.len(),
                last_page = page.is_last(),
                "Received scan page"
            );

            for items in chunk(page.items, BATCH_WRITE_SIZE) {
                let batch = Batch::new(target_table, kind, items)?;
                trace!(table = %batch.table(), requests = batch.len(), "Writing batch");
                let outcome = writer.write(batch).await?;
                report.record(&outcome);
            }

            if page.cursor.is_some() {
                transition(phase, PhaseState::Scanning);
            }
        }

        report.duration = start_time.elapsed();
        transition(phase, PhaseState::Done);
        info!(
            phase = %phase,
            source = %scanned_table,
            destination = %target_table,
            pages = report.pages,
            items_scanned = report.items_scanned,
            items_written = report.items_written,
            items_dropped = report.items_dropped,
            "Phase complete"
        );

        Ok(report)
    }
}
