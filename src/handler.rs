use tracing::{error, info};

use crate::job::ReplicationJob;
use crate::replication::{ReplicationReport, Replicator};
use crate::store::KeyValueStore;

/// Top-level entry for one invocation
///
/// Runs the job and logs a fatal error with its full source chain instead of
/// returning it, so the invocation itself always completes. The job is never
/// retried here. Returns the report when the job ran to completion.
pub async fn handle<S>(replicator: &Replicator<S>, job: &ReplicationJob) -> Option<ReplicationReport>
where
    S: KeyValueStore,
{
    info!(
        source = %job.source_table_name,
        destination = %job.destination_table_name,
        cleanup = job.cleanup_destination_table,
        migrate = job.migrate,
        "Starting replication job"
    );

    match replicator.run(job).await {
        Ok(report) => Some(report),
        Err(e) => {
            error!(
                source = %job.source_table_name,
                destination = %job.destination_table_name,
                error = %e.format_detailed(),
                "Error while migrating"
            );
            None
        }
    }
}
