/// DynamoDB Replication Tests
///
/// Runs jobs against a real DynamoDB endpoint. Start LocalStack and run with
/// `AWS_PROFILE=localstack cargo test -- --ignored`.
use dynamo_replicate::store::{DynamoStore, KeyValueStore, Projection, WriteRequest};
use dynamo_replicate::{ReplicationJob, Replicator, RetryPolicy, setup};
use rusty_ulid::generate_ulid_string;
use serial_test::serial;

mod helpers;
use helpers::fixtures::{PARTITION_KEY, SORT_KEY};
use helpers::*;

async fn fresh_table(store: &DynamoStore, label: &str) -> String {
    let name = format!("tests_replicate_{label}_{}", generate_ulid_string().to_lowercase());
    let _ = setup::table(store.client(), &name, PARTITION_KEY, Some(SORT_KEY))
        .await
        .expect("create table");
    name
}

async fn seed(store: &DynamoStore, table: &str, game: &str, count: usize) {
    for chunk in items(game, count).chunks(25) {
        let requests = chunk.iter().cloned().map(WriteRequest::Put).collect();
        let unprocessed = store.batch_write(table, requests).await.expect("seed");
        assert!(unprocessed.is_empty());
    }
}

async fn all_items(store: &DynamoStore, table: &str) -> Vec<TestObject> {
    let page = store
        .scan(table, &Projection::FullItem, 1000, None)
        .await
        .expect("scan");
    let mut objects: Vec<TestObject> = page.items.into_iter().map(TestObject::from_item).collect();
    objects.sort_by(|a, b| (&a.game, &a.age).cmp(&(&b.game, &b.age)));
    objects
}

#[tokio::test]
#[serial]
#[ignore = "requires LocalStack"]
async fn test_describe_key_schema() {
    let store = DynamoStore::connect(None).await;
    let table = fresh_table(&store, "schema").await;

    let schema = store.describe_key_schema(&table).await.unwrap();
    assert_eq!(schema, key_schema());

    let err = store
        .describe_key_schema("tests_replicate_does_not_exist")
        .await
        .unwrap_err();
    assert!(err.is_schema_unavailable());
}

#[tokio::test]
#[serial]
#[ignore = "requires LocalStack"]
async fn test_migrate_copies_every_page() {
    let store = DynamoStore::connect(None).await;
    let source = fresh_table(&store, "src").await;
    let destination = fresh_table(&store, "dst").await;
    seed(&store, &source, "copy", 60).await;

    let policy = RetryPolicy {
        scan_page_size: 7,
        ..RetryPolicy::default()
    };
    let replicator = Replicator::new(store, policy);
    let job = ReplicationJob::new(&source, &destination).with_migrate(true);
    let report = replicator.run(&job).await.unwrap();

    let migrate = report.migrate.unwrap();
    assert_eq!(migrate.items_scanned, 60);
    assert!(migrate.pages >= 9);
    assert_eq!(
        all_items(replicator.store(), &destination).await,
        objects("copy", 60)
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires LocalStack"]
async fn test_cleanup_then_migrate_replaces_destination() {
    let store = DynamoStore::connect(None).await;
    let source = fresh_table(&store, "src").await;
    let destination = fresh_table(&store, "dst").await;
    seed(&store, &source, "fresh", 3).await;
    seed(&store, &destination, "stale", 30).await;

    let replicator = Replicator::new(store, RetryPolicy::default());
    let job = ReplicationJob::new(&source, &destination)
        .with_cleanup(true)
        .with_migrate(true);
    let report = replicator.run(&job).await.unwrap();

    assert_eq!(report.items_dropped(), 0);
    assert_eq!(report.cleanup.unwrap().items_written, 30);
    assert_eq!(
        all_items(replicator.store(), &destination).await,
        objects("fresh", 3)
    );
}
