use std::time::{Duration, Instant};

use coresql::test_utils::{MemoryAgent, RESERVED_TABLE_NAMES, Truncator, init_test_tracing};
use coresql::{DbError, TruncateConfig};

#[tokio::test(flavor = "multi_thread")]
async fn test_full_reset_between_test_cases() {
    init_test_tracing();

    let agent = MemoryAgent::new()
        .with_table("markets", 3)
        .with_table("products", 7)
        .with_table("ingredients", 1)
        .with_table("schema_migrations", 4)
        .with_table("schema_lock", 1);
    let truncator = Truncator::new(agent.clone());

    truncator.truncate_all().await.unwrap();

    assert_eq!(agent.row_count("markets"), Some(0));
    assert_eq!(agent.row_count("products"), Some(0));
    assert_eq!(agent.row_count("ingredients"), Some(0));

    // Migration bookkeeping survives a full reset.
    for reserved in RESERVED_TABLE_NAMES {
        assert_ne!(agent.row_count(reserved), Some(0));
    }

    // A second reset over already-empty tables is also fine.
    truncator.truncate_all().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failing_table_aborts_the_batch_within_deadline() {
    init_test_tracing();

    let config = TruncateConfig { deadline_ms: 500 };
    let agent = MemoryAgent::new()
        .with_table("markets", 3)
        .with_table("slow", 2)
        .hanging_table("slow");
    let truncator = Truncator::with_config(agent, config.clone());

    let start = Instant::now();
    let err = truncator
        .truncate_tables(["markets", "missing_table", "slow"])
        .await
        .unwrap_err();

    // The missing table fails immediately and wins over the hung statement.
    assert!(matches!(err, DbError::Database(_)));
    assert!(start.elapsed() < config.deadline() + Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_must_truncate_tables_for_test_setup() {
    init_test_tracing();

    let agent = MemoryAgent::new().with_table("markets", 3);
    let truncator = Truncator::new(agent.clone());

    truncator.must_truncate_tables(["markets"]).await;

    assert_eq!(agent.row_count("markets"), Some(0));
}
