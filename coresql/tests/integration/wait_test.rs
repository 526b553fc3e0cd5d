use std::time::{Duration, Instant};

use coresql::test_utils::{MemoryAgent, init_test_tracing};
use coresql::{DbError, WaitConfig, wait_for_connection};

fn quick_config() -> WaitConfig {
    WaitConfig {
        max_attempts: 5,
        cooldown_ms: 1,
        deadline_ms: 500,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_connects_once_database_comes_up() {
    init_test_tracing();

    let agent = MemoryAgent::new().failing_pings(3);

    wait_for_connection(&agent, &quick_config()).await.unwrap();

    assert_eq!(agent.ping_count(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_reports_attempt_limit_with_limit_in_message() {
    init_test_tracing();

    let agent = MemoryAgent::new().failing_pings(u32::MAX);

    let err = wait_for_connection(&agent, &quick_config())
        .await
        .unwrap_err();

    assert!(matches!(err, DbError::AttemptLimitExceeded(5)));
    assert_eq!(
        err.to_string(),
        "could not connect to database: attempt limit (5) exceeded"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_wait_deadline_preempts_hung_probe() {
    init_test_tracing();

    let agent = MemoryAgent::new().hanging_pings();
    let config = quick_config();

    let start = Instant::now();
    let err = wait_for_connection(&agent, &config).await.unwrap_err();

    assert!(matches!(err, DbError::WaitTimeout));
    assert_eq!(
        err.to_string(),
        "could not connect to database: timeout"
    );
    // Approximately the configured deadline, with scheduling slack.
    let elapsed = start.elapsed();
    assert!(elapsed >= config.deadline());
    assert!(elapsed < config.deadline() + Duration::from_secs(2));
}
