//! Bounded-retry connection establishment.
//!
//! A supervisor loop launches connection probes one at a time against a shared
//! deadline. Probes are serialized through a single-slot admission gate so an
//! unreachable database is never hammered with concurrent pings, but each
//! probe runs in its own task so a hung probe cannot block deadline
//! observation. Coordination is purely message-passing: the gate is a
//! capacity-1 channel circulating exactly one token, and the token carries the
//! failed-attempt count.

use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{debug, info};

use crate::agent::SqlAgent;
use crate::config::WaitConfig;
use crate::error::{DbError, DbResult};

/// Blocks until the database behind `agent` answers a ping, the attempt limit
/// is exhausted, or the session deadline elapses.
///
/// Exactly one terminal outcome is produced:
/// - `Ok(())` once a probe succeeds within the deadline;
/// - [`DbError::AttemptLimitExceeded`] when `config.max_attempts` probes have
///   failed before the deadline;
/// - [`DbError::WaitTimeout`] when the deadline elapses first, regardless of
///   attempts remaining.
///
/// Attempt N+1 never starts before attempt N's outcome has been observed. On
/// deadline expiry any in-flight probe is abandoned rather than joined; its
/// late result is discarded because the session is already closed.
pub async fn wait_for_connection<A>(agent: &A, config: &WaitConfig) -> DbResult<()>
where
    A: SqlAgent,
{
    let deadline = Instant::now() + config.deadline();
    let cooldown = config.cooldown();
    let max_attempts = config.max_attempts;

    // The gate token carries the number of failed attempts so far. Capacity 1
    // means at most one token (and therefore one in-flight probe) exists.
    let (gate_tx, mut gate_rx) = mpsc::channel::<u32>(1);
    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);

    // The gate starts open with zero failed attempts recorded.
    let _ = gate_tx.try_send(0);

    let timeout = time::sleep_until(deadline);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            // Deadline expiry takes priority over a probe result that arrives
            // in the same instant.
            biased;

            _ = &mut timeout => {
                debug!("wait session deadline elapsed");
                return Err(DbError::WaitTimeout);
            }

            Some(()) = done_rx.recv() => {
                info!("database connection established");
                return Ok(());
            }

            Some(attempts) = gate_rx.recv() => {
                if attempts >= max_attempts {
                    return Err(DbError::AttemptLimitExceeded(max_attempts));
                }

                let agent = agent.clone();
                let gate_tx = gate_tx.clone();
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    match time::timeout_at(deadline, agent.ping()).await {
                        Ok(Ok(())) => {
                            // Discarded if the session already terminated.
                            let _ = done_tx.try_send(());
                        }
                        Ok(Err(err)) => {
                            debug!(attempt = attempts + 1, error = %err, "connection probe failed");
                            time::sleep(cooldown).await;
                            // Release the gate. The send fails silently when
                            // the supervisor has already returned.
                            let _ = gate_tx.try_send(attempts + 1);
                        }
                        Err(_) => {
                            // The probe outlived the session deadline; the
                            // supervisor is terminating on its own timer.
                            debug!(attempt = attempts + 1, "connection probe abandoned at deadline");
                        }
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_utils::MemoryAgent;

    fn fast_config() -> WaitConfig {
        WaitConfig {
            max_attempts: 60,
            cooldown_ms: 10,
            deadline_ms: 5000,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_succeeds_on_first_attempt() {
        let agent = MemoryAgent::new();

        let start = Instant::now();
        wait_for_connection(&agent, &fast_config()).await.unwrap();

        assert_eq!(agent.ping_count(), 1);
        // A first-attempt success needs no cooldown sleeps.
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_succeeds_after_k_attempts() {
        let agent = MemoryAgent::new().failing_pings(2);

        let start = Instant::now();
        wait_for_connection(&agent, &fast_config()).await.unwrap();

        // Success on attempt 3, with a cooldown after each of the 2 failures.
        assert_eq!(agent.ping_count(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_exhausts_attempt_limit() {
        let agent = MemoryAgent::new().failing_pings(u32::MAX);
        let config = fast_config();

        let err = wait_for_connection(&agent, &config).await.unwrap_err();

        assert!(matches!(err, DbError::AttemptLimitExceeded(60)));
        assert!(err.to_string().contains("60"));
        assert_eq!(agent.ping_count(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_on_hung_probe() {
        let agent = MemoryAgent::new().hanging_pings();
        let config = fast_config();

        let start = Instant::now();
        let err = wait_for_connection(&agent, &config).await.unwrap_err();

        assert!(matches!(err, DbError::WaitTimeout));
        assert_eq!(start.elapsed(), config.deadline());
        // The gate serializes probes, so the hung first probe is the only one.
        assert_eq!(agent.ping_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_discards_success_after_deadline() {
        let agent = MemoryAgent::new().ping_delay(Duration::from_secs(10));
        let config = fast_config();

        let err = wait_for_connection(&agent, &config).await.unwrap_err();
        assert!(matches!(err, DbError::WaitTimeout));

        // Let the abandoned probe run to completion; its late result must not
        // disturb anything.
        time::sleep(Duration::from_secs(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_attempt_limit_respects_small_limits() {
        let agent = MemoryAgent::new().failing_pings(u32::MAX);
        let config = WaitConfig {
            max_attempts: 3,
            cooldown_ms: 10,
            deadline_ms: 5000,
        };

        let err = wait_for_connection(&agent, &config).await.unwrap_err();

        assert!(matches!(err, DbError::AttemptLimitExceeded(3)));
        assert!(err.to_string().contains('3'));
        assert_eq!(agent.ping_count(), 3);
    }
}
