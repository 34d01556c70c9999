//! Retry Scheduler: periodically promotes due retry entries to the
//! ready stream via the atomic `promote_due` broker operation.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::metrics;
use crate::streams::Streams;

/// Default number of retry entries promoted per tick.
pub const BATCH_CAP: usize = 10;

pub struct RetryScheduler {
    streams: Streams,
    poll_interval: Duration,
}

impl RetryScheduler {
    pub fn new(streams: Streams, poll_interval: Duration) -> Self {
        Self {
            streams,
            poll_interval,
        }
    }

    /// Run the scheduler loop until `shutdown` is set.
    ///
    /// Multiple scheduler instances across multiple worker processes may run
    /// this loop concurrently; the broker's atomic `promote_due` guarantees
    /// each retry entry is promoted exactly once.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("retry scheduler starting");

        loop {
            if *shutdown.borrow() {
                info!("retry scheduler observed shutdown");
                break;
            }

            let now = chrono::Utc::now().timestamp();
            match self.streams.promote_due(now, BATCH_CAP).await {
                Ok(0) => {}
                Ok(count) => {
                    metrics::record_promoted(count);
                    info!(count, "promoted due retry entries to ready");
                }
                Err(e) => {
                    warn!(error = %e, "promote_due failed, continuing next tick");
                }
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("retry scheduler observed shutdown during tick sleep");
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("retry scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use test_utils::TestRedis;
    use uuid::Uuid;

    use super::*;

    async fn streams_on(redis: &TestRedis) -> Streams {
        let client = redis::Client::open(redis.connection_string().to_string())
            .expect("valid redis url");
        let conn = client
            .get_connection_manager()
            .await
            .expect("connect to test redis");
        Streams::new(conn, "ready", "retry", "dlq")
    }

    #[tokio::test]
    async fn promotes_only_entries_due_at_or_before_now() {
        let redis = TestRedis::new().await;
        let streams = streams_on(&redis).await;

        let now = chrono::Utc::now().timestamp();
        let due = Uuid::new_v4();
        let not_due = Uuid::new_v4();
        streams.retry_add(due, now - 5).await.unwrap();
        streams.retry_add(not_due, now + 3600).await.unwrap();

        let promoted = streams.promote_due(now, BATCH_CAP).await.unwrap();

        assert_eq!(promoted, 1);
        assert_eq!(streams.ready_depth().await.unwrap(), 1);
        assert_eq!(streams.retry_depth().await.unwrap(), 1);
    }

    // Property 5 (§8): the atomic script never promotes more than the
    // entries actually due, and a batch cap limits a single tick without
    // losing the remainder — the next tick picks it up.
    #[tokio::test]
    async fn batch_cap_spreads_a_large_promotion_across_ticks() {
        let redis = TestRedis::new().await;
        let streams = streams_on(&redis).await;

        let now = chrono::Utc::now().timestamp();
        for _ in 0..15 {
            streams.retry_add(Uuid::new_v4(), now - 1).await.unwrap();
        }

        let first_tick = streams.promote_due(now, BATCH_CAP).await.unwrap();
        assert_eq!(first_tick, BATCH_CAP);
        assert_eq!(streams.retry_depth().await.unwrap(), 5);
        assert_eq!(streams.ready_depth().await.unwrap(), BATCH_CAP as i64);

        let second_tick = streams.promote_due(now, BATCH_CAP).await.unwrap();
        assert_eq!(second_tick, 5);
        assert_eq!(streams.retry_depth().await.unwrap(), 0);
        assert_eq!(streams.ready_depth().await.unwrap(), 15);
    }

    #[tokio::test]
    async fn scheduler_run_stops_immediately_when_already_shut_down() {
        let redis = TestRedis::new().await;
        let streams = streams_on(&redis).await;
        let scheduler = RetryScheduler::new(streams, Duration::from_secs(30));

        let (_tx, rx) = watch::channel(true);
        let started = std::time::Instant::now();
        scheduler.run(rx).await;

        assert!(
            started.elapsed() < Duration::from_secs(1),
            "run() must observe shutdown at the loop head, not wait out a full tick"
        );
    }
}
