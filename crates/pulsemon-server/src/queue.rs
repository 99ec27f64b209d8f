//! Execution queue decoupling scheduler ticks from check execution.
//!
//! A bounded channel: a full queue exerts backpressure on producers rather
//! than rejecting jobs. Enqueue failures (receiver gone, or backpressure
//! outlasting the send timeout) are retried with exponential backoff and
//! surfaced as errors, never silently dropped.

use anyhow::Result;
use pulsemon_common::types::ExecutionJob;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Tries per enqueue before giving up.
const ENQUEUE_ATTEMPTS: u32 = 3;
/// Upper bound on how long one enqueue attempt may block on backpressure.
const ENQUEUE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ExecutionQueue {
    tx: mpsc::Sender<ExecutionJob>,
}

impl ExecutionQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ExecutionJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueues one execution job, retrying with backoff when the queue is
    /// unavailable or saturated beyond the per-attempt timeout.
    pub async fn enqueue(&self, job: ExecutionJob) -> Result<()> {
        for attempt in 0..ENQUEUE_ATTEMPTS {
            match tokio::time::timeout(ENQUEUE_ATTEMPT_TIMEOUT, self.tx.send(job.clone())).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(_)) => {
                    tracing::error!(
                        monitor_id = %job.monitor_id,
                        attempt = attempt + 1,
                        "Execution queue is closed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        monitor_id = %job.monitor_id,
                        attempt = attempt + 1,
                        "Execution queue saturated, backing off"
                    );
                }
            }
            if attempt + 1 < ENQUEUE_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
        }
        anyhow::bail!(
            "failed to enqueue execution job for monitor {} after {ENQUEUE_ATTEMPTS} attempts",
            job.monitor_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_and_receive_preserves_job_fields() {
        let (queue, mut rx) = ExecutionQueue::new(4);
        queue.enqueue(ExecutionJob::new("mon-1")).await.unwrap();

        let job = rx.recv().await.unwrap();
        assert_eq!(job.monitor_id, "mon-1");
        assert_eq!(job.attempt, 0);
    }

    #[tokio::test]
    async fn enqueue_fails_loudly_when_queue_closed() {
        let (queue, rx) = ExecutionQueue::new(4);
        drop(rx);
        let err = queue.enqueue(ExecutionJob::new("mon-1")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn retry_job_increments_attempt() {
        let job = ExecutionJob::new("mon-2");
        let retried = job.retry();
        assert_eq!(retried.attempt, 1);
        assert_eq!(retried.retry().attempt, 2);
        assert_eq!(retried.monitor_id, "mon-2");
    }
}
