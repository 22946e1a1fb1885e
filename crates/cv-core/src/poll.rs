//! Poll-until-terminal loop for long-running jobs on the endpoint side.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Give up once this much time has passed without a terminal state.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError<E> {
    #[error("polling failed: {0}")]
    Failed(E),

    #[error("polling cancelled")]
    Cancelled,

    #[error("no terminal state within {}s", .0.as_secs())]
    DeadlineExceeded(Duration),
}

/// Calls `poll` every `policy.interval` until `is_terminal` accepts the state it returns.
pub async fn poll_until<T, E, F, Fut, P>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut poll: F,
    is_terminal: P,
) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled);
        }

        let state = poll().await.map_err(PollError::Failed)?;
        polls += 1;
        if is_terminal(&state) {
            debug!(polls, elapsed_ms = started.elapsed().as_millis() as u64, "operation reached a terminal state");
            return Ok(state);
        }

        if let Some(limit) = policy.deadline {
            if started.elapsed() >= limit {
                return Err(PollError::DeadlineExceeded(limit));
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counter_poll(
        calls: &Arc<AtomicU32>,
        done_at: u32,
    ) -> impl FnMut() -> std::future::Ready<Result<u32, String>> {
        let calls = calls.clone();
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if n > 100 { Err("gone".to_string()) } else { Ok(n.min(done_at)) })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal() {
        let calls = Arc::new(AtomicU32::new(0));
        let start = Instant::now();

        let state = poll_until(&PollPolicy::default(), &CancellationToken::new(), counter_poll(&calls, 3), |n| *n == 3).await;

        assert_eq!(state, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            deadline: Some(Duration::from_secs(25)),
        };

        let state = poll_until(&policy, &CancellationToken::new(), counter_poll(&calls, u32::MAX), |_| false).await;

        assert_eq!(state, Err(PollError::DeadlineExceeded(Duration::from_secs(25))));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_stops_loop() {
        let calls = Arc::new(AtomicU32::new(100));

        let state = poll_until(&PollPolicy::default(), &CancellationToken::new(), counter_poll(&calls, 1), |_| false).await;

        assert_eq!(state, Err(PollError::Failed("gone".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            trigger.cancel();
        });

        let state = poll_until(&PollPolicy::default(), &cancel, counter_poll(&calls, u32::MAX), |_| false).await;

        assert_eq!(state, Err(PollError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
