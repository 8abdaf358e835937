//! Staggered concurrent request batches.
//!
//! Requests of one batch run as futures joined on the calling task. Request
//! `k` (0-based) sleeps `k × stagger` before it is fired, every request
//! settles before the batch yields, and results are restored to request
//! order by their tag. One failure fails the whole batch.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::debug;

/// A failed batch.
#[derive(Debug)]
pub struct BatchFailure<E> {
    /// Tag of the lowest-tagged failed request
    pub tag: usize,
    /// Error of that request
    pub error: E,
    /// Number of failed requests
    pub failed: usize,
    /// Number of requests in the batch
    pub total: usize,
}

impl<E: Display> Display for BatchFailure<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} requests failed (first at {}): {}",
            self.failed, self.total, self.tag, self.error
        )
    }
}

/// Run one request per tag with staggered start times.
///
/// `on_success` runs once for every request that completes successfully,
/// in completion order. The returned results are sorted by tag.
pub async fn run_staggered<T, E, F, Fut, P>(
    tags: Vec<usize>,
    stagger: Duration,
    request: F,
    on_success: P,
) -> Result<Vec<(usize, T)>, BatchFailure<E>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(usize),
{
    let total = tags.len();
    let request = &request;
    let on_success = &on_success;

    let futures = tags.into_iter().enumerate().map(|(slot, tag)| async move {
        let delay = stagger * slot as u32;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        debug!(tag, slot, "Firing batch request");

        let result = request(tag).await;
        if result.is_ok() {
            on_success(tag);
        }
        (tag, result)
    });

    let settled = join_all(futures).await;

    let mut successes = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for (tag, result) in settled {
        match result {
            Ok(value) => successes.push((tag, value)),
            Err(error) => failures.push((tag, error)),
        }
    }

    if !failures.is_empty() {
        let failed = failures.len();
        failures.sort_by_key(|(tag, _)| *tag);
        let (tag, error) = failures.swap_remove(0);
        return Err(BatchFailure {
            tag,
            error,
            failed,
            total,
        });
    }

    successes.sort_by_key(|(tag, _)| *tag);
    Ok(successes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_results_sorted_regardless_of_completion_order() {
        // Earlier tags take longer, so completion order is reversed
        let completed = Mutex::new(Vec::new());
        let results = run_staggered(
            vec![1, 2, 3, 4],
            Duration::from_millis(10),
            |tag| async move {
                tokio::time::sleep(Duration::from_millis(1000 - tag as u64 * 100)).await;
                Ok::<_, String>(tag * 10)
            },
            |tag| completed.lock().unwrap().push(tag),
        )
        .await
        .unwrap();

        assert_eq!(results, vec![(1, 10), (2, 20), (3, 30), (4, 40)]);
        assert_eq!(*completed.lock().unwrap(), vec![4, 3, 2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requests_are_staggered() {
        let start = Instant::now();
        let fired = Mutex::new(Vec::new());

        run_staggered(
            vec![0, 1, 2],
            Duration::from_millis(500),
            |tag| {
                fired.lock().unwrap().push((tag, start.elapsed()));
                async move { Ok::<_, String>(()) }
            },
            |_| {},
        )
        .await
        .unwrap();

        let fired = fired.lock().unwrap();
        assert_eq!(fired[0], (0, Duration::ZERO));
        assert_eq!(fired[1], (1, Duration::from_millis(500)));
        assert_eq!(fired[2], (2, Duration::from_millis(1000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failure_fails_batch_after_all_settle() {
        let settled = AtomicUsize::new(0);

        let failure = run_staggered(
            vec![1, 2, 3, 4, 5],
            Duration::from_millis(300),
            |tag| {
                let settled = &settled;
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    settled.fetch_add(1, Ordering::SeqCst);
                    if tag == 2 || tag == 4 {
                        Err(format!("request {tag} failed"))
                    } else {
                        Ok(tag)
                    }
                }
            },
            |_| {},
        )
        .await
        .unwrap_err();

        // Every request ran to completion before the failure was reported
        assert_eq!(settled.load(Ordering::SeqCst), 5);
        assert_eq!(failure.tag, 2);
        assert_eq!(failure.failed, 2);
        assert_eq!(failure.total, 5);
        assert_eq!(failure.error, "request 2 failed");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = run_staggered(
            Vec::new(),
            Duration::from_millis(300),
            |_| async { Ok::<(), String>(()) },
            |_| {},
        )
        .await
        .unwrap();
        assert!(results.is_empty());
    }
}
