use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use crate::errors::GenerationError;
use crate::progress::ProgressReporter;

/// Options for a bounded-concurrency batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of in-flight operations.
    pub concurrency: usize,
    /// Delay between successive task submissions (staggering).
    pub item_delay: Option<Duration>,
    /// Keep going after per-item failures.
    pub continue_on_error: bool,
    /// Reassemble results into input order even though execution interleaves.
    pub preserve_order: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            item_delay: None,
            continue_on_error: true,
            preserve_order: false,
        }
    }
}

/// Partial results of a batch: per-item failures never abort the batch.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub failure_count: usize,
}

impl<T> BatchOutcome<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            failure_count: 0,
        }
    }
}

/// Split items into fixed-size chunks; the last chunk may be shorter.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    if size == 0 {
        return vec![items.to_vec()];
    }
    items.chunks(size).map(<[T]>::to_vec).collect()
}

/// Run `op` over `items` with at most `opts.concurrency` in flight.
///
/// Failures are logged and counted, not propagated; retry, when wanted,
/// belongs inside `op` (the generators run their calls through an
/// `ExecutionGuard`).
pub async fn run_concurrent<I, T, F, Fut>(
    label: &str,
    items: Vec<I>,
    opts: BatchOptions,
    op: F,
) -> BatchOutcome<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, GenerationError>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return BatchOutcome::empty();
    }

    let semaphore = Arc::new(Semaphore::new(opts.concurrency.max(1)));
    let progress = Arc::new(ProgressReporter::new(label, total));
    let op = Arc::new(op);
    let mut tasks: JoinSet<(usize, Result<T, GenerationError>)> = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        if index > 0 {
            if let Some(delay) = opts.item_delay {
                tokio::time::sleep(delay).await;
            }
        }
        let semaphore = Arc::clone(&semaphore);
        let op = Arc::clone(&op);
        tasks.spawn(async move {
            // Closing the semaphore is the abort path; a closed acquire
            // surfaces as a circuit-open-like skip, never a panic.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        index,
                        Err(GenerationError::Validation("batch aborted".to_string())),
                    );
                }
            };
            (index, op(item).await)
        });
    }

    let mut slots: Vec<Option<T>> = Vec::new();
    if opts.preserve_order {
        slots.resize_with(total, || None);
    }
    let mut unordered = Vec::new();
    let mut failure_count = 0;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(value))) => {
                progress.success();
                if opts.preserve_order {
                    slots[index] = Some(value);
                } else {
                    unordered.push(value);
                }
            }
            Ok((index, Err(err))) => {
                progress.failure();
                failure_count += 1;
                if err.is_circuit_open() {
                    warn!(batch = %label, index, "circuit open, item rejected before reaching the remote");
                } else {
                    warn!(batch = %label, index, error = %err, "batch item failed");
                }
                if !opts.continue_on_error {
                    tasks.abort_all();
                    break;
                }
            }
            Err(join_err) => {
                if join_err.is_cancelled() {
                    continue;
                }
                progress.failure();
                failure_count += 1;
                warn!(batch = %label, error = %join_err, "batch task panicked");
            }
        }
    }
    progress.finish();

    let results = if opts.preserve_order {
        slots.into_iter().flatten().collect()
    } else {
        unordered
    };
    BatchOutcome {
        results,
        failure_count,
    }
}

/// Run `op` over `0..count` one at a time, swallowing per-item failures so
/// one failing item doesn't abort the rest.
pub async fn run_sequential<T, F, Fut>(label: &str, count: usize, mut op: F) -> BatchOutcome<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, GenerationError>>,
{
    let progress = ProgressReporter::new(label, count);
    let mut results = Vec::with_capacity(count);
    let mut failure_count = 0;

    for index in 0..count {
        match op(index).await {
            Ok(value) => {
                progress.success();
                results.push(value);
            }
            Err(err) => {
                progress.failure();
                failure_count += 1;
                if err.is_circuit_open() {
                    warn!(batch = %label, index, "circuit open, item rejected before reaching the remote");
                } else {
                    warn!(batch = %label, index, error = %err, "item failed");
                }
            }
        }
    }
    progress.finish();

    BatchOutcome {
        results,
        failure_count,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn partial_failure_returns_remaining_results() {
        let items: Vec<usize> = (0..10).collect();
        let outcome = run_concurrent(
            "test",
            items,
            BatchOptions {
                concurrency: 3,
                ..BatchOptions::default()
            },
            |i| async move {
                if i == 2 || i == 5 {
                    Err(GenerationError::Validation(format!("item {i}")))
                } else {
                    Ok(i)
                }
            },
        )
        .await;

        assert_eq!(outcome.results.len(), 8);
        assert_eq!(outcome.failure_count, 2);
    }

    #[tokio::test]
    async fn preserve_order_reassembles_input_order() {
        let items: Vec<usize> = (0..20).collect();
        let outcome = run_concurrent(
            "test",
            items,
            BatchOptions {
                concurrency: 8,
                preserve_order: true,
                ..BatchOptions::default()
            },
            |i| async move {
                // Later items finish earlier.
                tokio::time::sleep(Duration::from_millis((20 - i as u64) % 7)).await;
                Ok(i)
            },
        )
        .await;

        assert_eq!(outcome.results, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..12).collect();
        let (in_flight_op, peak_op) = (Arc::clone(&in_flight), Arc::clone(&peak));

        run_concurrent(
            "test",
            items,
            BatchOptions {
                concurrency: 3,
                ..BatchOptions::default()
            },
            move |_| {
                let in_flight = Arc::clone(&in_flight_op);
                let peak = Arc::clone(&peak_op);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn sequential_swallows_failures() {
        let outcome = run_sequential("test", 4, |i| async move {
            if i == 1 {
                Err(GenerationError::Validation("boom".into()))
            } else {
                Ok(i)
            }
        })
        .await;
        assert_eq!(outcome.results, vec![0, 2, 3]);
        assert_eq!(outcome.failure_count, 1);
    }

    #[tokio::test]
    async fn circuit_open_rejections_count_as_failures() {
        let outcome = run_sequential("test", 3, |i| async move {
            if i == 0 {
                Err(GenerationError::CircuitOpen {
                    operation: "create account".to_string(),
                })
            } else {
                Ok(i)
            }
        })
        .await;
        assert_eq!(outcome.results, vec![1, 2]);
        assert_eq!(outcome.failure_count, 1);
    }

    #[test]
    fn chunk_sizes() {
        let items: Vec<u32> = (0..7).collect();
        let chunks = chunk(&items, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], vec![6]);
    }
}
