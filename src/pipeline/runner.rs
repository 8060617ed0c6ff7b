//! Fan-out/gather execution of one unit per item.

use crate::error::{ReleaseError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs a unit of work for every item concurrently and gathers the results.
///
/// Every item is attempted: a failing unit never cancels its siblings.
/// Once all units have finished, the results come back in item order, or
/// the first error (in item order) is returned and the rest are logged.
#[derive(Debug, Clone)]
pub struct ParallelRunner {
    limit: Option<Arc<Semaphore>>,
}

impl Default for ParallelRunner {
    fn default() -> Self {
        Self::bounded(num_cpus::get().max(1) * 2)
    }
}

impl ParallelRunner {
    /// One task per item, no upper bound
    pub fn unbounded() -> Self {
        Self { limit: None }
    }

    /// At most `max` units in flight at once
    pub fn bounded(max: usize) -> Self {
        Self {
            limit: Some(Arc::new(Semaphore::new(max.max(1)))),
        }
    }

    /// Apply `unit` to every item and wait for all of them.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, unit: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let total = items.len();
        let unit = Arc::new(unit);
        let mut set = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let unit = Arc::clone(&unit);
            let limit = self.limit.clone();
            set.spawn(async move {
                let result = async {
                    let _permit = match limit {
                        Some(semaphore) => Some(
                            semaphore
                                .acquire_owned()
                                .await
                                .map_err(|e| ReleaseError::Task(e.to_string()))?,
                        ),
                        None => None,
                    };
                    unit(item).await
                }
                .await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
        let mut join_failures = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => join_failures.push(e.to_string()),
            }
        }

        if !join_failures.is_empty() {
            return Err(ReleaseError::Task(join_failures.join("; ")));
        }

        let mut results = Vec::with_capacity(total);
        let mut first_error = None;
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(value)) => results.push(value),
                Some(Err(e)) if first_error.is_none() => first_error = Some(e),
                Some(Err(e)) => log::error!("unit #{index} also failed: {e}"),
                None => {
                    return Err(ReleaseError::Task(format!("unit #{index} produced no result")));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

/// Aggregate per-unit status codes; any non-zero unit makes the sum non-zero
pub fn sum_codes(codes: &[i32]) -> i32 {
    codes.iter().fold(0i32, |acc, code| acc.saturating_add(*code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_units_run_and_codes_sum() {
        let executed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executed);

        let codes = ParallelRunner::unbounded()
            .run(vec![0, 0, 400, 0], move |code: i32| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(code)
                }
            })
            .await
            .expect("no unit faults");

        assert_eq!(executed.load(Ordering::SeqCst), 4);
        assert_eq!(codes, vec![0, 0, 400, 0]);
        assert_eq!(sum_codes(&codes), 400);
    }

    #[tokio::test]
    async fn test_results_keep_item_order() {
        let results = ParallelRunner::unbounded()
            .run(vec![30u64, 0, 15], |delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(delay)
            })
            .await
            .expect("no unit faults");

        assert_eq!(results, vec![30, 0, 15]);
    }

    #[tokio::test]
    async fn test_fault_does_not_cancel_siblings() {
        let executed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&executed);

        let result = ParallelRunner::bounded(2)
            .run(vec![1, 2, 3, 4, 5], move |n: i32| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    if n == 2 {
                        return Err(ReleaseError::Cli(CliError::InvalidArguments {
                            reason: format!("unit {n} failed"),
                        }));
                    }
                    Ok(0)
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(executed.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_bounded_limits_in_flight_units() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (flight, high) = (Arc::clone(&in_flight), Arc::clone(&peak));

        ParallelRunner::bounded(2)
            .run((0..6).collect::<Vec<_>>(), move |_: i32| {
                let (flight, high) = (Arc::clone(&flight), Arc::clone(&high));
                async move {
                    let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .expect("no unit faults");

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_unit_is_reported() {
        let result = ParallelRunner::unbounded()
            .run(vec![1, 2], |n: i32| async move {
                if n == 2 {
                    panic!("unit exploded");
                }
                Ok::<i32, ReleaseError>(n)
            })
            .await;

        assert!(matches!(result, Err(ReleaseError::Task(_))));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results: Vec<i32> = ParallelRunner::default()
            .run(Vec::<i32>::new(), |n| async move { Ok(n) })
            .await
            .expect("nothing to run");
        assert!(results.is_empty());
    }

    #[test]
    fn test_sum_codes() {
        assert_eq!(sum_codes(&[]), 0);
        assert_eq!(sum_codes(&[0, 0, 0]), 0);
        assert_eq!(sum_codes(&[400, 0, 400]), 800);
    }
}
