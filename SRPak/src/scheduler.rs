//! Bounded task scheduler for extraction
//!
//! Tasks run on a dedicated rayon pool. A counting permit (a bounded
//! channel holding one token per task in flight) keeps the submitter from
//! running more than N tasks ahead. The first failure (or panic) trips a
//! [`CancelToken`]; tasks that have not started yet are skipped, tasks
//! already running finish, and the failure is reported once the scope
//! drains.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{Error, Result, ValidationError};

/// Minimum worker thread count
pub const MIN_THREADS: usize = 1;

/// Maximum worker thread count
pub const MAX_THREADS: usize = 50;

/// Worker thread count used when none is given
pub const DEFAULT_THREADS: usize = 10;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of a run where every task succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
}

/// Check a thread count against the supported range.
///
/// # Errors
/// Returns [`ValidationError::ThreadCount`] if `threads` is outside 1..=50.
pub fn validate_threads(threads: usize) -> Result<()> {
    if (MIN_THREADS..=MAX_THREADS).contains(&threads) {
        Ok(())
    } else {
        Err(ValidationError::ThreadCount {
            count: threads,
            min: MIN_THREADS,
            max: MAX_THREADS,
        }
        .into())
    }
}

/// Hands a permit back when a task ends, even by unwinding.
struct Permit<'a>(&'a crossbeam_channel::Receiver<()>);

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.0.recv();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs tasks with at most N in flight.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    limit: usize,
}

impl Scheduler {
    /// Build a scheduler with `threads` workers.
    ///
    /// # Errors
    /// Returns [`ValidationError::ThreadCount`] for an out-of-range count, or
    /// [`Error::Scheduler`] if the pool cannot be started.
    pub fn new(threads: usize) -> Result<Self> {
        validate_threads(threads)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("srpak-worker-{i}"))
            .build()
            .map_err(|e| Error::Scheduler(e.to_string()))?;
        Ok(Self {
            pool,
            limit: threads,
        })
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.limit
    }

    /// Run `task` once per item and wait for all of them.
    ///
    /// # Errors
    /// Returns [`Error::ExtractionAborted`] wrapping the first task error if
    /// any task failed. A panicking task counts as a failure and is reported
    /// as [`Error::TaskPanicked`].
    pub fn run<T, F>(&self, items: &[T], task: F) -> Result<RunSummary>
    where
        T: Sync,
        F: Fn(&T) -> Result<()> + Sync,
    {
        let total = items.len();
        let cancel = CancelToken::new();
        let first_error: Mutex<Option<Error>> = Mutex::new(None);
        let completed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let (permit_tx, permit_rx) = crossbeam_channel::bounded::<()>(self.limit);

        self.pool.in_place_scope(|scope| {
            for item in items {
                if cancel.is_cancelled() {
                    skipped.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
                // Blocks while `limit` tasks are in flight.
                if permit_tx.send(()).is_err() {
                    skipped.fetch_add(1, Ordering::SeqCst);
                    continue;
                }

                let (task, cancel, first_error) = (&task, &cancel, &first_error);
                let (completed, failed, skipped) = (&completed, &failed, &skipped);
                let permit_rx = &permit_rx;
                scope.spawn(move |_| {
                    let _permit = Permit(permit_rx);
                    if cancel.is_cancelled() {
                        skipped.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(item)))
                        .unwrap_or_else(|payload| {
                            Err(Error::TaskPanicked(panic_message(&*payload)))
                        });
                    match outcome {
                        Ok(()) => {
                            completed.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::SeqCst);
                            let mut slot =
                                first_error.lock().unwrap_or_else(PoisonError::into_inner);
                            if slot.is_none() {
                                tracing::error!("{e}");
                                *slot = Some(e);
                            } else {
                                tracing::debug!("additional failure after abort: {e}");
                            }
                            cancel.cancel();
                        }
                    }
                });
            }
        });

        let completed = completed.into_inner();
        match first_error
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
        {
            Some(source) => Err(Error::ExtractionAborted {
                total,
                failed: failed.into_inner(),
                completed,
                skipped: skipped.into_inner(),
                source: Box::new(source),
            }),
            None => Ok(RunSummary { total, completed }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;

    fn failure(i: usize) -> Error {
        Error::Io(std::io::Error::other(format!("task {i} failed")))
    }

    #[test]
    fn test_thread_bounds() {
        assert!(Scheduler::new(0).is_err());
        assert!(Scheduler::new(51).is_err());
        assert!(matches!(
            validate_threads(0),
            Err(Error::Validation(ValidationError::ThreadCount { count: 0, min: 1, max: 50 }))
        ));
        assert_eq!(Scheduler::new(1).unwrap().threads(), 1);
        assert_eq!(Scheduler::new(50).unwrap().threads(), 50);
    }

    #[test]
    fn test_all_tasks_run() {
        let scheduler = Scheduler::new(4).unwrap();
        let items: Vec<usize> = (0..100).collect();
        let sum = AtomicUsize::new(0);

        let summary = scheduler
            .run(&items, |&i| {
                sum.fetch_add(i, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert_eq!(summary, RunSummary { total: 100, completed: 100 });
        assert_eq!(sum.into_inner(), 4950);
    }

    #[test]
    fn test_in_flight_never_exceeds_limit() {
        let scheduler = Scheduler::new(3).unwrap();
        let items: Vec<usize> = (0..24).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        scheduler
            .run(&items, |_| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert!(peak.into_inner() <= 3);
    }

    #[test]
    fn test_single_thread_does_not_deadlock() {
        let scheduler = Scheduler::new(1).unwrap();
        let items = vec![(); 10];
        let summary = scheduler.run(&items, |()| Ok(())).unwrap();
        assert_eq!(summary.completed, 10);
    }

    #[test]
    fn test_first_error_skips_remaining() {
        let scheduler = Scheduler::new(1).unwrap();
        let items: Vec<usize> = (0..5).collect();

        let err = scheduler
            .run(&items, |&i| if i == 2 { Err(failure(i)) } else { Ok(()) })
            .unwrap_err();

        match err {
            Error::ExtractionAborted {
                total,
                failed,
                completed,
                skipped,
                source,
            } => {
                assert_eq!((total, failed, completed, skipped), (5, 1, 2, 2));
                assert_eq!(source.to_string(), "IO error: task 2 failed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_counts_add_up_under_parallel_failure() {
        let scheduler = Scheduler::new(8).unwrap();
        let items: Vec<usize> = (0..200).collect();

        let err = scheduler
            .run(&items, |&i| if i % 7 == 3 { Err(failure(i)) } else { Ok(()) })
            .unwrap_err();

        let Error::ExtractionAborted {
            total,
            failed,
            completed,
            skipped,
            ..
        } = err
        else {
            panic!("expected ExtractionAborted");
        };
        assert_eq!(total, 200);
        assert!(failed >= 1);
        assert_eq!(failed + completed + skipped, total);
    }

    #[test]
    fn test_panicking_task_aborts_run() {
        let scheduler = Scheduler::new(1).unwrap();
        let items = vec![0usize; 3];

        let err = scheduler.run(&items, |_| panic!("boom")).unwrap_err();

        match err {
            Error::ExtractionAborted {
                total,
                failed,
                completed,
                skipped,
                source,
            } => {
                assert_eq!((total, failed, completed, skipped), (3, 1, 0, 2));
                assert!(matches!(*source, Error::TaskPanicked(ref msg) if msg == "boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parallel_panic_counts_add_up() {
        let scheduler = Scheduler::new(2).unwrap();
        let items: Vec<usize> = (0..20).collect();

        let err = scheduler
            .run(&items, |&i| if i == 5 { panic!("task {i}") } else { Ok(()) })
            .unwrap_err();

        let Error::ExtractionAborted {
            total,
            failed,
            completed,
            skipped,
            source,
        } = err
        else {
            panic!("expected ExtractionAborted");
        };
        assert_eq!(failed, 1);
        assert_eq!(failed + completed + skipped, total);
        assert_eq!(source.to_string(), "task panicked: task 5");
    }
}
