//! Blocking-task executor boundary.
//!
//! Synchronous implementations must never run on a transport or
//! event-loop thread, so the bridge hands their work to an externally
//! owned executor through the [`BlockingExecutor`] trait. The core only
//! submits units of work; pool sizing, bounds, and shutdown belong to
//! the owner of the executor.
//!
//! [`TokioBlockingExecutor`] is the production implementation.

/// Submission surface of the shared blocking-task executor.
///
/// The contract is minimal: submit a unit of work, it runs asynchronously
/// off the caller's thread, and no ordering is guaranteed relative to
/// other submissions.
pub trait BlockingExecutor: Send + Sync {
    /// Submit one unit of blocking work.
    fn submit(&self, work: Box<dyn FnOnce() + Send + 'static>);
}

/// Production executor backed by `tokio::task::spawn_blocking`.
///
/// Must be used from within a Tokio runtime. The join handle is dropped:
/// the unit of work reports its outcome through the call's reply, never
/// through the executor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBlockingExecutor;

impl BlockingExecutor for TokioBlockingExecutor {
    fn submit(&self, work: Box<dyn FnOnce() + Send + 'static>) {
        let _ = tokio::task::spawn_blocking(work);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tokio_executor_runs_work_off_caller_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = tokio::sync::oneshot::channel();

        TokioBlockingExecutor.submit(Box::new(move || {
            let _ = tx.send(std::thread::current().id() != caller);
        }));

        let off_thread = rx.await.expect("work ran");
        assert!(off_thread, "blocking work must not run on the caller thread");
    }

    #[tokio::test]
    async fn test_tokio_executor_runs_all_submissions() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();
        let (tx, rx) = tokio::sync::oneshot::channel();

        TokioBlockingExecutor.submit(Box::new(move || {
            ran_clone.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        }));

        rx.await.expect("work ran");
        assert!(ran.load(Ordering::SeqCst));
    }
}
