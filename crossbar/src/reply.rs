//! Single-assignment reply for one dispatched call.
//!
//! Every call gets exactly one reply, created as a promise/future pair by
//! [`reply_channel`]. The dispatch side completes or fails the
//! [`ReplyPromise`]; the transport awaits the [`ReplyFuture`] and encodes
//! whichever outcome it resolves to.
//!
//! The promise is a single-assignment cell: the first terminal transition
//! (`Pending → Completed` or `Pending → Failed`) wins, and every later
//! attempt is a silent no-op. This is what makes an externally imposed
//! timeout safe — a late async callback firing after the timeout already
//! failed the reply must not panic or overwrite the outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use serde_json::Value;

use crate::error::DispatchError;

/// Internal state of a reply. Guarded by a mutex so that completion
/// attempts racing from an async callback thread and a timeout task
/// observe one atomic terminal transition.
enum ReplyState {
    /// No terminal outcome yet; holds the consumer's waker if it polled.
    Pending { waker: Option<Waker> },
    /// The call produced a value.
    Completed(Value),
    /// The call failed with a dispatch error.
    Failed(DispatchError),
}

struct ReplyShared {
    state: Mutex<ReplyState>,
}

impl ReplyShared {
    /// A poisoned lock only means a completer panicked mid-transition;
    /// the state enum is always left valid, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, ReplyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, terminal: ReplyState) -> bool {
        let mut state = self.lock();
        match &mut *state {
            ReplyState::Pending { waker } => {
                let waker = waker.take();
                *state = terminal;
                drop(state);
                if let Some(waker) = waker {
                    waker.wake();
                }
                true
            }
            // Already terminal: late completion attempts are no-ops.
            _ => false,
        }
    }
}

/// Writer side of a reply.
///
/// Held by the dispatch path and by async completion callbacks. Cloning
/// shares the same underlying single-assignment cell, so any one clone
/// can deliver the terminal outcome.
#[derive(Clone)]
pub struct ReplyPromise {
    shared: Arc<ReplyShared>,
}

impl ReplyPromise {
    /// Complete the reply with a success value.
    ///
    /// Returns `true` if this call delivered the terminal outcome, or
    /// `false` if the reply was already terminal (no-op).
    pub fn complete(&self, value: Value) -> bool {
        self.shared.transition(ReplyState::Completed(value))
    }

    /// Fail the reply with a dispatch error.
    ///
    /// Returns `true` if this call delivered the terminal outcome, or
    /// `false` if the reply was already terminal (no-op).
    pub fn fail(&self, error: DispatchError) -> bool {
        self.shared.transition(ReplyState::Failed(error))
    }

    /// Whether the reply has reached a terminal state.
    ///
    /// The blocking invocation path checks this before doing any work so
    /// that a call abandoned by an external timeout is not executed.
    pub fn is_done(&self) -> bool {
        !matches!(*self.shared.lock(), ReplyState::Pending { .. })
    }
}

impl std::fmt::Debug for ReplyPromise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyPromise")
            .field("is_done", &self.is_done())
            .finish()
    }
}

/// Consumer side of a reply, awaited by the transport.
///
/// Resolves to the call's success value or its [`DispatchError`].
pub struct ReplyFuture {
    shared: Arc<ReplyShared>,
}

impl ReplyFuture {
    /// Whether the reply has reached a terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(*self.shared.lock(), ReplyState::Pending { .. })
    }
}

impl Future for ReplyFuture {
    type Output = Result<Value, DispatchError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        match &mut *state {
            ReplyState::Pending { waker } => {
                *waker = Some(cx.waker().clone());
                Poll::Pending
            }
            ReplyState::Completed(value) => Poll::Ready(Ok(value.clone())),
            ReplyState::Failed(error) => Poll::Ready(Err(error.clone())),
        }
    }
}

/// Create a linked promise/future pair for one call.
pub fn reply_channel() -> (ReplyPromise, ReplyFuture) {
    let shared = Arc::new(ReplyShared {
        state: Mutex::new(ReplyState::Pending { waker: None }),
    });
    (
        ReplyPromise {
            shared: shared.clone(),
        },
        ReplyFuture { shared },
    )
}
