use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Something blocked in a wait that a [CancelToken] can knock loose.
pub(crate) trait Interrupt: Send + Sync {
    /// Wake every waiter so that it re-checks its predicate and the token.
    fn interrupt(&self);
}

/// Cooperative cancellation signal.
///
/// Blocking calls that accept a token (for example [crate::Channel::recv_cancellable()])
/// poll it on every wake up, and [CancelToken::cancel()] wakes the waits currently blocked on it.
/// Once cancelled, a token stays cancelled.
pub struct CancelToken(Arc<CancelInner>);

struct CancelInner {
    cancelled: AtomicBool,
    state: Mutex<Waiters>,
    sleepers: Condvar,
}

#[derive(Default)]
struct Waiters {
    seq: u64,
    targets: Vec<(u64, Arc<dyn Interrupt>)>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CancelToken(cancelled={})", self.is_cancelled())
    }
}

impl Clone for CancelToken {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(CancelInner {
            cancelled: AtomicBool::new(false),
            state: Mutex::new(Waiters::default()),
            sleepers: Condvar::new(),
        }))
    }

    #[inline(always)]
    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    ///
    /// Returns true if this call flipped the token, false when it was already cancelled.
    pub fn cancel(&self) -> bool {
        let _self = self.0.as_ref();
        if _self.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let targets = {
            let mut guard = _self.state.lock().unwrap_or_else(PoisonError::into_inner);
            _self.sleepers.notify_all();
            std::mem::take(&mut guard.targets)
        };
        // Must not hold our own lock while taking the waiters' locks.
        for (_seq, target) in targets {
            target.interrupt();
        }
        true
    }

    /// Sleep until `timeout` elapses or the token is cancelled.
    ///
    /// Returns true if woken by cancellation.
    pub fn sleep(&self, timeout: Duration) -> bool {
        let _self = self.0.as_ref();
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = _self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_cancelled() {
                return true;
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    guard = _self
                        .sleepers
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    guard = _self.sleepers.wait(guard).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Attach a wait we are about to block in. Detached when the guard drops.
    ///
    /// A waiter must check [CancelToken::is_cancelled()] under its own lock after registering,
    /// that closes the window between the check and the wait.
    pub(crate) fn register(&self, target: Arc<dyn Interrupt>) -> Registration<'_> {
        let mut guard = self.0.state.lock().unwrap_or_else(PoisonError::into_inner);
        guard.seq += 1;
        let seq = guard.seq;
        if !self.is_cancelled() {
            guard.targets.push((seq, target));
        }
        Registration { token: self, seq }
    }
}

pub(crate) struct Registration<'a> {
    token: &'a CancelToken,
    seq: u64,
}

impl<'a> Drop for Registration<'a> {
    fn drop(&mut self) {
        let mut guard = self.token.0.state.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = self.seq;
        guard.targets.retain(|(_seq, _)| *_seq != seq);
    }
}
