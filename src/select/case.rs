use crate::cancel::CancelToken;
use crate::channel::Channel;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub(crate) type PanicSlot = Arc<Mutex<Option<Box<dyn Any + Send + 'static>>>>;

/// What one racer shares with its [super::Selector].
pub(crate) struct RaceContext {
    pub index: usize,
    /// Single-winner flag of the select
    pub claimed: Arc<AtomicBool>,
    /// Capacity 1. The winner sends its index before and after the callback.
    pub report: Channel<usize>,
    pub cancel: CancelToken,
    pub panicked: PanicSlot,
}

impl RaceContext {
    /// Try to become the winner. Never blocks.
    #[inline(always)]
    pub fn claim(&self) -> bool {
        self.claimed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_ok()
    }

    /// Run the winner's callback between the two reports.
    ///
    /// A panic in `callback` is parked for the selector, so the second report is always sent.
    pub fn commit<F: FnOnce()>(&self, callback: F) {
        // The selector closes the report channel only after both reports arrived.
        if let Err(e) = self.report.send(self.index) {
            unreachable!("select report channel: {}", e);
        }
        if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
            log::debug!("case {} callback panicked", self.index);
            self.panicked.lock().unwrap_or_else(PoisonError::into_inner).replace(payload);
        }
        if let Err(e) = self.report.send(self.index) {
            unreachable!("select report channel: {}", e);
        }
    }
}

/// One branch of a select, raced on its own worker.
pub(crate) trait Case: Send + 'static {
    /// Snapshot for the default fast path: would this case complete right now.
    fn is_ready(&self) -> bool;

    /// Block until the operation can complete, claim, and run the callback if won.
    ///
    /// Returns without side effects when cancelled or when the claim is lost.
    fn race(self: Box<Self>, ctx: RaceContext);
}
