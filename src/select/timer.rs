use super::case::{Case, RaceContext};
use crate::go::go;
use crossbeam::channel::{after, bounded};
use std::time::Duration;

/// Fires after `delay`.
///
/// The deferred action runs on a separate worker, while the racing worker itself stays blocked
/// until the delay elapses or it is cancelled. Each timer case therefore holds two threads for
/// up to `delay`.
pub(crate) struct TimerCase<F> {
    pub delay: Duration,
    pub callback: F,
}

impl<F> Case for TimerCase<F>
where
    F: FnOnce() + Send + 'static,
{
    #[inline]
    fn is_ready(&self) -> bool {
        false
    }

    fn race(self: Box<Self>, ctx: RaceContext) {
        let TimerCase { delay, callback } = *self;
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let waiter = ctx.cancel.clone();
        let index = ctx.index;
        let deadline = after(delay);
        go(move || {
            let fire = crossbeam::select! {
                // Disconnected means the waiter saw the delay elapse, keep waiting for our deadline.
                recv(stop_rx) -> msg => msg.is_err() && deadline.recv().is_ok(),
                recv(deadline) -> _ => true,
            };
            if !fire {
                log::trace!("case {} timer stopped", ctx.index);
                return;
            }
            if ctx.claim() {
                log::trace!("case {} won timer", ctx.index);
                ctx.commit(callback);
                ctx.cancel.cancel();
            } else {
                log::trace!("case {} timer lost", ctx.index);
            }
        });
        if waiter.sleep(delay) {
            // Cancelled from outside, or by our own action after it ran; both are fine to stop.
            log::trace!("case {} timer waiter cancelled", index);
            let _ = stop_tx.send(());
        }
    }
}
