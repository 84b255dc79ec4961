//! Wait on several channel operations and timeouts, run exactly one of them.
//!
//! Each case is raced on its own worker from the process-wide dispatcher (see [crate::go()]).
//! The first case to complete its operation claims the select; the others are cancelled and
//! never run their callbacks, nor consume or deliver a message.
//!
//! ```rust
//! use gochan::{select, Channel, Selected};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use std::time::Duration;
//!
//! let ch = Channel::<i32>::make();
//! ch.send(1).unwrap();
//! let x = Arc::new(AtomicI32::new(0));
//! let (_x1, _x2) = (x.clone(), x.clone());
//! let selected = select()
//!     .add_recv(&ch, move |v| _x1.store(v, Ordering::SeqCst))
//!     .add_timeout(Duration::from_secs(1), move || _x2.store(2, Ordering::SeqCst))
//!     .run();
//! assert_eq!(selected, Selected::Case(0));
//! assert_eq!(x.load(Ordering::SeqCst), 1);
//! ```

mod case;
mod recv;
mod send;
mod timer;

use self::case::{Case, PanicSlot, RaceContext};
use self::recv::RecvCase;
use self::send::SendCase;
use self::timer::TimerCase;
use crate::cancel::CancelToken;
use crate::channel::Channel;
use crate::go::go;
use std::fmt;
use std::panic::resume_unwind;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Which branch of a [Selector] ran.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Selected {
    /// Index of the case, in the order the cases were added.
    Case(usize),
    Default,
}

/// Builder of one select operation, consumed by [Selector::run()].
///
/// Cases may be added in any order, it only matters for which ready case tends to win.
pub struct Selector {
    cases: Vec<Box<dyn Case>>,
    default: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Selector(cases={}, default={})", self.cases.len(), self.default.is_some())
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

/// Start building a [Selector]
#[inline]
pub fn select() -> Selector {
    Selector::new()
}

impl Selector {
    pub fn new() -> Self {
        Self { cases: Vec::new(), default: None }
    }

    /// Receive one message from `channel` and pass it to `callback`.
    ///
    /// A closed channel with nothing left to receive never wins.
    pub fn add_recv<T, F>(mut self, channel: &Channel<T>, callback: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        self.cases.push(Box::new(RecvCase { channel: channel.clone(), callback }));
        self
    }

    /// Send `message` into `channel`, then run `callback`.
    ///
    /// The message is only sent if this case wins. A closed channel never wins.
    pub fn add_send<T, F>(mut self, channel: &Channel<T>, message: T, callback: F) -> Self
    where
        T: Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        self.cases.push(Box::new(SendCase { channel: channel.clone(), message, callback }));
        self
    }

    /// Run `callback` once `delay` has elapsed, unless another case won before.
    ///
    /// A timer case occupies two threads until it fires or is cancelled, keep their number and
    /// delay small.
    pub fn add_timeout<F>(mut self, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.cases.push(Box::new(TimerCase { delay, callback }));
        self
    }

    /// Run `callback` instead, when no receive case has a message buffered and no send case has room
    /// at the time [Selector::run()] starts.
    ///
    /// Timer cases are not considered. Adding another default replaces the previous one.
    pub fn add_default<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.default = Some(Box::new(callback));
        self
    }

    /// Run the select, returning after the chosen callback has completed.
    ///
    /// Blocks forever when there is no default and no case can ever complete.
    ///
    /// # Panics
    ///
    /// A panic from the winning callback is resumed here.
    pub fn run(self) -> Selected {
        let Selector { cases, default } = self;
        if let Some(default) = default {
            // Point-in-time snapshot, a concurrent racer may change it right after.
            if !cases.iter().any(|case| case.is_ready()) {
                log::debug!("select: no case ready, run default");
                default();
                return Selected::Default;
            }
        }

        let report = Channel::<usize>::make();
        let claimed = Arc::new(AtomicBool::new(false));
        let panicked: PanicSlot = Arc::new(Mutex::new(None));
        let mut cancels = Vec::with_capacity(cases.len());
        for (index, case) in cases.into_iter().enumerate() {
            let cancel = CancelToken::new();
            cancels.push(cancel.clone());
            let ctx = RaceContext {
                index,
                claimed: claimed.clone(),
                report: report.clone(),
                cancel,
                panicked: panicked.clone(),
            };
            go(move || case.race(ctx));
        }

        let winner = match report.recv() {
            Ok(index) => index,
            Err(e) => unreachable!("select report channel: {}", e),
        };
        for (index, cancel) in cancels.iter().enumerate() {
            if index != winner {
                cancel.cancel();
            }
        }
        // Second report: the callback has finished
        if let Err(e) = report.recv() {
            unreachable!("select report channel: {}", e);
        }
        report.close();
        log::debug!("select: case {} done", winner);

        let payload = panicked.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(payload) = payload {
            resume_unwind(payload);
        }
        Selected::Case(winner)
    }
}
