//! # gochan
//!
//! Go-style concurrency for threads: closable bounded channels, `select` with timeout and
//! default cases, and `go()` to fire off a task.
//!
//! Everything here works in blocking context. Waiting is done on condition variables, and
//! every wait a select may abandon can be cancelled through a [CancelToken].
//!
//! ## APIs
//!
//! ### Channel
//!
//! [Channel] is a bounded FIFO (capacity >= 1) that any number of threads may send into and
//! receive from through cloned handles.
//!
//! * [Channel::send()] blocks while full, [Channel::recv()] blocks while empty.
//!
//! * [Channel::close()] is idempotent. After close, sending fails with [SendError::Closed], while
//! receivers keep draining buffered messages until [RecvError::Closed].
//!
//! * [Channel::has_space()] and [Channel::has_next()] wait for readiness without touching the queue.
//!
//! * `for msg in &ch` iterates until the channel is closed and drained.
//!
//! [InputChannel] and [OutputChannel] are for writing code generic over one side of a channel.
//!
//! ### Select
//!
//! [select()] builds a [Selector] out of receive cases, send cases, timeout cases and an optional
//! default. [Selector::run()] runs exactly one of them: the default when nothing is ready at
//! start, otherwise the first case to complete. Cases that lose never run their callback, and
//! never receive or send their message.
//!
//! ### go
//!
//! [go()] submits a task to the process-wide [Dispatcher], which starts a worker thread whenever
//! no idle one is available, so blocked tasks never hold up others. Call [go::shutdown()] before
//! exit to let in-flight tasks finish.
//!
//! ### Error types
//!
//! [SendError], [TrySendError], [RecvError], [TryRecvError], and [InvalidArgument] for a zero capacity.
//!
//! ## Usage
//!
//! Cargo.toml:
//! ```toml
//! [dependencies]
//! gochan = "0.1"
//! ```
//! example:
//!
//! ```rust
//! use gochan::*;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! let jobs = Channel::<usize>::new(100).unwrap();
//! let results = Channel::<usize>::new(100).unwrap();
//! for _ in 0..4 {
//!     let (jobs, results) = (jobs.clone(), results.clone());
//!     go(move || {
//!         for job in &jobs {
//!             let _ = results.send(job * 2);
//!         }
//!     });
//! }
//! for i in 0..10 {
//!     jobs.send(i).unwrap();
//! }
//! jobs.close();
//!
//! let total = Arc::new(AtomicUsize::new(0));
//! for _ in 0..10 {
//!     let _total = total.clone();
//!     select()
//!         .add_recv(&results, move |v| {
//!             _total.fetch_add(v, Ordering::SeqCst);
//!         })
//!         .add_timeout(Duration::from_secs(5), || panic!("workers stuck"))
//!         .run();
//! }
//! assert_eq!(total.load(Ordering::SeqCst), 90);
//! ```

extern crate crossbeam;

mod cancel;
pub use cancel::CancelToken;

mod error;
pub use error::*;

mod channel;
pub use channel::{Channel, IntoIter, Iter};

mod input;
pub use input::*;
mod output;
pub use output::*;

mod dispatch;
pub use dispatch::{Dispatcher, DispatcherConfig};

/// The process-wide dispatcher
pub mod go;
pub use go::go;

mod select;
pub use select::{select, Selected, Selector};

#[cfg(test)]
mod tests;
