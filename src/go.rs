//! The process-wide [Dispatcher] behind [go()].
//!
//! It is created with [DispatcherConfig::default()] on first use, unless [init()] installed
//! another config before. There is no exit hook: call [shutdown()] (or [shutdown_timeout()])
//! before the process exits to let in-flight tasks finish.

use crate::dispatch::{Dispatcher, DispatcherConfig};
use lazy_static::lazy_static;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

lazy_static! {
    static ref GLOBAL: Mutex<Option<Dispatcher>> = Mutex::new(None);
}

/// Install the process-wide dispatcher with `config`.
///
/// Returns false (and changes nothing) if it already exists.
pub fn init(config: DispatcherConfig) -> bool {
    let mut global = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    if global.is_some() {
        return false;
    }
    log::debug!("init dispatcher {:?}", config);
    global.replace(Dispatcher::new(config));
    true
}

/// Handle to the process-wide dispatcher, created on first use.
pub fn dispatcher() -> Dispatcher {
    let mut global = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    global.get_or_insert_with(Dispatcher::default).clone()
}

/// Run `task` concurrently on the process-wide dispatcher, without waiting for it.
///
/// Compose with a [crate::Channel] or a wait group to learn when it finished.
///
/// # Panics
///
/// Panics if the OS fails to create a worker thread, use [try_go()] to handle that.
pub fn go<F>(task: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = try_go(task) {
        panic!("go: failed to dispatch task: {}", e);
    }
}

/// Like [go()], returns the error instead of panicking.
pub fn try_go<F>(task: F) -> io::Result<()>
where
    F: FnOnce() + Send + 'static,
{
    // Spawn under the lock, so a concurrent shutdown() never closes the dispatcher in between.
    let mut global = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    global.get_or_insert_with(Dispatcher::default).spawn(task)
}

/// Tear down the process-wide dispatcher, waiting for queued and running tasks.
///
/// A later [go()] creates a fresh dispatcher.
pub fn shutdown() {
    let current = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(current) = current {
        current.shutdown();
    }
}

/// Like [shutdown()], abandons tasks still running after `timeout`.
///
/// Returns false if tasks were abandoned.
pub fn shutdown_timeout(timeout: Duration) -> bool {
    let current = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner).take();
    match current {
        Some(current) => current.shutdown_timeout(timeout),
        None => true,
    }
}
