use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Settings of a [Dispatcher]
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Worker threads are named `{name_prefix}-{seq}`.
    pub name_prefix: String,
    /// Stack size of worker threads, `None` for the platform default.
    ///
    /// Most tasks only block on channels, a small stack lets many of them wait cheaply.
    pub stack_size: Option<usize>,
    /// An idle worker exits after waiting this long for a task.
    pub keep_alive: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { name_prefix: "go-worker".to_string(), stack_size: None, keep_alive: Duration::from_secs(10) }
    }
}

#[derive(Default)]
struct PoolState {
    // Workers waiting for a task that no submitted task has counted on yet.
    idle: usize,
    live: usize,
}

struct DispatcherInner {
    config: DispatcherConfig,
    sender: Mutex<Option<Sender<Task>>>,
    recv: Receiver<Task>,
    state: Mutex<PoolState>,
    exited: Condvar,
    seq: AtomicUsize,
}

impl DispatcherInner {
    #[inline(always)]
    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pool of worker threads that runs fire-and-forget tasks.
///
/// Tasks are expected to spend most of their time blocked (on a [crate::Channel], a select
/// race or a timer), so the pool never lets a task wait for another one to finish:
/// when no idle worker is available a new thread is started. Idle workers are re-used and
/// retire after [DispatcherConfig::keep_alive].
///
/// Cloning gives another handle to the same pool.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.inner.state();
        write!(f, "Dispatcher(live={}, idle={})", state.live, state.idle)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        let (sender, recv) = channel::unbounded();
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                sender: Mutex::new(Some(sender)),
                recv,
                state: Mutex::new(PoolState::default()),
                exited: Condvar::new(),
                seq: AtomicUsize::new(0),
            }),
        }
    }

    /// Run `task` on a worker thread.
    ///
    /// Returns an error if the pool is shut down, or the OS refused to start a new thread.
    pub fn spawn<F>(&self, task: F) -> io::Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = {
            let guard = self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                Some(sender) => sender.clone(),
                None => {
                    log::warn!("dispatcher is shut down, task rejected");
                    return Err(io::Error::new(io::ErrorKind::Other, "dispatcher is shut down"));
                }
            }
        };
        let need_worker = {
            let mut state = self.inner.state();
            if state.idle > 0 {
                state.idle -= 1;
                false
            } else {
                state.live += 1;
                true
            }
        };
        if need_worker {
            if let Err(e) = self.start_worker() {
                let mut state = self.inner.state();
                state.live -= 1;
                self.inner.exited.notify_all();
                return Err(e);
            }
        }
        sender
            .send(Box::new(task))
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "dispatcher is shut down"))
    }

    fn start_worker(&self) -> io::Result<()> {
        let inner = self.inner.clone();
        let seq = inner.seq.fetch_add(1, Ordering::Relaxed);
        let name = format!("{}-{}", inner.config.name_prefix, seq);
        let mut builder = thread::Builder::new().name(name);
        if let Some(size) = inner.config.stack_size {
            builder = builder.stack_size(size);
        }
        builder.spawn(move || Self::worker_loop(inner)).map(|_| ())
    }

    fn worker_loop(inner: Arc<DispatcherInner>) {
        log::trace!("worker {:?} starting", thread::current().name());
        loop {
            match inner.recv.recv_timeout(inner.config.keep_alive) {
                Ok(task) => {
                    if catch_unwind(AssertUnwindSafe(task)).is_err() {
                        log::warn!("task panicked on worker {:?}", thread::current().name());
                    }
                    inner.state().idle += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    let mut state = inner.state();
                    // idle == 0 means every waiting worker is already counted on by a task.
                    if state.idle > 0 {
                        state.idle -= 1;
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        let mut state = inner.state();
        state.live -= 1;
        inner.exited.notify_all();
        log::trace!("worker {:?} exiting, {} left", thread::current().name(), state.live);
    }

    /// Number of worker threads alive, busy or idle.
    pub fn workers(&self) -> usize {
        self.inner.state().live
    }

    /// Stop accepting tasks, let queued and running tasks finish, and wait for every worker to exit.
    ///
    /// Must not be called from a task of this pool.
    pub fn shutdown(&self) {
        self.close();
        self.wait_exited(None);
    }

    /// Like [Dispatcher::shutdown()], but gives up waiting after `timeout`.
    ///
    /// A timeout too large to form a deadline waits without limit.
    /// Returns false if some tasks were still running, they are abandoned and keep their threads.
    pub fn shutdown_timeout(&self, timeout: Duration) -> bool {
        self.close();
        self.wait_exited(Instant::now().checked_add(timeout))
    }

    fn wait_exited(&self, deadline: Option<Instant>) -> bool {
        let mut state = self.inner.state();
        while state.live > 0 {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        log::warn!("dispatcher shutdown timed out, abandon {} workers", state.live);
                        return false;
                    }
                    state = self
                        .inner
                        .exited
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    state = self.inner.exited.wait(state).unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        log::debug!("dispatcher shut down");
        true
    }

    fn close(&self) {
        // Workers see disconnected once the queue is drained.
        self.inner.sender.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}
