use crate::cancel::{CancelToken, Interrupt};
pub use crate::error::*;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct State<T> {
    queue: VecDeque<T>,
    closed: bool,
}

impl<T> State<T> {
    #[inline(always)]
    fn is_full(&self, bound: usize) -> bool {
        self.queue.len() >= bound
    }
}

pub(crate) struct ChannelShared<T> {
    state: Mutex<State<T>>,
    // Blocked in send() / has_space()
    senders: Condvar,
    // Blocked in recv() / has_next()
    recvs: Condvar,
    pub bound_size: usize,
}

impl<T> ChannelShared<T> {
    fn new(bound_size: usize) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State { queue: VecDeque::with_capacity(bound_size), closed: false }),
            senders: Condvar::new(),
            recvs: Condvar::new(),
            bound_size,
        })
    }

    #[inline(always)]
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // No user code runs under this lock, a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wake up all rx
    #[inline(always)]
    fn on_send(&self) {
        self.recvs.notify_all();
    }

    /// Wake up all tx
    #[inline(always)]
    fn on_recv(&self) {
        self.senders.notify_all();
    }
}

impl<T: Send> Interrupt for ChannelShared<T> {
    fn interrupt(&self) {
        let _guard = self.lock();
        self.senders.notify_all();
        self.recvs.notify_all();
    }
}

/// A bounded, closable FIFO channel for blocking context.
///
/// `Channel` is a handle: cloning it gives another handle to the same queue,
/// so any number of threads may send and receive concurrently.
/// Dropping handles never closes the channel, call [Channel::close()] explicitly.
///
/// ```rust
/// use gochan::{go, Channel};
///
/// let ch = Channel::<i32>::new(10).unwrap();
/// let tx = ch.clone();
/// go(move || {
///     for i in 1..=10 {
///         tx.send(i).expect("open");
///     }
///     tx.close();
/// });
/// let sum: i32 = ch.iter().sum();
/// assert_eq!(sum, 55);
/// ```
pub struct Channel<T> {
    pub(crate) shared: Arc<ChannelShared<T>>,
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.shared.lock();
        write!(
            f,
            "Channel(len={}, bound={}, closed={})",
            state.queue.len(),
            self.shared.bound_size,
            state.closed
        )
    }
}

impl<T> Clone for Channel<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self { shared: self.shared.clone() }
    }
}

impl<T> Default for Channel<T> {
    /// Channel with capacity 1
    fn default() -> Self {
        Self { shared: ChannelShared::new(1) }
    }
}

impl<T> Channel<T> {
    /// Create a channel that buffers up to `capacity` messages.
    ///
    /// Returns Err([InvalidArgument]) when `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, InvalidArgument> {
        if capacity == 0 {
            return Err(InvalidArgument { capacity });
        }
        Ok(Self { shared: ChannelShared::new(capacity) })
    }

    /// Create a channel with capacity 1.
    #[inline]
    pub fn make() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn _send(&self, item: T, cancel: Option<&CancelToken>) -> Result<(), SendError<T>> {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        loop {
            if state.closed {
                return Err(SendError::Closed(item));
            }
            if !state.is_full(shared.bound_size) {
                break;
            }
            if cancel.map_or(false, |c| c.is_cancelled()) {
                return Err(SendError::Cancelled(item));
            }
            state = shared.senders.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state.queue.push_back(item);
        drop(state);
        shared.on_send();
        Ok(())
    }

    #[inline(always)]
    fn _recv(&self, cancel: Option<&CancelToken>) -> Result<T, RecvError> {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        loop {
            if let Some(item) = state.queue.pop_front() {
                drop(state);
                shared.on_recv();
                return Ok(item);
            }
            if state.closed {
                return Err(RecvError::Closed);
            }
            if cancel.map_or(false, |c| c.is_cancelled()) {
                return Err(RecvError::Cancelled);
            }
            state = shared.recvs.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    #[inline(always)]
    fn _has_space(&self, cancel: Option<&CancelToken>) -> bool {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        loop {
            if state.closed {
                return false;
            }
            if !state.is_full(shared.bound_size) {
                return true;
            }
            if cancel.map_or(false, |c| c.is_cancelled()) {
                return false;
            }
            state = shared.senders.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    #[inline(always)]
    fn _has_next(&self, cancel: Option<&CancelToken>) -> bool {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        loop {
            if !state.queue.is_empty() {
                return true;
            }
            if state.closed {
                return false;
            }
            if cancel.map_or(false, |c| c.is_cancelled()) {
                return false;
            }
            state = shared.recvs.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Send message. Will block when channel is full.
    ///
    /// Returns `Ok(())` on successful.
    ///
    /// Returns Err([SendError::Closed]) when the channel is closed, before or while waiting.
    #[inline]
    pub fn send(&self, item: T) -> Result<(), SendError<T>> {
        self._send(item, None)
    }

    /// Try to send message, non-blocking
    ///
    /// Returns Err([TrySendError::Full]) on channel full.
    ///
    /// Returns Err([TrySendError::Closed]) when the channel is closed.
    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        if state.closed {
            return Err(TrySendError::Closed(item));
        }
        if state.is_full(shared.bound_size) {
            return Err(TrySendError::Full(item));
        }
        state.queue.push_back(item);
        drop(state);
        shared.on_send();
        Ok(())
    }

    /// Receive message, will block when channel is empty.
    ///
    /// Messages buffered before [Channel::close()] are still delivered.
    ///
    /// Returns Err([RecvError::Closed]) when the channel is closed and drained.
    #[inline]
    pub fn recv(&self) -> Result<T, RecvError> {
        self._recv(None)
    }

    /// Try to receive message, non-blocking.
    ///
    /// Returns Err([TryRecvError::Empty]) when channel is empty.
    ///
    /// Returns Err([TryRecvError::Closed]) when the channel is closed and drained.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        if let Some(item) = state.queue.pop_front() {
            drop(state);
            shared.on_recv();
            return Ok(item);
        }
        if state.closed {
            return Err(TryRecvError::Closed);
        }
        Err(TryRecvError::Empty)
    }

    /// Block until there is room for one more message or the channel is closed.
    ///
    /// Returns false if closed. Nothing is reserved, another sender may take the slot.
    #[inline]
    pub fn has_space(&self) -> bool {
        self._has_space(None)
    }

    /// Block until a message is buffered or the channel is closed and drained.
    ///
    /// Returns false if closed and drained. Nothing is reserved, another receiver may take the message.
    #[inline]
    pub fn has_next(&self) -> bool {
        self._has_next(None)
    }

    /// Close the channel and wake up every waiter.
    ///
    /// Pending and later sends fail, receivers drain what is left.
    /// Closing again has no effect; returns true only for the call that closed it.
    pub fn close(&self) -> bool {
        let shared = self.shared.as_ref();
        let mut state = shared.lock();
        if state.closed {
            return false;
        }
        state.closed = true;
        drop(state);
        shared.on_send();
        shared.on_recv();
        true
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    /// Snapshot, may be stale as soon as it returns.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.lock().queue.is_empty()
    }

    /// Snapshot, may be stale as soon as it returns.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.shared.lock().is_full(self.shared.bound_size)
    }

    /// Number of buffered messages (snapshot)
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.lock().queue.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.bound_size
    }

    /// Blocking iterator over received messages, ends when the channel is closed and drained.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { channel: self }
    }

    /// Receive one message for a select case, only if `claim` wins.
    ///
    /// Waits until a message is buffered. Then, under the channel lock, `claim` decides whether this
    /// caller takes it; a losing or cancelled caller leaves the queue untouched.
    /// Returns `None` when the claim is lost, the wait is cancelled, or the channel is closed and drained.
    pub(crate) fn recv_if<F: FnOnce() -> bool>(
        &self, claim: F, cancel: &CancelToken,
    ) -> Option<T>
    where
        T: Send + 'static,
    {
        let shared = self.shared.as_ref();
        let _reg = cancel.register(self.shared.clone());
        let mut state = shared.lock();
        loop {
            if !state.queue.is_empty() {
                if cancel.is_cancelled() || !claim() {
                    return None;
                }
                let item = state.queue.pop_front();
                drop(state);
                shared.on_recv();
                return item;
            }
            if state.closed || cancel.is_cancelled() {
                return None;
            }
            state = shared.recvs.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Send one message for a select case, only if `claim` wins.
    ///
    /// Waits until there is room. Then, under the channel lock, `claim` decides whether this caller
    /// delivers; otherwise the message is handed back.
    pub(crate) fn send_if<F: FnOnce() -> bool>(
        &self, item: T, claim: F, cancel: &CancelToken,
    ) -> Result<(), T>
    where
        T: Send + 'static,
    {
        let shared = self.shared.as_ref();
        let _reg = cancel.register(self.shared.clone());
        let mut state = shared.lock();
        loop {
            if state.closed || cancel.is_cancelled() {
                return Err(item);
            }
            if !state.is_full(shared.bound_size) {
                if !claim() {
                    return Err(item);
                }
                state.queue.push_back(item);
                drop(state);
                shared.on_send();
                return Ok(());
            }
            state = shared.senders.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<T: Send + 'static> Channel<T> {
    /// Like [Channel::send()], but gives up when `cancel` fires while waiting for room.
    ///
    /// Returns Err([SendError::Cancelled]) with the message on cancellation.
    pub fn send_cancellable(&self, item: T, cancel: &CancelToken) -> Result<(), SendError<T>> {
        let _reg = cancel.register(self.shared.clone());
        self._send(item, Some(cancel))
    }

    /// Like [Channel::recv()], but gives up when `cancel` fires while waiting for a message.
    ///
    /// Returns Err([RecvError::Cancelled]) on cancellation.
    pub fn recv_cancellable(&self, cancel: &CancelToken) -> Result<T, RecvError> {
        let _reg = cancel.register(self.shared.clone());
        self._recv(Some(cancel))
    }

    /// Like [Channel::has_space()], returns false when cancelled.
    pub fn has_space_cancellable(&self, cancel: &CancelToken) -> bool {
        let _reg = cancel.register(self.shared.clone());
        self._has_space(Some(cancel))
    }

    /// Like [Channel::has_next()], returns false when cancelled.
    pub fn has_next_cancellable(&self, cancel: &CancelToken) -> bool {
        let _reg = cancel.register(self.shared.clone());
        self._has_next(Some(cancel))
    }
}

/// Iterator returned by [Channel::iter()]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if !self.channel.has_next() {
            return None;
        }
        // A concurrent receiver may drain it between has_next() and recv(), recv() then waits
        // for the next message or reports closed.
        self.channel.recv().ok()
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator of a [Channel] handle
pub struct IntoIter<T> {
    channel: Channel<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.channel.iter().next()
    }
}

impl<T> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { channel: self }
    }
}
