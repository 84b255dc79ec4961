use crate::cancel::CancelToken;
use crate::channel::*;

/// For writing generic code over the receiving side of a channel.
///
/// Accepting `impl InputChannel<T>` documents that a function only consumes from the channel.
pub trait InputChannel<T: Send + 'static>: Send + 'static {
    /// Receive message, will block when channel is empty.
    ///
    /// Returns Err([RecvError::Closed]) when the channel is closed and drained.
    fn recv(&self) -> Result<T, RecvError>;

    /// Receive message, giving up with Err([RecvError::Cancelled]) once `cancel` fires.
    fn recv_cancellable(&self, cancel: &CancelToken) -> Result<T, RecvError>;

    /// Try to receive message, non-blocking.
    fn try_recv(&self) -> Result<T, TryRecvError>;

    /// Block until a message is buffered (true) or the channel is closed and drained (false).
    fn has_next(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Whether there's message in the channel (not accurate)
    fn is_empty(&self) -> bool;

    /// Probe possible messages in the channel (not accurate)
    fn len(&self) -> usize;
}

impl<T: Send + 'static> InputChannel<T> for Channel<T> {
    #[inline(always)]
    fn recv(&self) -> Result<T, RecvError> {
        Channel::recv(self)
    }

    #[inline(always)]
    fn recv_cancellable(&self, cancel: &CancelToken) -> Result<T, RecvError> {
        Channel::recv_cancellable(self, cancel)
    }

    #[inline(always)]
    fn try_recv(&self) -> Result<T, TryRecvError> {
        Channel::try_recv(self)
    }

    #[inline(always)]
    fn has_next(&self) -> bool {
        Channel::has_next(self)
    }

    #[inline(always)]
    fn is_closed(&self) -> bool {
        Channel::is_closed(self)
    }

    #[inline(always)]
    fn is_empty(&self) -> bool {
        Channel::is_empty(self)
    }

    #[inline(always)]
    fn len(&self) -> usize {
        Channel::len(self)
    }
}
