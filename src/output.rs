use crate::cancel::CancelToken;
use crate::channel::*;

/// For writing generic code over the sending side of a channel.
pub trait OutputChannel<T: Send + 'static>: Send + 'static {
    /// Send message. Will block when channel is full.
    ///
    /// Returns Err([SendError::Closed]) when the channel is closed.
    fn send(&self, item: T) -> Result<(), SendError<T>>;

    /// Send message, giving up with Err([SendError::Cancelled]) once `cancel` fires.
    fn send_cancellable(&self, item: T, cancel: &CancelToken) -> Result<(), SendError<T>>;

    /// Try to send message, non-blocking
    fn try_send(&self, item: T) -> Result<(), TrySendError<T>>;

    /// Block until there is room (true) or the channel is closed (false).
    fn has_space(&self) -> bool;

    /// Close the channel, returns true only for the call that closed it.
    fn close(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Whether the channel is full (not accurate)
    fn is_full(&self) -> bool;
}

impl<T: Send + 'static> OutputChannel<T> for Channel<T> {
    #[inline(always)]
    fn send(&self, item: T) -> Result<(), SendError<T>> {
        Channel::send(self, item)
    }

    #[inline(always)]
    fn send_cancellable(&self, item: T, cancel: &CancelToken) -> Result<(), SendError<T>> {
        Channel::send_cancellable(self, item, cancel)
    }

    #[inline(always)]
    fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        Channel::try_send(self, item)
    }

    #[inline(always)]
    fn has_space(&self) -> bool {
        Channel::has_space(self)
    }

    #[inline(always)]
    fn close(&self) -> bool {
        Channel::close(self)
    }

    #[inline(always)]
    fn is_closed(&self) -> bool {
        Channel::is_closed(self)
    }

    #[inline(always)]
    fn is_full(&self) -> bool {
        Channel::is_full(self)
    }
}
