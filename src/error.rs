use thiserror::Error;

/// Error returned by [Channel::send()](crate::Channel::send) and its cancellable variant.
///
/// The message that could not be delivered is handed back.
#[derive(Error, PartialEq, Eq, Clone, Copy)]
pub enum SendError<T> {
    /// The channel is closed, it will never accept another message.
    #[error("sending on a closed channel")]
    Closed(T),
    /// The wait for free space was cancelled.
    #[error("send cancelled")]
    Cancelled(T),
}

impl<T> SendError<T> {
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SendError::Cancelled(_))
    }

    /// Get back the message that was not sent.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            SendError::Closed(t) | SendError::Cancelled(t) => t,
        }
    }
}

impl<T> std::fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SendError::Closed(_) => write!(f, "Closed(..)"),
            SendError::Cancelled(_) => write!(f, "Cancelled(..)"),
        }
    }
}

/// Error returned by [Channel::try_send()](crate::Channel::try_send).
#[derive(Error, PartialEq, Eq, Clone, Copy)]
pub enum TrySendError<T> {
    #[error("sending on a full channel")]
    Full(T),
    #[error("sending on a closed channel")]
    Closed(T),
}

impl<T> TrySendError<T> {
    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, TrySendError::Closed(_))
    }

    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(t) | TrySendError::Closed(t) => t,
        }
    }
}

impl<T> std::fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "Full(..)"),
            TrySendError::Closed(_) => write!(f, "Closed(..)"),
        }
    }
}

/// Error returned by [Channel::recv()](crate::Channel::recv) and its cancellable variant.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum RecvError {
    /// The channel is closed and every buffered message has been received.
    #[error("receiving on a closed and empty channel")]
    Closed,
    /// The wait for a message was cancelled.
    #[error("receive cancelled")]
    Cancelled,
}

impl RecvError {
    #[inline]
    pub fn is_closed(&self) -> bool {
        *self == RecvError::Closed
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self == RecvError::Cancelled
    }
}

/// Error returned by [Channel::try_recv()](crate::Channel::try_recv).
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum TryRecvError {
    #[error("receiving on an empty channel")]
    Empty,
    #[error("receiving on a closed and empty channel")]
    Closed,
}

impl TryRecvError {
    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == TryRecvError::Empty
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        *self == TryRecvError::Closed
    }
}

/// Returned when a channel is created with a capacity of zero.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("capacity must be greater than 0, got {capacity}")]
pub struct InvalidArgument {
    pub capacity: usize,
}
