use super::case::{Case, RaceContext};
use crate::channel::Channel;

pub(crate) struct SendCase<T, F> {
    pub channel: Channel<T>,
    pub message: T,
    pub callback: F,
}

impl<T, F> Case for SendCase<T, F>
where
    T: Send + 'static,
    F: FnOnce() + Send + 'static,
{
    #[inline]
    fn is_ready(&self) -> bool {
        !self.channel.is_closed() && !self.channel.is_full()
    }

    fn race(self: Box<Self>, ctx: RaceContext) {
        let SendCase { channel, message, callback } = *self;
        match channel.send_if(message, || ctx.claim(), &ctx.cancel) {
            Ok(()) => {
                log::trace!("case {} won send", ctx.index);
                ctx.commit(callback);
            }
            Err(_message) => {
                log::trace!("case {} send lost (cancelled={})", ctx.index, ctx.cancel.is_cancelled());
            }
        }
    }
}
