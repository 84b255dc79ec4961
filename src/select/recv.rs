use super::case::{Case, RaceContext};
use crate::channel::Channel;

pub(crate) struct RecvCase<T, F> {
    pub channel: Channel<T>,
    pub callback: F,
}

impl<T, F> Case for RecvCase<T, F>
where
    T: Send + 'static,
    F: FnOnce(T) + Send + 'static,
{
    #[inline]
    fn is_ready(&self) -> bool {
        !self.channel.is_empty()
    }

    fn race(self: Box<Self>, ctx: RaceContext) {
        let RecvCase { channel, callback } = *self;
        // Claiming under the channel lock, a closed and drained channel never wins.
        match channel.recv_if(|| ctx.claim(), &ctx.cancel) {
            Some(item) => {
                log::trace!("case {} won recv", ctx.index);
                ctx.commit(move || callback(item));
            }
            None => {
                log::trace!("case {} recv lost (cancelled={})", ctx.index, ctx.cancel.is_cancelled());
            }
        }
    }
}
