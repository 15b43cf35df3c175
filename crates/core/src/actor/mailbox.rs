use std::fmt::Debug;

use tokio::sync::mpsc;

use super::{Actor, ActorDeadError};

/// Object-safe form of [`Message`], so messages can be boxed.
pub trait BoxMessage<S>: Send + Debug + 'static {
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>);
}

/// The message that an actor can handle.
pub trait Message<S>: BoxMessage<S> {
    /// Handles the message with mutable access to the actor's state.
    ///
    /// `handle` refers to the actor itself, tasks spawned from here use a
    /// clone of it to report back.
    fn handle(self, state: &mut S, handle: &Actor<S>);
}

impl<S, M: Message<S>> BoxMessage<S> for M {
    #[inline]
    fn handle_box(self: Box<Self>, state: &mut S, handle: &Actor<S>) {
        (*self).handle(state, handle)
    }
}

pub type BoxedMessage<S> = Box<dyn BoxMessage<S>>;

pub struct Mailbox<S> {
    msg_tx: mpsc::UnboundedSender<BoxedMessage<S>>,
}

impl<S: 'static> Mailbox<S> {
    #[inline]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BoxedMessage<S>>) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        (Mailbox { msg_tx }, msg_rx)
    }

    #[inline]
    pub fn send(&self, msg: BoxedMessage<S>) -> Result<(), ActorDeadError> {
        self.msg_tx.send(msg).map_err(|_| ActorDeadError)
    }
}
