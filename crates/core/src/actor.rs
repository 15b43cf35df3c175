//! A minimal actor runtime.
//!
//! An actor is a task owning some state `S`. Other tasks talk to it only by
//! sending [`Message`]s through an [`Actor`] handle; messages are handled
//! one at a time with exclusive access to the state, so the state never
//! needs a lock.

mod mailbox;
mod scheduler;

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use mailbox::Mailbox;
pub use mailbox::Message;

/// Returned when a message is sent to an actor that has stopped.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ActorDeadError;

impl fmt::Debug for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActorDeadError")
    }
}

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the actor has stopped")
    }
}

impl Error for ActorDeadError {}

/// Handle to an actor.
///
/// The actor keeps running as long as at least one handle is alive.
pub struct Actor<S> {
    mailbox: Arc<Mailbox<S>>,
}

impl<S: Send + 'static> Actor<S> {
    /// Spawns a new actor on the current Tokio runtime.
    pub fn spawn(state: S, label: &str) -> Self {
        let (mailbox, msg_rx) = Mailbox::new();
        let mailbox = Arc::new(mailbox);
        tokio::spawn(
            scheduler::run(Arc::downgrade(&mailbox), state, msg_rx)
                .instrument(debug_span!("actor", label)),
        );
        Self { mailbox }
    }

    /// Sends a message to the actor.
    #[inline]
    pub fn send<M: Message<S>>(&self, msg: M) -> Result<(), ActorDeadError> {
        self.mailbox.send(Box::new(msg))
    }
}

impl<S> Clone for Actor<S> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}
