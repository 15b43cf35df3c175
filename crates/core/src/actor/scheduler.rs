use std::sync::Weak;

use tokio::sync::mpsc;

use super::Actor;
use super::mailbox::{BoxedMessage, Mailbox};

/// Runs the message loop until every handle is dropped.
///
/// Only a weak reference to the mailbox is kept here, otherwise the actor
/// would keep itself alive forever.
pub async fn run<S: Send + 'static>(
    mailbox: Weak<Mailbox<S>>,
    mut state: S,
    mut msg_rx: mpsc::UnboundedReceiver<BoxedMessage<S>>,
) {
    debug!("started");
    while let Some(msg) = msg_rx.recv().await {
        let Some(mailbox) = mailbox.upgrade() else {
            trace!("all handles are gone, discarding {msg:?}");
            break;
        };
        trace!("received message: {msg:?}");
        let handle = Actor { mailbox };
        msg.handle_box(&mut state, &handle);
    }
    debug!("stopped");
}
