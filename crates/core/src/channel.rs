//! Channel trait: the abstraction over daemon transports.
//!
//! A Channel delivers user text into the daemon and carries the reply back.
//! Each inbound message owns a [`ReplyHandle`]; the transport waits on it
//! before reading the next message, so exactly one exchange is in flight.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use crate::error::ChannelError;

/// A message received from a channel, paired with its way back.
#[derive(Debug)]
pub struct ChannelMessage {
    /// The user's text, already stripped of line terminators
    pub content: String,

    /// Where the reply goes
    pub reply: ReplyHandle,
}

impl ChannelMessage {
    /// Create a message and the receiver the transport awaits for the reply.
    pub fn new(content: impl Into<String>) -> (Self, oneshot::Receiver<Option<String>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                content: content.into(),
                reply: ReplyHandle(tx),
            },
            rx,
        )
    }
}

/// One-shot return path for a reply.
///
/// `None` reports a failed exchange; the transport decides how to surface it.
#[derive(Debug)]
pub struct ReplyHandle(oneshot::Sender<Option<String>>);

impl ReplyHandle {
    /// Deliver the reply. Returns `false` if the transport went away.
    pub fn send(self, reply: Option<String>) -> bool {
        self.0.send(reply).is_ok()
    }
}

/// The core Channel trait.
#[async_trait]
pub trait Channel: Send + Sync {
    /// A short name for logs (e.g., "stdin", "unix-socket").
    fn name(&self) -> &str;

    /// Start receiving messages.
    ///
    /// The receiver yields messages one at a time; the channel does not read
    /// further input until the previous message's reply handle is consumed.
    async fn start(
        &self,
    ) -> std::result::Result<mpsc::Receiver<std::result::Result<ChannelMessage, ChannelError>>, ChannelError>;
}
