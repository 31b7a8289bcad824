//! Daemon transports for neo.
//!
//! Each channel turns inbound lines into [`ChannelMessage`]s and writes the
//! reply back once the daemon answers. Both serve strictly one exchange at
//! a time.
//!
//! Available channels:
//! - **Stdin**: one message per line, replies on stdout
//! - **Unix socket**: one connection, one line, one reply

pub mod socket;
pub mod stdin;

pub use socket::UnixSocketChannel;
pub use stdin::StdinChannel;

use neo_core::channel::ChannelMessage;

/// Strip trailing CR/LF.
pub(crate) fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// The reply as written to the wire: newline-terminated.
pub(crate) fn terminated(reply: &str) -> String {
    if reply.ends_with('\n') {
        reply.to_string()
    } else {
        format!("{reply}\n")
    }
}

/// Hand one message to the daemon and wait for its answer.
///
/// `None` means the exchange failed or the daemon is gone; the second
/// value is false once the daemon has stopped listening.
pub(crate) async fn dispatch(
    tx: &tokio::sync::mpsc::Sender<Result<ChannelMessage, neo_core::error::ChannelError>>,
    content: &str,
) -> (Option<String>, bool) {
    let (msg, reply_rx) = ChannelMessage::new(content);
    if tx.send(Ok(msg)).await.is_err() {
        return (None, false);
    }
    match reply_rx.await {
        Ok(reply) => (reply, true),
        Err(_) => (None, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_line_endings() {
        assert_eq!(strip_line_ending("hello\r\n"), "hello");
        assert_eq!(strip_line_ending("hello\n\n"), "hello");
        assert_eq!(strip_line_ending("  padded  \n"), "  padded  ");
    }

    #[test]
    fn terminated_adds_missing_newline() {
        assert_eq!(terminated("hi"), "hi\n");
        assert_eq!(terminated("hi\n"), "hi\n");
    }
}
