//! Stdin channel: the daemon's default transport.
//!
//! Reads one message per line. Blank lines are skipped; `exit`, `quit` or
//! EOF end the session. Replies go to stdout, failures to stderr.

use async_trait::async_trait;
use neo_core::channel::{Channel, ChannelMessage};
use neo_core::error::ChannelError;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Printed to stderr when an exchange fails.
pub const FAILURE_NOTICE: &str = "neo: LLM request failed\n";

/// Line-oriented channel over the process's stdin and stdout.
#[derive(Debug, Default)]
pub struct StdinChannel;

impl StdinChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Channel for StdinChannel {
    fn name(&self) -> &str {
        "stdin"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let reader = BufReader::new(io::stdin());
            let mut out = io::stdout();
            let mut err = io::stderr();
            serve_lines(reader, &mut out, &mut err, tx).await;
        });

        Ok(rx)
    }
}

/// Serve messages from `reader` until EOF, an exit command, or the daemon stops.
pub async fn serve_lines<R, W, E>(
    mut reader: R,
    out: &mut W,
    err: &mut E,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                break;
            }
        }

        let raw = String::from_utf8_lossy(&buf);
        let line = crate::strip_line_ending(&raw);
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            tracing::debug!("Exit command received");
            break;
        }

        let (reply, alive) = crate::dispatch(&tx, line).await;
        if !alive {
            break;
        }

        let written = match reply {
            Some(text) if !text.is_empty() => write_flush(out, crate::terminated(&text).as_bytes()).await,
            Some(_) => Ok(()),
            None => write_flush(err, FAILURE_NOTICE.as_bytes()).await,
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write reply");
            break;
        }
    }
}

async fn write_flush<W: AsyncWrite + Unpin>(w: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    w.write_all(bytes).await?;
    w.flush().await
}
