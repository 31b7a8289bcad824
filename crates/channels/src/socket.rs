//! Unix socket channel.
//!
//! Serves one connection at a time: read a single line, hand it to the
//! daemon, write the reply, close. A failed exchange closes the connection
//! without writing anything.

use async_trait::async_trait;
use neo_core::channel::{Channel, ChannelMessage};
use neo_core::error::ChannelError;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Longest request line accepted from a client, in bytes.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Listens on a filesystem socket path.
#[derive(Debug, Clone)]
pub struct UnixSocketChannel {
    path: PathBuf,
}

impl UnixSocketChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
#[async_trait]
impl Channel for UnixSocketChannel {
    fn name(&self) -> &str {
        "unix-socket"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        let listener = tokio::net::UnixListener::bind(&self.path)?;
        tracing::info!(path = %self.path.display(), "Listening on unix socket");

        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(accept_loop(listener, tx));
        Ok(rx)
    }
}

#[cfg(not(unix))]
#[async_trait]
impl Channel for UnixSocketChannel {
    fn name(&self) -> &str {
        "unix-socket"
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<ChannelMessage, ChannelError>>, ChannelError> {
        Err(ChannelError::NotSupported(
            "Unix sockets are not available on this platform".into(),
        ))
    }
}

#[cfg(unix)]
async fn accept_loop(
    listener: tokio::net::UnixListener,
    tx: mpsc::Sender<Result<ChannelMessage, ChannelError>>,
) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        };
        if !serve_connection(stream, &tx).await {
            break;
        }
    }
}

/// Handle one client. Returns false once the daemon has stopped listening.
#[cfg(unix)]
async fn serve_connection(
    stream: tokio::net::UnixStream,
    tx: &mpsc::Sender<Result<ChannelMessage, ChannelError>>,
) -> bool {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half.take(MAX_LINE_BYTES as u64));
    let buf = match read_request_line(&mut reader).await {
        Ok(buf) => buf,
        Err(e) => {
            tracing::debug!(error = %e, "Client read failed");
            return true;
        }
    };

    let line = String::from_utf8_lossy(&buf).into_owned();
    if line.is_empty() {
        return true;
    }

    let (reply, alive) = crate::dispatch(tx, &line).await;
    match reply {
        Some(text) if !text.is_empty() => {
            let wire = crate::terminated(&text);
            if let Err(e) = write_half.write_all(wire.as_bytes()).await {
                tracing::debug!(error = %e, "Client write failed");
            }
            let _ = write_half.shutdown().await;
        }
        Some(_) => {}
        None => tracing::debug!("Exchange failed, closing connection without reply"),
    }
    alive
}

/// Bytes up to the first `\n` or `\r`, or up to EOF. The terminator is consumed.
#[cfg(unix)]
async fn read_request_line<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut line = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(line);
        }
        if let Some(pos) = available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            line.extend_from_slice(&available[..pos]);
            reader.consume(pos + 1);
            return Ok(line);
        }
        let n = available.len();
        line.extend_from_slice(available);
        reader.consume(n);
    }
}
