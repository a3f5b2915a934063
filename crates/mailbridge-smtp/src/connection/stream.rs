//! Low-level SMTP stream handling.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Line-oriented SMTP stream over any byte transport.
///
/// Production code uses a [`TcpStream`]; tests plug in a scripted mock.
#[derive(Debug)]
pub struct SmtpStream<S = TcpStream> {
    reader: BufReader<S>,
    timeout: Option<Duration>,
}

impl<S> SmtpStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::new(stream),
            timeout: None,
        }
    }

    /// Bounds every read and write by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads a line from the stream, without the trailing CRLF.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] at end of stream, or an I/O or
    /// timeout error.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = with_timeout(self.timeout, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes data to the stream and flushes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or times out.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let writer = self.reader.get_mut();
        with_timeout(self.timeout, async {
            writer.write_all(data).await?;
            writer.flush().await
        })
        .await??;
        Ok(())
    }
}

async fn with_timeout<F, T>(timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::Timeout(limit)),
        None => Ok(fut.await),
    }
}

/// Connects to an SMTP server over plain TCP.
///
/// The connection is never encrypted.
///
/// # Errors
///
/// Returns an error if the connection fails or does not complete within
/// `timeout`.
pub async fn connect(
    hostname: &str,
    port: u16,
    timeout: Option<Duration>,
) -> Result<SmtpStream<TcpStream>> {
    let addr = format!("{hostname}:{port}");
    tracing::debug!(%addr, "Connecting to SMTP server");
    let stream = with_timeout(timeout, TcpStream::connect(&addr)).await??;
    Ok(SmtpStream::new(stream).with_timeout(timeout))
}
