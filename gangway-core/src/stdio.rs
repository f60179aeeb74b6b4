//! Transport bootstrap over standard I/O.
//!
//! The daemon launches the frontend as a subprocess with the RPC channel
//! mapped onto the child's stdin/stdout pair. [`StdioSocket`] presents
//! the two pipes as one full-duplex stream, and [`connect`] dials a
//! single channel over it. Stderr stays free for logging.
//!
//! The parent daemon controls both pipe ends, so the channel uses
//! plaintext credentials; the URI handed to the endpoint is a dummy the
//! transport requires but never resolves.

use crate::error::Result;
use hyper_util::rt::TokioIo;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf, Stdin, Stdout};
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

/// Send/receive cap per message, in either direction.
pub const MAX_MESSAGE_SIZE: usize = 16 << 20;

/// Pseudo-address reported for the stdio channel.
pub const PSEUDO_ADDR: &str = "http://localhost";

/// The process's stdin/stdout pair as one full-duplex byte stream.
pub struct StdioSocket {
    stdin: Stdin,
    stdout: Stdout,
}

impl StdioSocket {
    pub fn new() -> Self {
        Self { stdin: tokio::io::stdin(), stdout: tokio::io::stdout() }
    }
}

impl Default for StdioSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for StdioSocket {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdin).poll_read(cx, buf)
    }
}

impl AsyncWrite for StdioSocket {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().stdout).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdout).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().stdout).poll_shutdown(cx)
    }
}

/// Dial the single channel over the process's standard streams. Called
/// exactly once per frontend invocation.
pub async fn connect() -> Result<Channel> {
    let channel = Endpoint::try_from(PSEUDO_ADDR)?
        .connect_with_connector(service_fn(|_: Uri| async {
            Ok::<_, io::Error>(TokioIo::new(StdioSocket::new()))
        }))
        .await?;
    Ok(channel)
}
