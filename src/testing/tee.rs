//! Tee'd output stream
//!
//! The command writes its stdout into a [`TeeWriter`]. Every byte lands in the
//! wrapped writer (the captured output) and a copy is queued for the
//! [`OutputTap`], which the conversation engine reads at its own pace. The
//! queue is unbounded so a slow or finished reader never stalls the command.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

/// Create a tee around `inner`, returning the writer and its read view
pub fn tee<W>(inner: W) -> (TeeWriter<W>, OutputTap) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        TeeWriter { inner, tap: tx },
        OutputTap {
            chunks: rx,
            pending: Vec::new(),
            offset: 0,
        },
    )
}

/// Writer that forwards to `inner` and copies everything written to a tap
#[derive(Debug)]
pub struct TeeWriter<W> {
    inner: W,
    tap: mpsc::UnboundedSender<Vec<u8>>,
}

impl<W> TeeWriter<W> {
    /// Recover the wrapped writer. The tap sees end of stream once this
    /// writer is gone.
    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for TeeWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => n,
            other => return other,
        };
        if written > 0 {
            // The tap may already be gone (conversation finished); the
            // primary output must keep working regardless.
            let _ = this.tap.send(buf[..written].to_vec());
        }
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Independent read view of everything written to a [`TeeWriter`]
///
/// Reads return pending while no new output is queued and end of stream
/// once the writer has been dropped and the queue is drained.
#[derive(Debug)]
pub struct OutputTap {
    chunks: mpsc::UnboundedReceiver<Vec<u8>>,
    pending: Vec<u8>,
    offset: usize,
}

impl AsyncRead for OutputTap {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        while this.offset >= this.pending.len() {
            match this.chunks.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    this.pending = chunk;
                    this.offset = 0;
                }
                // Writer dropped and queue drained: end of stream
                Poll::Ready(None) => return Poll::Ready(Ok(())),
                Poll::Pending => return Poll::Pending,
            }
        }

        let available = &this.pending[this.offset..];
        let n = available.len().min(buf.remaining());
        buf.put_slice(&available[..n]);
        this.offset += n;
        Poll::Ready(Ok(()))
    }
}
