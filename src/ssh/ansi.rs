//! Output wrapper that lets remote ANSI escapes reach the local terminal.
//!
//! Bytes are forwarded untouched. On Windows the console is switched into
//! virtual-terminal mode first so colored remote output renders instead of
//! printing raw escape codes.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

pub struct AnsiWriter<W> {
    inner: W,
}

impl<W> AnsiWriter<W> {
    pub fn new(inner: W) -> Self {
        enable_virtual_terminal();
        Self { inner }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(windows)]
fn enable_virtual_terminal() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        if !crossterm::ansi_support::supports_ansi() {
            tracing::debug!("console does not support ANSI escapes");
        }
    });
}

#[cfg(not(windows))]
fn enable_virtual_terminal() {}

impl<W: AsyncWrite + Unpin> AsyncWrite for AnsiWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
