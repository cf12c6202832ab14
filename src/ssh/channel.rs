//! Transport seam between session logic and the SSH library.
//!
//! Shell and exec sessions are written against these traits so the
//! lifecycle rules (who closes what, in which order) do not depend on russh.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SshelfError};

/// Something that came back from the remote end of a session channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    ExitStatus(u32),
    ExitSignal(String),
    Eof,
    Closed,
}

/// One session channel.
#[async_trait]
pub trait RemoteChannel: Send {
    async fn request_pty(&mut self, term: &str, width: u32, height: u32) -> Result<()>;

    async fn request_shell(&mut self) -> Result<()>;

    async fn exec(&mut self, command: &str) -> Result<()>;

    async fn send(&mut self, data: &[u8]) -> Result<()>;

    async fn send_eof(&mut self) -> Result<()>;

    /// Next event, or `None` once the channel is gone.
    async fn next_event(&mut self) -> Option<ChannelEvent>;

    async fn close(&mut self) -> Result<()>;
}

/// An authenticated connection able to open session channels.
#[async_trait]
pub trait Connection: Sync {
    type Channel: RemoteChannel;

    async fn open_channel(&self) -> Result<Self::Channel>;
}

/// How the remote side ended a session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteExit {
    pub status: Option<u32>,
    pub signal: Option<String>,
}

/// Shuttle bytes between local streams and `channel` until the remote closes.
///
/// When `input` reaches EOF the remote is sent EOF and output keeps flowing.
pub async fn pump<C, I, O, E>(
    channel: &mut C,
    mut input: I,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<RemoteExit>
where
    C: RemoteChannel + ?Sized,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut exit = RemoteExit::default();
    let mut input_open = true;
    let mut input_buf = [0u8; 1024];

    loop {
        tokio::select! {
            result = input.read(&mut input_buf), if input_open => {
                match result {
                    Ok(0) => {
                        input_open = false;
                        channel.send_eof().await?;
                    }
                    Ok(n) => channel.send(&input_buf[..n]).await?,
                    Err(e) => {
                        tracing::warn!("stdin read error: {}", e);
                        input_open = false;
                        channel.send_eof().await?;
                    }
                }
            }

            event = channel.next_event() => {
                match event {
                    Some(ChannelEvent::Stdout(data)) => write_local(stdout, &data).await?,
                    Some(ChannelEvent::Stderr(data)) => write_local(stderr, &data).await?,
                    Some(ChannelEvent::ExitStatus(status)) => exit.status = Some(status),
                    Some(ChannelEvent::ExitSignal(signal)) => exit.signal = Some(signal),
                    Some(ChannelEvent::Eof) => {}
                    Some(ChannelEvent::Closed) | None => break,
                }
            }
        }
    }

    Ok(exit)
}

async fn write_local<W: AsyncWrite + Unpin>(out: &mut W, data: &[u8]) -> Result<()> {
    out.write_all(data)
        .await
        .map_err(|e| SshelfError::Session(format!("Failed to write output: {}", e)))?;
    out.flush().await.ok();
    Ok(())
}
