//! PTY (pseudo-terminal) handling for interactive SSH sessions.
//!
//! Provides full terminal emulation for shell sessions.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Result, SshelfError};
use crate::ssh::ansi::AnsiWriter;
use crate::ssh::channel::{pump, Connection, RemoteChannel};

/// Local terminal controls needed by a shell session.
pub trait Terminal {
    fn enable_raw_mode(&self) -> std::io::Result<()>;

    fn disable_raw_mode(&self) -> std::io::Result<()>;

    /// Width and height in cells.
    fn size(&self) -> std::io::Result<(u16, u16)>;
}

/// The process's own terminal, driven through crossterm.
pub struct LocalTerminal;

impl Terminal for LocalTerminal {
    fn enable_raw_mode(&self) -> std::io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> std::io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }

    fn size(&self) -> std::io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }
}

/// Start an interactive shell over `conn`.
///
/// Raw mode is held only while the shell runs and is restored before the
/// channel is closed, whatever the outcome. A shell that exits non-zero is a
/// normal ending.
pub async fn open_shell<C, T, I, O, E>(
    conn: &C,
    terminal: &T,
    term: &str,
    stdin: I,
    stdout: O,
    stderr: E,
) -> Result<()>
where
    C: Connection,
    T: Terminal + ?Sized,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut channel = conn.open_channel().await?;

    let mut stdout = AnsiWriter::new(stdout);
    let mut stderr = AnsiWriter::new(stderr);

    let result = run_shell(&mut channel, terminal, term, stdin, &mut stdout, &mut stderr).await;

    if let Err(e) = channel.close().await {
        tracing::debug!("closing shell channel: {}", e);
    }

    result
}

async fn run_shell<C, T, I, O, E>(
    channel: &mut C,
    terminal: &T,
    term: &str,
    stdin: I,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<()>
where
    C: RemoteChannel,
    T: Terminal + ?Sized,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let _raw_guard = RawModeGuard::acquire(terminal)?;

    let (width, height) = get_terminal_size(terminal);

    channel.request_pty(term, width as u32, height as u32).await?;
    channel.request_shell().await?;

    let exit = pump(channel, stdin, stdout, stderr).await?;
    match (exit.status, exit.signal) {
        (Some(status), _) => tracing::debug!("remote shell exited with status {}", status),
        (None, Some(signal)) => tracing::debug!("remote shell killed by signal {}", signal),
        (None, None) => tracing::debug!("remote shell closed"),
    }

    Ok(())
}

/// Get current terminal size.
fn get_terminal_size<T: Terminal + ?Sized>(terminal: &T) -> (u16, u16) {
    terminal.size().unwrap_or((80, 24))
}

/// RAII guard to restore terminal mode on drop.
struct RawModeGuard<'a, T: Terminal + ?Sized> {
    terminal: &'a T,
}

impl<'a, T: Terminal + ?Sized> RawModeGuard<'a, T> {
    fn acquire(terminal: &'a T) -> Result<Self> {
        terminal
            .enable_raw_mode()
            .map_err(|e| SshelfError::Session(format!("Failed to enable raw mode: {}", e)))?;

        Ok(Self { terminal })
    }
}

impl<T: Terminal + ?Sized> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.terminal.disable_raw_mode() {
            tracing::warn!("failed to restore terminal mode: {}", e);
        }
    }
}
