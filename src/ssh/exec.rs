//! Remote command execution.
//!
//! Runs exactly one command, streaming its output to the local writers.

use tokio::io::AsyncWrite;

use crate::error::{Result, SshelfError};
use crate::ssh::ansi::AnsiWriter;
use crate::ssh::channel::{pump, Connection, RemoteChannel};

/// Execute `command` on the remote host (non-interactive).
///
/// Unlike a shell session, a non-zero exit status is reported as
/// [`SshelfError::RemoteExit`]. The channel is closed on every path.
pub async fn run_command<C, O, E>(conn: &C, command: &str, stdout: O, stderr: E) -> Result<()>
where
    C: Connection,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    let mut channel = conn.open_channel().await?;

    let mut stdout = AnsiWriter::new(stdout);
    let mut stderr = AnsiWriter::new(stderr);

    let result = exec_command(&mut channel, command, &mut stdout, &mut stderr).await;

    if let Err(e) = channel.close().await {
        tracing::debug!("closing exec channel: {}", e);
    }

    result
}

async fn exec_command<C, O, E>(
    channel: &mut C,
    command: &str,
    stdout: &mut O,
    stderr: &mut E,
) -> Result<()>
where
    C: RemoteChannel,
    O: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    channel.exec(command).await?;

    let exit = pump(channel, tokio::io::empty(), stdout, stderr).await?;

    match (exit.status, exit.signal) {
        (Some(0), _) => Ok(()),
        (Some(status), _) => Err(SshelfError::RemoteExit {
            command: command.to_string(),
            status,
        }),
        (None, Some(signal)) => Err(SshelfError::Session(format!(
            "Remote command '{}' killed by signal {}",
            command, signal
        ))),
        (None, None) => Err(SshelfError::Session(format!(
            "Remote command '{}' ended without an exit status",
            command
        ))),
    }
}
