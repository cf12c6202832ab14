//! Pure Rust SSH sessions for sshelf.
//!
//! ## Modules
//!
//! - [`auth`] - Pick the one authentication method a host profile describes
//! - [`client`] - Connection setup and the russh-backed channel
//! - [`channel`] - Transport traits shared by shell and exec sessions
//! - [`pty`] - Interactive shell sessions with local raw mode
//! - [`exec`] - One-shot remote commands
//! - [`ansi`] - Escape-preserving output wrapper

mod ansi;
pub mod auth;
mod channel;
mod client;
mod exec;
mod pty;

pub use client::SshClient;

use crate::error::Result;
use crate::host::HostProfile;

/// Resolve credentials for `profile` and open an authenticated connection.
pub async fn connect(profile: &HostProfile) -> Result<SshClient> {
    let auth = auth::resolve(profile)?;

    tracing::debug!("connecting to {} using {}", profile, auth.describe());

    SshClient::connect(&profile.address, profile.port, &profile.user, auth).await
}
