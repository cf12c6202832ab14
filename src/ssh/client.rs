//! SSH client implementation using russh.
//!
//! Provides connection management and authentication.

use std::collections::VecDeque;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::ChannelMsg;
use tokio::sync::Mutex;

use crate::error::{Result, SshelfError};
use crate::ssh::auth::AuthMethod;
use crate::ssh::channel::{ChannelEvent, Connection, RemoteChannel};
use crate::ssh::pty::LocalTerminal;

/// SSH client wrapper over russh.
pub struct SshClient {
    session: Mutex<Handle<ClientHandler>>,
    target: String,
}

impl SshClient {
    /// Connect to an SSH server and authenticate with `auth`.
    pub async fn connect(host: &str, port: u16, user: &str, auth: AuthMethod) -> Result<Self> {
        let russh_config = Arc::new(client::Config {
            // No inactivity timeout - keep connection alive indefinitely
            inactivity_timeout: None,
            // Send keep-alive every 15 seconds
            keepalive_interval: Some(std::time::Duration::from_secs(15)),
            // Allow up to 4 missed keep-alives before disconnect (60 seconds)
            keepalive_max: 4,
            ..Default::default()
        });

        // Resolve hostname to IP
        let addr = format!("{}:{}", host, port)
            .to_socket_addrs()
            .map_err(|e| SshelfError::Connection(format!("Failed to resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| SshelfError::Connection(format!("No address found for {}", host)))?;

        tracing::debug!("connecting to {} ({}) as {}", host, addr, user);

        let mut session = client::connect(russh_config, addr, ClientHandler)
            .await
            .map_err(|e| SshelfError::Connection(format!("Connection failed: {}", e)))?;

        Self::authenticate(&mut session, user, auth).await?;

        Ok(Self {
            session: Mutex::new(session),
            target: format!("{}@{}:{}", user, host, port),
        })
    }

    /// Present the single resolved credential. There is no fallback.
    async fn authenticate(
        session: &mut Handle<ClientHandler>,
        user: &str,
        auth: AuthMethod,
    ) -> Result<()> {
        let method = auth.describe();

        let accepted = match auth {
            AuthMethod::Password(password) => session.authenticate_password(user, password).await,
            AuthMethod::Key(key) | AuthMethod::EncryptedKey(key) => {
                session.authenticate_publickey(user, key).await
            }
        }
        .map_err(|e| SshelfError::Connection(format!("Authentication failed: {}", e)))?;

        if accepted {
            tracing::debug!("authenticated as {} with {}", user, method);
            Ok(())
        } else {
            Err(SshelfError::Connection(format!(
                "Server rejected {} authentication for {}",
                method, user
            )))
        }
    }

    /// Start an interactive shell on the local terminal.
    pub async fn shell(&self, term: &str) -> Result<()> {
        crate::ssh::pty::open_shell(
            self,
            &LocalTerminal,
            term,
            tokio::io::stdin(),
            tokio::io::stdout(),
            tokio::io::stderr(),
        )
        .await
    }

    /// Run one command, streaming its output to the local stdout/stderr.
    pub async fn exec(&self, command: &str) -> Result<()> {
        crate::ssh::exec::run_command(self, command, tokio::io::stdout(), tokio::io::stderr()).await
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Politely end the connection.
    pub async fn disconnect(&self) {
        let session = self.session.lock().await;
        if let Err(e) = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
        {
            tracing::debug!("disconnect from {}: {}", self.target, e);
        }
    }
}

#[async_trait]
impl Connection for SshClient {
    type Channel = SshChannel;

    async fn open_channel(&self) -> Result<SshChannel> {
        let session = self.session.lock().await;
        let channel = session
            .channel_open_session()
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to open channel: {}", e)))?;

        Ok(SshChannel {
            channel,
            pending: VecDeque::new(),
        })
    }
}

/// A russh session channel.
pub struct SshChannel {
    channel: russh::Channel<client::Msg>,
    /// Events that arrived while waiting for a request reply.
    pending: VecDeque<ChannelEvent>,
}

impl SshChannel {
    /// Wait for the server to answer the last `want_reply` request.
    async fn await_reply(&mut self, request: &str) -> Result<()> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Success) => return Ok(()),
                Some(ChannelMsg::Failure) => {
                    return Err(SshelfError::Session(format!(
                        "Remote rejected {} request",
                        request
                    )))
                }
                Some(msg) => {
                    if let Some(event) = to_event(msg) {
                        self.pending.push_back(event);
                    }
                }
                None => {
                    return Err(SshelfError::Session(format!(
                        "Channel closed while waiting for {} reply",
                        request
                    )))
                }
            }
        }
    }
}

fn to_event(msg: ChannelMsg) -> Option<ChannelEvent> {
    match msg {
        ChannelMsg::Data { data } => Some(ChannelEvent::Stdout(data.to_vec())),
        ChannelMsg::ExtendedData { data, ext: 1 } => Some(ChannelEvent::Stderr(data.to_vec())),
        ChannelMsg::ExitStatus { exit_status } => Some(ChannelEvent::ExitStatus(exit_status)),
        ChannelMsg::ExitSignal { signal_name, .. } => {
            Some(ChannelEvent::ExitSignal(format!("{:?}", signal_name)))
        }
        ChannelMsg::Eof => Some(ChannelEvent::Eof),
        ChannelMsg::Close => Some(ChannelEvent::Closed),
        _ => None,
    }
}

#[async_trait]
impl RemoteChannel for SshChannel {
    async fn request_pty(&mut self, term: &str, width: u32, height: u32) -> Result<()> {
        self.channel
            .request_pty(true, term, width, height, 0, 0, &[])
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to request PTY: {}", e)))?;
        self.await_reply("pty").await
    }

    async fn request_shell(&mut self) -> Result<()> {
        self.channel
            .request_shell(true)
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to request shell: {}", e)))?;
        self.await_reply("shell").await
    }

    async fn exec(&mut self, command: &str) -> Result<()> {
        self.channel
            .exec(true, command.as_bytes())
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to execute command: {}", e)))?;
        self.await_reply("exec").await
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.channel
            .data(data)
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to send data: {}", e)))
    }

    async fn send_eof(&mut self) -> Result<()> {
        self.channel
            .eof()
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to send EOF: {}", e)))
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        loop {
            let msg = self.channel.wait().await?;
            if let Some(event) = to_event(msg) {
                return Some(event);
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.channel
            .close()
            .await
            .map_err(|e| SshelfError::Session(format!("Failed to close channel: {}", e)))
    }
}

/// Client handler for russh connection callbacks.
///
/// The server's host key is accepted without verification; its fingerprint
/// is only logged.
pub struct ClientHandler;

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = SshelfError;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh_keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        tracing::debug!(
            "accepting server key {}",
            server_public_key.fingerprint(Default::default())
        );
        Ok(true)
    }
}
