use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshelfError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Host '{0}' not found")]
    HostNotFound(String),

    #[error("No active host. Activate one with 'sshelf host select' or pass --name")]
    NoActiveHost,

    #[error("No hosts saved yet. Add one with 'sshelf host add'")]
    NoHosts,

    #[error("Host '{0}' already exists")]
    DuplicateName(String),

    #[error("Failed to read key file {}: {source}", path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse key file {}: {reason}", path.display())]
    KeyParse { path: PathBuf, reason: String },

    #[error("Invalid authentication settings: {0}")]
    AuthConfig(String),

    #[error("SSH connection error: {0}")]
    Connection(String),

    #[error("SSH session error: {0}")]
    Session(String),

    /// A one-shot command finished with a non-zero status.
    #[error("Remote command '{command}' exited with status {status}")]
    RemoteExit { command: String, status: u32 },

    /// The user aborted an interactive prompt. Not a failure.
    #[error("Cancelled by user")]
    UserCancelled,

    #[error("Store error ({op}): {source}")]
    Store {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dialog error: {0}")]
    Dialog(dialoguer::Error),

    #[error("SSH protocol error: {0}")]
    SshProtocol(#[from] russh::Error),
}

impl SshelfError {
    /// Wrap a storage failure with the operation that produced it.
    pub fn store(op: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| SshelfError::Store { op, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SshelfError::UserCancelled)
    }
}

impl From<dialoguer::Error> for SshelfError {
    fn from(err: dialoguer::Error) -> Self {
        match err {
            dialoguer::Error::IO(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::Interrupted | std::io::ErrorKind::UnexpectedEof
                ) =>
            {
                SshelfError::UserCancelled
            }
            other => SshelfError::Dialog(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SshelfError>;
