//! Authentication method resolution.
//!
//! A host profile carries one `password` field whose meaning depends on
//! `key_path`:
//!
//! | key_path | password | method                          |
//! |----------|----------|---------------------------------|
//! | empty    | any      | password auth with `password`   |
//! | set      | empty    | unencrypted private key         |
//! | set      | set      | private key, `password` decrypts it |
//!
//! Exactly one method is produced; nothing falls back to another.

use std::path::PathBuf;
use std::sync::Arc;

use russh_keys::PrivateKey;

use crate::error::{Result, SshelfError};
use crate::host::HostProfile;

/// Credentials ready to present to the server.
#[derive(Clone)]
pub enum AuthMethod {
    Password(String),
    /// Key file stored without encryption.
    Key(Arc<PrivateKey>),
    /// Key file decrypted with the profile's passphrase.
    EncryptedKey(Arc<PrivateKey>),
}

impl AuthMethod {
    pub fn describe(&self) -> &'static str {
        match self {
            AuthMethod::Password(_) => "password",
            AuthMethod::Key(_) => "private key",
            AuthMethod::EncryptedKey(_) => "passphrase-protected key",
        }
    }
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthMethod({})", self.describe())
    }
}

/// Pick the single authentication method described by `profile`.
pub fn resolve(profile: &HostProfile) -> Result<AuthMethod> {
    if profile.user.is_empty() {
        return Err(SshelfError::AuthConfig(format!(
            "host '{}' has no user",
            profile.name
        )));
    }

    if profile.key_path.is_empty() {
        return Ok(AuthMethod::Password(profile.password.clone()));
    }

    let path = PathBuf::from(shellexpand::tilde(&profile.key_path).as_ref());
    let bytes = std::fs::read(&path).map_err(|source| SshelfError::KeyRead {
        path: path.clone(),
        source,
    })?;
    let key_parse = |reason: String| SshelfError::KeyParse {
        path: path.clone(),
        reason,
    };

    let pem = String::from_utf8(bytes).map_err(|_| key_parse("not a text key file".to_string()))?;

    let passphrase = (!profile.password.is_empty()).then_some(profile.password.as_str());
    if passphrase.is_some() && !is_encrypted(&pem) {
        return Err(key_parse("key is not passphrase protected".to_string()));
    }

    let key = russh_keys::decode_secret_key(&pem, passphrase).map_err(|e| key_parse(e.to_string()))?;

    tracing::debug!("loaded key {} for host {}", path.display(), profile.name);

    let key = Arc::new(key);
    Ok(match passphrase {
        Some(_) => AuthMethod::EncryptedKey(key),
        None => AuthMethod::Key(key),
    })
}

/// Whether the key text is stored encrypted.
///
/// OpenSSH keys carry a cipher name; legacy PEM and PKCS#8 keys mark
/// encryption in their headers.
fn is_encrypted(pem: &str) -> bool {
    match ssh_key::PrivateKey::from_openssh(pem) {
        Ok(key) => key.is_encrypted(),
        Err(_) => pem.contains("ENCRYPTED"),
    }
}
