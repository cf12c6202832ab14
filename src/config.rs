use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SshelfError};

const DEFAULT_TERM: &str = "xterm-256color";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port offered when adding a new host.
    #[serde(default = "default_port")]
    pub default_port: u16,
    /// Terminal type requested for remote PTYs.
    #[serde(default = "default_term")]
    pub term: String,
}

fn default_port() -> u16 {
    22
}

fn default_term() -> String {
    DEFAULT_TERM.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_port: default_port(),
            term: default_term(),
        }
    }
}

/// The directory holding the database and config file.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Resolve the workspace, falling back to `~/.sshelf`.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = match explicit {
            Some(path) => PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref()),
            None => Self::default_root()?,
        };
        Ok(Self { root })
    }

    fn default_root() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| SshelfError::Config("Could not determine home directory".to_string()))?;
        Ok(home.join(".sshelf"))
    }

    /// Create the directory if missing; reject a path that is not a directory.
    pub fn ensure(&self) -> Result<()> {
        match std::fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(SshelfError::Config(format!(
                "Workspace path {} is not a directory",
                self.root.display()
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("creating workspace {}", self.root.display());
                std::fs::create_dir_all(&self.root)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }
}

impl AppConfig {
    /// Load the config file; a missing file yields the defaults.
    pub fn load(workspace: &Workspace) -> Result<Self> {
        let path = workspace.config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| SshelfError::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    pub fn save(&self, workspace: &Workspace) -> Result<()> {
        let path = workspace.config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| SshelfError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "default_port" | "default-port" | "port" => {
                self.default_port = value
                    .parse()
                    .ok()
                    .filter(|port| *port != 0)
                    .ok_or_else(|| SshelfError::Config(format!("Invalid port '{}'", value)))?;
            }
            "term" => {
                if value.trim().is_empty() {
                    return Err(SshelfError::Config("term must not be empty".to_string()));
                }
                self.term = value.trim().to_string();
            }
            _ => {
                return Err(SshelfError::Config(format!(
                    "Unknown config key '{}'. Available keys: default_port, term",
                    key
                )))
            }
        }
        Ok(())
    }
}
