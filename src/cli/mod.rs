pub mod commands;
pub mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, Workspace};
use crate::error::Result;
use crate::host::HostStore;

#[derive(Parser)]
#[command(name = "sshelf")]
#[command(version)]
#[command(about = "Keep your SSH hosts on a shelf")]
#[command(long_about = "Save SSH host profiles once, pick one as active, and open a shell or run a command on it.\n\nPasswords, keys and encrypted keys are all handled in-process.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace directory holding the host database and config
    #[arg(long, global = true, env = "SSHELF_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage saved hosts
    Host {
        #[command(subcommand)]
        command: HostCommands,
    },

    /// Connect to a saved host
    Ssh {
        #[command(subcommand)]
        command: SshCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum HostCommands {
    /// Add a new host
    Add,

    /// Pick a host and make it active
    Select,

    /// Show the active host
    Active,

    /// Show one host as JSON
    Get {
        /// Host name
        name: String,
    },

    /// List all hosts
    Gets,

    /// Pick a host and edit every field
    Update,

    /// Pick a host and delete it
    Delete,
}

#[derive(Subcommand)]
pub enum SshCommands {
    /// Open an interactive shell
    Shell {
        /// Host name (default: the active host)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Run one command and exit with its result
    Exec {
        /// Host name (default: the active host)
        #[arg(short, long)]
        name: Option<String>,

        /// Command to execute, passed to the remote shell as one string
        command: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let workspace = Workspace::resolve(self.workspace.as_deref())?;
        workspace.ensure()?;
        tracing::debug!("using workspace {}", workspace.root().display());

        match self.command {
            Commands::Host { command } => {
                let config = AppConfig::load(&workspace)?;
                let store = HostStore::open(workspace.root())?;
                match command {
                    HostCommands::Add => commands::host::add(&store, &config),
                    HostCommands::Select => commands::host::select(&store),
                    HostCommands::Active => commands::host::active(&store),
                    HostCommands::Get { name } => commands::host::get(&store, &name),
                    HostCommands::Gets => commands::host::gets(&store),
                    HostCommands::Update => commands::host::update(&store),
                    HostCommands::Delete => commands::host::delete(&store),
                }
            }
            Commands::Ssh { command } => {
                let config = AppConfig::load(&workspace)?;
                let store = HostStore::open(workspace.root())?;
                match command {
                    SshCommands::Shell { name } => {
                        commands::ssh::shell(&store, &config, name.as_deref()).await
                    }
                    SshCommands::Exec { name, command } => {
                        commands::ssh::exec(&store, name.as_deref(), &command).await
                    }
                }
            }
            Commands::Config { command } => match command {
                ConfigCommands::Show => commands::config::show(&workspace),
                ConfigCommands::Set { key, value } => commands::config::set(&workspace, &key, &value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec_with_name() {
        let cli = Cli::try_parse_from(["sshelf", "ssh", "exec", "--name", "web", "ls -la"]).unwrap();
        match cli.command {
            Commands::Ssh {
                command: SshCommands::Exec { name, command },
            } => {
                assert_eq!(name.as_deref(), Some("web"));
                assert_eq!(command, "ls -la");
            }
            _ => panic!("expected ssh exec"),
        }
    }

    #[test]
    fn test_exec_keeps_quoting() {
        let cli = Cli::try_parse_from(["sshelf", "ssh", "exec", "sh -c 'echo a b'"]).unwrap();
        match cli.command {
            Commands::Ssh {
                command: SshCommands::Exec { name, command },
            } => {
                assert!(name.is_none());
                assert_eq!(command, "sh -c 'echo a b'");
            }
            _ => panic!("expected ssh exec"),
        }
    }

    #[test]
    fn test_exec_takes_exactly_one_command() {
        assert!(Cli::try_parse_from(["sshelf", "ssh", "exec", "ls", "-la"]).is_err());
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sshelf", "host", "gets", "--workspace", "/tmp/ws", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
    }

    #[test]
    fn test_exec_requires_command() {
        assert!(Cli::try_parse_from(["sshelf", "ssh", "exec"]).is_err());
    }
}
