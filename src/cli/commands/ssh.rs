use console::style;

use crate::config::AppConfig;
use crate::error::{Result, SshelfError};
use crate::host::{HostProfile, HostStore};

const BANNER: &str = r#"
╔═══════════════════════════════╗
║  s s h e l f                  ║
║  your hosts, one shelf        ║
╚═══════════════════════════════╝
"#;

fn print_banner(host: &HostProfile) {
    eprintln!("{}", style(BANNER).cyan());
    eprintln!(
        "  {} {} {}",
        style("→").bold(),
        style(&host.name).white().bold(),
        style(format!("({}@{}:{})", host.user, host.address, host.port)).dim()
    );
    eprintln!();
}

/// The named host, or the active one when no name is given.
pub fn resolve_host(store: &HostStore, name: Option<&str>) -> Result<HostProfile> {
    match name {
        Some(name) => store.find_by_name(name),
        None => store.get_active()?.ok_or(SshelfError::NoActiveHost),
    }
}

pub async fn shell(store: &HostStore, config: &AppConfig, name: Option<&str>) -> Result<()> {
    let host = resolve_host(store, name)?;
    print_banner(&host);

    let client = crate::ssh::connect(&host).await?;
    tracing::debug!("connected to {}", client.target());
    let result = client.shell(&config.term).await;
    client.disconnect().await;

    result?;
    eprintln!("{} Good bye", style("😎").bold());
    Ok(())
}

pub async fn exec(store: &HostStore, name: Option<&str>, command: &str) -> Result<()> {
    let host = resolve_host(store, name)?;
    tracing::info!("running '{}' on {}", command, host);

    let client = crate::ssh::connect(&host).await?;
    tracing::debug!("connected to {}", client.target());
    let result = client.exec(command).await;
    client.disconnect().await;

    result
}
