use console::style;

use crate::cli::prompt;
use crate::config::AppConfig;
use crate::error::Result;
use crate::host::{HostProfile, HostRequest, HostStore};

pub fn add(store: &HostStore, config: &AppConfig) -> Result<()> {
    let initial = HostRequest {
        port: config.default_port,
        ..Default::default()
    };
    let request = prompt::read_host(initial)?;
    let host = store.save(&request)?;

    tracing::info!("saved host {}", host.name);
    println!(
        "{} Added {}",
        style("✓").green().bold(),
        style(&host).cyan()
    );
    if !host.has_credentials() {
        println!(
            "  {}",
            style("No password or key path set; connecting will use an empty password.").dim()
        );
    }

    Ok(())
}

pub fn select(store: &HostStore) -> Result<()> {
    let hosts = store.find_all()?;
    let host = prompt::select_host(&hosts)?;
    store.set_active(host)?;

    println!(
        "{} Active host is now {}",
        style("✓").green().bold(),
        style(host).cyan()
    );

    Ok(())
}

pub fn active(store: &HostStore) -> Result<()> {
    match store.get_active()? {
        Some(host) => {
            println!("{} {}", style("●").green().bold(), style(&host).white().bold());
            println!("{}", host.to_json(true));
        }
        None => {
            println!("{}", style("No active host.").dim());
            println!("Run {} to pick one.", style("sshelf host select").cyan());
        }
    }

    Ok(())
}

pub fn get(store: &HostStore, name: &str) -> Result<()> {
    let host = store.find_by_name(name)?;
    println!("{}", host.to_json(true));
    Ok(())
}

pub fn gets(store: &HostStore) -> Result<()> {
    let hosts = store.find_all()?;
    for line in listing(&hosts) {
        println!("{}", line);
    }
    Ok(())
}

/// One compact JSON line per host, then the total.
fn listing(hosts: &[HostProfile]) -> Vec<String> {
    let mut lines: Vec<String> = hosts.iter().map(|h| h.to_json(false)).collect();
    lines.push(format!("total: {}", hosts.len()));
    lines
}

pub fn update(store: &HostStore) -> Result<()> {
    let hosts = store.find_all()?;
    let chosen = prompt::select_host(&hosts)?;

    let request = prompt::read_host(chosen.to_request())?;
    store.update(chosen.id, &request)?;

    tracing::info!("updated host #{} ({})", chosen.id, request.name);
    println!(
        "{} Updated {}",
        style("✓").green().bold(),
        style(&request.name).cyan()
    );

    Ok(())
}

pub fn delete(store: &HostStore) -> Result<()> {
    let hosts = store.find_all()?;
    let chosen = prompt::select_host(&hosts)?;

    let confirmed = prompt::confirm(&format!(
        "{} Delete {}?",
        style("?").cyan().bold(),
        chosen
    ))?;
    if !confirmed {
        println!("  {}", style("Cancelled.").dim());
        return Ok(());
    }

    if store.delete_by_name(&chosen.name)? == 0 {
        println!(
            "{} {} was already gone",
            style("!").yellow().bold(),
            style(&chosen.name).white()
        );
    } else {
        tracing::info!("deleted host {}", chosen.name);
        println!(
            "{} Deleted {}",
            style("✓").green().bold(),
            style(&chosen.name).cyan()
        );
    }

    Ok(())
}
