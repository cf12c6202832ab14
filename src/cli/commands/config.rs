use console::style;

use crate::config::{AppConfig, Workspace};
use crate::error::Result;

pub fn show(workspace: &Workspace) -> Result<()> {
    let config_path = workspace.config_path();
    let config = AppConfig::load(workspace)?;

    println!("{}", style("Current Configuration").bold().cyan());
    println!();
    println!("  Workspace:    {}", style(workspace.root().display()).white());
    println!("  Default port: {}", style(config.default_port).white());
    println!("  Terminal:     {}", style(&config.term).white());
    println!();
    if config_path.exists() {
        println!("Config file: {}", style(config_path.display()).dim());
    } else {
        println!(
            "{} {}",
            style("Using defaults; no file at").dim(),
            style(config_path.display()).dim()
        );
    }

    Ok(())
}

pub fn set(workspace: &Workspace, key: &str, value: &str) -> Result<()> {
    let mut config = AppConfig::load(workspace)?;
    config.set(key, value)?;
    config.save(workspace)?;

    tracing::debug!("wrote {}", workspace.config_path().display());
    println!(
        "{} Set {} = {}",
        style("✓").green().bold(),
        style(key).cyan(),
        style(value).white()
    );

    Ok(())
}
