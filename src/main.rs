mod cli;
mod config;
mod error;
mod host;
mod ssh;

use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "sshelf=debug" } else { "sshelf=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let code = match cli.execute().await {
        Ok(()) => 0,
        Err(e) if e.is_cancelled() => {
            eprintln!("{} Good bye", style("😎").bold());
            0
        }
        Err(e) => {
            eprintln!("{} {}", style("✗").red().bold(), e);
            1
        }
    };

    // A blocking stdin read from a finished shell session would otherwise
    // keep the runtime from shutting down.
    std::process::exit(code);
}
