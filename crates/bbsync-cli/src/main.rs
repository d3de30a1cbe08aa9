mod cli;
mod commands;
mod config;
mod manifest;
mod observability;
mod output;

use anyhow::{Context, Result};
use bbsync_client::connect;
use bbsync_reconciler::RepositoryReconciler;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands};
use crate::config::BbsyncConfig;
use crate::manifest::Manifest;
use crate::output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = crate::config::loader::load_config(cli.config.as_deref()).map_err(anyhow::Error::msg)?;
    cfg.apply_overrides(
        cli.server.as_deref(),
        cli.token.as_deref(),
        cli.ca_cert.as_ref(),
    );
    observability::init_tracing_with_level(&cfg.logging.level);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match &cli.command {
        Commands::Ping => {
            let settings = cfg.connection_settings().map_err(anyhow::Error::msg)?;
            commands::ping::ping(&settings, &cancel).await?;
        }
        Commands::Observe(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let reconciler = make_reconciler(&cfg, &cancel).await?;
            commands::observe::observe(&reconciler, &manifest.select(None)?, &cancel).await?;
        }
        Commands::Apply(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let reconciler = make_reconciler(&cfg, &cancel).await?;
            commands::apply::apply(&reconciler, &manifest.select(None)?, &cancel).await?;
        }
        Commands::Delete(args) => {
            let manifest = Manifest::load(&args.manifest)?;
            let selected = manifest.select(args.only.as_deref())?;
            let reconciler = make_reconciler(&cfg, &cancel).await?;
            commands::delete::delete(&reconciler, &selected, &cancel).await?;
        }
    }

    Ok(())
}

async fn make_reconciler(
    cfg: &BbsyncConfig,
    cancel: &CancellationToken,
) -> Result<RepositoryReconciler> {
    let settings = cfg.connection_settings().map_err(anyhow::Error::msg)?;
    let service = connect(&settings, cancel)
        .await
        .with_context(|| format!("Cannot reach {}", settings.base_url))?;
    Ok(RepositoryReconciler::new(service.into_dyn()))
}

/// First Ctrl-C cancels the in-flight call.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}
