use anyhow::{Context, Result};
use bbsync_client::{ConnectionSettings, connect};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

pub async fn ping(settings: &ConnectionSettings, cancel: &CancellationToken) -> Result<()> {
    let service = connect(settings, cancel)
        .await
        .with_context(|| format!("Cannot reach {}", settings.base_url))?;
    println!(
        "{} {} is {}",
        "✓".green(),
        service.client().base_url().as_str().cyan(),
        "reachable".green()
    );
    Ok(())
}
