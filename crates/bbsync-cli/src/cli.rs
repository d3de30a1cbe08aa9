use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bbsync")]
#[command(about = "bbsync: keep Bitbucket Server repositories in line with a manifest")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./bbsync.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL (overrides config file and BBSYNC__SERVER__BASE_URL)
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Bearer token (overrides config file and BBSYNC__SERVER__TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Extra PEM bundle trusted in addition to the system roots
    #[arg(long, global = true)]
    pub ca_cert: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the server is reachable and accepts the token
    Ping,
    /// Report the state of every declared repository
    Observe(ManifestArgs),
    /// Create or update declared repositories until they match
    Apply(ManifestArgs),
    /// Delete declared repositories
    Delete(DeleteArgs),
}

#[derive(clap::Args)]
pub struct ManifestArgs {
    /// Path to the TOML manifest
    #[arg(short, long)]
    pub manifest: PathBuf,
}

#[derive(clap::Args)]
pub struct DeleteArgs {
    /// Path to the TOML manifest
    #[arg(short, long)]
    pub manifest: PathBuf,
    /// Only delete the repository with this name
    #[arg(long)]
    pub only: Option<String>,
}
