use std::path::PathBuf;
use std::time::Duration;

use bbsync_client::ConnectionSettings;
use serde::Deserialize;

/// Default file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bbsync.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BbsyncConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub ca_cert_path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}
fn default_timeout_secs() -> u64 {
    10
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            ca_cert_path: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "warn".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl BbsyncConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.timeout_secs == 0 {
            return Err("server.timeout_secs must be > 0".into());
        }
        if self
            .server
            .base_url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            return Err("server.base_url must not be empty".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Command-line values win over file and environment.
    pub fn apply_overrides(
        &mut self,
        base_url: Option<&str>,
        token: Option<&str>,
        ca_cert_path: Option<&PathBuf>,
    ) {
        if let Some(url) = base_url {
            self.server.base_url = Some(url.to_owned());
        }
        if let Some(token) = token {
            self.server.token = Some(token.to_owned());
        }
        if let Some(path) = ca_cert_path {
            self.server.ca_cert_path = Some(path.clone());
        }
    }

    pub fn connection_settings(&self) -> Result<ConnectionSettings, String> {
        let base_url = self
            .server
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or("No server URL configured. Use --server, set server.base_url, or BBSYNC__SERVER__BASE_URL")?;
        let token = self
            .server
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or("No token configured. Use --token, set server.token, or BBSYNC__SERVER__TOKEN")?;

        let mut settings = ConnectionSettings::new(base_url, token)
            .with_timeout(Duration::from_secs(self.server.timeout_secs));
        if let Some(path) = &self.server.ca_cert_path {
            settings = settings.with_ca_cert_path(path.clone());
        }
        Ok(settings)
    }
}

pub mod loader {
    use super::{BbsyncConfig, DEFAULT_CONFIG_FILE};
    use config::{Config, Environment, File, FileFormat};
    use std::path::Path;

    /// File (explicit path, else `bbsync.toml` when present), then
    /// `BBSYNC__*` environment overrides, then validation.
    pub fn load_config(path: Option<&Path>) -> Result<BbsyncConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(format!("config file {} does not exist", p.display()));
                }
                builder = builder.add_source(File::from(p).format(FileFormat::Toml));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path).format(FileFormat::Toml));
                }
            }
        }
        // Environment variable overrides, e.g., BBSYNC__SERVER__TIMEOUT_SECS=30
        builder = builder.add_source(
            Environment::with_prefix("BBSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: BbsyncConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
