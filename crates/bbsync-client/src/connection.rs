//! Connection factory.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::ClientResult;
use crate::repository::HttpRepositoryService;

/// Client-wide request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Parameters needed to reach a Bitbucket Server.
#[derive(Clone)]
pub struct ConnectionSettings {
    /// Server base URL, without the API prefix.
    pub base_url: String,
    /// Bearer token sent on every request.
    pub token: String,
    /// Optional PEM bundle added to the system trust store.
    pub ca_cert_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            ca_cert_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Build a repository client for the given server.
///
/// Runs one liveness check and fails if the server cannot be reached or
/// rejects the credentials. Errors are returned to the caller, never turned
/// into a process exit.
pub async fn connect(
    settings: &ConnectionSettings,
    cancel: &CancellationToken,
) -> ClientResult<HttpRepositoryService> {
    let client = Client::connect(settings, cancel).await?;
    Ok(HttpRepositoryService::new(client))
}
