//! Trust root setup for the HTTP transport.
//!
//! The system trust store is always in use. An optional CA bundle can add
//! extra roots; when that bundle is missing or unreadable the client keeps
//! running on system roots only and says so with a warning.

use std::path::Path;

use reqwest::Certificate;

/// Outcome of loading the optional CA bundle.
#[derive(Debug)]
pub enum TrustRoots {
    /// No CA bundle was configured.
    System,
    /// The bundle was loaded and its certificates are added to the system roots.
    WithCustomCa(Vec<Certificate>),
    /// A bundle was configured but could not be used.
    Degraded { reason: String },
}

impl TrustRoots {
    /// Load the CA bundle at `path`, if any.
    ///
    /// Never fails: problems with the bundle produce [`TrustRoots::Degraded`]
    /// and a `warn` event.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            return Self::System;
        };

        if !path.exists() {
            return Self::degraded(format!("'{}' does not exist", path.display()));
        }

        let pem = match std::fs::read(path) {
            Ok(pem) => pem,
            Err(e) => return Self::degraded(format!("failed to read {}: {e}", path.display())),
        };

        let certificates = match Certificate::from_pem_bundle(&pem) {
            Ok(certificates) => certificates,
            Err(e) => {
                return Self::degraded(format!("failed to parse {}: {e}", path.display()));
            }
        };

        if certificates.is_empty() {
            return Self::degraded(format!(
                "no certificates appended from {}, using system certs only",
                path.display()
            ));
        }

        tracing::debug!(
            path = %path.display(),
            count = certificates.len(),
            "loaded custom CA certificates"
        );
        Self::WithCustomCa(certificates)
    }

    fn degraded(reason: String) -> Self {
        tracing::warn!(%reason, "custom CA bundle not used, falling back to system trust store");
        Self::Degraded { reason }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Add the loaded roots to a client builder.
    pub fn apply(self, mut builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        if let Self::WithCustomCa(certificates) = self {
            for cert in certificates {
                builder = builder.add_root_certificate(cert);
            }
        }
        builder
    }
}
