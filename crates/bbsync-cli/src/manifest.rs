use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bbsync_reconciler::DesiredState;
use serde::Deserialize;

/// Repositories declared in a TOML manifest, in file order.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<DesiredState>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Every entry must be valid and address a distinct repository.
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for desired in &self.repositories {
            desired.validate()?;
            let reference = desired.reference();
            if !seen.insert(reference.clone()) {
                anyhow::bail!("repository {reference} is declared more than once");
            }
        }
        Ok(())
    }

    /// Entries named `only`, or all of them.
    pub fn select(&self, only: Option<&str>) -> Result<Vec<&DesiredState>> {
        let selected: Vec<&DesiredState> = self
            .repositories
            .iter()
            .filter(|d| only.is_none_or(|name| d.name == name))
            .collect();
        if let (Some(name), true) = (only, selected.is_empty()) {
            anyhow::bail!("No repository named '{name}' in the manifest");
        }
        Ok(selected)
    }
}
