//! Declared repository configuration.

use std::collections::HashSet;

use bbsync_client::{GroupGrant, Repository, RepositoryRef};
use serde::Deserialize;

use crate::error::{ReconcileError, ReconcileResult};

/// What a repository should look like on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    /// Remote identifier. Renaming is not supported.
    pub name: String,
    /// Key of the owning project.
    pub project: String,
    #[serde(default)]
    pub public: bool,
    /// Absent and empty are the same description.
    #[serde(default)]
    pub description: Option<String>,
    /// Order is irrelevant; group names must be unique.
    #[serde(default)]
    pub groups: Vec<GroupGrant>,
}

impl DesiredState {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            public: false,
            description: None,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    #[must_use]
    pub fn with_group(mut self, grant: GroupGrant) -> Self {
        self.groups.push(grant);
        self
    }

    pub fn reference(&self) -> RepositoryRef {
        RepositoryRef::new(self.project.clone(), self.name.clone())
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// The record sent on create and update. Never carries an id.
    pub fn to_repository(&self) -> Repository {
        Repository {
            id: None,
            name: self.name.clone(),
            project: self.project.clone(),
            description: self.description().to_owned(),
            public: self.public,
        }
    }

    /// Reject declarations the server would misinterpret.
    pub fn validate(&self) -> ReconcileResult<()> {
        let repository = self.reference().to_string();
        if self.name.trim().is_empty() {
            return Err(ReconcileError::invalid(repository, "name must not be empty"));
        }
        if self.project.trim().is_empty() {
            return Err(ReconcileError::invalid(repository, "project must not be empty"));
        }

        let mut seen = HashSet::new();
        for grant in &self.groups {
            if grant.name.trim().is_empty() {
                return Err(ReconcileError::invalid(repository, "group name must not be empty"));
            }
            if !seen.insert(grant.name.as_str()) {
                return Err(ReconcileError::invalid(
                    repository,
                    format!("duplicate group '{}'", grant.name),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbsync_client::Permission;

    #[test]
    fn test_absent_description_is_empty() {
        let desired = DesiredState::new("CORE", "svc");
        assert_eq!(desired.description(), "");
        assert_eq!(desired.to_repository().description, "");
        assert_eq!(desired.to_repository().id, None);
    }

    #[test]
    fn test_validate_accepts_unique_groups() {
        let desired = DesiredState::new("CORE", "svc")
            .with_group(GroupGrant::new("devs", Permission::Write))
            .with_group(GroupGrant::new("ops", Permission::Read));
        assert!(desired.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_groups() {
        let desired = DesiredState::new("CORE", "svc")
            .with_group(GroupGrant::new("devs", Permission::Write))
            .with_group(GroupGrant::new("devs", Permission::Read));
        let err = desired.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate group 'devs'"));
    }

    #[test]
    fn test_validate_rejects_empty_identity() {
        assert!(DesiredState::new("CORE", "").validate().is_err());
        assert!(DesiredState::new(" ", "svc").validate().is_err());
    }

    #[test]
    fn test_deserialize_with_short_permission_aliases() {
        let desired: DesiredState = toml::from_str(
            r#"
            name = "svc"
            project = "CORE"
            description = "x"
            groups = [{ name = "devs", permission = "write" }]
            "#,
        )
        .unwrap();
        assert!(!desired.public);
        assert_eq!(desired.groups, vec![GroupGrant::new("devs", Permission::Write)]);
    }
}
