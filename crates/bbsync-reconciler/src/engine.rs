//! Repository reconciliation.
//!
//! The engine keeps no state between calls. Each operation is a single pass
//! that issues remote calls in a fixed order, stops at the first failure and
//! leaves whatever already succeeded in place. Callers serialise operations
//! per repository and decide which operation to run from [`observe`].
//!
//! [`observe`]: RepositoryReconciler::observe

use bbsync_client::{DynRepositoryService, Repository};
use tokio_util::sync::CancellationToken;

use crate::desired::DesiredState;
use crate::diff::{groups_equal, plan_grant_changes};
use crate::error::ReconcileResult;
use crate::observation::Observation;

/// Drives a [`bbsync_client::RepositoryService`] towards declared state.
#[derive(Clone)]
pub struct RepositoryReconciler {
    service: DynRepositoryService,
}

impl RepositoryReconciler {
    pub fn new(service: DynRepositoryService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &DynRepositoryService {
        &self.service
    }

    /// Compare the remote repository with its declaration.
    ///
    /// A repository that does not exist is reported as
    /// [`ResourceState::Missing`](crate::ResourceState::Missing), not as an
    /// error. Any other failure is returned with its classification intact.
    pub async fn observe(
        &self,
        desired: &DesiredState,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Observation> {
        desired.validate()?;
        let reference = desired.reference();

        let remote = match self.service.get(&reference, cancel).await {
            Ok(remote) => remote,
            Err(e) if e.is_not_found() => {
                tracing::info!(repository = %reference, "repository missing");
                return Ok(Observation::missing());
            }
            Err(e) => return Err(e.into()),
        };

        // Grants are only fetched when the repository itself matches.
        if remote.description != desired.description() {
            tracing::info!(repository = %reference, id = ?remote.id, "description drifted");
            return Ok(Observation::out_of_date(remote.id));
        }
        if remote.public != desired.public {
            tracing::info!(
                repository = %reference,
                id = ?remote.id,
                public = remote.public,
                "visibility drifted"
            );
            return Ok(Observation::out_of_date(remote.id));
        }

        let remote_groups = self.service.get_groups(&reference, cancel).await?;
        if !groups_equal(&desired.groups, &remote_groups) {
            tracing::info!(
                repository = %reference,
                id = ?remote.id,
                desired = desired.groups.len(),
                remote = remote_groups.len(),
                "group grants drifted"
            );
            return Ok(Observation::out_of_date(remote.id));
        }

        tracing::debug!(repository = %reference, id = ?remote.id, "repository up to date");
        Ok(Observation::up_to_date(remote.id))
    }

    /// Create the repository, then grant each declared group in order.
    ///
    /// A failed grant leaves the repository and earlier grants in place.
    pub async fn create(
        &self,
        desired: &DesiredState,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Repository> {
        desired.validate()?;
        let reference = desired.reference();

        let created = self.service.create(&desired.to_repository(), cancel).await?;
        for grant in &desired.groups {
            self.service.add_group(&reference, grant, cancel).await?;
            tracing::debug!(
                repository = %reference,
                group = %grant.name,
                permission = %grant.permission,
                "group granted"
            );
        }

        tracing::info!(
            repository = %reference,
            id = ?created.id,
            groups = desired.groups.len(),
            "repository created"
        );
        Ok(created)
    }

    /// Overwrite the repository, upsert every declared grant, then revoke
    /// grants for groups that are no longer declared.
    pub async fn update(
        &self,
        desired: &DesiredState,
        cancel: &CancellationToken,
    ) -> ReconcileResult<Repository> {
        desired.validate()?;
        let reference = desired.reference();

        let updated = self.service.update(&desired.to_repository(), cancel).await?;
        let remote_groups = self.service.get_groups(&reference, cancel).await?;
        let plan = plan_grant_changes(&desired.groups, &remote_groups);

        for grant in &plan.upserts {
            self.service.add_group(&reference, grant, cancel).await?;
        }
        for grant in &plan.revokes {
            self.service.revoke_group(&reference, grant, cancel).await?;
            tracing::debug!(repository = %reference, group = %grant.name, "group revoked");
        }

        tracing::info!(
            repository = %reference,
            id = ?updated.id,
            upserted = plan.upserts.len(),
            revoked = plan.revokes.len(),
            "repository updated"
        );
        Ok(updated)
    }

    /// Delete the repository. Its grants are removed by the server.
    pub async fn delete(
        &self,
        desired: &DesiredState,
        cancel: &CancellationToken,
    ) -> ReconcileResult<()> {
        let reference = desired.reference();
        self.service.delete(&reference, cancel).await?;
        tracing::info!(repository = %reference, "repository deleted");
        Ok(())
    }
}

impl std::fmt::Debug for RepositoryReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryReconciler").finish_non_exhaustive()
    }
}
