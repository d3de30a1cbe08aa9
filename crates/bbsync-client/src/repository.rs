//! Repository and group-permission operations.
//!
//! [`RepositoryService`] is the capability the reconciliation engine works
//! against. [`HttpRepositoryService`] binds it to a live server; the
//! in-memory implementation in [`crate::memory`] stands in for one.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::types::{GroupGrant, GroupPermissionJson, Page, Repository, RepositoryJson, RepositoryRef};

/// Operations on a single repository and its group grants.
///
/// Implementations must be thread-safe (`Send + Sync`). Every call is a single
/// attempt; retry policy belongs to the caller.
#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Fetch a repository.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` classified error if the repository does not exist.
    async fn get(&self, repo: &RepositoryRef, cancel: &CancellationToken)
    -> ClientResult<Repository>;

    /// Create a repository in `repo.project`. The returned record carries the new id.
    async fn create(&self, repo: &Repository, cancel: &CancellationToken)
    -> ClientResult<Repository>;

    /// Overwrite name, visibility and description of an existing repository.
    async fn update(&self, repo: &Repository, cancel: &CancellationToken)
    -> ClientResult<Repository>;

    /// Delete a repository. Its grants go with it.
    async fn delete(&self, repo: &RepositoryRef, cancel: &CancellationToken) -> ClientResult<()>;

    /// List group grants, in server order.
    ///
    /// Follows paging until the last page or an empty one. A listing whose
    /// next page start does not advance fails with a `Transport` error.
    async fn get_groups(
        &self,
        repo: &RepositoryRef,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupGrant>>;

    /// Grant a permission to a group, overwriting any existing grant for it.
    async fn add_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()>;

    /// Remove a group's grant. Revoking a grant that does not exist succeeds.
    async fn revoke_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()>;
}

/// Type alias for a shareable repository service.
pub type DynRepositoryService = Arc<dyn RepositoryService>;

/// [`RepositoryService`] backed by the Bitbucket Server REST API.
#[derive(Debug, Clone)]
pub struct HttpRepositoryService {
    client: Client,
}

impl HttpRepositoryService {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn into_dyn(self) -> DynRepositoryService {
        Arc::new(self)
    }
}

fn repo_path(repo: &RepositoryRef) -> [&str; 4] {
    ["projects", repo.project.as_str(), "repos", repo.name.as_str()]
}

fn groups_path(repo: &RepositoryRef) -> [&str; 6] {
    [
        "projects",
        repo.project.as_str(),
        "repos",
        repo.name.as_str(),
        "permissions",
        "groups",
    ]
}

#[async_trait]
impl RepositoryService for HttpRepositoryService {
    async fn get(
        &self,
        repo: &RepositoryRef,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        let request = self
            .client
            .request(Method::GET, &repo_path(repo), &[], None::<&()>)?;
        let json: RepositoryJson = self.client.fetch(request, cancel).await?;
        Ok(json.into())
    }

    async fn create(
        &self,
        repo: &Repository,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        let request = self.client.request(
            Method::POST,
            &["projects", repo.project.as_str(), "repos"],
            &[],
            Some(&repo.payload()),
        )?;
        let json: RepositoryJson = self.client.fetch(request, cancel).await?;
        tracing::debug!(project = %repo.project, repository = %repo.name, id = json.id, "repository created");
        Ok(json.into())
    }

    async fn update(
        &self,
        repo: &Repository,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        let reference = repo.reference();
        let request = self.client.request(
            Method::PUT,
            &repo_path(&reference),
            &[],
            Some(&repo.payload()),
        )?;
        let json: RepositoryJson = self.client.fetch(request, cancel).await?;
        Ok(json.into())
    }

    async fn delete(&self, repo: &RepositoryRef, cancel: &CancellationToken) -> ClientResult<()> {
        let request = self
            .client
            .request(Method::DELETE, &repo_path(repo), &[], None::<&()>)?;
        self.client.execute(request, cancel).await
    }

    async fn get_groups(
        &self,
        repo: &RepositoryRef,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupGrant>> {
        let mut grants = Vec::new();
        let mut start: Option<u64> = None;

        loop {
            let current = start.unwrap_or(0);
            let start_param = start.map(|s| s.to_string());
            let query: Vec<(&str, &str)> = start_param
                .as_deref()
                .map(|s| vec![("start", s)])
                .unwrap_or_default();

            let request = self
                .client
                .request(Method::GET, &groups_path(repo), &query, None::<&()>)?;
            let url = request.url().to_string();
            let page: Page<GroupPermissionJson> = self.client.fetch(request, cancel).await?;
            // An empty page ends the listing even if more are announced.
            let done = page.is_last_page || page.values.is_empty();
            grants.extend(page.values.into_iter().map(GroupGrant::from));
            if done {
                break;
            }

            match page.next_page_start {
                Some(next) if next > current => start = Some(next),
                Some(next) => return Err(ClientError::StalledPage { url, start: current, next }),
                None => break,
            }
        }

        Ok(grants)
    }

    async fn add_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.client.request(
            Method::PUT,
            &groups_path(repo),
            &[("name", grant.name.as_str()), ("permission", grant.permission.as_str())],
            None::<&()>,
        )?;
        self.client.execute(request, cancel).await
    }

    async fn revoke_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        let request = self.client.request(
            Method::DELETE,
            &groups_path(repo),
            &[("name", grant.name.as_str())],
            None::<&()>,
        )?;
        match self.client.execute(request, cancel).await {
            Err(e) if e.is_not_found() => {
                tracing::debug!(repository = %repo, group = %grant.name, "grant already absent");
                Ok(())
            }
            other => other,
        }
    }
}
