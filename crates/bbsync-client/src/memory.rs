//! In-memory [`RepositoryService`].
//!
//! Mirrors the server contract closely enough to drive the reconciliation
//! engine without a network: ids are assigned on create, missing
//! repositories answer `NotFound`, duplicates answer `Conflict` and grants
//! follow the same overwrite semantics. Every call is journaled, and faults
//! can be queued per operation.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult, ErrorKind};
use crate::repository::{DynRepositoryService, RepositoryService};
use crate::types::{GroupGrant, Repository, RepositoryRef};

/// The operations of [`RepositoryService`], used to target injected faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Create,
    Update,
    Delete,
    GetGroups,
    AddGroup,
    RevokeGroup,
}

/// One call made against the service, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Get(RepositoryRef),
    Create(Repository),
    Update(Repository),
    Delete(RepositoryRef),
    GetGroups(RepositoryRef),
    AddGroup(RepositoryRef, GroupGrant),
    RevokeGroup(RepositoryRef, GroupGrant),
}

impl RecordedCall {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Get(_) => Operation::Get,
            Self::Create(_) => Operation::Create,
            Self::Update(_) => Operation::Update,
            Self::Delete(_) => Operation::Delete,
            Self::GetGroups(_) => Operation::GetGroups,
            Self::AddGroup(..) => Operation::AddGroup,
            Self::RevokeGroup(..) => Operation::RevokeGroup,
        }
    }
}

#[derive(Debug)]
struct StoredRepository {
    repository: Repository,
    /// Insertion order is the order `get_groups` reports.
    grants: Vec<GroupGrant>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    repositories: HashMap<RepositoryRef, StoredRepository>,
    calls: Vec<RecordedCall>,
    faults: HashMap<Operation, VecDeque<ErrorKind>>,
}

/// Repository service that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRepositoryService {
    state: Mutex<State>,
}

impl InMemoryRepositoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed a repository with grants, bypassing the journal.
    ///
    /// Assigns an id when the record has none.
    pub fn insert(&self, mut repository: Repository, grants: Vec<GroupGrant>) -> Repository {
        let mut state = self.state.lock();
        if repository.id.is_none() {
            repository.id = Some(state.allocate_id());
        }
        state.repositories.insert(
            repository.reference(),
            StoredRepository {
                repository: repository.clone(),
                grants,
            },
        );
        repository
    }

    /// Current state of a repository, without journaling.
    pub fn repository(&self, repo: &RepositoryRef) -> Option<Repository> {
        self.state
            .lock()
            .repositories
            .get(repo)
            .map(|stored| stored.repository.clone())
    }

    /// Current grants of a repository, without journaling.
    pub fn grants(&self, repo: &RepositoryRef) -> Option<Vec<GroupGrant>> {
        self.state
            .lock()
            .repositories
            .get(repo)
            .map(|stored| stored.grants.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Calls made so far, excluding read-only operations.
    pub fn mutations(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call.operation(), Operation::Get | Operation::GetGroups))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Make the next call of `operation` fail with an error of `kind`.
    ///
    /// Faults queue up: calling this twice fails the next two calls.
    pub fn fail_next(&self, operation: Operation, kind: ErrorKind) {
        self.state
            .lock()
            .faults
            .entry(operation)
            .or_default()
            .push_back(kind);
    }

    pub fn into_dyn(self) -> DynRepositoryService {
        Arc::new(self)
    }

    /// Journal the call, then apply cancellation and injected faults.
    fn begin(&self, call: RecordedCall, cancel: &CancellationToken) -> ClientResult<()> {
        let operation = call.operation();
        let url = memory_url(&call);
        let mut state = self.state.lock();
        state.calls.push(call);

        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled);
        }
        match state.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(kind) => Err(error_for(kind, url)),
            None => Ok(()),
        }
    }
}

impl State {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn stored_mut(&mut self, repo: &RepositoryRef) -> ClientResult<&mut StoredRepository> {
        self.repositories
            .get_mut(repo)
            .ok_or_else(|| ClientError::NotFound {
                url: format!("memory://{repo}"),
            })
    }
}

fn memory_url(call: &RecordedCall) -> String {
    let repo = match call {
        RecordedCall::Create(r) | RecordedCall::Update(r) => r.reference(),
        RecordedCall::Get(r)
        | RecordedCall::Delete(r)
        | RecordedCall::GetGroups(r)
        | RecordedCall::AddGroup(r, _)
        | RecordedCall::RevokeGroup(r, _) => r.clone(),
    };
    format!("memory://{repo}")
}

fn error_for(kind: ErrorKind, url: String) -> ClientError {
    match kind {
        ErrorKind::NotFound => ClientError::NotFound { url },
        ErrorKind::PermissionDenied => ClientError::PermissionDenied { url },
        ErrorKind::Conflict => ClientError::Conflict { url },
        ErrorKind::Malformed => ClientError::Malformed {
            url,
            source: serde::de::Error::custom("injected malformed response"),
        },
        ErrorKind::Transport => ClientError::Status {
            url,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        },
        ErrorKind::Cancelled => ClientError::Cancelled,
    }
}

#[async_trait]
impl RepositoryService for InMemoryRepositoryService {
    async fn get(
        &self,
        repo: &RepositoryRef,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        self.begin(RecordedCall::Get(repo.clone()), cancel)?;
        let mut state = self.state.lock();
        Ok(state.stored_mut(repo)?.repository.clone())
    }

    async fn create(
        &self,
        repo: &Repository,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        self.begin(RecordedCall::Create(repo.clone()), cancel)?;
        let mut state = self.state.lock();
        let reference = repo.reference();
        if state.repositories.contains_key(&reference) {
            return Err(ClientError::Conflict {
                url: format!("memory://{reference}"),
            });
        }
        let created = Repository {
            id: Some(state.allocate_id()),
            ..repo.clone()
        };
        state.repositories.insert(
            reference,
            StoredRepository {
                repository: created.clone(),
                grants: Vec::new(),
            },
        );
        Ok(created)
    }

    async fn update(
        &self,
        repo: &Repository,
        cancel: &CancellationToken,
    ) -> ClientResult<Repository> {
        self.begin(RecordedCall::Update(repo.clone()), cancel)?;
        let mut state = self.state.lock();
        let stored = state.stored_mut(&repo.reference())?;
        stored.repository.description = repo.description.clone();
        stored.repository.public = repo.public;
        Ok(stored.repository.clone())
    }

    async fn delete(&self, repo: &RepositoryRef, cancel: &CancellationToken) -> ClientResult<()> {
        self.begin(RecordedCall::Delete(repo.clone()), cancel)?;
        let mut state = self.state.lock();
        state.stored_mut(repo)?;
        state.repositories.remove(repo);
        Ok(())
    }

    async fn get_groups(
        &self,
        repo: &RepositoryRef,
        cancel: &CancellationToken,
    ) -> ClientResult<Vec<GroupGrant>> {
        self.begin(RecordedCall::GetGroups(repo.clone()), cancel)?;
        let mut state = self.state.lock();
        Ok(state.stored_mut(repo)?.grants.clone())
    }

    async fn add_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.begin(RecordedCall::AddGroup(repo.clone(), grant.clone()), cancel)?;
        let mut state = self.state.lock();
        let stored = state.stored_mut(repo)?;
        match stored.grants.iter_mut().find(|g| g.name == grant.name) {
            Some(existing) => existing.permission = grant.permission,
            None => stored.grants.push(grant.clone()),
        }
        Ok(())
    }

    async fn revoke_group(
        &self,
        repo: &RepositoryRef,
        grant: &GroupGrant,
        cancel: &CancellationToken,
    ) -> ClientResult<()> {
        self.begin(RecordedCall::RevokeGroup(repo.clone(), grant.clone()), cancel)?;
        let mut state = self.state.lock();
        let stored = state.stored_mut(repo)?;
        stored.grants.retain(|g| g.name != grant.name);
        Ok(())
    }
}
