//! Reconciliation of Bitbucket Server repositories against declared state.
//!
//! [`RepositoryReconciler::observe`] reports whether a repository is missing,
//! out of date or up to date; `create`, `update` and `delete` converge it.
//! The engine works against any [`bbsync_client::RepositoryService`].

pub mod desired;
pub mod diff;
pub mod engine;
pub mod error;
pub mod observation;

pub use desired::DesiredState;
pub use diff::{GrantPlan, groups_equal, plan_grant_changes};
pub use engine::RepositoryReconciler;
pub use error::{ReconcileError, ReconcileResult};
pub use observation::{Observation, ResourceState};
