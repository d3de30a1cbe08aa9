//! Reconciliation errors.

use bbsync_client::{ClientError, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A remote call failed. The classification is the client's.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The declaration cannot be reconciled as written.
    #[error("invalid desired state for {repository}: {reason}")]
    InvalidDesiredState { repository: String, reason: String },
}

impl ReconcileError {
    pub fn invalid(repository: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDesiredState {
            repository: repository.into(),
            reason: reason.into(),
        }
    }

    /// Classification of the underlying failure.
    ///
    /// Rejected declarations never reach the server and report `Malformed`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Client(e) => e.kind(),
            Self::InvalidDesiredState { .. } => ErrorKind::Malformed,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}

pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
