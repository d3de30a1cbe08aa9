//! Outcome of observing a repository.

use std::fmt;

/// How the remote repository compares to its declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// The repository does not exist.
    Missing,
    /// The repository exists but differs in description, visibility or grants.
    OutOfDate,
    UpToDate,
}

impl ResourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::OutOfDate => "out-of-date",
            Self::UpToDate => "up-to-date",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub state: ResourceState,
    /// Server-assigned id, present whenever the repository exists.
    pub id: Option<i64>,
}

impl Observation {
    pub fn missing() -> Self {
        Self {
            state: ResourceState::Missing,
            id: None,
        }
    }

    pub fn out_of_date(id: Option<i64>) -> Self {
        Self {
            state: ResourceState::OutOfDate,
            id,
        }
    }

    pub fn up_to_date(id: Option<i64>) -> Self {
        Self {
            state: ResourceState::UpToDate,
            id,
        }
    }

    pub fn exists(&self) -> bool {
        self.state != ResourceState::Missing
    }

    pub fn is_up_to_date(&self) -> bool {
        self.state == ResourceState::UpToDate
    }
}
