//! Error taxonomy for Bitbucket Server API calls.
//!
//! The transport layer is the only place where HTTP outcomes are classified.
//! Callers inspect [`ClientError::kind`] instead of matching on status codes.

use reqwest::StatusCode;

/// Errors returned by the transport client and the resource clients built on it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered 404.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that was requested.
        url: String,
    },

    /// The server answered 401.
    #[error("permission denied: {url}")]
    PermissionDenied {
        /// The URL that was requested.
        url: String,
    },

    /// The server answered 409.
    #[error("conflict: {url}")]
    Conflict {
        /// The URL that was requested.
        url: String,
    },

    /// Any other status at or above 400.
    #[error("{url} returned {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The status code the server answered with.
        status: StatusCode,
    },

    /// The response body is not valid JSON.
    #[error("response malformed: {url}: {source}")]
    Malformed {
        /// The URL that was requested.
        url: String,
        /// The underlying syntax error.
        #[source]
        source: serde_json::Error,
    },

    /// The response body is valid JSON but does not match the expected shape.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// The underlying data error.
        #[source]
        source: serde_json::Error,
    },

    /// A decode target was supplied but the server sent no content.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL that was requested.
        url: String,
    },

    /// A paged listing pointed back at a page it had already served.
    #[error("paging stalled at {url}: next page start {next} does not pass {start}")]
    StalledPage {
        /// The URL of the offending page.
        url: String,
        /// Start of the page that was served.
        start: u64,
        /// The `nextPageStart` it announced.
        next: u64,
    },

    /// The request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// Network failure, timeout, or request construction failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The base URL or a derived endpoint could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// A configured header value is not a valid HTTP header.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The call was cancelled before it completed.
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    /// Classify a non-success status code.
    ///
    /// Returns `None` for statuses below 400.
    pub fn from_status(url: impl Into<String>, status: StatusCode) -> Option<Self> {
        let url = url.into();
        match status {
            StatusCode::NOT_FOUND => Some(Self::NotFound { url }),
            StatusCode::UNAUTHORIZED => Some(Self::PermissionDenied { url }),
            StatusCode::CONFLICT => Some(Self::Conflict { url }),
            s if s.as_u16() >= 400 => Some(Self::Status { url, status: s }),
            _ => None,
        }
    }

    /// Classify a JSON decoding failure.
    ///
    /// Syntax errors and truncated bodies are [`ClientError::Malformed`];
    /// structural mismatches stay generic decode errors.
    pub fn from_decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        use serde_json::error::Category;

        let url = url.into();
        match source.classify() {
            Category::Syntax | Category::Eof => Self::Malformed { url, source },
            Category::Data | Category::Io => Self::Decode { url, source },
        }
    }

    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Malformed { .. } => ErrorKind::Malformed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Status { .. }
            | Self::Decode { .. }
            | Self::EmptyBody { .. }
            | Self::StalledPage { .. }
            | Self::Encode(_)
            | Self::Http(_)
            | Self::InvalidUrl(_)
            | Self::InvalidHeader(_) => ErrorKind::Transport,
        }
    }

    /// Whether the remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Error categories exposed to callers that decide retry and alerting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    Conflict,
    Malformed,
    Transport,
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::PermissionDenied => write!(f, "permission"),
            Self::Conflict => write!(f, "conflict"),
            Self::Malformed => write!(f, "response_malformed"),
            Self::Transport => write!(f, "transport"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Convenience result type for client operations
pub type ClientResult<T> = std::result::Result<T, ClientError>;
