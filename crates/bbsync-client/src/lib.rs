//! # bbsync-client
//!
//! Typed client for the Bitbucket Server REST API (`/rest/api/1.0/`).
//!
//! The crate has three layers:
//! - [`Client`]: the transport. Builds authenticated requests, executes them
//!   against a cancellation token and classifies every failure into an
//!   [`ErrorKind`].
//! - [`RepositoryService`]: repository CRUD plus group permission grants.
//!   [`HttpRepositoryService`] talks to a server, [`InMemoryRepositoryService`]
//!   keeps state in process.
//! - [`connect`]: builds a client from [`ConnectionSettings`] and verifies it
//!   with one liveness check.
//!
//! ## Example
//!
//! ```ignore
//! use bbsync_client::{ConnectionSettings, RepositoryRef, RepositoryService, connect};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let settings = ConnectionSettings::new("https://bitbucket.example.com", token);
//! let service = connect(&settings, &cancel).await?;
//!
//! let repo = service.get(&RepositoryRef::new("CORE", "svc"), &cancel).await?;
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod tls;
pub mod types;

pub use client::{API_PATH, Client, RawResponse, check_status, decode_response};
pub use connection::{ConnectionSettings, DEFAULT_TIMEOUT, connect};
pub use error::{ClientError, ClientResult, ErrorKind};
pub use memory::{InMemoryRepositoryService, Operation, RecordedCall};
pub use repository::{DynRepositoryService, HttpRepositoryService, RepositoryService};
pub use tls::TrustRoots;
pub use types::{GroupGrant, Permission, Repository, RepositoryRef};
