//! # pinfile core
//!
//! Commit-addressed file retrieval for pinfile.
//!
//! This crate serves "the bytes this file had at commit X" out of local Git repositories:
//! - revision validation (`validation`): full 40 character lowercase hex ids only
//! - repository access (`repo`): one read handle per request, no caching
//! - snapshot resolution and path location (`snapshot`)
//! - blob streaming (`stream`)
//! - the route table mapping endpoints to (repository, path) pairs (`routes`), loaded from YAML
//!   configuration (`config`)
//!
//! **No HTTP concerns**: routing requests, status codes and servers belong in `api-rest`.

pub mod config;
pub mod constants;
pub mod error;
pub mod repo;
pub mod routes;
pub mod service;
pub mod snapshot;
pub mod stream;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod test_support;

pub use config::ServiceConfig;
pub use error::{ConfigError, ConfigResult, FailureKind, RetrievalError, RetrievalResult, Stage};
pub use repo::{GitRepositoryAccess, RepositoryAccess, RepositoryHandle};
pub use routes::{Route, RouteEntry, RouteTable};
pub use service::RetrievalService;
pub use snapshot::{BlobRef, Snapshot};
pub use stream::ContentStream;
pub use validation::RevisionId;
