use crate::constants::INVALID_REVISION_MESSAGE;
use std::path::PathBuf;

/// Pipeline stage at which a retrieval failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    Validate,
    Open,
    Resolve,
    Locate,
    Stream,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Open => "open",
            Self::Resolve => "resolve",
            Self::Locate => "locate",
            Self::Stream => "stream",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure class, used by callers to pick a user-facing response.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FailureKind {
    /// The client sent something malformed. No repository I/O happened.
    BadInput,
    /// The revision or path does not exist in the repository.
    NotFound,
    /// The repository could not be opened or its objects could not be read.
    Environment,
    /// Copying bytes to the sink failed.
    Stream,
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("{}", INVALID_REVISION_MESSAGE)]
    InvalidRevision(String),
    #[error("failed to open git repository at {}: {source}", .location.display())]
    RepositoryOpen {
        location: PathBuf,
        #[source]
        source: git2::Error,
    },
    #[error("object not found - no match for id ({0})")]
    CommitNotFound(String),
    #[error("failed to look up commit: {0}")]
    CommitLookup(git2::Error),
    #[error("failed to find git tree: {0}")]
    SnapshotTree(git2::Error),
    #[error("file not found: {path} (no entry for '{segment}')")]
    PathNotFound { path: String, segment: String },
    #[error("file not found: {0} is not a file")]
    NotAFile(String),
    #[error("failed to load sub-tree: {0}")]
    TreeLookup(git2::Error),
    #[error("failed to open object database: {0}")]
    ObjectDatabase(git2::Error),
    #[error("failed to open blob: {0}")]
    ObjectOpen(git2::Error),
    #[error("failed to read blob: {0}")]
    StreamRead(std::io::Error),
    #[error("failed to write response: {0}")]
    StreamWrite(std::io::Error),
}

impl RetrievalError {
    /// Stage of the pipeline that produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::InvalidRevision(_) => Stage::Validate,
            Self::RepositoryOpen { .. } => Stage::Open,
            Self::CommitNotFound(_) | Self::CommitLookup(_) | Self::SnapshotTree(_) => {
                Stage::Resolve
            }
            Self::PathNotFound { .. } | Self::NotAFile(_) | Self::TreeLookup(_) => Stage::Locate,
            Self::ObjectDatabase(_)
            | Self::ObjectOpen(_)
            | Self::StreamRead(_)
            | Self::StreamWrite(_) => Stage::Stream,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::InvalidRevision(_) => FailureKind::BadInput,
            Self::CommitNotFound(_) | Self::PathNotFound { .. } | Self::NotAFile(_) => {
                FailureKind::NotFound
            }
            Self::RepositoryOpen { .. }
            | Self::CommitLookup(_)
            | Self::SnapshotTree(_)
            | Self::TreeLookup(_)
            | Self::ObjectDatabase(_)
            | Self::ObjectOpen(_) => FailureKind::Environment,
            Self::StreamRead(_) | Self::StreamWrite(_) => FailureKind::Stream,
        }
    }
}

pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("malformed config: entry {index} is missing '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("malformed config: endpoint '{0}' must start with '/'")]
    InvalidEndpoint(String),
    #[error("malformed config: endpoint '{0}' is configured more than once")]
    DuplicateEndpoint(String),
    #[error("malformed config: endpoint '{0}' is reserved")]
    ReservedEndpoint(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
