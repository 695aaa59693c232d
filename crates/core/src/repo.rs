//! Repository access.
//!
//! Repositories are pre-existing and read-only from pinfile's point of view. Each request opens
//! its own handle through a [`RepositoryAccess`] implementation and drops it when the request
//! ends; nothing is cached between requests.

use crate::snapshot::Snapshot;
use crate::validation::RevisionId;
use crate::{RetrievalError, RetrievalResult};
use std::path::{Path, PathBuf};

/// Opens read handles to repositories.
///
/// [`GitRepositoryAccess`] is the production implementation. The trait exists so callers (and
/// tests) can observe or replace how repositories are reached.
pub trait RepositoryAccess: Send + Sync {
    /// Open the repository stored at `location`.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::RepositoryOpen` if `location` does not exist, is unreadable, or
    /// does not contain a valid repository.
    fn open(&self, location: &Path) -> RetrievalResult<RepositoryHandle>;
}

/// Opens repositories with libgit2.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitRepositoryAccess;

impl RepositoryAccess for GitRepositoryAccess {
    fn open(&self, location: &Path) -> RetrievalResult<RepositoryHandle> {
        RepositoryHandle::open(location)
    }
}

/// A read handle to one repository, owned by a single request.
pub struct RepositoryHandle {
    repo: git2::Repository,
    location: PathBuf,
}

impl RepositoryHandle {
    /// Open an existing repository at `location`.
    ///
    /// Both bare repositories and working trees are accepted. Parent directories are never
    /// searched, so a misconfigured location cannot silently resolve to an enclosing repository.
    pub fn open(location: &Path) -> RetrievalResult<Self> {
        let repo = git2::Repository::open_ext(
            location,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(|source| RetrievalError::RepositoryOpen {
            location: location.to_path_buf(),
            source,
        })?;

        Ok(Self {
            repo,
            location: location.to_path_buf(),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Resolve `revision` to its commit and return the commit's root tree.
    ///
    /// The id must address a commit exactly; there is no abbreviation matching and no fallback
    /// to a nearby revision.
    ///
    /// # Errors
    ///
    /// - `CommitNotFound` if no commit with that id exists (including ids of trees or blobs),
    /// - `CommitLookup` if the object database fails for another reason,
    /// - `SnapshotTree` if the commit's tree cannot be loaded.
    pub fn resolve_snapshot(&self, revision: &RevisionId) -> RetrievalResult<Snapshot<'_>> {
        let commit = match self.repo.find_commit(revision.oid()) {
            Ok(commit) => commit,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(RetrievalError::CommitNotFound(revision.to_string()));
            }
            Err(e) => return Err(RetrievalError::CommitLookup(e)),
        };

        let tree = commit.tree().map_err(RetrievalError::SnapshotTree)?;
        Ok(Snapshot::new(&self.repo, commit.id(), tree))
    }

    /// Open the object database for streaming blob content.
    pub fn odb(&self) -> RetrievalResult<git2::Odb<'_>> {
        self.repo.odb().map_err(RetrievalError::ObjectDatabase)
    }
}

impl std::fmt::Debug for RepositoryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryHandle")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FixtureRepo;
    use tempfile::TempDir;

    #[test]
    fn opens_working_tree_repository() {
        let fixture = FixtureRepo::new();
        let handle = RepositoryHandle::open(fixture.path()).expect("repository should open");
        assert_eq!(handle.location(), fixture.path());
    }

    #[test]
    fn opens_bare_repository() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        git2::Repository::init_bare(temp_dir.path()).expect("Failed to init bare repo");

        RepositoryHandle::open(temp_dir.path()).expect("bare repository should open");
    }

    #[test]
    fn open_fails_for_missing_location() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("does-not-exist");

        let err = RepositoryHandle::open(&missing).unwrap_err();
        match err {
            RetrievalError::RepositoryOpen { location, .. } => assert_eq!(location, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn open_fails_for_plain_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = RepositoryHandle::open(temp_dir.path()).unwrap_err();
        assert!(matches!(err, RetrievalError::RepositoryOpen { .. }));
    }

    #[test]
    fn open_does_not_search_parent_directories() {
        let fixture = FixtureRepo::new();
        let nested = fixture.path().join("nested");
        std::fs::create_dir_all(&nested).expect("Failed to create nested dir");

        let err = RepositoryHandle::open(&nested).unwrap_err();
        assert!(matches!(err, RetrievalError::RepositoryOpen { .. }));
    }

    #[test]
    fn resolve_snapshot_finds_existing_commit() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("a.txt", b"a")]);

        let handle = RepositoryHandle::open(fixture.path()).unwrap();
        let revision = RevisionId::parse(&commit.to_string()).unwrap();
        let snapshot = handle.resolve_snapshot(&revision).expect("commit should resolve");
        assert_eq!(snapshot.commit_id(), commit);
    }

    #[test]
    fn resolve_snapshot_reports_unknown_commit() {
        let fixture = FixtureRepo::new();
        fixture.commit(&[("a.txt", b"a")]);

        let handle = RepositoryHandle::open(fixture.path()).unwrap();
        let revision = RevisionId::parse("1111111111111111111111111111111111111111").unwrap();
        let err = handle.resolve_snapshot(&revision).unwrap_err();
        assert!(matches!(&err, RetrievalError::CommitNotFound(id) if id == &revision.to_string()));
        assert_eq!(err.kind(), crate::FailureKind::NotFound);
    }

    #[test]
    fn resolve_snapshot_rejects_non_commit_objects() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("a.txt", b"a")]);
        let blob = fixture.blob_id(commit, "a.txt");

        let handle = RepositoryHandle::open(fixture.path()).unwrap();
        let revision = RevisionId::parse(&blob.to_string()).unwrap();
        let err = handle.resolve_snapshot(&revision).unwrap_err();
        assert!(matches!(err, RetrievalError::CommitNotFound(_)));
    }
}
