//! Commit snapshots and path location.
//!
//! A [`Snapshot`] is the root tree of one commit. [`Snapshot::locate`] walks it one path segment
//! at a time and returns a [`BlobRef`] that is enough to open a content stream without walking
//! the tree again.
//!
//! ## Path rules
//!
//! Paths are slash-separated and relative to the snapshot root:
//!
//! - leading and trailing `/` are ignored (`/builds/app.bin` == `builds/app.bin`),
//! - empty interior segments (`a//b`), `.` and `..` never match an entry,
//! - the final entry must be a blob: regular files, executables and symlinks qualify; trees and
//!   submodule commits do not.

use crate::{RetrievalError, RetrievalResult};

/// The root tree of a resolved commit.
pub struct Snapshot<'repo> {
    repo: &'repo git2::Repository,
    commit_id: git2::Oid,
    tree: git2::Tree<'repo>,
}

/// Reference to a located blob.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlobRef {
    pub(crate) id: git2::Oid,
    pub(crate) path: String,
}

impl BlobRef {
    pub fn id(&self) -> git2::Oid {
        self.id
    }

    /// The normalised path the blob was found at.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl<'repo> Snapshot<'repo> {
    pub(crate) fn new(
        repo: &'repo git2::Repository,
        commit_id: git2::Oid,
        tree: git2::Tree<'repo>,
    ) -> Self {
        Self {
            repo,
            commit_id,
            tree,
        }
    }

    pub fn commit_id(&self) -> git2::Oid {
        self.commit_id
    }

    /// Walk the snapshot to the blob stored at `path`.
    ///
    /// # Errors
    ///
    /// - `PathNotFound` if a segment is missing, is `.`/`..`/empty, or an intermediate segment
    ///   is not a directory,
    /// - `NotAFile` if the final entry is a directory or submodule,
    /// - `TreeLookup` if a sub-tree object cannot be loaded.
    pub fn locate(&self, path: &str) -> RetrievalResult<BlobRef> {
        let normalised = path.trim_matches('/');
        let segments: Vec<&str> = normalised.split('/').collect();

        let mut current: Option<git2::Tree<'repo>> = None;

        for (index, segment) in segments.iter().enumerate() {
            if matches!(*segment, "" | "." | "..") {
                return Err(RetrievalError::PathNotFound {
                    path: path.to_string(),
                    segment: (*segment).to_string(),
                });
            }

            let (kind, id) = {
                let tree = current.as_ref().unwrap_or(&self.tree);
                let entry = tree
                    .get_name(segment)
                    .ok_or_else(|| RetrievalError::PathNotFound {
                        path: path.to_string(),
                        segment: (*segment).to_string(),
                    })?;
                (entry.kind(), entry.id())
            };

            let is_last = index + 1 == segments.len();
            match (kind, is_last) {
                (Some(git2::ObjectType::Blob), true) => {
                    return Ok(BlobRef {
                        id,
                        path: normalised.to_string(),
                    });
                }
                (_, true) => return Err(RetrievalError::NotAFile(path.to_string())),
                (Some(git2::ObjectType::Tree), false) => {
                    let next = self
                        .repo
                        .find_tree(id)
                        .map_err(RetrievalError::TreeLookup)?;
                    current = Some(next);
                }
                (_, false) => {
                    return Err(RetrievalError::PathNotFound {
                        path: path.to_string(),
                        segment: (*segment).to_string(),
                    });
                }
            }
        }

        // `split` always yields at least one segment, so the loop returns before this point.
        Err(RetrievalError::PathNotFound {
            path: path.to_string(),
            segment: String::new(),
        })
    }
}

impl std::fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("commit_id", &self.commit_id)
            .field("tree_id", &self.tree.id())
            .finish_non_exhaustive()
    }
}
