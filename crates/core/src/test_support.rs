//! Fixture repositories and sinks for tests.
//!
//! Compiled for this crate's unit tests and, through the `testing` feature, for the test suites
//! of the crates built on top of it.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::TempDir;

/// A throwaway working-tree repository.
pub struct FixtureRepo {
    dir: TempDir,
    repo: git2::Repository,
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repo = git2::Repository::init(dir.path()).expect("Failed to init repo");
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `files` into the working tree and commit them on top of `HEAD`.
    pub fn commit(&self, files: &[(&str, &[u8])]) -> git2::Oid {
        let mut index = self.repo.index().expect("Failed to open index");

        for (rel, contents) in files {
            let full = self.dir.path().join(rel);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent dirs");
            }
            fs::write(&full, contents).expect("Failed to write fixture file");
            index.add_path(Path::new(rel)).expect("Failed to add path");
        }
        index.write().expect("Failed to write index");

        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");
        let sig = git2::Signature::now("Fixture", "fixture@example.com")
            .expect("Failed to create signature");

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, "fixture commit", &tree, &parents)
            .expect("Failed to commit")
    }

    /// Remove `rel` from the working tree and index and commit the deletion.
    pub fn remove(&self, rel: &str) -> git2::Oid {
        let mut index = self.repo.index().expect("Failed to open index");
        fs::remove_file(self.dir.path().join(rel)).expect("Failed to remove fixture file");
        index.remove_path(Path::new(rel)).expect("Failed to remove path");
        index.write().expect("Failed to write index");
        self.commit(&[])
    }

    /// Id of the blob at `rel` in `commit`.
    pub fn blob_id(&self, commit: git2::Oid, rel: &str) -> git2::Oid {
        self.repo
            .find_commit(commit)
            .and_then(|c| c.tree())
            .and_then(|t| t.get_path(Path::new(rel)))
            .map(|e| e.id())
            .expect("blob should exist in fixture commit")
    }

    /// Move everything reachable from `HEAD` into a pack and delete the loose copies, the way
    /// `git gc` leaves a repository.
    pub fn pack_objects(&self) {
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push_head().expect("Failed to push HEAD");

        let mut builder = self.repo.packbuilder().expect("Failed to create packbuilder");
        builder.insert_walk(&mut walk).expect("Failed to insert history");
        let mut buf = git2::Buf::new();
        builder.write_buf(&mut buf).expect("Failed to build pack");

        let odb = self.repo.odb().expect("Failed to open odb");
        let mut writer = odb.packwriter().expect("Failed to open packwriter");
        writer.write_all(&buf).expect("Failed to write pack");
        writer.commit().expect("Failed to index pack");

        let objects = self.repo.path().join("objects");
        for entry in fs::read_dir(&objects).expect("Failed to list objects") {
            let entry = entry.expect("Failed to read objects entry");
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.len() == 2 && name.bytes().all(|b| b.is_ascii_hexdigit()) {
                fs::remove_dir_all(entry.path()).expect("Failed to remove loose objects");
            }
        }
    }
}

/// A sink that accepts `limit` bytes and then fails every write.
pub struct FailingWriter {
    limit: usize,
    accepted: usize,
}

impl FailingWriter {
    pub fn after(limit: usize) -> Self {
        Self { limit, accepted: 0 }
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit - self.accepted;
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        let n = room.min(buf.len());
        self.accepted += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
