//! The retrieval pipeline.
//!
//! [`RetrievalService::retrieve`] runs, in order:
//!
//! 1. revision validation (no repository I/O happens before this succeeds),
//! 2. repository open,
//! 3. commit and root tree resolution,
//! 4. path location,
//! 5. content stream open,
//! 6. sink acquisition and streaming copy.
//!
//! The sink is only requested once steps 1 to 5 have succeeded. An HTTP caller can therefore
//! treat the sink request as the point where a success status is committed: every failure before
//! it is reportable as an error status, every failure after it is a truncated body.
//!
//! [`RetrievalService::content_length`] stops after step 5, for callers that only need the size.

use crate::repo::{GitRepositoryAccess, RepositoryAccess};
use crate::routes::Route;
use crate::stream::ContentStream;
use crate::validation::RevisionId;
use crate::RetrievalResult;
use std::io::Write;

pub struct RetrievalService {
    access: Box<dyn RepositoryAccess>,
}

impl RetrievalService {
    /// A service that opens repositories with libgit2.
    pub fn new() -> Self {
        Self::with_access(GitRepositoryAccess)
    }

    pub fn with_access(access: impl RepositoryAccess + 'static) -> Self {
        Self {
            access: Box::new(access),
        }
    }

    /// Stream the file served by `route` as it was at `revision`.
    ///
    /// `open_sink` is called at most once, with the blob length, after the blob has been located
    /// and opened. It is not called if any earlier stage fails. Returns the number of bytes
    /// written.
    ///
    /// # Errors
    ///
    /// Returns the `RetrievalError` of the first stage that fails. Use
    /// [`RetrievalError::stage`](crate::RetrievalError::stage) to tell whether the sink was
    /// already handed out (`Stage::Stream` errors other than `ObjectOpen`/`ObjectDatabase`).
    pub fn retrieve<W, F>(
        &self,
        route: &Route,
        revision: &str,
        open_sink: F,
    ) -> RetrievalResult<u64>
    where
        W: Write,
        F: FnOnce(u64) -> W,
    {
        self.with_content(route, revision, |content| {
            let mut sink = open_sink(content.len());
            content.copy_to(&mut sink)
        })
    }

    /// Run every stage up to opening the content and return the blob length without copying
    /// any bytes.
    ///
    /// # Errors
    ///
    /// Same as [`retrieve`](Self::retrieve) for the stages before streaming.
    pub fn content_length(&self, route: &Route, revision: &str) -> RetrievalResult<u64> {
        self.with_content(route, revision, |content| Ok(content.len()))
    }

    fn with_content<T, F>(
        &self,
        route: &Route,
        revision: &str,
        use_content: F,
    ) -> RetrievalResult<T>
    where
        F: FnOnce(ContentStream<'_>) -> RetrievalResult<T>,
    {
        let revision = RevisionId::parse(revision)?;

        let handle = self.access.open(route.repository())?;
        let snapshot = handle.resolve_snapshot(&revision)?;
        let blob = snapshot.locate(route.path())?;

        let odb = handle.odb()?;
        let content = ContentStream::open(&odb, &blob)?;

        tracing::info!(
            endpoint = route.endpoint(),
            hash = %revision,
            bytes = content.len(),
            "using hash {}",
            revision
        );
        tracing::debug!(
            repo = %handle.location().display(),
            commit = %snapshot.commit_id(),
            blob = %blob.id(),
            path = blob.path(),
            "located blob"
        );

        use_content(content)
    }
}

impl Default for RetrievalService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::RepositoryHandle;
    use crate::routes::{RouteEntry, RouteTable};
    use crate::test_support::{FailingWriter, FixtureRepo};
    use crate::{FailureKind, RetrievalError, Stage};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts repository opens and delegates to libgit2.
    #[derive(Clone, Default)]
    struct SpyAccess {
        opens: Arc<AtomicUsize>,
    }

    impl RepositoryAccess for SpyAccess {
        fn open(&self, location: &Path) -> RetrievalResult<RepositoryHandle> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            GitRepositoryAccess.open(location)
        }
    }

    fn route_to(repo: &Path, path: &str) -> Route {
        let table = RouteTable::build(vec![RouteEntry {
            repo_location: repo.display().to_string(),
            url: "/download".into(),
            path: path.into(),
        }])
        .unwrap();
        table.dispatch("/download").cloned().unwrap()
    }

    fn fetch(
        service: &RetrievalService,
        route: &Route,
        revision: &str,
    ) -> RetrievalResult<Vec<u8>> {
        let mut out = Vec::new();
        let sink = &mut out;
        service.retrieve(route, revision, move |_| sink)?;
        Ok(out)
    }

    #[test]
    fn streams_file_at_commit() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("path/to/file.bin", &[0x01, 0x02, 0x03])]);
        let route = route_to(fixture.path(), "path/to/file.bin");

        let body = fetch(&RetrievalService::new(), &route, &commit.to_string()).unwrap();
        assert_eq!(body, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn serves_historical_content_not_latest() {
        let fixture = FixtureRepo::new();
        let first = fixture.commit(&[("app.bin", b"version one")]);
        let second = fixture.commit(&[("app.bin", b"version two")]);
        let route = route_to(fixture.path(), "app.bin");
        let service = RetrievalService::new();

        assert_eq!(
            fetch(&service, &route, &first.to_string()).unwrap(),
            b"version one"
        );
        assert_eq!(
            fetch(&service, &route, &second.to_string()).unwrap(),
            b"version two"
        );
    }

    #[test]
    fn repeated_requests_are_identical() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("data.bin", &[9, 8, 7, 6])]);
        let route = route_to(fixture.path(), "data.bin");
        let service = RetrievalService::new();

        let first = fetch(&service, &route, &commit.to_string()).unwrap();
        for _ in 0..5 {
            assert_eq!(fetch(&service, &route, &commit.to_string()).unwrap(), first);
        }
    }

    #[test]
    fn invalid_revision_never_opens_repository() {
        let fixture = FixtureRepo::new();
        fixture.commit(&[("a.txt", b"a")]);
        let route = route_to(fixture.path(), "a.txt");

        let spy = SpyAccess::default();
        let service = RetrievalService::with_access(spy.clone());

        let upper = "A".repeat(40);
        let long = "a".repeat(41);
        for bad in ["", "XYZ", "HEAD", "abc123", upper.as_str(), long.as_str()] {
            let mut sink_opened = false;
            let err = service
                .retrieve(&route, bad, |_| {
                    sink_opened = true;
                    Vec::<u8>::new()
                })
                .unwrap_err();
            assert_eq!(err.kind(), FailureKind::BadInput);
            assert_eq!(err.stage(), Stage::Validate);
            assert!(!sink_opened);
        }

        assert_eq!(spy.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn valid_revision_opens_repository_once() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("a.txt", b"a")]);
        let route = route_to(fixture.path(), "a.txt");

        let spy = SpyAccess::default();
        let service = RetrievalService::with_access(spy.clone());
        fetch(&service, &route, &commit.to_string()).unwrap();

        assert_eq!(spy.opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_commit_is_not_found_before_sink() {
        let fixture = FixtureRepo::new();
        fixture.commit(&[("a.txt", b"a")]);
        let route = route_to(fixture.path(), "a.txt");

        let mut sink_opened = false;
        let err = RetrievalService::new()
            .retrieve(&route, &"f".repeat(40), |_| {
                sink_opened = true;
                Vec::<u8>::new()
            })
            .unwrap_err();

        assert!(matches!(err, RetrievalError::CommitNotFound(_)));
        assert_eq!(err.stage(), Stage::Resolve);
        assert!(!sink_opened);
    }

    #[test]
    fn file_absent_at_revision_is_not_found() {
        let fixture = FixtureRepo::new();
        fixture.commit(&[("a.txt", b"a"), ("b.txt", b"b")]);
        let without_b = fixture.remove("b.txt");
        let route = route_to(fixture.path(), "b.txt");

        let err = fetch(&RetrievalService::new(), &route, &without_b.to_string()).unwrap_err();
        assert!(matches!(err, RetrievalError::PathNotFound { .. }));
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn directory_route_is_not_found() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("builds/app.bin", b"x")]);
        let route = route_to(fixture.path(), "builds");

        let err = fetch(&RetrievalService::new(), &route, &commit.to_string()).unwrap_err();
        assert!(matches!(err, RetrievalError::NotAFile(_)));
    }

    #[test]
    fn missing_repository_is_environment_failure() {
        let fixture = FixtureRepo::new();
        let route = route_to(&fixture.path().join("missing"), "a.txt");

        let err = fetch(&RetrievalService::new(), &route, &"a".repeat(40)).unwrap_err();
        assert!(matches!(err, RetrievalError::RepositoryOpen { .. }));
        assert_eq!(err.kind(), FailureKind::Environment);
        assert_eq!(err.stage(), Stage::Open);
    }

    #[test]
    fn content_length_reads_no_bytes() {
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("a.bin", b"12345")]);
        let route = route_to(fixture.path(), "a.bin");

        let len = RetrievalService::new()
            .content_length(&route, &commit.to_string())
            .unwrap();
        assert_eq!(len, 5);
    }

    #[test]
    fn content_length_validates_before_opening() {
        let fixture = FixtureRepo::new();
        fixture.commit(&[("a.bin", b"12345")]);
        let route = route_to(fixture.path(), "a.bin");

        let spy = SpyAccess::default();
        let service = RetrievalService::with_access(spy.clone());
        let err = service.content_length(&route, "XYZ").unwrap_err();
        assert_eq!(err.kind(), FailureKind::BadInput);
        assert_eq!(spy.opens.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn serves_packed_repository() {
        let payload: Vec<u8> = (0..(3 * 1024 * 1024)).map(|i| (i % 241) as u8).collect();
        let fixture = FixtureRepo::new();
        let commit = fixture.commit(&[("builds/app.exe", payload.as_slice())]);
        fixture.pack_objects();
        let route = route_to(fixture.path(), "builds/app.exe");

        let body = fetch(&RetrievalService::new(), &route, &commit.to_string()).unwrap();
        assert_eq!(body.len(), payload.len());
        assert_eq!(body, payload);
    }

    #[test]
    fn sink_failure_surfaces_as_stream_error() {
        let fixture = FixtureRepo::new();
        let payload = vec![7u8; 1024];
        let commit = fixture.commit(&[("a.bin", payload.as_slice())]);
        let route = route_to(fixture.path(), "a.bin");

        let err = RetrievalService::new()
            .retrieve(&route, &commit.to_string(), |_| FailingWriter::after(100))
            .unwrap_err();
        assert!(matches!(err, RetrievalError::StreamWrite(_)));
        assert_eq!(err.stage(), Stage::Stream);
    }
}
