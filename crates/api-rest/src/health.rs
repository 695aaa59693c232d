use pinfile_core::constants::READY_BODY;

/// Liveness probe.
///
/// Always answers `200 OK` while the process is serving. It does not touch any repository.
pub async fn ready() -> &'static str {
    READY_BODY
}
