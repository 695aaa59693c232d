//! Constants used throughout the pinfile core crate.
//!
//! Wire-facing strings and sizing knobs live here so the HTTP layer, the CLI and the tests agree
//! on them.

/// Number of hexadecimal characters in a full revision identifier.
pub const REVISION_HEX_LEN: usize = 40;

/// Liveness probe endpoint. Configured routes may not use it.
pub const READY_ENDPOINT: &str = "/ready";

/// Body returned by the liveness probe.
pub const READY_BODY: &str = "OK";

/// Message returned to clients whose revision identifier fails validation.
pub const INVALID_REVISION_MESSAGE: &str = "Invalid commit hash. It should contain only numbers and characters from a to f and be exactly 40 characters long.";

/// Size of each chunk copied from a blob to its sink.
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
