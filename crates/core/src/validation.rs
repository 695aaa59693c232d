//! Revision identifier validation.
//!
//! Revision strings arrive from untrusted query parameters. They are checked here before they are
//! ever used to address the object database: only a full, lowercase, 40 character hex object id
//! is accepted. Short ids, uppercase hex and symbolic names (`HEAD`, branches, tags) are rejected.

use crate::constants::REVISION_HEX_LEN;
use crate::{RetrievalError, RetrievalResult};
use std::fmt;
use std::str::FromStr;

/// A validated, fully-qualified commit id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct RevisionId(git2::Oid);

impl RevisionId {
    /// Validates `input` and converts it into a `RevisionId`.
    ///
    /// The whole string must be exactly [`REVISION_HEX_LEN`] characters from `[0-9a-f]`.
    /// Nothing is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::InvalidRevision` for any other shape.
    pub fn parse(input: &str) -> RetrievalResult<Self> {
        if !is_full_lowercase_hex(input) {
            return Err(RetrievalError::InvalidRevision(input.to_string()));
        }

        git2::Oid::from_str(input)
            .map(Self)
            .map_err(|_| RetrievalError::InvalidRevision(input.to_string()))
    }

    pub fn oid(&self) -> git2::Oid {
        self.0
    }
}

impl FromStr for RevisionId {
    type Err = RetrievalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

fn is_full_lowercase_hex(input: &str) -> bool {
    input.len() == REVISION_HEX_LEN && input.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
