//! Blob content streaming.
//!
//! libgit2 can stream loose objects straight from disk, but its pack backend does not support
//! read streams. [`ContentStream::open`] prefers the streaming reader and falls back to the
//! inflated object when the backend refuses, so callers always get a `Read` over the blob bytes.
//!
//! Packed blobs are therefore inflated fully into memory before the copy starts; only loose
//! objects are streamed in bounded chunks.
//!
//! `OdbReader::read` reports the requested length rather than the bytes produced and never
//! signals end of stream, so the streamed variant is capped at the blob length with
//! [`Read::take`].

use crate::constants::STREAM_CHUNK_SIZE;
use crate::snapshot::BlobRef;
use crate::{RetrievalError, RetrievalResult};
use std::io::{self, Read, Write};

/// Forward-only reader over a blob's bytes.
pub enum ContentStream<'odb> {
    Streamed {
        reader: io::Take<git2::OdbReader<'odb>>,
        len: u64,
    },
    Buffered {
        object: git2::OdbObject<'odb>,
        pos: usize,
    },
}

impl<'odb> ContentStream<'odb> {
    /// Open a stream over the blob referenced by `blob`.
    ///
    /// # Errors
    ///
    /// Returns `RetrievalError::ObjectOpen` if the object cannot be read from the database.
    pub fn open(odb: &'odb git2::Odb<'_>, blob: &BlobRef) -> RetrievalResult<Self> {
        match odb.reader(blob.id()) {
            Ok((reader, len, _)) => {
                let len = len as u64;
                Ok(Self::Streamed {
                    reader: reader.take(len),
                    len,
                })
            }
            Err(e) => {
                tracing::debug!(
                    "read stream unavailable for {} ({}), reading object",
                    blob.id(),
                    e.message()
                );
                Self::open_buffered(odb, blob)
            }
        }
    }

    pub(crate) fn open_buffered(
        odb: &'odb git2::Odb<'_>,
        blob: &BlobRef,
    ) -> RetrievalResult<Self> {
        let object = odb.read(blob.id()).map_err(RetrievalError::ObjectOpen)?;
        Ok(Self::Buffered { object, pos: 0 })
    }

    /// Size of the blob in bytes.
    pub fn len(&self) -> u64 {
        match self {
            Self::Streamed { len, .. } => *len,
            Self::Buffered { object, .. } => object.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the whole blob into `sink`, consuming the stream.
    ///
    /// Returns the number of bytes written. A failure part-way through leaves whatever was
    /// already written in the sink.
    ///
    /// # Errors
    ///
    /// - `StreamRead` if reading the object fails,
    /// - `StreamWrite` if the sink rejects a write or flush.
    pub fn copy_to<W: Write>(mut self, sink: &mut W) -> RetrievalResult<u64> {
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        let mut written = 0u64;

        loop {
            let n = match self.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RetrievalError::StreamRead(e)),
            };

            sink.write_all(&buf[..n]).map_err(RetrievalError::StreamWrite)?;
            written += n as u64;
        }

        sink.flush().map_err(RetrievalError::StreamWrite)?;
        Ok(written)
    }
}

impl Read for ContentStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Streamed { reader, .. } => reader.read(buf),
            Self::Buffered { object, pos } => {
                let remaining = &object.data()[*pos..];
                let n = remaining.len().min(buf.len());
                buf[..n].copy_from_slice(&remaining[..n]);
                *pos += n;
                Ok(n)
            }
        }
    }
}
