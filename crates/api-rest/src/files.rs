//! File endpoint.
//!
//! libgit2 handles are blocking and tied to one thread, so each request runs the retrieval
//! pipeline inside `spawn_blocking`. The blocking task reports the pre-stream outcome over a
//! oneshot channel, which is what decides the status code, and then pushes body chunks through a
//! bounded channel. A client that goes away closes the channel, which surfaces in the pipeline as
//! a stream write failure.

use crate::AppState;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use pinfile_core::{FailureKind, RetrievalError, RetrievalResult};
use std::io::{self, Write};
use tokio::sync::{mpsc, oneshot};

/// Number of chunks buffered between the blocking reader and the response body.
const BODY_CHANNEL_DEPTH: usize = 4;

const NOT_FOUND_BODY: &str = "404 page not found";

#[derive(Debug, Default, serde::Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub hash: String,
}

/// Serve the configured file for the requested endpoint at the requested revision.
///
/// The request path is percent-decoded before it is matched against the route table.
/// Unconfigured paths get `404`. On a configured endpoint:
/// - `200` with the raw file bytes (headers only for `HEAD`),
/// - `400` if `hash` is not a full 40 character lowercase hex id,
/// - `500` if the repository cannot be opened, the revision or file does not exist, or the
///   blob cannot be read.
pub async fn serve_file(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let endpoint = percent_decode_str(uri.path()).decode_utf8_lossy();
    let Some(route) = state.routes.dispatch(&endpoint).cloned() else {
        return (StatusCode::NOT_FOUND, NOT_FOUND_BODY).into_response();
    };

    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, HeaderValue::from_static("GET, HEAD"))],
        )
            .into_response();
    }

    let hash = Query::<FileQuery>::try_from_uri(&uri)
        .map(|Query(query)| query.hash)
        .unwrap_or_default();

    if method == Method::HEAD {
        let service = state.service.clone();
        let outcome =
            tokio::task::spawn_blocking(move || service.content_length(&route, &hash)).await;
        return match outcome {
            Ok(Ok(len)) => success_response(len, Body::empty()),
            Ok(Err(err)) => error_response(&err, &endpoint, state.redact_errors),
            Err(e) => {
                tracing::error!(endpoint = %endpoint, "retrieval task failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        };
    }

    let (ready_tx, ready_rx) = oneshot::channel::<RetrievalResult<u64>>();
    let (body_tx, body_rx) = mpsc::channel::<io::Result<Bytes>>(BODY_CHANNEL_DEPTH);
    let abort_tx = body_tx.clone();
    let service = state.service.clone();

    tokio::task::spawn_blocking(move || {
        let mut ready = Some(ready_tx);
        let result = service.retrieve(&route, &hash, |len| {
            if let Some(tx) = ready.take() {
                let _ = tx.send(Ok(len));
            }
            BodyWriter { tx: body_tx }
        });

        match (result, ready.take()) {
            (Ok(bytes), _) => {
                tracing::debug!(endpoint = route.endpoint(), bytes, "response complete");
            }
            (Err(err), Some(tx)) => {
                let _ = tx.send(Err(err));
            }
            (Err(err), None) => {
                // Headers are already out; all that is left is to cut the body short.
                tracing::error!(endpoint = route.endpoint(), "Error writing response: {}", err);
                let _ = abort_tx.blocking_send(Err(io::Error::new(
                    io::ErrorKind::Other,
                    err.to_string(),
                )));
            }
        }
    });

    match ready_rx.await {
        Ok(Ok(len)) => success_response(len, Body::from_stream(body_stream(body_rx))),
        Ok(Err(err)) => error_response(&err, &endpoint, state.redact_errors),
        Err(_) => {
            tracing::error!(endpoint = %endpoint, "retrieval task ended without a result");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}

fn success_response(len: u64, body: Body) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            ),
            (header::CONTENT_LENGTH, HeaderValue::from(len)),
        ],
        body,
    )
        .into_response()
}

/// Map a pre-stream failure to a response.
///
/// Not-found conditions share the 500 status with environment failures.
fn error_response(err: &RetrievalError, endpoint: &str, redact: bool) -> Response {
    match err.kind() {
        FailureKind::BadInput => {
            tracing::warn!(endpoint, "Error: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        _ => {
            tracing::error!(endpoint, stage = %err.stage(), "Error: {}", err);
            if redact {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {err}")).into_response()
            }
        }
    }
}

fn body_stream(
    rx: mpsc::Receiver<io::Result<Bytes>>,
) -> impl futures::Stream<Item = io::Result<Bytes>> + Send + 'static {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    })
}

/// Blocking writer feeding the response body channel.
struct BodyWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
