//! Shared fixtures: a local HTTP server with scripted behaviors and a
//! recording progress sink.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures_util::stream;
use tokio::net::TcpListener;

use fdl_core::{ProgressSink, TransferState};

/// Deterministic, non-repeating test payload.
pub fn payload(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// How a route answers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Behavior {
    /// Answer `Range` requests with 206.
    pub honor_range: bool,
    /// Send only this many body bytes on the first GET, then break the
    /// connection.
    pub drop_after: Option<usize>,
    /// Pause between 8 KiB pieces of the body.
    pub delay: Option<Duration>,
    /// Omit Content-Length (chunked encoding).
    pub chunked: bool,
    /// Serve `text/html` instead of a binary type.
    pub html: bool,
    /// Answer every `Range` request with a 206 covering the whole file.
    pub misaligned_range: bool,
}

impl Behavior {
    pub fn ranged() -> Self {
        Self {
            honor_range: true,
            ..Self::default()
        }
    }
}

struct ServerState {
    data: Vec<u8>,
    behavior: Behavior,
    ranges: Mutex<Vec<Option<String>>>,
    dropped: AtomicBool,
}

/// A running test server serving one payload at `/file.bin`.
pub struct TestServer {
    pub base: String,
    state: Arc<ServerState>,
}

impl TestServer {
    pub async fn start(data: Vec<u8>, behavior: Behavior) -> Self {
        let state = Arc::new(ServerState {
            data,
            behavior,
            ranges: Mutex::new(Vec::new()),
            dropped: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/file.bin", get(serve_get).head(serve_head))
            .route("/page", get(serve_get).head(serve_head))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn file_url(&self) -> String {
        self.url("/file.bin")
    }

    /// `Range` headers of every GET received, in order.
    pub fn ranges(&self) -> Vec<Option<String>> {
        self.state.ranges.lock().unwrap().clone()
    }

    pub fn data(&self) -> &[u8] {
        &self.state.data
    }
}

fn content_type(behavior: &Behavior) -> HeaderValue {
    if behavior.html {
        HeaderValue::from_static("text/html; charset=utf-8")
    } else {
        HeaderValue::from_static("application/octet-stream")
    }
}

async fn serve_head(State(state): State<Arc<ServerState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type(&state.behavior));
    if !state.behavior.chunked {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(state.data.len()));
    }
    if state.behavior.honor_range {
        headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    (StatusCode::OK, headers).into_response()
}

async fn serve_get(State(state): State<Arc<ServerState>>, request: HeaderMap) -> Response {
    let range = request
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.ranges.lock().unwrap().push(range.clone());

    let behavior = state.behavior;
    let len = state.data.len();
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type(&behavior));

    let start = range
        .as_deref()
        .filter(|_| behavior.honor_range)
        .and_then(|r| r.strip_prefix("bytes="))
        .and_then(|r| r.strip_suffix('-'))
        .and_then(|r| r.parse::<usize>().ok());

    let (status, start) = match start {
        Some(start) if start >= len => {
            headers.insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!("bytes */{len}")).unwrap(),
            );
            return (StatusCode::RANGE_NOT_SATISFIABLE, headers).into_response();
        }
        Some(start) => {
            let start = if behavior.misaligned_range { 0 } else { start };
            headers.insert(
                header::CONTENT_RANGE,
                HeaderValue::from_str(&format!("bytes {start}-{}/{len}", len - 1)).unwrap(),
            );
            (StatusCode::PARTIAL_CONTENT, start)
        }
        None => (StatusCode::OK, 0),
    };

    if !behavior.chunked {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len - start));
    }

    let body = state.data[start..].to_vec();
    let cut = behavior
        .drop_after
        .filter(|_| !state.dropped.swap(true, Ordering::SeqCst));

    (status, headers, streamed_body(body, cut, behavior.delay)).into_response()
}

fn streamed_body(body: Vec<u8>, cut: Option<usize>, delay: Option<Duration>) -> Body {
    const PIECE: usize = 8 * 1024;
    let limit = cut.map_or(body.len(), |c| c.min(body.len()));
    let body = Arc::new(body);

    let pieces = stream::unfold(0usize, move |pos| {
        let body = Arc::clone(&body);
        async move {
            if pos >= limit {
                if cut.is_some() && pos < body.len() {
                    // Let the sent bytes reach the client before the reset.
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "dropped");
                    return Some((Err(err), usize::MAX));
                }
                return None;
            }
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let end = (pos + PIECE).min(limit);
            Some((Ok(Bytes::copy_from_slice(&body[pos..end])), end))
        }
    });
    Body::from_stream(pieces)
}

/// Progress sink that keeps every state it receives.
#[derive(Default)]
pub struct RecordingSink {
    states: Mutex<Vec<TransferState>>,
}

impl RecordingSink {
    pub fn states(&self) -> Vec<TransferState> {
        self.states.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, state: TransferState) {
        self.states.lock().unwrap().push(state);
    }
}

pub fn partial_of(destination: &Path) -> std::path::PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".part");
    name.into()
}
