//! JSON-RPC line pipeline
//!
//! A transparent bidirectional pass-through between the client's stdio and
//! the child's stdio. Lines are forwarded byte-for-byte in arrival order;
//! the pipeline never rewrites payloads and forwards malformed JSON
//! unchanged. Requests are tracked in an in-memory registry by id so
//! traffic records can tell responses from notifications; outstanding
//! entries are discarded at shutdown.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::protocol::{Direction, FramePeek};

/// Pipeline behavior switches.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Emit a structured debug record per frame.
    pub log_traffic: bool,
    /// Also append records as JSON lines to this file.
    pub traffic_log_path: Option<PathBuf>,
}

/// Counters reported after the pipeline drains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub requests_forwarded: u64,
    pub responses_forwarded: u64,
    /// Requests that never saw a response before shutdown.
    pub outstanding_discarded: u64,
}

/// State shared by both directions of the pipeline.
struct PipelineState {
    /// Pending requests keyed by the serialized id.
    registry: Mutex<HashMap<String, ()>>,
    requests: AtomicU64,
    responses: AtomicU64,
    recorder: TrafficRecorder,
}

struct TrafficRecorder {
    enabled: bool,
    file: Option<Mutex<std::fs::File>>,
}

impl TrafficRecorder {
    fn new(options: &PipelineOptions) -> Self {
        let file = match (&options.traffic_log_path, options.log_traffic) {
            (Some(path), true) => {
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                    Ok(file) => Some(Mutex::new(file)),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), "cannot open traffic log: {e}");
                        None
                    }
                }
            }
            _ => None,
        };
        Self {
            enabled: options.log_traffic,
            file,
        }
    }

    fn record(&self, direction: Direction, peek: Option<&FramePeek>) {
        if !self.enabled {
            return;
        }
        match peek {
            Some(peek) if peek.method.is_some() => {
                tracing::debug!(
                    target: "mcpadre::traffic",
                    direction = direction.as_str(),
                    method = peek.method.as_deref().unwrap_or_default(),
                    id = ?peek.id,
                    params = peek.has_params,
                    "frame"
                );
            }
            Some(peek) => {
                tracing::debug!(
                    target: "mcpadre::traffic",
                    direction = direction.as_str(),
                    id = ?peek.id,
                    has_result = peek.has_result,
                    has_error = peek.has_error,
                    "frame"
                );
            }
            None => {
                tracing::debug!(
                    target: "mcpadre::traffic",
                    direction = direction.as_str(),
                    "unparseable frame passed through"
                );
            }
        }

        if let Some(file) = &self.file {
            let record = serde_json::json!({
                "ts": chrono::Utc::now().to_rfc3339(),
                "direction": direction.as_str(),
                "method": peek.and_then(|p| p.method.clone()),
                "id": peek.and_then(|p| p.id.clone()),
                "hasResult": peek.map(|p| p.has_result),
                "hasError": peek.map(|p| p.has_error),
            });
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{record}");
            }
        }
    }
}

/// The running pipeline.
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Proxy until either read end closes.
    ///
    /// Client EOF closes the child's stdin and then drains the child's
    /// remaining output; child EOF ends the pipeline immediately.
    pub async fn run<CI, CO, SI, SO>(
        &self,
        client_in: CI,
        client_out: CO,
        child_in: SI,
        child_out: SO,
    ) -> Result<PipelineSummary>
    where
        CI: AsyncRead + Unpin + Send + 'static,
        CO: AsyncWrite + Unpin + Send + 'static,
        SI: AsyncWrite + Unpin + Send + 'static,
        SO: AsyncRead + Unpin + Send + 'static,
    {
        let state = Arc::new(PipelineState {
            registry: Mutex::new(HashMap::new()),
            requests: AtomicU64::new(0),
            responses: AtomicU64::new(0),
            recorder: TrafficRecorder::new(&self.options),
        });

        let mut to_child = tokio::spawn(forward(
            client_in,
            child_in,
            Direction::ClientToServer,
            Arc::clone(&state),
        ));
        let mut to_client = tokio::spawn(forward(
            child_out,
            client_out,
            Direction::ServerToClient,
            Arc::clone(&state),
        ));

        tokio::select! {
            child_side = &mut to_client => {
                // Child hung up; nothing more can arrive for the client.
                to_child.abort();
                child_side.map_err(join_panic)??;
            }
            client_side = &mut to_child => {
                // Client hung up; EOF propagates to the child's stdin and
                // the remaining child output is drained.
                client_side.map_err(join_panic)??;
                to_client.await.map_err(join_panic)??;
            }
        }

        let outstanding = state.registry.lock().map(|r| r.len() as u64).unwrap_or(0);
        if outstanding > 0 {
            tracing::debug!(outstanding, "discarding unanswered requests at shutdown");
        }
        Ok(PipelineSummary {
            requests_forwarded: state.requests.load(Ordering::Relaxed),
            responses_forwarded: state.responses.load(Ordering::Relaxed),
            outstanding_discarded: outstanding,
        })
    }
}

fn join_panic(e: tokio::task::JoinError) -> std::io::Error {
    std::io::Error::other(e)
}

/// Forward one direction line-by-line, verbatim.
async fn forward<R, W>(
    reader: R,
    mut writer: W,
    direction: Direction,
    state: Arc<PipelineState>,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf: Vec<u8> = Vec::with_capacity(4096);

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let peek = FramePeek::parse(line.trim_end_matches(['\n', '\r']));

        if let Some(peek) = &peek {
            if let Some(id) = &peek.id {
                let key = id.to_string();
                match direction {
                    Direction::ClientToServer if peek.is_request() => {
                        // Register before the bytes reach the child so a
                        // fast response can never miss its entry.
                        if let Ok(mut registry) = state.registry.lock() {
                            registry.insert(key, ());
                        }
                        state.requests.fetch_add(1, Ordering::Relaxed);
                    }
                    Direction::ServerToClient if peek.is_response() => {
                        if let Ok(mut registry) = state.registry.lock() {
                            registry.remove(&key);
                        }
                        state.responses.fetch_add(1, Ordering::Relaxed);
                    }
                    _ => {}
                }
            }
        }
        state.recorder.record(direction, peek.as_ref());

        writer.write_all(&buf).await?;
        writer.flush().await?;
    }

    // Signal EOF downstream.
    let _ = writer.shutdown().await;
    Ok(())
}
