//! Minimal stdio↔HTTP bridge for remote MCP servers
//!
//! Each client line is POSTed to the configured URL as one JSON-RPC
//! message; the response body comes back as one line on stdout.
//! Notifications (HTTP 202 or an empty body) produce no output line.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};
use crate::pipeline::PipelineOptions;
use crate::protocol::{Direction, FramePeek};
use crate::runner::RunOutcome;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Bridge our stdio to a remote HTTP MCP endpoint until stdin closes.
pub async fn run_http_bridge(
    url: &str,
    headers: &BTreeMap<String, String>,
    options: PipelineOptions,
) -> Result<RunOutcome> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::PipelineIo(std::io::Error::other(e)))?;

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if options.log_traffic {
            let peek = FramePeek::parse(&line);
            tracing::debug!(
                target: "mcpadre::traffic",
                direction = Direction::ClientToServer.as_str(),
                method = peek.as_ref().and_then(|p| p.method.as_deref()).unwrap_or_default(),
                id = ?peek.as_ref().and_then(|p| p.id.clone()),
                "frame"
            );
        }

        let mut request = client
            .post(url)
            .header("content-type", "application/json")
            .body(line);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::PipelineIo(std::io::Error::other(e)))?;
        if response.status() == reqwest::StatusCode::ACCEPTED {
            continue;
        }
        let body = response
            .text()
            .await
            .map_err(|e| Error::PipelineIo(std::io::Error::other(e)))?;
        if body.trim().is_empty() {
            continue;
        }

        if options.log_traffic {
            let peek = FramePeek::parse(body.trim());
            tracing::debug!(
                target: "mcpadre::traffic",
                direction = Direction::ServerToClient.as_str(),
                id = ?peek.as_ref().and_then(|p| p.id.clone()),
                has_result = peek.as_ref().map(|p| p.has_result).unwrap_or(false),
                has_error = peek.as_ref().map(|p| p.has_error).unwrap_or(false),
                "frame"
            );
        }
        stdout.write_all(body.trim_end().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(RunOutcome { exit_code: 0 })
}
