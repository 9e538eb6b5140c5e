//! Execution layer for mcpadre
//!
//! Builds the (optionally sandboxed) server command, spawns it with piped
//! stdio, and proxies line-framed JSON-RPC between the client on our own
//! stdio and the child, until either side hangs up or a signal arrives.

pub mod command;
pub mod error;
pub mod http_bridge;
pub mod install;
pub mod pipeline;
pub mod protocol;
pub mod runner;

pub use command::{ServerCommand, ServerProcess};
pub use error::{Error, Result};
pub use install::{InstallReport, install_all, install_server};
pub use pipeline::{Pipeline, PipelineOptions, PipelineSummary};
pub use protocol::{Direction, FramePeek};
pub use runner::{RunOutcome, run_server};
