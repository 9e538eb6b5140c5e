//! OS-level sandboxing for mcpadre server processes
//!
//! Turns a per-server [`SandboxConfig`](mcpadre_config::SandboxConfig) into
//! a finalized allow-list of absolute paths, then wraps the launch command
//! with the platform isolation tool:
//!
//! - **Linux**: bubblewrap (`bwrap`) with fresh namespaces and bind mounts
//! - **macOS**: `sandbox-exec` with a generated Scheme policy
//! - **Other**: a warning no-op passthrough
//!
//! Argv/policy generation is pure over the finalized config; filesystem
//! probing lives behind [`PathProbe`] so the generators stay unit-testable.

pub mod bwrap;
pub mod error;
pub mod passthrough;
pub mod platform;
pub mod resolve;
pub mod seatbelt;

pub use error::{Error, Result};
pub use platform::{Sandbox, WrappedCommand, create_sandbox};
pub use resolve::{FinalizedSandboxConfig, OsPathProbe, PathProbe, SandboxWorkspace,
    resolve_sandbox_config};
