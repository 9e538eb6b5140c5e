//! Filesystem layer for mcpadre
//!
//! Provides the managed `.mcpadre/` workspace layout, normalized path
//! handling, atomic file writes, and the per-server advisory locks that
//! serialize `install` and `run` on the same server directory.

pub mod error;
pub mod io;
pub mod layout;
pub mod lock;
pub mod path;

pub use error::{Error, Result};
pub use layout::{WorkspaceLayout, validate_server_name};
pub use lock::{LockMode, ServerLock};
pub use path::NormalizedPath;
