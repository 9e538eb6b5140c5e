//! Configuration layer for mcpadre
//!
//! Loads the declarative `mcpadre.{yaml,toml,json}` configuration from the
//! project and user scopes, merges them into an effective [`Settings`], and
//! resolves `{{dirs.*}}` / `{{parentEnv.*}}` templates against a
//! [`DirectoryResolver`] and the parent environment.

pub mod context;
pub mod dirs;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod template;

pub use context::{WorkspaceContext, WorkspaceKind};
pub use dirs::{DirKey, DirectoryResolver};
pub use error::{Error, Result};
pub use resolver::Settings;
pub use schema::options::{GlobalOptions, VersionManagerConfig};
pub use schema::sandbox::SandboxConfig;
pub use schema::server::{
    ContainerSpec, HttpSpec, NodeSpec, PythonSpec, RuntimeSpec, ServerSpec, ShellSpec,
};
pub use schema::template::{CommandTemplate, EnvTemplate, PathTemplate};
pub use template::{resolve_env_map, resolve_path_templates, resolve_template};
