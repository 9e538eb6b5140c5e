//! Passthrough sandbox
//!
//! Used when sandboxing is disabled, and as the fallback on platforms with
//! no isolation mechanism. In the fallback case a single warning is logged
//! so the user knows the process runs unconfined.

use async_trait::async_trait;

use crate::platform::{Sandbox, WrappedCommand};

pub struct PassthroughSandbox {
    warn_unsupported: bool,
}

impl PassthroughSandbox {
    /// Passthrough because the config disabled sandboxing.
    pub fn disabled() -> Self {
        Self {
            warn_unsupported: false,
        }
    }

    /// Passthrough because the platform has no sandbox; warns once.
    pub fn unsupported_platform() -> Self {
        tracing::warn!(
            "sandboxing was requested but is not supported on this platform; \
             the server will run without isolation"
        );
        Self {
            warn_unsupported: true,
        }
    }

    /// Whether this passthrough stands in for an unavailable sandbox.
    pub fn is_fallback(&self) -> bool {
        self.warn_unsupported
    }
}

#[async_trait]
impl Sandbox for PassthroughSandbox {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn build_sandbox_args(&self, _program: &str, _args: &[String]) -> Option<WrappedCommand> {
        None
    }

    async fn validate(&self) -> bool {
        true
    }
}
