//! Container environment manager
//!
//! Pins `image:tag` to its immutable content digest. The lock file
//! `container.lock.json` records what was pulled; drift is the remote
//! digest for the same tag moving away from the lock. Pull and run both
//! address the image by digest, never by tag.

use std::sync::OnceLock;

use async_trait::async_trait;
use mcpadre_config::ContainerSpec;
use mcpadre_fs::NormalizedPath;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::provider::{
    DriftAction, DriftReport, EnvironmentProvider, LaunchSpec, ProviderContext, UpgradePolicy,
};
use crate::registry::{DigestResolver, HttpRegistryClient};

/// Name of the per-server lock file.
pub const LOCK_FILE: &str = "container.lock.json";

/// The persisted digest pin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerLock {
    pub image: String,
    pub tag: String,
    pub digest: String,
}

fn digest_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^sha256:[0-9a-f]{64}$").expect("valid pattern"))
}

impl ContainerLock {
    /// Validate the digest format before trusting it.
    pub fn validate(&self) -> Result<()> {
        if digest_pattern().is_match(&self.digest) {
            Ok(())
        } else {
            Err(Error::InvalidDigest {
                digest: self.digest.clone(),
            })
        }
    }

    pub fn read(dir: &NormalizedPath) -> Result<Option<Self>> {
        let path = dir.join(LOCK_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = mcpadre_fs::io::read_text(&path)?;
        let lock: Self = serde_json::from_str(&content).map_err(|e| Error::InstallFailed {
            step: format!("parse {LOCK_FILE}"),
            detail: e.to_string(),
        })?;
        lock.validate()?;
        Ok(Some(lock))
    }

    pub fn write(&self, dir: &NormalizedPath) -> Result<()> {
        self.validate()?;
        let mut rendered = serde_json::to_string_pretty(self).expect("lock serializes");
        rendered.push('\n');
        mcpadre_fs::io::write_text_if_changed(&dir.join(LOCK_FILE), &rendered)?;
        Ok(())
    }
}

pub struct ContainerProvider {
    spec: ContainerSpec,
    resolver: Box<dyn DigestResolver>,
}

impl ContainerProvider {
    pub fn new(spec: ContainerSpec) -> Self {
        Self {
            spec,
            resolver: Box::new(HttpRegistryClient::new()),
        }
    }

    /// Replace the registry client, for tests.
    pub fn with_resolver(spec: ContainerSpec, resolver: Box<dyn DigestResolver>) -> Self {
        Self { spec, resolver }
    }

    /// docker when available, podman otherwise.
    fn engine(&self) -> Result<String> {
        for candidate in ["docker", "podman"] {
            if which::which(candidate).is_ok() {
                return Ok(candidate.to_string());
            }
        }
        Err(Error::PrereqMissing {
            tool: "docker".to_string(),
            detail: "neither docker nor podman found on PATH".to_string(),
        })
    }
}

#[async_trait]
impl EnvironmentProvider for ContainerProvider {
    fn kind(&self) -> &'static str {
        "container"
    }

    async fn ensure_prerequisites(&self, _ctx: &ProviderContext) -> Result<()> {
        let engine = self.engine()?;
        let probe = crate::probe::probe_output(Command::new(&engine).arg("version"))
            .await
            .map_err(|e| Error::PrereqMissing {
                tool: engine.clone(),
                detail: e.to_string(),
            })?;
        if !probe.status.success() {
            return Err(Error::PrereqMissing {
                tool: engine,
                detail: "engine is not reachable".to_string(),
            });
        }
        Ok(())
    }

    async fn detect_drift(
        &self,
        ctx: &ProviderContext,
        policy: UpgradePolicy,
    ) -> Result<DriftReport> {
        let Some(lock) = ContainerLock::read(&ctx.server_dir)? else {
            return Ok(DriftReport::create());
        };

        let remote = self
            .resolver
            .resolve_digest(&self.spec.image, &self.spec.tag)
            .await?;

        if lock.image == self.spec.image && lock.tag == self.spec.tag && lock.digest == remote {
            Ok(DriftReport::sync())
        } else {
            // Digests have no ordering, so the downgrade guard does not
            // apply here.
            let change = format!("Image digest: {} → {}", lock.digest, remote);
            Ok(DriftReport::changed(vec![change], policy.permits_upgrade()))
        }
    }

    async fn materialize(&self, ctx: &ProviderContext, report: &DriftReport) -> Result<()> {
        match report.action {
            DriftAction::Skip | DriftAction::Sync => return Ok(()),
            DriftAction::Create | DriftAction::Upgrade => {}
        }

        let digest = self
            .resolver
            .resolve_digest(&self.spec.image, &self.spec.tag)
            .await?;
        let lock = ContainerLock {
            image: self.spec.image.clone(),
            tag: self.spec.tag.clone(),
            digest: digest.clone(),
        };
        lock.validate()?;

        let engine = self.engine()?;
        let pinned = format!("{}@{}", self.spec.image, digest);
        tracing::info!(image = %pinned, "pulling container image");
        let pull = Command::new(&engine)
            .args(["pull", &pinned])
            .output()
            .await
            .map_err(|e| Error::InstallFailed {
                step: format!("{engine} pull"),
                detail: e.to_string(),
            })?;
        if !pull.status.success() {
            return Err(Error::InstallFailed {
                step: format!("{engine} pull"),
                detail: String::from_utf8_lossy(&pull.stderr).trim().to_string(),
            });
        }

        lock.write(&ctx.server_dir)
    }

    async fn build_launch(&self, ctx: &ProviderContext) -> Result<LaunchSpec> {
        let lock = ContainerLock::read(&ctx.server_dir)?.ok_or_else(|| Error::NotInstalled {
            server: ctx.server_name.clone(),
        })?;

        let engine = self.engine()?;
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "-i".to_string(),
            "--init".to_string(),
        ];
        let server_dir = ctx.server_dir.to_native();
        args.push("-v".to_string());
        args.push(format!("{0}:{0}", server_dir.display()));
        for (key, value) in &ctx.resolved_env {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }
        args.push(format!("{}@{}", lock.image, lock.digest));

        Ok(LaunchSpec {
            program: engine,
            args,
            cwd: server_dir,
            env: ctx.child_env(),
        })
    }
}
