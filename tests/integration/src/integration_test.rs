//! End-to-end integration tests for the execution core
//!
//! Exercises the full flow with hermetic stand-ins: config loading and
//! scope merging, drift detection against materialized manifests, sandbox
//! finalization, and the spawn→pipeline→exit path against a real `cat`
//! process standing in for an MCP server.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use mcpadre_config::{VersionManagerConfig, WorkspaceContext};
use mcpadre_env::{
    ContainerLock, DriftAction, EnvironmentProvider, ReshimAction, UpgradePolicy,
    determine_reshim_action, provider_for,
};
use mcpadre_fs::{NormalizedPath, WorkspaceLayout};
use mcpadre_run::{Pipeline, PipelineOptions, ServerCommand};
use mcpadre_sandbox::{OsPathProbe, SandboxWorkspace, resolve_sandbox_config};
use tempfile::TempDir;

/// A project workspace with a config covering all runtime variants.
fn setup_workspace() -> (TempDir, TempDir) {
    let project = TempDir::new().unwrap();
    let user_dir = TempDir::new().unwrap();
    fs::write(
        project.path().join("mcpadre.yaml"),
        r#"
mcpServers:
  memory:
    node:
      package: "@modelcontextprotocol/server-memory"
      version: "0.6.0"
  pypi:
    python:
      package: mcp-pypi
      version: "2.6.5"
      pythonVersion: "3.11.11"
  tools:
    container:
      image: "ghcr.io/acme/mcp-tools"
      tag: "1.2.3"
  echo:
    shell:
      command: "cat"
options:
  installImplicitlyUpgradesChangedPackages: false
"#,
    )
    .unwrap();
    (project, user_dir)
}

fn open_workspace(project: &TempDir, user_dir: &TempDir) -> WorkspaceContext {
    let mut env = HashMap::new();
    env.insert("HOME".to_string(), "/nonexistent".to_string());
    env.insert(
        "MCPADRE_USER_DIR".to_string(),
        user_dir.path().to_string_lossy().into_owned(),
    );
    WorkspaceContext::open_project(project.path(), env).unwrap()
}

#[test]
fn test_config_load_covers_all_variants() {
    let (project, user_dir) = setup_workspace();
    let ctx = open_workspace(&project, &user_dir);

    let servers = &ctx.settings().servers;
    assert_eq!(servers.len(), 4);
    assert_eq!(servers["memory"].runtime.kind(), "node");
    assert_eq!(servers["pypi"].runtime.kind(), "python");
    assert_eq!(servers["tools"].runtime.kind(), "container");
    assert_eq!(servers["echo"].runtime.kind(), "shell");
    assert!(!ctx.settings().options.install_implicitly_upgrades_changed_packages);
}

#[test]
fn test_user_scope_merges_under_project() {
    let (project, user_dir) = setup_workspace();
    fs::write(
        user_dir.path().join("mcpadre.yaml"),
        r#"
mcpServers:
  user-notes:
    shell:
      command: "cat"
  memory:
    node:
      package: "@modelcontextprotocol/server-memory"
      version: "0.1.0"
"#,
    )
    .unwrap();

    let ctx = open_workspace(&project, &user_dir);
    assert!(ctx.settings().servers.contains_key("user-notes"));
    // Project pin wins over the user-scope pin.
    match &ctx.settings().servers["memory"].runtime {
        mcpadre_config::RuntimeSpec::Node(node) => assert_eq!(node.version, "0.6.0"),
        other => panic!("expected node, got {other:?}"),
    }
}

/// Python upgrade gating: a changed pin is reported but not applied, and
/// the files on disk stay untouched.
#[tokio::test]
async fn test_python_upgrade_gated_by_policy() {
    let (project, user_dir) = setup_workspace();
    let ctx = open_workspace(&project, &user_dir);
    let layout = WorkspaceLayout::new(ctx.root().clone());
    let server_dir = layout.ensure_server_dir("pypi").unwrap();

    // Materialize the old manifest by hand, as a prior install would have.
    let old_manifest = mcpadre_env::pyproject::generate_pyproject(
        "pypi",
        "mcp-pypi",
        "2.6.5",
        "==3.11.11",
    );
    fs::write(server_dir.to_native().join("pyproject.toml"), &old_manifest).unwrap();

    // Reconfigure to newer pins.
    let new_spec = mcpadre_config::PythonSpec {
        package: "mcp-pypi".to_string(),
        version: "2.6.7".to_string(),
        python_version: Some("3.13.6".to_string()),
    };
    let provider = provider_for(&mcpadre_config::RuntimeSpec::Python(new_spec)).unwrap();
    let provider_ctx = mcpadre_env::ProviderContext {
        server_name: "pypi".to_string(),
        workspace_root: ctx.root().clone(),
        server_dir: server_dir.clone(),
        parent_env: Default::default(),
        resolved_env: Default::default(),
        options: ctx.settings().options.clone(),
    };

    let drift = provider
        .detect_drift(&provider_ctx, UpgradePolicy::default())
        .await
        .unwrap();
    assert_eq!(drift.action, DriftAction::Skip);
    assert_eq!(
        drift.changes,
        vec![
            "Python version: ==3.11.11 → ==3.13.6".to_string(),
            "Package version: mcp-pypi==2.6.5 → mcp-pypi==2.6.7".to_string(),
        ]
    );

    // Skipped materialization leaves the manifest bit-for-bit unchanged.
    provider.materialize(&provider_ctx, &drift).await.unwrap();
    let on_disk = fs::read_to_string(server_dir.to_native().join("pyproject.toml")).unwrap();
    assert_eq!(on_disk, old_manifest);

    // With --force the same drift upgrades.
    let forced = provider
        .detect_drift(
            &provider_ctx,
            UpgradePolicy {
                allow_implicit: false,
                force: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(forced.action, DriftAction::Upgrade);
}

/// Pass-through run: one request line in, one matching response line out,
/// with a `cat` process standing in for the server.
#[tokio::test]
async fn test_pipeline_roundtrip_against_real_child() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    let launch = mcpadre_env::LaunchSpec {
        program: "cat".to_string(),
        args: vec![],
        cwd: std::env::temp_dir(),
        env: std::collections::BTreeMap::from([(
            "PATH".to_string(),
            "/usr/bin:/bin".to_string(),
        )]),
    };
    let mut process = ServerCommand::new(launch).spawn().unwrap();
    let child_in = process.take_stdin().unwrap();
    let child_out = process.take_stdout().unwrap();

    let (mut client_write, client_in) = duplex(1024);
    let (client_out, mut client_read) = duplex(1024);

    let request = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}\n";
    client_write.write_all(request.as_bytes()).await.unwrap();
    drop(client_write);

    let summary = Pipeline::new(PipelineOptions::default())
        .run(client_in, client_out, child_in, child_out)
        .await
        .unwrap();

    let mut received = String::new();
    client_read.read_to_string(&mut received).await.unwrap();
    assert_eq!(received, request);
    assert_eq!(summary.requests_forwarded, 1);
    assert_eq!(process.wait().await.unwrap(), 0);
}

/// Ambiguous version manager: a shim path mentioning both asdf and mise
/// must refuse to guess.
#[test]
fn test_ambiguous_version_manager_shim_path() {
    let shim = PathBuf::from("/home/u/.asdf/installs/something/mise/shims/node");
    let result = determine_reshim_action(VersionManagerConfig::Auto, "node", Some(&shim));
    assert!(matches!(
        result,
        Err(mcpadre_env::Error::VersionManagerAmbiguous { .. })
    ));

    let plain = PathBuf::from("/usr/bin/node");
    assert_eq!(
        determine_reshim_action(VersionManagerConfig::Auto, "node", Some(&plain)).unwrap(),
        ReshimAction::None
    );
}

/// Container digest drift against a stubbed registry.
#[tokio::test]
async fn test_container_digest_drift_upgrade() {
    const OLD: &str = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const NEW: &str = "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    struct Stub;
    #[async_trait::async_trait]
    impl mcpadre_env::registry::DigestResolver for Stub {
        async fn resolve_digest(
            &self,
            _image: &str,
            _tag: &str,
        ) -> mcpadre_env::Result<String> {
            Ok(NEW.to_string())
        }
    }

    let temp = TempDir::new().unwrap();
    let dir = NormalizedPath::new(temp.path());
    ContainerLock {
        image: "ghcr.io/acme/mcp-tools".to_string(),
        tag: "1.2.3".to_string(),
        digest: OLD.to_string(),
    }
    .write(&dir)
    .unwrap();

    let provider = mcpadre_env::ContainerProvider::with_resolver(
        mcpadre_config::ContainerSpec {
            image: "ghcr.io/acme/mcp-tools".to_string(),
            tag: "1.2.3".to_string(),
        },
        Box::new(Stub),
    );
    let provider_ctx = mcpadre_env::ProviderContext {
        server_name: "tools".to_string(),
        workspace_root: NormalizedPath::new(temp.path()),
        server_dir: dir,
        parent_env: Default::default(),
        resolved_env: Default::default(),
        options: Default::default(),
    };

    let drift = provider
        .detect_drift(
            &provider_ctx,
            UpgradePolicy {
                allow_implicit: true,
                force: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(drift.action, DriftAction::Upgrade);
    assert_eq!(drift.changes, vec![format!("Image digest: {OLD} → {NEW}")]);
}

/// Sandbox finalization against the real filesystem: only existing paths
/// survive, and the workspace is readable by default.
#[test]
fn test_sandbox_finalization_on_real_fs() {
    let (project, user_dir) = setup_workspace();
    let ctx = open_workspace(&project, &user_dir);

    let ro_dir = TempDir::new().unwrap();
    let config = mcpadre_config::SandboxConfig {
        allow_read: vec![
            mcpadre_config::PathTemplate::from(ro_dir.path().to_string_lossy().as_ref()),
            mcpadre_config::PathTemplate::from("/definitely/not/present"),
        ],
        networking: false,
        ..Default::default()
    };
    let workspace = SandboxWorkspace {
        dirs: ctx.dirs(),
        parent_env: ctx.parent_env(),
        options: &ctx.settings().options,
        server_dir: None,
    };

    let finalized = resolve_sandbox_config(&config, &workspace, &OsPathProbe).unwrap();
    assert!(finalized.enabled);
    assert!(!finalized.networking);
    let canonical_ro = canonicalize_path(ro_dir.path());
    assert!(finalized.allow_read.contains(&canonical_ro));
    assert!(
        !finalized
            .allow_read
            .iter()
            .any(|p| p.to_string_lossy().contains("not/present"))
    );
    // The workspace root itself is granted.
    let workspace_root = canonicalize_path(project.path());
    assert!(finalized.allow_read.contains(&workspace_root));
}

fn canonicalize_path(path: &std::path::Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Read-only versus read-write enforcement under bubblewrap, when bwrap is
/// both installed and usable on this machine.
#[tokio::test]
async fn test_bwrap_read_only_blocks_write() {
    if !cfg!(target_os = "linux") || which::which("bwrap").is_err() {
        eprintln!("skipping: bwrap not available");
        return;
    }

    let ro = TempDir::new().unwrap();
    let rw = TempDir::new().unwrap();
    let mut allow_read = vec![ro.path().to_path_buf()];
    allow_read.extend(
        ["/usr", "/bin", "/lib", "/lib64", "/etc"]
            .iter()
            .map(PathBuf::from)
            .filter(|p| p.exists()),
    );
    let config = mcpadre_sandbox::FinalizedSandboxConfig {
        enabled: true,
        networking: false,
        allow_read,
        allow_read_write: vec![rw.path().to_path_buf()],
    };

    let probe = tokio::process::Command::new("bwrap")
        .args(["--ro-bind", "/", "/", "--unshare-net", "/bin/true"])
        .output()
        .await;
    if !probe.map(|o| o.status.success()).unwrap_or(false) {
        eprintln!("skipping: bwrap cannot create namespaces here");
        return;
    }

    let ro_target = ro.path().join("x");
    let argv = mcpadre_sandbox::bwrap::bwrap_args(
        &config,
        "touch",
        &[ro_target.to_string_lossy().into_owned()],
    );
    let denied = tokio::process::Command::new("bwrap")
        .args(&argv)
        .output()
        .await
        .unwrap();
    assert!(!denied.status.success(), "write into read-only bind must fail");

    let rw_target = rw.path().join("x");
    let argv = mcpadre_sandbox::bwrap::bwrap_args(
        &config,
        "touch",
        &[rw_target.to_string_lossy().into_owned()],
    );
    let allowed = tokio::process::Command::new("bwrap")
        .args(&argv)
        .output()
        .await
        .unwrap();
    assert!(allowed.status.success(), "write into read-write bind must succeed");
}
