//! Server command building and process supervision
//!
//! Composes the launch descriptor with the per-server environment and an
//! optional sandbox wrapper, spawns the child with fully piped stdio, and
//! supervises it: stderr is drained line-by-line into the debug log (the
//! last lines are kept for error reporting), exit code and wall-clock
//! duration are recorded.

use std::process::Stdio;
use std::time::{Duration, Instant};

use mcpadre_env::LaunchSpec;
use mcpadre_sandbox::Sandbox;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// How many trailing stderr lines are kept for `ProcessFailed` reports.
const STDERR_TAIL_LINES: usize = 20;

/// A fully described server invocation, ready to spawn.
pub struct ServerCommand {
    launch: LaunchSpec,
    sandbox: Option<Box<dyn Sandbox>>,
}

impl ServerCommand {
    pub fn new(launch: LaunchSpec) -> Self {
        Self {
            launch,
            sandbox: None,
        }
    }

    /// Wrap the invocation with a sandbox.
    pub fn sandboxed(mut self, sandbox: Box<dyn Sandbox>) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    /// The program and argv that will actually be exec'd, after sandbox
    /// wrapping. Pure; useful for logging and tests.
    pub fn effective_invocation(&self) -> (String, Vec<String>) {
        if let Some(sandbox) = &self.sandbox {
            if let Some(wrapped) =
                sandbox.build_sandbox_args(&self.launch.program, &self.launch.args)
            {
                return (wrapped.program, wrapped.args);
            }
        }
        (self.launch.program.clone(), self.launch.args.clone())
    }

    /// Spawn with piped stdio and a stderr drain task.
    pub fn spawn(&self) -> Result<ServerProcess> {
        let (program, args) = self.effective_invocation();
        tracing::debug!(program = %program, ?args, cwd = %self.launch.cwd.display(), "spawning server");

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(&self.launch.cwd)
            .env_clear()
            .envs(&self.launch.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn { program, source })?;

        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            let Some(stderr) = stderr else {
                return tail;
            };
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "mcpadre::server_stderr", "{line}");
                if tail.len() == STDERR_TAIL_LINES {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        });

        Ok(ServerProcess {
            child,
            started: Instant::now(),
            stderr_task: Some(stderr_task),
        })
    }
}

/// A running server child process.
pub struct ServerProcess {
    child: Child,
    started: Instant,
    stderr_task: Option<JoinHandle<Vec<String>>>,
}

impl ServerProcess {
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Wait for exit, returning the code (-1 when killed by a signal).
    pub async fn wait(&mut self) -> Result<i32> {
        let status = self.child.wait().await?;
        let code = status.code().unwrap_or(-1);
        tracing::debug!(
            exit_code = code,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "server exited"
        );
        Ok(code)
    }

    /// Wait for exit, turning a non-zero code into `ProcessFailed` with
    /// the collected stderr tail.
    pub async fn wait_checked(&mut self) -> Result<()> {
        let code = self.wait().await?;
        if code == 0 {
            return Ok(());
        }
        Err(Error::ProcessFailed {
            exit_code: code,
            stderr_tail: self.stderr_tail().await,
        })
    }

    /// The trailing stderr lines collected so far. Consumes the drain task,
    /// so call after the child exited.
    pub async fn stderr_tail(&mut self) -> Vec<String> {
        match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Forward a termination request, wait out the grace window, then
    /// force-kill.
    pub async fn shutdown(&mut self, grace: Duration) -> Result<i32> {
        self.request_termination();
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => Ok(status?.code().unwrap_or(-1)),
            Err(_) => {
                tracing::debug!("grace window elapsed, force-killing server");
                self.child.kill().await?;
                Ok(self.child.wait().await?.code().unwrap_or(-1))
            }
        }
    }

    #[cfg(unix)]
    fn request_termination(&self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;
        if let Some(pid) = self.child.id() {
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
    }

    #[cfg(not(unix))]
    fn request_termination(&self) {
        // No SIGTERM analogue; the grace window just delays the kill.
    }

    /// Time since spawn.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
