//! Command execution against the selected environment host.
//!
//! Every operation is a linear sequence of external commands, run either
//! locally or over ssh. Commands are built as explicit argument lists
//! (`Cmd`) rather than interpolated strings; the ssh executor is the one
//! place that renders a command line, quoting each argument on the way.
//!
//! The `Executor` trait is the test seam: command modules take
//! `&dyn Executor` so tests can record the exact sequence of calls with
//! a scripted mock instead of touching a real host.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::CommandError;
use crate::tools::{get_tool_path, tools};

/// A single external command: program, arguments, optional remote working
/// directory and optional stdin payload.
#[derive(Debug, Clone)]
pub struct Cmd {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub stdin: Option<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<String>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Render the command for the remote shell, quoting every argument.
    /// A working directory becomes a `cd <dir> && ...` bracket.
    pub fn render_remote(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        let line = parts.join(" ");

        match &self.cwd {
            Some(dir) => format!("cd {} && {}", shell_quote(dir), line),
            None => line,
        }
    }
}

/// Single-quote an argument for the remote shell unless it is already
/// entirely shell-safe. Globs and pipes arrive at the remote program as
/// literal arguments, never as shell syntax.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./-_".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a command on the remote host, returning its stdout.
    /// Non-zero exit aborts with the program name and captured stderr.
    async fn run(&self, cmd: &Cmd) -> Result<String>;

    /// Run a command on the remote host, reporting only whether it
    /// exited successfully. Used for existence checks.
    async fn succeeds(&self, cmd: &Cmd) -> Result<bool>;

    /// Run a command on the local machine, returning its stdout.
    async fn run_local(&self, cmd: &Cmd) -> Result<String>;

    /// Upload a local file to a path on the remote host.
    async fn put(&self, local: &Path, remote: &str) -> Result<()>;

    /// Download a remote file to a local path.
    async fn get(&self, remote: &str, local: &Path) -> Result<()>;
}

/// Executor backed by the system `ssh`/`scp` commands.
///
/// Host resolution, credentials and multiplexing are left to the
/// operator's ssh config, the same way the rest of our tooling works.
pub struct SshExecutor {
    host: String,
    ssh: String,
    scp: String,
}

impl SshExecutor {
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let ssh = get_tool_path(tools::SSH);
        let scp = get_tool_path(tools::SCP);

        which::which(&ssh).with_context(|| format!("ssh not found at '{}'", ssh))?;
        which::which(&scp).with_context(|| format!("scp not found at '{}'", scp))?;

        Ok(Self {
            host: host.into(),
            ssh,
            scp,
        })
    }

    async fn run_remote_raw(&self, cmd: &Cmd) -> Result<std::process::Output> {
        let rendered = cmd.render_remote();
        tracing::debug!("[{}] {}", self.host, rendered);

        let mut child = Command::new(&self.ssh)
            .arg(&self.host)
            .arg(&rendered)
            .stdin(if cmd.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: self.ssh.clone(),
                source,
            })?;

        if let Some(data) = &cmd.stdin {
            if let Some(mut sink) = child.stdin.take() {
                sink.write_all(data.as_bytes())
                    .await
                    .context("Failed to write command stdin")?;
            }
        }

        child
            .wait_with_output()
            .await
            .context("Failed to wait for ssh")
    }
}

#[async_trait]
impl Executor for SshExecutor {
    async fn run(&self, cmd: &Cmd) -> Result<String> {
        let output = self.run_remote_raw(cmd).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CommandError::Failed {
                program: cmd.program.clone(),
                status: output.status.to_string(),
                stderr,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn succeeds(&self, cmd: &Cmd) -> Result<bool> {
        let output = self.run_remote_raw(cmd).await?;
        Ok(output.status.success())
    }

    async fn run_local(&self, cmd: &Cmd) -> Result<String> {
        tracing::debug!("[local] {} {}", cmd.program, cmd.args.join(" "));

        let mut command = Command::new(&cmd.program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: cmd.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CommandError::Failed {
                program: cmd.program.clone(),
                status: output.status.to_string(),
                stderr,
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn put(&self, local: &Path, remote: &str) -> Result<()> {
        let target = format!("{}:{}", self.host, remote);
        let local_path = local.to_string_lossy().to_string();
        tracing::debug!("put {} -> {}", local_path, target);

        let output = Command::new(&self.scp)
            .args([local_path.as_str(), target.as_str()])
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: self.scp.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CommandError::Failed {
                program: self.scp.clone(),
                status: output.status.to_string(),
                stderr,
            }
            .into());
        }
        Ok(())
    }

    async fn get(&self, remote: &str, local: &Path) -> Result<()> {
        let source = format!("{}:{}", self.host, remote);
        let local_path = local.to_string_lossy().to_string();
        tracing::debug!("get {} -> {}", source, local_path);

        let output = Command::new(&self.scp)
            .args([source.as_str(), local_path.as_str()])
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: self.scp.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(CommandError::Failed {
                program: self.scp.clone(),
                status: output.status.to_string(),
                stderr,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod mock {
    use super::{Cmd, Executor};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    /// Everything an operation asked the executor to do, in order.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Run(String),
        Succeeds(String),
        RunLocal(String),
        Put(PathBuf, String),
        Get(String, PathBuf),
    }

    /// Records calls and replays scripted stdout / existence answers.
    #[derive(Default)]
    pub struct MockExecutor {
        pub calls: Mutex<Vec<Call>>,
        pub remote_outputs: Mutex<VecDeque<String>>,
        pub local_outputs: Mutex<VecDeque<String>>,
        pub exist_answers: Mutex<VecDeque<bool>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn queue_remote_output(&self, output: &str) {
            self.remote_outputs
                .lock()
                .unwrap()
                .push_back(output.to_string());
        }

        pub fn queue_local_output(&self, output: &str) {
            self.local_outputs
                .lock()
                .unwrap()
                .push_back(output.to_string());
        }

        pub fn queue_exists(&self, exists: bool) {
            self.exist_answers.lock().unwrap().push_back(exists);
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Executor for MockExecutor {
        async fn run(&self, cmd: &Cmd) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Run(cmd.render_remote()));
            Ok(self
                .remote_outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        async fn succeeds(&self, cmd: &Cmd) -> Result<bool> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Succeeds(cmd.render_remote()));
            Ok(self
                .exist_answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(false))
        }

        async fn run_local(&self, cmd: &Cmd) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::RunLocal(cmd.render_remote()));
            Ok(self
                .local_outputs
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }

        async fn put(&self, local: &Path, remote: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Put(local.to_path_buf(), remote.to_string()));
            Ok(())
        }

        async fn get(&self, remote: &str, local: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Get(remote.to_string(), local.to_path_buf()));
            Ok(())
        }
    }
}
