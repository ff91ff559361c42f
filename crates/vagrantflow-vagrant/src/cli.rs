//! vagrant CLI wrapper
//!
//! Runs `vagrant <subcommand> --machine-readable` in the resource's
//! directory. A process that outlives its deadline or whose cancellation
//! token fires is killed and reaped before the error is returned.

use crate::machine_readable::{self, Line};
use crate::ssh_config::parse_ssh_config;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use vagrantflow_core::environment::split_entry;
use vagrantflow_core::{
    CommandOptions, ForwardedPort, Result, SshConfig, StatusMap, VagrantError, VagrantGateway,
    VmInfoMap,
};

/// Default executable name, looked up on `PATH`
pub const VAGRANT_BIN: &str = "vagrant";

/// vagrant CLI wrapper
#[derive(Debug, Clone)]
pub struct Vagrant {
    binary: PathBuf,
}

/// Captured output of a finished vagrant process
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub lines: Vec<Line>,
    pub stdout: String,
    pub stderr: String,
}

enum Outcome {
    Finished(Result<(ExitStatus, String, String)>),
    TimedOut,
    Cancelled,
}

impl Default for Vagrant {
    fn default() -> Self {
        Self::new()
    }
}

impl Vagrant {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(VAGRANT_BIN),
        }
    }

    /// Use a specific vagrant executable
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Run `vagrant <subcommand> <args>` and return its parsed output.
    ///
    /// Fails on spawn errors, non-zero exit, deadline and cancellation. The
    /// process runs in its own process group, so a deadline or cancellation
    /// kills everything vagrant started as well.
    pub async fn run(
        &self,
        subcommand: &str,
        args: &[&str],
        options: &CommandOptions,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(subcommand);
        cmd.args(args);
        cmd.current_dir(&options.dir);
        if let Some(env) = &options.env {
            for entry in env {
                let (key, value) = split_entry(entry);
                cmd.env(key, value);
            }
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            "Running: {} {} {} (in {})",
            self.binary.display(),
            subcommand,
            args.join(" "),
            options.dir.display()
        );

        let mut child = cmd.spawn().map_err(|source| VagrantError::Spawn {
            command: subcommand.to_string(),
            source,
        })?;
        // leader of the new group; stays valid after the child is reaped
        let group = child.id();

        let mut stdout_handle = tokio::spawn(read_stdout(child.stdout.take()));
        let mut stderr_handle = tokio::spawn(read_stderr(child.stderr.take()));

        // pipes can outlive the child when a forked helper inherits them,
        // so collecting the output races the deadline too
        let outcome = tokio::select! {
            output = wait_with_output(&mut child, &mut stdout_handle, &mut stderr_handle) => {
                Outcome::Finished(output)
            }
            _ = wait_for_deadline(options.deadline) => Outcome::TimedOut,
            _ = options.cancel.cancelled() => Outcome::Cancelled,
        };

        let (status, stdout, stderr) = match outcome {
            Outcome::Finished(output) => output?,
            Outcome::TimedOut => {
                tracing::warn!("vagrant {} exceeded its deadline, killing", subcommand);
                terminate(&mut child, group, subcommand, stdout_handle, stderr_handle).await;
                return Err(VagrantError::Timeout(subcommand.to_string()));
            }
            Outcome::Cancelled => {
                tracing::warn!("vagrant {} cancelled, killing", subcommand);
                terminate(&mut child, group, subcommand, stdout_handle, stderr_handle).await;
                return Err(VagrantError::Cancelled(subcommand.to_string()));
            }
        };

        let lines = machine_readable::parse_output(&stdout);

        if !status.success() {
            let message = machine_readable::error_message(&lines)
                .filter(|m| !m.is_empty())
                .or_else(|| non_empty(&stderr))
                .or_else(|| non_empty(&stdout))
                .unwrap_or_default();
            return Err(VagrantError::CommandFailed {
                command: subcommand.to_string(),
                status: status.to_string(),
                message,
            });
        }

        Ok(CommandOutput {
            lines,
            stdout,
            stderr,
        })
    }
}

#[async_trait]
impl VagrantGateway for Vagrant {
    async fn up(&self, options: &CommandOptions, parallel: bool) -> Result<VmInfoMap> {
        let mut args = vec!["--machine-readable"];
        if parallel {
            args.push("--parallel");
        }
        let output = self.run("up", &args, options).await?;
        Ok(machine_readable::vm_info(&output.lines))
    }

    async fn status(&self, options: &CommandOptions) -> Result<StatusMap> {
        let output = self.run("status", &["--machine-readable"], options).await?;
        Ok(machine_readable::statuses(&output.lines))
    }

    async fn reload(&self, options: &CommandOptions) -> Result<StatusMap> {
        let output = self.run("reload", &["--machine-readable"], options).await?;
        Ok(machine_readable::statuses(&output.lines))
    }

    async fn destroy(&self, options: &CommandOptions) -> Result<()> {
        self.run("destroy", &["--force", "--machine-readable"], options)
            .await?;
        Ok(())
    }

    async fn ssh_config(&self, options: &CommandOptions) -> Result<Vec<(String, SshConfig)>> {
        let output = self
            .run("ssh-config", &["--machine-readable"], options)
            .await?;

        let configs = machine_readable::ssh_configs(&output.lines)?;
        if !configs.is_empty() {
            return Ok(configs);
        }

        // some vagrant versions print plain ssh_config text even in machine-readable mode
        let plain: String = output
            .stdout
            .lines()
            .filter(|line| machine_readable::parse_line(line).is_none())
            .map(|line| format!("{}\n", line))
            .collect();
        parse_ssh_config(&plain)
    }

    async fn port(&self, options: &CommandOptions, machine: &str) -> Result<Vec<ForwardedPort>> {
        let output = self
            .run("port", &["--machine-readable", machine], options)
            .await?;
        machine_readable::forwarded_ports(&output.lines)
    }
}

async fn wait_with_output(
    child: &mut Child,
    stdout: &mut JoinHandle<std::io::Result<String>>,
    stderr: &mut JoinHandle<std::io::Result<String>>,
) -> Result<(ExitStatus, String, String)> {
    let status = child.wait().await?;
    let stdout = join_reader(stdout).await?;
    let stderr = join_reader(stderr).await?;
    Ok((status, stdout, stderr))
}

/// Kill the whole process group and reap the child, then drop its output readers
async fn terminate(
    child: &mut Child,
    group: Option<u32>,
    command: &str,
    stdout: JoinHandle<std::io::Result<String>>,
    stderr: JoinHandle<std::io::Result<String>>,
) {
    if !kill_group(group, command)
        && let Err(e) = child.start_kill()
    {
        tracing::debug!("Failed to kill vagrant {}: {}", command, e);
    }

    // the child may have exited already; wait() then returns the cached status
    if let Err(e) = child.wait().await {
        tracing::error!("Failed to reap vagrant {}: {}", command, e);
    }
    stdout.abort();
    stderr.abort();
}

/// SIGKILL every process in the group. False when nothing was signalled.
#[cfg(unix)]
fn kill_group(group: Option<u32>, command: &str) -> bool {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(group) = group.and_then(|pid| i32::try_from(pid).ok()) else {
        return false;
    };
    match killpg(Pid::from_raw(group), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("killpg {} for vagrant {} failed: {}", group, command, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_group: Option<u32>, _command: &str) -> bool {
    false
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Collect stdout, forwarding `ui` records to the log as they arrive
async fn read_stdout<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let Some(pipe) = pipe else {
        return Ok(String::new());
    };

    let mut output = String::new();
    let mut lines = BufReader::new(pipe).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(record) = machine_readable::parse_line(&line)
            && record.kind == "ui"
        {
            tracing::debug!("[vagrant] {}", record.data(1).unwrap_or_default().trim_end());
        }
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}

async fn read_stderr<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<String> {
    let Some(mut pipe) = pipe else {
        return Ok(String::new());
    };

    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf).await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn join_reader(handle: &mut JoinHandle<std::io::Result<String>>) -> Result<String> {
    let output = handle.await.map_err(std::io::Error::other)??;
    Ok(output)
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
