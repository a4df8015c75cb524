use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::judge_result::{ExecutionResult, TIMEOUT_EXIT_CODE};
use nix::errno::Errno;
use nix::sys::signal::{Signal, killpg};
use nix::sys::wait::{Id, WaitPidFlag, waitid};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::error::SandboxError;
use super::stream::StreamDrain;
use super::{SandboxHandle, SandboxManager};
use crate::config::{LanguageProfile, SandboxConfig};

pub const TIMEOUT_MESSAGE: &str = "\nProcess timed out";
pub const RESOURCE_HINT: &str =
    "\nHint: program exceeded memory limit or produced excessive output";

/// Runs submissions as plain child processes in a scratch directory.
///
/// Each child leads its own process group so a timeout kills everything it
/// spawned, not just the direct child.
#[derive(Debug, Clone)]
pub struct ProcessSandboxManager {
    sandbox: SandboxConfig,
    language: LanguageProfile,
}

impl ProcessSandboxManager {
    pub fn new(sandbox: SandboxConfig, language: LanguageProfile) -> Self {
        Self { sandbox, language }
    }

    async fn exec(
        &self,
        dir: &Path,
        argv: &[String],
        stdin: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, SandboxError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SandboxError::InvalidCommand("empty argv".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);

        let start = Instant::now();
        let mut child = command.spawn().map_err(|source| SandboxError::Spawn {
            program: program.clone(),
            source,
        })?;
        // Also the process group id.
        let pid = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .ok_or_else(|| SandboxError::Execution("child has no pid".to_string()))?;

        let stdout = child
            .stdout
            .take()
            .map(|pipe| StreamDrain::spawn(pipe, self.sandbox.stdout_limit_bytes))
            .ok_or_else(|| SandboxError::Execution("stdout pipe missing".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .map(|pipe| StreamDrain::spawn(pipe, self.sandbox.stderr_limit_bytes))
            .ok_or_else(|| SandboxError::Execution("stderr pipe missing".to_string()))?;
        let feeder = feed_stdin(child.stdin.take(), stdin);

        let deadline = tokio::time::Instant::now() + timeout;
        let exit = match tokio::time::timeout_at(deadline, wait_exited(pid)).await {
            Ok(Ok(())) => Exit::Unreaped,
            Ok(Err(e)) => {
                debug!(pid, error = %e, "Exit watch failed, waiting on child directly");
                match tokio::time::timeout_at(deadline, child.wait()).await {
                    Ok(status) => Exit::Reaped(status.map_err(|e| {
                        SandboxError::Execution(format!("failed to wait for child: {e}"))
                    })?),
                    Err(_) => Exit::TimedOut,
                }
            }
            Err(_) => Exit::TimedOut,
        };
        if let Some(feeder) = feeder {
            feeder.abort();
        }

        let status = match exit {
            Exit::Unreaped => {
                // Background children may still hold the pipes open. The leader
                // is a zombie until reaped here, so its id still names our group.
                kill_process_group(pid);
                child
                    .wait()
                    .await
                    .map_err(|e| SandboxError::Execution(format!("failed to wait for child: {e}")))?
            }
            // The id may already be reused; stragglers are cut off by the exit grace.
            Exit::Reaped(status) => status,
            Exit::TimedOut => {
                warn!(
                    program = %program,
                    timeout_ms = timeout.as_millis() as u64,
                    "Process timed out, killing process group"
                );
                let grace = self.sandbox.kill_grace();
                kill_process_group(pid);
                let _ = child.start_kill();
                if tokio::time::timeout(grace, child.wait()).await.is_err() {
                    warn!(program = %program, "Killed process was not reaped within grace period");
                }

                let (out, err) = tokio::join!(stdout.finish(grace), stderr.finish(grace));
                let mut stderr = err.text;
                stderr.push_str(TIMEOUT_MESSAGE);
                return Ok(ExecutionResult {
                    stdout: out.text,
                    stderr,
                    exit_code: TIMEOUT_EXIT_CODE,
                    duration_ms: elapsed_ms(start),
                });
            }
        };

        let grace = self.sandbox.exit_grace();
        let (out, err) = tokio::join!(stdout.finish(grace), stderr.finish(grace));
        let duration_ms = elapsed_ms(start);
        let exit_code = exit_code_of(status);

        let mut stderr = err.text;
        let out_of_memory = self
            .language
            .oom_markers
            .iter()
            .any(|marker| !marker.is_empty() && stderr.contains(marker.as_str()));
        if out_of_memory || out.truncated {
            stderr.push_str(RESOURCE_HINT);
        }

        debug!(program = %program, exit_code, duration_ms, "Process finished");
        Ok(ExecutionResult {
            stdout: out.text,
            stderr,
            exit_code,
            duration_ms,
        })
    }
}

#[async_trait]
impl SandboxManager for ProcessSandboxManager {
    async fn create_sandbox(&self, source_code: &str) -> Result<SandboxHandle, SandboxError> {
        let sandbox = SandboxHandle::create(&self.sandbox.root_dir()).await?;
        let source_path = sandbox.path().join(&self.language.source_file);
        tokio::fs::write(&source_path, source_code)
            .await
            .map_err(|source| SandboxError::Initialization {
                path: source_path.clone(),
                source,
            })?;
        debug!(sandbox = %sandbox.id(), path = %sandbox.path().display(), "Sandbox created");
        Ok(sandbox)
    }

    #[instrument(skip(self, sandbox), fields(sandbox = %sandbox.id()))]
    async fn compile(
        &self,
        sandbox: &SandboxHandle,
    ) -> Result<Option<ExecutionResult>, SandboxError> {
        if self.language.compile.is_empty() {
            return Ok(None);
        }
        let result = self
            .exec(
                sandbox.path(),
                &self.language.compile,
                "",
                self.sandbox.compile_timeout(),
            )
            .await?;
        if !result.succeeded() {
            debug!(exit_code = result.exit_code, "Compilation failed");
        }
        Ok(Some(result))
    }

    #[instrument(skip(self, sandbox, stdin), fields(sandbox = %sandbox.id()))]
    async fn execute(
        &self,
        sandbox: &SandboxHandle,
        stdin: &str,
    ) -> Result<ExecutionResult, SandboxError> {
        self.exec(
            sandbox.path(),
            &self.language.run,
            stdin,
            self.sandbox.run_timeout(),
        )
        .await
    }
}

/// Write `input` to the child and close the pipe. Empty input closes it at once.
fn feed_stdin(pipe: Option<ChildStdin>, input: &str) -> Option<JoinHandle<()>> {
    let mut pipe = pipe?;
    if input.is_empty() {
        return None;
    }
    let data = input.as_bytes().to_vec();
    Some(tokio::spawn(async move {
        if let Err(e) = pipe.write_all(&data).await {
            if e.kind() != io::ErrorKind::BrokenPipe {
                debug!(error = %e, "Failed to write stdin");
            }
        }
    }))
}

/// How the run step ended.
enum Exit {
    /// Exited; still a zombie.
    Unreaped,
    Reaped(ExitStatus),
    TimedOut,
}

/// Resolve once `pid` has exited, leaving it unreaped.
async fn wait_exited(pid: i32) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        loop {
            match waitid(
                Id::Pid(Pid::from_raw(pid)),
                WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT,
            ) {
                Err(Errno::EINTR) => continue,
                other => return other.map(|_| ()).map_err(io::Error::from),
            }
        }
    })
    .await
    .map_err(io::Error::other)?
}

/// SIGKILL the whole group led by `pgid`. No-op once the group is empty.
fn kill_process_group(pgid: i32) {
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        if e != Errno::ESRCH {
            debug!(pgid, error = %e, "killpg failed");
        }
    }
}

/// Exit code, or 128 + signal number for a signalled process.
fn exit_code_of(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

fn elapsed_ms(start: Instant) -> u64 {
    (start.elapsed().as_millis() as u64).max(1)
}
