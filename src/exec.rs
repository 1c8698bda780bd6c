//! External command execution.
//!
//! Icon converters and archivers are external programs. Every invocation goes
//! through [`CommandExecutor`] so strategies can be exercised against scripted
//! executors in tests, and so the system implementation can bound how long a
//! misbehaving tool may block the pipeline.

use crate::error::Result;
use camino::Utf8Path;
use log::debug;
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Default upper bound on a single tool invocation.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args`, optionally inside `cwd`, and returns the
    /// captured output once the process exits.
    ///
    /// # Errors
    ///
    /// Returns any I/O error encountered while spawning the command, or a
    /// [`io::ErrorKind::TimedOut`] error when the command exceeds the
    /// executor's time limit.
    fn run(&self, cwd: Option<&Utf8Path>, cmd: &str, args: &[&str]) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// # Examples
///
/// ```no_run
/// use web_notes_packager::exec::{CommandExecutor, SystemCommandExecutor};
///
/// let executor = SystemCommandExecutor::default();
/// let output = executor.run(None, "zip", &["-v"])?;
/// assert!(output.status.success());
/// # Ok::<(), web_notes_packager::error::PackagerError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    /// Create an executor that kills commands running longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Return the configured time limit.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_TOOL_TIMEOUT)
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cwd: Option<&Utf8Path>, cmd: &str, args: &[&str]) -> Result<Output> {
        debug!("running {cmd} {}", args.join(" "));

        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            command.current_dir(dir.as_std_path());
        }

        let mut child = command.spawn()?;

        let Some(status) = child.wait_timeout(self.timeout)? else {
            // Teardown failures are logged; the timeout is what gets reported.
            if let Err(e) = child.kill() {
                debug!("failed to kill {cmd}: {e}");
            }
            if let Err(e) = child.wait() {
                debug!("failed to reap {cmd}: {e}");
            }
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{cmd} timed out after {} seconds", self.timeout.as_secs()),
            )
            .into());
        };

        let stdout = child
            .stdout
            .take()
            .map(io::read_to_string)
            .transpose()?
            .unwrap_or_default();
        let stderr = child
            .stderr
            .take()
            .map(io::read_to_string)
            .transpose()?
            .unwrap_or_default();

        Ok(Output {
            status,
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        })
    }
}

/// Returns true if the given command executes successfully.
///
/// Used to probe tool availability: a missing binary surfaces as a spawn
/// error and a broken installation as a non-zero exit, and both count as
/// unavailable.
pub fn command_succeeds(executor: &dyn CommandExecutor, cmd: &str, args: &[&str]) -> bool {
    executor
        .run(None, cmd, args)
        .is_ok_and(|output| output.status.success())
}

/// Render a failed command's output as a single diagnostic line.
#[must_use]
pub fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.to_owned()
    }
}
