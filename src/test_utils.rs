//! Scripted command execution for tests.
//!
//! [`StubExecutor`] replays a queue of [`ExpectedCall`]s so converter and
//! archiver backends can be exercised without the real programs installed.

use crate::error::{PackagerError, Result};
use crate::exec::CommandExecutor;
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::process::{ExitStatus, Output};

/// Build an exit status carrying `code`.
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Build an exit status carrying `code`.
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Output of a tool that exited cleanly and printed nothing.
#[must_use]
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Output of a tool that exited with status 1, printing `stderr`.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// One scripted invocation and the result it yields.
#[derive(Debug)]
pub struct ExpectedCall {
    /// Working directory the command is expected to run in.
    pub cwd: Option<Utf8PathBuf>,
    /// Program name, such as `zip` or `magick`.
    pub cmd: &'static str,
    /// Exact argument list.
    pub args: Vec<String>,
    /// Value handed back to the caller.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// Expect `cmd args...` outside any particular directory, succeeding.
    #[must_use]
    pub fn new(cmd: &'static str, args: &[&str]) -> Self {
        Self {
            cwd: None,
            cmd,
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            result: Ok(success_output()),
        }
    }

    /// Expect the command to run inside `cwd`.
    #[must_use]
    pub fn in_dir(mut self, cwd: &Utf8Path) -> Self {
        self.cwd = Some(cwd.to_owned());
        self
    }

    /// Return `result` instead of a successful output.
    #[must_use]
    pub fn returning(mut self, result: Result<Output>) -> Self {
        self.result = result;
        self
    }

    /// Simulate a tool that is not installed.
    #[must_use]
    pub fn not_found(self) -> Self {
        self.returning(Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()))
    }

    /// Simulate a tool that exits non-zero with `stderr`.
    #[must_use]
    pub fn failing(self, stderr: &str) -> Self {
        self.returning(Ok(failure_output(stderr)))
    }
}

/// [`CommandExecutor`] that checks each invocation against a script.
///
/// Calls must arrive in script order; any divergence is returned as
/// [`PackagerError::StubMismatch`] so the backend under test reports it.
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
}

impl StubExecutor {
    /// Script the calls this executor accepts.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
        }
    }

    /// Check that the whole script was used.
    ///
    /// # Panics
    ///
    /// Panics if any scripted call was never made.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "{} scripted call(s) never made: {:?}",
            remaining.len(),
            remaining.iter().map(|call| call.cmd).collect::<Vec<_>>()
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cwd: Option<&Utf8Path>, cmd: &str, args: &[&str]) -> Result<Output> {
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PackagerError::StubMismatch {
                message: format!("unexpected command invocation: {cmd} {}", args.join(" ")),
            });
        };

        let matches = call.cmd == cmd
            && call.args.iter().map(String::as_str).eq(args.iter().copied())
            && call.cwd.as_deref() == cwd;
        if !matches {
            return Err(PackagerError::StubMismatch {
                message: format!(
                    "expected {} {} in {:?}, got {cmd} {} in {cwd:?}",
                    call.cmd,
                    call.args.join(" "),
                    call.cwd,
                    args.join(" ")
                ),
            });
        }

        call.result
    }
}
