//! Command runner abstraction for the transport layer.
//!
//! Transport operations shell out to the system `rsync` and `sftp` binaries.
//! The trait seam keeps those invocations fakeable in tests; the process
//! implementation supports feeding a batch payload on stdin, which `sftp`
//! batch mode requires.

use std::ffi::OsString;
use std::io::Write;
use std::process::{Command, Stdio};

use super::TransportError;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, optionally feeding `stdin`,
    /// and captures stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Spawn`] if the command cannot be started or
    /// its stdin cannot be written.
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, TransportError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner;

impl CommandRunner for ProcessCommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, TransportError> {
        let spawn_error = |message: String| TransportError::Spawn {
            program: program.to_owned(),
            message,
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(stdin.map_or_else(Stdio::null, |_| Stdio::piped()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|err| spawn_error(err.to_string()))?;
        if let Some(payload) = stdin {
            if let Some(mut handle) = child.stdin.take() {
                handle
                    .write_all(payload.as_bytes())
                    .map_err(|err| spawn_error(err.to_string()))?;
            }
            // stdin handle drops here, closing the pipe so sftp sees EOF.
        }

        let output = child
            .wait_with_output()
            .map_err(|err| spawn_error(err.to_string()))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
