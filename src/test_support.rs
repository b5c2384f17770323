//! Test support utilities shared across unit and integration tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::rc::Rc;

use crate::environment::{Environment, FrameworkKind};
use crate::exec::{ExecError, ExecOutput, RemoteExecutor};
use crate::transport::{CommandOutput, CommandRunner, TransportConfig, TransportError};

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic transport outcomes without spawning
/// processes. A response may carry a payload that is written to the
/// invocation's final argument, which simulates a pull materialising a
/// local file.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses: Rc<RefCell<VecDeque<ScriptedResponse>>>,
    invocations: Rc<RefCell<Vec<CommandInvocation>>>,
}

#[derive(Clone, Debug)]
struct ScriptedResponse {
    output: CommandOutput,
    materialise: Option<String>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
    /// Batch payload fed on stdin, when any.
    pub stdin: Option<String>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_output(Some(0), "", "");
    }

    /// Pushes a successful exit status that also writes `content` to the
    /// invocation's final argument, simulating a pulled file.
    pub fn push_success_with_file(&self, content: impl Into<String>) {
        self.responses.borrow_mut().push_back(ScriptedResponse {
            output: CommandOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            },
            materialise: Some(content.into()),
        });
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.push_output(Some(code), "", "simulated failure");
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses.borrow_mut().push_back(ScriptedResponse {
            output: CommandOutput {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            },
            materialise: None,
        });
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
        stdin: Option<&str>,
    ) -> Result<CommandOutput, TransportError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
            stdin: stdin.map(str::to_owned),
        });
        let response = self.responses.borrow_mut().pop_front().ok_or_else(|| {
            TransportError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            }
        })?;
        if let Some(content) = response.materialise {
            if let Some(destination) = args.last() {
                std::fs::write(destination, content).map_err(|err| TransportError::Spawn {
                    program: program.to_owned(),
                    message: err.to_string(),
                })?;
            }
        }
        Ok(response.output)
    }
}

/// Scripted remote executor that returns pre-seeded results in FIFO order.
///
/// When the queue is empty a successful, silent execution is returned so
/// tests only script the interesting outcomes.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    results: RefCell<VecDeque<Result<ExecOutput, ExecError>>>,
    commands: RefCell<Vec<Vec<String>>>,
}

impl ScriptedExecutor {
    /// Creates a new executor with no queued results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful execution with empty output.
    pub fn push_success(&self) {
        self.results.borrow_mut().push_back(Ok(ExecOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        }));
    }

    /// Queues a failed execution with the given exit code and stderr.
    pub fn push_failure(&self, code: i32, stderr: impl Into<String>) {
        self.results.borrow_mut().push_back(Ok(ExecOutput {
            exit_code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }));
    }

    /// Returns a snapshot of the argument vectors executed so far.
    #[must_use]
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.borrow().clone()
    }
}

impl RemoteExecutor for ScriptedExecutor {
    fn execute(
        &self,
        _environment: &Environment,
        command: &[String],
    ) -> Result<ExecOutput, ExecError> {
        self.commands.borrow_mut().push(command.to_vec());
        self.results.borrow_mut().pop_front().unwrap_or_else(|| {
            Ok(ExecOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            })
        })
    }
}

/// Produces a transport configuration suitable for scripted tests.
#[must_use]
pub fn test_transport_config() -> TransportConfig {
    TransportConfig {
        rsync_bin: String::from("rsync"),
        sftp_bin: String::from("sftp"),
        ssh_bin: String::from("ssh"),
        port: 2222,
        remote_files_dir: Some(String::from("/srv/bindings/test/files")),
    }
}

/// Produces a resolved Drupal 8 environment for tests.
#[must_use]
pub fn test_environment() -> Environment {
    Environment {
        site_id: String::from("11111111-2222-3333-4444-555555555555"),
        name: String::from("dev"),
        address: String::from(
            "dev.11111111-2222-3333-4444-555555555555@appserver.dev.\
             11111111-2222-3333-4444-555555555555.drush.in",
        ),
        framework: FrameworkKind::Drupal8,
    }
}
