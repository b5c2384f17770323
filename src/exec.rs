//! Remote interpreter selection and probe command construction.
//!
//! Each framework family is served by a different CMS shell on the remote
//! host. Selection is a pure function of the environment's framework kind,
//! evaluated fresh for every run, and the probe invocation is built directly
//! as an argument vector so option values containing spaces can never split
//! into extra arguments.

use std::borrow::Cow;
use std::ffi::OsString;

use shell_escape::unix::escape;
use thiserror::Error;

use crate::environment::{Environment, FrameworkKind};
use crate::transport::{CommandRunner, ProcessCommandRunner, TransportConfig, TransportError};

/// CMS shells capable of running a deployed probe script.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Interpreter {
    /// The Drupal shell (`drush`).
    Drush,
    /// The WordPress shell (`wp`).
    Wp,
}

impl Interpreter {
    /// Name of the remote binary for this interpreter.
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Drush => "drush",
            Self::Wp => "wp",
        }
    }
}

/// Selects the interpreter serving a framework kind.
///
/// # Errors
///
/// Returns [`ExecError::UnsupportedFramework`] for framework kinds with no
/// known interpreter.
pub fn interpreter_for(framework: &FrameworkKind) -> Result<Interpreter, ExecError> {
    match framework {
        FrameworkKind::Drupal | FrameworkKind::Drupal8 => Ok(Interpreter::Drush),
        FrameworkKind::Wordpress | FrameworkKind::WordpressNetwork => Ok(Interpreter::Wp),
        FrameworkKind::Unknown(raw) => Err(ExecError::UnsupportedFramework {
            framework: raw.clone(),
        }),
    }
}

/// Builds the argument vector that runs a deployed probe script.
#[must_use]
pub fn probe_command(
    interpreter: Interpreter,
    script_dir: &str,
    script_name: &str,
) -> Vec<String> {
    match interpreter {
        Interpreter::Drush => vec![
            String::from(interpreter.binary()),
            String::from("scr"),
            script_name.to_owned(),
            format!("--script-path={script_dir}"),
        ],
        Interpreter::Wp => vec![
            String::from(interpreter.binary()),
            String::from("eval-file"),
            format!("{script_dir}/{script_name}"),
        ],
    }
}

/// Output captured from a remote command execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecOutput {
    /// Exit code reported by the remote command, if available.
    pub exit_code: Option<i32>,
    /// Captured standard output stream.
    pub stdout: String,
    /// Captured standard error stream.
    pub stderr: String,
}

impl ExecOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Errors raised while executing a command on the remote host.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ExecError {
    /// Raised when the framework kind has no known interpreter.
    #[error("cannot determine whether to use drush or wp-cli for framework {framework}")]
    UnsupportedFramework {
        /// Framework string reported by the platform.
        framework: String,
    },
    /// Raised when the underlying SSH invocation fails to run.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// External capability that runs an argument vector on a resolved
/// environment and reports exit status plus captured output.
pub trait RemoteExecutor {
    /// Executes `command` against `environment`.
    ///
    /// A non-zero remote exit is reported through [`ExecOutput::exit_code`],
    /// not as an error; errors are reserved for failures to execute at all.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] when the command cannot be dispatched.
    fn execute(
        &self,
        environment: &Environment,
        command: &[String],
    ) -> Result<ExecOutput, ExecError>;
}

/// Remote executor that shells out to the system `ssh` client.
#[derive(Clone, Debug)]
pub struct SshExecutor<R: CommandRunner> {
    config: TransportConfig,
    runner: R,
}

impl SshExecutor<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: TransportConfig) -> Result<Self, TransportError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> SshExecutor<R> {
    /// Creates a new executor using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] when configuration
    /// validation fails.
    pub fn new(config: TransportConfig, runner: R) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    fn build_ssh_args(&self, environment: &Environment, command: &[String]) -> Vec<OsString> {
        vec![
            OsString::from("-p"),
            OsString::from(self.config.port.to_string()),
            OsString::from(environment.address.clone()),
            OsString::from(render_remote_command(command)),
        ]
    }
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    fn execute(
        &self,
        environment: &Environment,
        command: &[String],
    ) -> Result<ExecOutput, ExecError> {
        let args = self.build_ssh_args(environment, command);
        let output = self.runner.run(&self.config.ssh_bin, &args, None)?;
        Ok(ExecOutput {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Joins an argument vector into a single shell-escaped remote command.
fn render_remote_command(command: &[String]) -> String {
    command
        .iter()
        .map(|arg| escape(Cow::from(arg.as_str())).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRunner, test_environment, test_transport_config};
    use rstest::rstest;

    #[rstest]
    #[case(FrameworkKind::Drupal, Interpreter::Drush)]
    #[case(FrameworkKind::Drupal8, Interpreter::Drush)]
    #[case(FrameworkKind::Wordpress, Interpreter::Wp)]
    #[case(FrameworkKind::WordpressNetwork, Interpreter::Wp)]
    fn interpreter_selection_covers_every_known_framework(
        #[case] framework: FrameworkKind,
        #[case] expected: Interpreter,
    ) {
        let interpreter =
            interpreter_for(&framework).expect("known framework should map");
        assert_eq!(interpreter, expected);
    }

    #[test]
    fn interpreter_selection_rejects_unknown_frameworks() {
        let framework = FrameworkKind::Unknown(String::from("backdrop"));
        let err = interpreter_for(&framework).expect_err("unknown framework should fail");
        assert!(
            matches!(err, ExecError::UnsupportedFramework { ref framework } if framework == "backdrop")
        );
    }

    #[test]
    fn drush_command_passes_script_path_flag() {
        let command = probe_command(Interpreter::Drush, "/srv/bindings/abc/files", "curltest.php");
        assert_eq!(
            command,
            vec![
                String::from("drush"),
                String::from("scr"),
                String::from("curltest.php"),
                String::from("--script-path=/srv/bindings/abc/files"),
            ]
        );
    }

    #[test]
    fn wp_command_evaluates_file_in_place() {
        let command = probe_command(Interpreter::Wp, "/srv/bindings/abc/files", "sshtest.php");
        assert_eq!(
            command,
            vec![
                String::from("wp"),
                String::from("eval-file"),
                String::from("/srv/bindings/abc/files/sshtest.php"),
            ]
        );
    }

    #[test]
    fn ssh_executor_joins_and_escapes_the_argument_vector() {
        let runner = ScriptedRunner::new();
        runner.push_success();
        let executor = SshExecutor::new(test_transport_config(), runner.clone())
            .expect("config should validate");
        let environment = test_environment();

        let command = vec![
            String::from("drush"),
            String::from("scr"),
            String::from("curltest.php"),
            String::from("--script-path=/srv/bindings/a b/files"),
        ];
        executor
            .execute(&environment, &command)
            .expect("execution should succeed");

        let invocations = runner.invocations();
        let invocation = invocations.first().expect("one invocation");
        assert_eq!(invocation.program, "ssh");
        let joined = invocation
            .args
            .last()
            .expect("remote command argument")
            .to_string_lossy()
            .into_owned();
        assert!(
            joined.contains("'--script-path=/srv/bindings/a b/files'"),
            "joined: {joined}"
        );
        assert!(joined.starts_with("drush scr curltest.php"), "joined: {joined}");
    }

    #[test]
    fn ssh_executor_reports_remote_exit_code() {
        let runner = ScriptedRunner::new();
        runner.push_failure(3);
        let executor = SshExecutor::new(test_transport_config(), runner)
            .expect("config should validate");

        let output = executor
            .execute(&test_environment(), &[String::from("drush")])
            .expect("dispatch should succeed");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.is_success());
    }
}
