//! Orchestrates one end-to-end probe run.
//!
//! A run is a single synchronous transaction against an unreliable remote
//! channel: validate options, render the probe script, push it, execute it
//! through the environment's CMS shell, pull the results artifact back,
//! clean up the remote copies, and parse the artifact. The remote side has
//! no notion of the operation, so there is no rollback — the orchestrator
//! instead maximises local determinism (temp file naming, escaping, cleanup
//! ordering) and guarantees best-effort remote cleanup on every path that
//! deployed a script.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::exec::{self, ExecError, RemoteExecutor};
use crate::probe::{MissingOptionError, OptionSet, ProbeSpec, template};
use crate::report::ProbeResult;
use crate::transport::{CommandRunner, Transport, TransportError};

#[cfg(test)]
mod tests;

/// Remote directory, relative to the login directory, that receives the
/// probe script and holds its results artifact.
pub const REMOTE_FILES_AREA: &str = "files";

/// Errors surfaced while running a probe.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProbeRunError {
    /// Raised when a required option is absent or empty. Surfaced before
    /// any remote call is made.
    #[error(transparent)]
    MissingOption(#[from] MissingOptionError),
    /// Raised when staging the rendered script locally fails.
    #[error("failed to stage the probe script locally: {message}")]
    Workspace {
        /// Underlying error message.
        message: String,
    },
    /// Raised when uploading the probe script fails.
    #[error("failed to upload the probe script: {0}")]
    Push(#[source] TransportError),
    /// Raised when the remote files directory cannot be discovered.
    #[error("failed to discover the remote files directory: {0}")]
    WorkingDirectory(#[source] TransportError),
    /// Raised when the interpreter cannot be selected or the command cannot
    /// be dispatched.
    #[error(transparent)]
    Exec(#[from] ExecError),
    /// Raised when the remote probe invocation exits non-zero.
    #[error("remote command `{command}` failed with exit code {status_text}: {stderr}")]
    Execute {
        /// Argument vector rendered for diagnostics.
        command: String,
        /// Human readable exit status.
        status_text: String,
        /// Stderr captured from the remote invocation.
        stderr: String,
    },
    /// Raised when retrieving the results artifact fails.
    #[error("failed to retrieve the probe results: {0}")]
    Pull(#[source] TransportError),
    /// Raised when the pull reported success but no local file materialised.
    #[error("unable to locate results file {path}")]
    ResultsNotFound {
        /// Local path that was expected to exist.
        path: Utf8PathBuf,
    },
    /// Raised when the results artifact is not valid JSON.
    #[error("probe results were not valid JSON: {message}")]
    MalformedResult {
        /// Decoder error message.
        message: String,
    },
}

/// Drives one probe run end-to-end over the transport and executor seams.
#[derive(Debug)]
pub struct ProbeOrchestrator<R: CommandRunner, E: RemoteExecutor> {
    transport: Transport<R>,
    executor: E,
}

impl<R: CommandRunner, E: RemoteExecutor> ProbeOrchestrator<R, E> {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(transport: Transport<R>, executor: E) -> Self {
        Self {
            transport,
            executor,
        }
    }

    /// Runs a probe against the environment and returns its parsed result.
    ///
    /// Remote artifacts (the deployed script and its results file) are
    /// removed best-effort before this method returns on every path that
    /// got as far as deploying the script; removal failures are logged and
    /// never override the primary outcome. Local artifacts live in a scoped
    /// temporary directory that is deleted unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeRunError`] for the first hard failure: validation,
    /// staging, upload, interpreter selection, execution, retrieval, or
    /// decoding.
    pub fn run(
        &self,
        environment: &Environment,
        spec: &ProbeSpec,
        options: &OptionSet,
    ) -> Result<ProbeResult, ProbeRunError> {
        spec.validate(options)?;
        let effective = spec.effective_options(options);
        debug!(probe = spec.template(), options = ?effective, "validated probe options");

        let body = template::render(spec.body(), &effective);
        let workspace = tempfile::tempdir().map_err(|err| ProbeRunError::Workspace {
            message: err.to_string(),
        })?;
        let workspace_dir = utf8_workspace_path(&workspace)?;
        let script = stage_script(&workspace_dir, spec.template(), &body)?;

        info!(probe = spec.template(), environment = %environment.address, "deploying probe script");
        self.transport
            .push(environment, &script, &format!("{REMOTE_FILES_AREA}/"))
            .map_err(ProbeRunError::Push)?;

        let pulled = self.execute_and_pull(environment, spec, &workspace_dir);
        self.cleanup_remote(environment, spec);

        let results_path = pulled?;
        parse_results(&results_path)
    }

    fn execute_and_pull(
        &self,
        environment: &Environment,
        spec: &ProbeSpec,
        workspace_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, ProbeRunError> {
        let files_dir = self.resolve_files_dir(environment)?;
        let interpreter = exec::interpreter_for(&environment.framework)?;
        let command = exec::probe_command(interpreter, &files_dir, spec.template());

        info!(command = %command.join(" "), "executing probe");
        let output = self.executor.execute(environment, &command)?;
        if !output.is_success() {
            let status_text = output
                .exit_code
                .map_or_else(|| String::from("unknown"), |code| code.to_string());
            return Err(ProbeRunError::Execute {
                command: command.join(" "),
                status_text,
                stderr: output.stderr,
            });
        }

        let results_file = spec.results_file();
        let local = workspace_dir.join(&results_file);
        self.transport
            .pull(
                environment,
                &format!("{REMOTE_FILES_AREA}/{results_file}"),
                &local,
            )
            .map_err(ProbeRunError::Pull)?;
        if !local.is_file() {
            return Err(ProbeRunError::ResultsNotFound { path: local });
        }
        Ok(local)
    }

    fn resolve_files_dir(&self, environment: &Environment) -> Result<String, ProbeRunError> {
        self.transport.config().remote_files_dir.clone().map_or_else(
            || {
                self.transport
                    .current_directory(environment)
                    .map(|login_dir| format!("{login_dir}/{REMOTE_FILES_AREA}"))
                    .map_err(ProbeRunError::WorkingDirectory)
            },
            Ok,
        )
    }

    /// Removes both remote artifacts, each independently best-effort.
    fn cleanup_remote(&self, environment: &Environment, spec: &ProbeSpec) {
        let artifacts = [
            format!("{REMOTE_FILES_AREA}/{}", spec.results_file()),
            format!("{REMOTE_FILES_AREA}/{}", spec.template()),
        ];
        for artifact in artifacts {
            if let Err(err) = self.transport.remove(environment, &artifact) {
                warn!(artifact = %artifact, error = %err, "failed to remove remote probe artifact");
            }
        }
    }
}

fn utf8_workspace_path(workspace: &TempDir) -> Result<Utf8PathBuf, ProbeRunError> {
    Utf8PathBuf::from_path_buf(workspace.path().to_path_buf()).map_err(|path| {
        ProbeRunError::Workspace {
            message: format!("temporary directory is not UTF-8: {}", path.display()),
        }
    })
}

fn stage_script(
    workspace_dir: &Utf8Path,
    name: &str,
    body: &str,
) -> Result<Utf8PathBuf, ProbeRunError> {
    let workspace_error = |message: String| ProbeRunError::Workspace { message };
    let dir = Dir::open_ambient_dir(workspace_dir, ambient_authority())
        .map_err(|err| workspace_error(err.to_string()))?;
    dir.write(name, body)
        .map_err(|err| workspace_error(err.to_string()))?;
    Ok(workspace_dir.join(name))
}

fn parse_results(path: &Utf8Path) -> Result<ProbeResult, ProbeRunError> {
    let raw = std::fs::read_to_string(path).map_err(|err| ProbeRunError::Workspace {
        message: err.to_string(),
    })?;
    // The artifact is transient: drop it as soon as it has been read, even
    // when decoding fails below.
    if let Err(err) = std::fs::remove_file(path) {
        warn!(path = %path, error = %err, "failed to remove local results file");
    }
    serde_json::from_str(&raw).map_err(|err| ProbeRunError::MalformedResult {
        message: err.to_string(),
    })
}
