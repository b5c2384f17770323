//! Remote file transport over rsync and sftp on a fixed secure-shell port.
//!
//! `push` and `pull` wrap the system `rsync` binary in compression-enabled,
//! link-preserving mode; `remove` and working-directory discovery drive
//! `sftp` in batch mode. Every operation surfaces non-zero exits as a
//! [`TransportError::CommandFailure`] carrying the full command string and
//! status, and nothing here retries: a probe run is a single round trip.

use std::ffi::OsString;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::environment::Environment;

mod runner;


pub use runner::{CommandOutput, CommandRunner, ProcessCommandRunner};

/// Secure-shell port used by the hosting platform's file transport.
pub const DEFAULT_TRANSPORT_PORT: u16 = 2222;

/// Transport settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(prefix = "PEGCHECK_TRANSPORT")]
pub struct TransportConfig {
    /// Path to the `rsync` executable.
    #[ortho_config(default = "rsync".to_owned())]
    pub rsync_bin: String,
    /// Path to the `sftp` executable.
    #[ortho_config(default = "sftp".to_owned())]
    pub sftp_bin: String,
    /// Path to the `ssh` executable, used as the rsync remote shell and for
    /// remote probe execution.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Secure-shell port the platform exposes for file transfer.
    #[ortho_config(default = DEFAULT_TRANSPORT_PORT)]
    pub port: u16,
    /// Remote directory that receives uploaded files. When unset, the
    /// orchestrator falls back to sftp banner discovery of the login
    /// directory.
    pub remote_files_dir: Option<String>,
}

impl TransportConfig {
    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] when any required field is
    /// empty.
    pub fn validate(&self) -> Result<(), TransportError> {
        Self::require_value(&self.rsync_bin, "rsync_bin")?;
        Self::require_value(&self.sftp_bin, "sftp_bin")?;
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_optional_value(self.remote_files_dir.as_deref(), "remote_files_dir")?;
        if self.port == 0 {
            return Err(TransportError::InvalidConfig {
                field: String::from("port"),
            });
        }
        Ok(())
    }

    /// Loads configuration from defaults, configuration files, and
    /// environment variables, without consulting CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`TransportConfigLoadError::Parse`] when merging sources
    /// fails.
    pub fn load_without_cli_args() -> Result<Self, TransportConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("pegcheck")])
            .map_err(|err| TransportConfigLoadError::Parse(err.to_string()))
    }

    fn require_value(value: &str, field: &str) -> Result<(), TransportError> {
        Self::require_optional_value(Some(value), field)
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), TransportError> {
        match value {
            None => Ok(()),
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(TransportError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }
}

/// Errors raised when loading the transport configuration from layered
/// sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum TransportConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("transport configuration parsing failed: {0}")]
    Parse(String),
}

/// Errors surfaced while transferring or removing remote files.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Raised when configuration is missing required values.
    #[error(
        "missing {field}: set PEGCHECK_TRANSPORT_{env_suffix} or add {field} to pegcheck.toml",
        env_suffix = field.to_uppercase()
    )]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a transfer command completes with a non-zero exit code.
    #[error("command `{command}` failed with exit code {status_text}: {stderr}")]
    CommandFailure {
        /// Full command line used for the attempted operation.
        command: String,
        /// Exit status as reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// Raised when the sftp banner does not reveal the working directory.
    #[error("could not locate the remote working directory in sftp output: {output}")]
    BannerParse {
        /// Captured sftp output that failed to parse.
        output: String,
    },
}

/// File transport bound to a command runner and transport configuration.
#[derive(Clone, Debug)]
pub struct Transport<R: CommandRunner> {
    config: TransportConfig,
    runner: R,
}

impl Transport<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: TransportConfig) -> Result<Self, TransportError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> Transport<R> {
    /// Creates a new transport using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidConfig`] when configuration
    /// validation fails.
    pub fn new(config: TransportConfig, runner: R) -> Result<Self, TransportError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Uploads a local file into the environment's remote file area.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandFailure`] when rsync exits non-zero.
    pub fn push(
        &self,
        environment: &Environment,
        local: &Utf8Path,
        remote: &str,
    ) -> Result<(), TransportError> {
        let destination = format!("{}:{remote}", environment.address);
        self.rsync(local.as_str(), &destination)
    }

    /// Downloads a remote file to a local path.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandFailure`] when rsync exits non-zero,
    /// including when the remote file does not exist.
    pub fn pull(
        &self,
        environment: &Environment,
        remote: &str,
        local: &Utf8Path,
    ) -> Result<(), TransportError> {
        let source = format!("{}:{remote}", environment.address);
        self.rsync(&source, local.as_str())
    }

    /// Removes a remote file via an sftp batch command.
    ///
    /// This is advisory cleanup: callers are expected to catch and log
    /// failures rather than propagate them.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::CommandFailure`] when sftp exits non-zero.
    pub fn remove(&self, environment: &Environment, remote: &str) -> Result<(), TransportError> {
        self.sftp_batch(environment, &format!("rm {remote}\n"))
            .map(|_| ())
    }

    /// Discovers the remote login directory by asking sftp for its working
    /// directory and parsing the reported banner line.
    ///
    /// Legacy fallback: prefer configuring
    /// [`TransportConfig::remote_files_dir`] explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BannerParse`] when the output carries no
    /// `Remote working directory:` line.
    pub fn current_directory(&self, environment: &Environment) -> Result<String, TransportError> {
        let output = self.sftp_batch(environment, "pwd\n")?;
        parse_working_directory(&output.stdout).ok_or(TransportError::BannerParse {
            output: output.stdout,
        })
    }

    fn rsync(&self, source: &str, destination: &str) -> Result<(), TransportError> {
        let args = vec![
            OsString::from("-rlIpz"),
            OsString::from("--ipv4"),
            OsString::from("-e"),
            OsString::from(format!("{} -p {}", self.config.ssh_bin, self.config.port)),
            OsString::from(source),
            OsString::from(destination),
        ];
        debug!(command = %command_string(&self.config.rsync_bin, &args), "running rsync");
        let output = self.runner.run(&self.config.rsync_bin, &args, None)?;
        if output.is_success() {
            return Ok(());
        }
        Err(command_failure(&self.config.rsync_bin, &args, &output))
    }

    fn sftp_batch(
        &self,
        environment: &Environment,
        batch: &str,
    ) -> Result<CommandOutput, TransportError> {
        let args = vec![
            OsString::from("-o"),
            OsString::from(format!("Port={}", self.config.port)),
            OsString::from("-b"),
            OsString::from("-"),
            OsString::from(environment.address.clone()),
        ];
        debug!(command = %command_string(&self.config.sftp_bin, &args), "running sftp batch");
        let output = self.runner.run(&self.config.sftp_bin, &args, Some(batch))?;
        if output.is_success() {
            return Ok(output);
        }
        Err(command_failure(&self.config.sftp_bin, &args, &output))
    }
}

fn command_failure(program: &str, args: &[OsString], output: &CommandOutput) -> TransportError {
    let status_text = output
        .code
        .map_or_else(|| String::from("unknown"), |code| code.to_string());
    TransportError::CommandFailure {
        command: command_string(program, args),
        status: output.code,
        status_text,
        stderr: output.stderr.clone(),
    }
}

fn command_string(program: &str, args: &[OsString]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_owned());
    parts.extend(args.iter().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn parse_working_directory(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Remote working directory:")
            .map(|rest| rest.trim().to_owned())
            .filter(|path| !path.is_empty())
    })
}
