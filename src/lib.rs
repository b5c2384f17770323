//! Core library for the pegcheck connectivity diagnostic tool.
//!
//! The crate orchestrates PEG (private egress gateway) probes against managed
//! hosting environments: a probe script is rendered from a template, shipped
//! to the environment over SFTP/rsync, executed through the environment's CMS
//! shell, and its JSON results artifact is retrieved, parsed, and reported.

pub mod endpoints;
pub mod environment;
pub mod exec;
pub mod probe;
pub mod report;
pub mod runner;
pub mod test_support;
pub mod transport;

pub use endpoints::render_endpoint_table;
pub use environment::{
    ConfigResolver, ENDPOINT_CONSTANT_PREFIX, Environment, EnvironmentResolver, FrameworkKind,
    PegEndpoint, ResolverConfig, ResolverError, split_site_env,
};
pub use exec::{
    ExecError, ExecOutput, Interpreter, RemoteExecutor, SshExecutor, interpreter_for,
    probe_command,
};
pub use probe::{MissingOptionError, OptionSet, ProbeKind, ProbeSpec};
pub use report::{Outcome, ProbeResult, summarize};
pub use runner::{ProbeOrchestrator, ProbeRunError, REMOTE_FILES_AREA};
pub use transport::{
    CommandOutput, CommandRunner, DEFAULT_TRANSPORT_PORT, ProcessCommandRunner, Transport,
    TransportConfig, TransportConfigLoadError, TransportError,
};
