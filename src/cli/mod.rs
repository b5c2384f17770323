//! Command-line interface definitions for the `pegcheck` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page. It
//! deliberately depends on nothing but clap: the build script includes it via
//! `#[path]`.

use clap::{Parser, Subcommand};

/// Top-level CLI for the `pegcheck` binary.
#[derive(Debug, Parser)]
#[command(
    name = "pegcheck",
    about = "Run PEG connectivity probes against a managed hosting environment",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Enable verbose diagnostic logging.
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands, one per probe kind plus the endpoint listing.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the PEG endpoint constants configured for an environment.
    #[command(name = "endpoints")]
    Endpoints(EndpointsCommand),
    /// Run a cURL test to check PEG HTTP connectivity.
    #[command(name = "curl")]
    Curl(CurlCommand),
    /// Run an LDAP bind test through the PEG.
    #[command(name = "ldap")]
    Ldap(LdapCommand),
    /// Run an SMTP HELO test through the PEG.
    #[command(name = "smtp")]
    Smtp(SmtpCommand),
    /// Run a simple SSH banner test through the PEG.
    #[command(name = "ssh")]
    Ssh(SshCommand),
    /// Dump the TLS certificates presented behind the PEG.
    #[command(name = "showcerts")]
    Showcerts(ShowcertsCommand),
}

/// Arguments for the `pegcheck endpoints` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct EndpointsCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
}

/// Arguments for the `pegcheck curl` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CurlCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
    /// The URL to fetch through the gateway.
    #[arg(long, value_name = "URL")]
    pub(crate) url: Option<String>,
    /// The endpoint constant name to resolve the gateway port from.
    #[arg(long, value_name = "NAME")]
    pub(crate) constant_name: Option<String>,
}

/// Arguments for the `pegcheck ldap` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct LdapCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
    /// The endpoint constant name to resolve the gateway port from.
    #[arg(long, value_name = "NAME")]
    pub(crate) constant_name: Option<String>,
    /// Whether to use TLS (true/false).
    #[arg(long, value_name = "BOOL")]
    pub(crate) use_tls: Option<String>,
    /// The LDAP protocol version to use (2/3).
    #[arg(long, value_name = "VERSION")]
    pub(crate) proto: Option<String>,
    /// The bind DN to authenticate with; omit for an anonymous binding.
    #[arg(long, value_name = "DN")]
    pub(crate) bind_dn: Option<String>,
    /// The bind password. Pass the flag without a value to be prompted
    /// instead of supplying the secret on the command line.
    #[arg(long, value_name = "PASSWORD", num_args = 0..=1)]
    pub(crate) bind_password: Option<Option<String>>,
    /// Bypass TLS certificate validation (true/false). Useful for
    /// debugging even though the CMS directory modules never set it.
    #[arg(long, value_name = "BOOL")]
    pub(crate) bypass_tls_check: Option<String>,
}

/// Arguments for the `pegcheck smtp` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SmtpCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
    /// The endpoint constant name to resolve the gateway port from.
    #[arg(long, value_name = "NAME")]
    pub(crate) constant_name: Option<String>,
    /// The mail server address to greet as an SMTP relay.
    #[arg(long, value_name = "ADDRESS")]
    pub(crate) relay_address: Option<String>,
}

/// Arguments for the `pegcheck ssh` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct SshCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
    /// The endpoint constant name to resolve the gateway port from.
    #[arg(long, value_name = "NAME")]
    pub(crate) constant_name: Option<String>,
}

/// Arguments for the `pegcheck showcerts` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ShowcertsCommand {
    /// Target environment in SITE.ENV form.
    #[arg(value_name = "SITE.ENV")]
    pub(crate) target: String,
    /// The endpoint constant name to resolve the gateway port from.
    #[arg(long, value_name = "NAME")]
    pub(crate) constant_name: Option<String>,
    /// STARTTLS protocol to negotiate first (smtp, pop3, imap, ftp, xmpp).
    #[arg(long, value_name = "PROTO")]
    pub(crate) proto: Option<String>,
}
