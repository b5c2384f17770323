//! Binary entry point for the pegcheck CLI.

use std::io::{self, BufRead, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use pegcheck::{
    ConfigResolver, EnvironmentResolver, OptionSet, ProbeKind, ProbeOrchestrator, ProbeRunError,
    ProbeSpec, ResolverConfig, ResolverError, SshExecutor, Transport, TransportConfig,
    render_endpoint_table, split_site_env, summarize,
};

mod cli;

use cli::{
    Cli, Command, CurlCommand, EndpointsCommand, LdapCommand, ShowcertsCommand, SmtpCommand,
    SshCommand,
};

/// STARTTLS protocols `openssl s_client` can negotiate for the certificate
/// check.
const SUPPORTED_CERT_PROTOCOLS: [&str; 5] = ["smtp", "pop3", "imap", "ftp", "xmpp"];

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Resolver(#[from] ResolverError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Run(#[from] ProbeRunError),
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("failed to read bind password: {0}")]
    Prompt(String),
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let exit_code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "pegcheck=debug" } else { "pegcheck=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn dispatch(cli: &Cli) -> Result<i32, CliError> {
    let resolver_config = ResolverConfig::load_without_cli_args()?;
    let resolver = ConfigResolver::new(resolver_config)?;

    match &cli.command {
        Command::Endpoints(args) => endpoints_command(&resolver, args),
        Command::Curl(args) => {
            run_probe(&resolver, ProbeKind::Curl, &args.target, &curl_options(args))
        }
        Command::Ldap(args) => {
            let options = ldap_options(args)?;
            run_probe(&resolver, ProbeKind::Ldap, &args.target, &options)
        }
        Command::Smtp(args) => {
            run_probe(&resolver, ProbeKind::Smtp, &args.target, &smtp_options(args))
        }
        Command::Ssh(args) => {
            run_probe(&resolver, ProbeKind::Ssh, &args.target, &ssh_options(args))
        }
        Command::Showcerts(args) => {
            let options = showcerts_options(args)?;
            run_probe(&resolver, ProbeKind::ShowCerts, &args.target, &options)
        }
    }
}

fn endpoints_command(
    resolver: &ConfigResolver,
    args: &EndpointsCommand,
) -> Result<i32, CliError> {
    let (site, _environment) = split_site_env(&args.target)?;
    let endpoints = resolver.endpoints(site)?;
    if endpoints.is_empty() {
        write_line(
            io::stdout(),
            "There are no PEG constants configured for this environment.",
        );
    } else {
        write_text(io::stdout(), &render_endpoint_table(&endpoints));
    }
    Ok(0)
}

fn run_probe(
    resolver: &ConfigResolver,
    kind: ProbeKind,
    target: &str,
    options: &OptionSet,
) -> Result<i32, CliError> {
    let (site, environment_name) = split_site_env(target)?;
    let environment = resolver.resolve(site, environment_name)?;

    let transport_config = TransportConfig::load_without_cli_args()
        .map_err(|err| CliError::Config(err.to_string()))?;
    let transport = Transport::with_process_runner(transport_config.clone())
        .map_err(|err| CliError::Transport(err.to_string()))?;
    let executor = SshExecutor::with_process_runner(transport_config)
        .map_err(|err| CliError::Transport(err.to_string()))?;
    let orchestrator = ProbeOrchestrator::new(transport, executor);

    let spec = ProbeSpec::for_kind(kind);
    let result = orchestrator.run(&environment, spec, options)?;
    let outcome = summarize(kind, &result);
    write_line(io::stdout(), &outcome.message(kind));
    Ok(i32::from(outcome.is_failure()))
}

fn curl_options(args: &CurlCommand) -> OptionSet {
    let mut options = OptionSet::new();
    insert_if_present(&mut options, "url", args.url.as_deref());
    insert_if_present(&mut options, "constant-name", args.constant_name.as_deref());
    options
}

fn ldap_options(args: &LdapCommand) -> Result<OptionSet, CliError> {
    let mut options = OptionSet::new();
    insert_if_present(&mut options, "constant-name", args.constant_name.as_deref());
    insert_if_present(&mut options, "use-tls", args.use_tls.as_deref());
    insert_if_present(&mut options, "proto", args.proto.as_deref());
    insert_if_present(&mut options, "bind-dn", args.bind_dn.as_deref());
    insert_if_present(
        &mut options,
        "bypass-tls-check",
        args.bypass_tls_check.as_deref(),
    );

    match &args.bind_password {
        Some(Some(password)) => options.set("bind-password", password.clone()),
        // The bare flag asks for the secret interactively, but only when a
        // bind DN was supplied; an anonymous binding needs no password.
        Some(None) => {
            if args.bind_dn.is_some() {
                options.set("bind-password", prompt_bind_password()?);
            }
        }
        None => {}
    }
    Ok(options)
}

fn smtp_options(args: &SmtpCommand) -> OptionSet {
    let mut options = OptionSet::new();
    insert_if_present(&mut options, "constant-name", args.constant_name.as_deref());
    insert_if_present(&mut options, "relay-address", args.relay_address.as_deref());
    options
}

fn ssh_options(args: &SshCommand) -> OptionSet {
    let mut options = OptionSet::new();
    insert_if_present(&mut options, "constant-name", args.constant_name.as_deref());
    options
}

fn showcerts_options(args: &ShowcertsCommand) -> Result<OptionSet, CliError> {
    let mut options = OptionSet::new();
    insert_if_present(&mut options, "constant-name", args.constant_name.as_deref());
    if let Some(proto) = args.proto.as_deref() {
        let lowered = proto.to_lowercase();
        if !SUPPORTED_CERT_PROTOCOLS.contains(&lowered.as_str()) {
            return Err(CliError::InvalidOption(format!(
                "the proto option must be one of the following: {}",
                SUPPORTED_CERT_PROTOCOLS.join(", ")
            )));
        }
        options.set("proto", lowered);
    }
    Ok(options)
}

fn insert_if_present(options: &mut OptionSet, key: &str, value: Option<&str>) {
    if let Some(present) = value {
        options.set(key, present);
    }
}

fn prompt_bind_password() -> Result<String, CliError> {
    let prompt_error = |err: io::Error| CliError::Prompt(err.to_string());
    let mut err_out = io::stderr();
    write!(err_out, "Please enter a bind password: ").map_err(prompt_error)?;
    err_out.flush().map_err(prompt_error)?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).map_err(prompt_error)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

fn write_line(mut target: impl Write, text: &str) {
    writeln!(target, "{text}").ok();
}

fn write_text(mut target: impl Write, text: &str) {
    write!(target, "{text}").ok();
}
