//! Target environment model and the environment resolver seam.
//!
//! An [`Environment`] identifies one deployment of one site: the opaque site
//! identifier, the environment name, the computed appserver address used for
//! SSH/SFTP, and the CMS framework that determines which remote shell can run
//! probe scripts. Resolution is owned by an external capability behind the
//! [`EnvironmentResolver`] trait; the bundled [`ConfigResolver`] reads site
//! declarations from layered configuration.

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix applied to configured endpoint names to form the PHP constant the
/// probe templates read on the remote side.
pub const ENDPOINT_CONSTANT_PREFIX: &str = "PANTHEON_SOIP_";

/// CMS framework families observed in environment metadata.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FrameworkKind {
    /// Drupal 7 and earlier.
    Drupal,
    /// Drupal 8 and later.
    Drupal8,
    /// Single-site WordPress.
    Wordpress,
    /// WordPress multisite networks.
    WordpressNetwork,
    /// Anything the platform reports that this tool does not recognise.
    /// Carried verbatim so interpreter selection can name it when failing.
    Unknown(String),
}

impl FrameworkKind {
    /// Parses the framework string reported by the platform.
    #[must_use]
    pub fn from_metadata(raw: &str) -> Self {
        match raw {
            "drupal" => Self::Drupal,
            "drupal8" => Self::Drupal8,
            "wordpress" => Self::Wordpress,
            "wordpress_network" => Self::WordpressNetwork,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// The platform's string form of this framework kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Drupal => "drupal",
            Self::Drupal8 => "drupal8",
            Self::Wordpress => "wordpress",
            Self::WordpressNetwork => "wordpress_network",
            Self::Unknown(raw) => raw,
        }
    }
}

impl std::fmt::Display for FrameworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved deployment target. Immutable once resolved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Environment {
    /// Opaque site identifier assigned by the platform.
    pub site_id: String,
    /// Environment name within the site (for example `dev` or `live`).
    pub name: String,
    /// Login and host for SSH/SFTP, `{env}.{site}@appserver…` form.
    pub address: String,
    /// CMS framework served by this environment.
    pub framework: FrameworkKind,
}

/// One configured egress endpoint exposed to the environment as a PHP
/// constant.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PegEndpoint {
    /// Full constant name, including [`ENDPOINT_CONSTANT_PREFIX`].
    pub constant_name: String,
    /// IP address the gateway forwards to.
    pub target_ip: String,
    /// Port the gateway forwards to.
    pub target_port: u16,
}

/// External capability that resolves environments and their endpoints.
pub trait EnvironmentResolver {
    /// Resolves a site/environment pair into a target [`Environment`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError`] when the site or environment is not known.
    fn resolve(&self, site: &str, environment: &str) -> Result<Environment, ResolverError>;

    /// Lists the egress endpoints configured for a site.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::UnknownSite`] when the site is not declared.
    fn endpoints(&self, site: &str) -> Result<Vec<PegEndpoint>, ResolverError>;
}

/// Errors raised while resolving environments.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolverError {
    /// Raised when the named site is not declared in configuration.
    #[error("unknown site {site}: declare it under [[sites]] in pegcheck.toml")]
    UnknownSite {
        /// Site name as supplied by the caller.
        site: String,
    },
    /// Raised when a target identifier is not in `SITE.ENV` form.
    #[error("malformed target {target}: expected SITE.ENV")]
    MalformedTarget {
        /// Identifier as supplied by the caller.
        target: String,
    },
    /// Raised when configuration loading or validation fails.
    #[error("resolver configuration error: {0}")]
    Config(String),
}

/// Splits a `SITE.ENV` identifier into its site and environment parts.
///
/// # Errors
///
/// Returns [`ResolverError::MalformedTarget`] when the separator is absent or
/// either part is empty.
pub fn split_site_env(target: &str) -> Result<(&str, &str), ResolverError> {
    target
        .split_once('.')
        .filter(|(site, environment)| !site.is_empty() && !environment.is_empty())
        .ok_or_else(|| ResolverError::MalformedTarget {
            target: target.to_owned(),
        })
}

/// Resolver settings loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "PEGCHECK",
    discovery(
        app_name = "pegcheck",
        env_var = "PEGCHECK_CONFIG_PATH",
        config_file_name = "pegcheck.toml",
        dotfile_name = ".pegcheck.toml",
        project_file_name = "pegcheck.toml"
    )
)]
pub struct ResolverConfig {
    /// Domain suffix used when computing appserver addresses.
    #[ortho_config(default = "drush.in".to_owned())]
    pub host_domain: String,
    /// Sites this installation may target.
    #[ortho_config(default = Vec::new(), skip_cli)]
    pub sites: Vec<SiteConfig>,
}

/// One declared site.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Human-facing site name used on the command line.
    pub name: String,
    /// Opaque platform identifier for the site.
    pub id: String,
    /// Framework metadata string (`drupal`, `drupal8`, `wordpress`,
    /// `wordpress_network`).
    pub framework: String,
    /// Egress endpoints configured for the site.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// One declared egress endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Endpoint name; the constant prefix is prepended when listing.
    pub name: String,
    /// IP address the gateway forwards to.
    pub target_ip: String,
    /// Port the gateway forwards to.
    pub target_port: u16,
}

impl ResolverConfig {
    /// Loads configuration from defaults, configuration files, and
    /// environment variables, without consulting CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Config`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, ResolverError> {
        Self::load_from_iter([std::ffi::OsString::from("pegcheck")])
            .map_err(|err| ResolverError::Config(err.to_string()))
    }

    /// Ensures declared values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Config`] naming the first empty field.
    pub fn validate(&self) -> Result<(), ResolverError> {
        Self::require_value(&self.host_domain, "host_domain")?;
        for site in &self.sites {
            Self::require_value(&site.name, "sites.name")?;
            Self::require_value(&site.id, "sites.id")?;
            Self::require_value(&site.framework, "sites.framework")?;
        }
        Ok(())
    }

    fn require_value(value: &str, field: &str) -> Result<(), ResolverError> {
        if value.trim().is_empty() {
            return Err(ResolverError::Config(format!(
                "missing {field}: set PEGCHECK_{} or add {field} to pegcheck.toml",
                field.to_uppercase().replace('.', "_")
            )));
        }
        Ok(())
    }
}

/// Environment resolver backed by declared configuration.
#[derive(Clone, Debug)]
pub struct ConfigResolver {
    config: ResolverConfig,
}

impl ConfigResolver {
    /// Creates a resolver after validating the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::Config`] when validation fails.
    pub fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn site(&self, name: &str) -> Result<&SiteConfig, ResolverError> {
        self.config
            .sites
            .iter()
            .find(|site| site.name == name)
            .ok_or_else(|| ResolverError::UnknownSite {
                site: name.to_owned(),
            })
    }
}

impl EnvironmentResolver for ConfigResolver {
    fn resolve(&self, site: &str, environment: &str) -> Result<Environment, ResolverError> {
        let declared = self.site(site)?;
        let address = format!(
            "{environment}.{id}@appserver.{environment}.{id}.{domain}",
            id = declared.id,
            domain = self.config.host_domain
        );
        Ok(Environment {
            site_id: declared.id.clone(),
            name: environment.to_owned(),
            address,
            framework: FrameworkKind::from_metadata(&declared.framework),
        })
    }

    fn endpoints(&self, site: &str) -> Result<Vec<PegEndpoint>, ResolverError> {
        let declared = self.site(site)?;
        Ok(declared
            .endpoints
            .iter()
            .map(|endpoint| PegEndpoint {
                constant_name: format!("{ENDPOINT_CONSTANT_PREFIX}{}", endpoint.name),
                target_ip: endpoint.target_ip.clone(),
                target_port: endpoint.target_port,
            })
            .collect())
    }
}
