//! Probe catalogue and caller-supplied option handling.
//!
//! Each diagnostic probe is described by a static [`ProbeSpec`]: the template
//! shipped with the binary, the option keys the caller must or may provide,
//! and the name of the results artifact the probe writes on the remote side.
//! Option values are carried in an [`OptionSet`], which substitutes
//! deterministically and never exposes values through its `Debug` output.

use std::collections::BTreeMap;
use std::fmt;

use camino::Utf8Path;
use thiserror::Error;

pub mod template;


/// The diagnostic probes this tool knows how to run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeKind {
    /// HTTP fetch through the gateway using cURL.
    Curl,
    /// LDAP bind (anonymous or authenticated).
    Ldap,
    /// SMTP HELO exchange against a mail relay.
    Smtp,
    /// Raw TCP banner sniff expecting an SSH server.
    Ssh,
    /// TLS certificate dump via `openssl s_client`.
    ShowCerts,
}

impl ProbeKind {
    /// Operator-facing label used in outcome messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Curl => "cURL test",
            Self::Ldap => "LDAP test",
            Self::Smtp => "SMTP test",
            Self::Ssh => "Simple SSH test",
            Self::ShowCerts => "Certificate check",
        }
    }
}

/// Static description of one probe: template, option contract, and the
/// results file it produces remotely.
#[derive(Debug)]
pub struct ProbeSpec {
    kind: ProbeKind,
    template: &'static str,
    body: &'static str,
    required: &'static [&'static str],
    optional: &'static [(&'static str, &'static str)],
    sensitive: &'static [&'static str],
}

static CURL: ProbeSpec = ProbeSpec {
    kind: ProbeKind::Curl,
    template: "curltest.php",
    body: include_str!("../../templates/curltest.php"),
    required: &["url", "constant-name"],
    optional: &[],
    sensitive: &[],
};

static LDAP: ProbeSpec = ProbeSpec {
    kind: ProbeKind::Ldap,
    template: "ldaptest.php",
    body: include_str!("../../templates/ldaptest.php"),
    required: &["constant-name"],
    optional: &[
        ("use-tls", "true"),
        ("proto", "3"),
        ("bind-dn", ""),
        ("bind-password", ""),
        ("bypass-tls-check", "false"),
    ],
    sensitive: &["bind-password"],
};

static SMTP: ProbeSpec = ProbeSpec {
    kind: ProbeKind::Smtp,
    template: "smtptest.php",
    body: include_str!("../../templates/smtptest.php"),
    required: &["constant-name", "relay-address"],
    optional: &[],
    sensitive: &[],
};

static SSH: ProbeSpec = ProbeSpec {
    kind: ProbeKind::Ssh,
    template: "sshtest.php",
    body: include_str!("../../templates/sshtest.php"),
    required: &["constant-name"],
    optional: &[],
    sensitive: &[],
};

static SHOW_CERTS: ProbeSpec = ProbeSpec {
    kind: ProbeKind::ShowCerts,
    template: "showcerts.php",
    body: include_str!("../../templates/showcerts.php"),
    required: &["constant-name"],
    optional: &[("proto", "")],
    sensitive: &[],
};

impl ProbeSpec {
    /// Looks up the static spec for a probe kind.
    #[must_use]
    pub const fn for_kind(kind: ProbeKind) -> &'static Self {
        match kind {
            ProbeKind::Curl => &CURL,
            ProbeKind::Ldap => &LDAP,
            ProbeKind::Smtp => &SMTP,
            ProbeKind::Ssh => &SSH,
            ProbeKind::ShowCerts => &SHOW_CERTS,
        }
    }

    /// The probe kind this spec describes.
    #[must_use]
    pub const fn kind(&self) -> ProbeKind {
        self.kind
    }

    /// Filename of the probe template, which is also the name the script is
    /// deployed under remotely.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        self.template
    }

    /// The embedded template body.
    #[must_use]
    pub const fn body(&self) -> &'static str {
        self.body
    }

    /// Name of the results artifact the probe writes beside itself.
    #[must_use]
    pub fn results_file(&self) -> String {
        let stem = Utf8Path::new(self.template)
            .file_stem()
            .unwrap_or(self.template);
        format!("{stem}_results.json")
    }

    /// Returns `true` when the named option must never be logged.
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.sensitive.iter().any(|sensitive| *sensitive == key)
    }

    /// Ensures every required option is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`MissingOptionError`] naming the first absent or empty key.
    pub fn validate(&self, options: &OptionSet) -> Result<(), MissingOptionError> {
        for &key in self.required {
            let present = options
                .get(key)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(MissingOptionError {
                    key: key.to_owned(),
                });
            }
        }
        Ok(())
    }

    /// Merges caller options over the spec's optional-key defaults.
    ///
    /// Caller-supplied values win; defaults only fill keys the caller left
    /// unset, so every token in the template has a substitution value.
    #[must_use]
    pub fn effective_options(&self, options: &OptionSet) -> OptionSet {
        let mut merged = OptionSet::new();
        for &(key, default) in self.optional {
            merged.set(key, default);
        }
        for (key, value) in options.iter() {
            merged.set(key, value);
        }
        merged
    }
}

/// Raised when a required probe option is absent or empty.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("the {key} option must be specified")]
pub struct MissingOptionError {
    /// Name of the missing option.
    pub key: String,
}

/// Caller-supplied option values keyed by option name.
///
/// Backed by an ordered map so template substitution is deterministic. The
/// `Debug` implementation prints key names only; values may contain secrets
/// such as bind passwords and must never reach logs or error messages.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct OptionSet {
    values: BTreeMap<String, String>,
}

impl OptionSet {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, replacing any previous value for the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`OptionSet::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Returns the value for `key`, when present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Iterates options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns `true` when no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.keys()).finish()
    }
}
