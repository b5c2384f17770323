//! Probe result model and outcome reporting.
//!
//! A probe writes a JSON artifact on the remote side with three contractual
//! keys: `results`, `error`, and `elapsed`. Probes may add informational
//! keys (the HTTP probe records its raw and prepared cURL options); those
//! are ignored here. By convention exactly one of `results`/`error` is
//! non-empty, which is what [`summarize`] keys off — except for the
//! certificate check, which has no pass/fail semantics and always reports
//! its raw output.

use serde::Deserialize;

use crate::probe::ProbeKind;

/// Parsed contents of a probe's remote results artifact.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProbeResult {
    /// Human-readable success detail; empty when the probe failed.
    #[serde(default)]
    pub results: String,
    /// Failure detail; empty when the probe succeeded.
    #[serde(default)]
    pub error: String,
    /// Remote-side elapsed time in seconds.
    #[serde(default)]
    pub elapsed: f64,
}

/// Operator-facing interpretation of a probe result.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The probe reported success detail.
    Success {
        /// Probe-reported success text.
        detail: String,
        /// Remote-side elapsed seconds.
        elapsed: f64,
    },
    /// The probe reported a failure.
    Failure {
        /// Probe-reported error text.
        detail: String,
    },
    /// Informational output with no pass/fail semantics.
    Info {
        /// Raw probe output.
        detail: String,
        /// Remote-side elapsed seconds.
        elapsed: f64,
    },
}

impl Outcome {
    /// Returns `true` for failed probes.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Renders the operator-facing message for this outcome.
    #[must_use]
    pub fn message(&self, kind: ProbeKind) -> String {
        let label = kind.label();
        match self {
            Self::Success { detail, elapsed } => format!(
                "{label} completed successfully; PEG is configured properly.\n\
                 {detail}\nElapsed time (sec): {elapsed}"
            ),
            Self::Failure { detail } => {
                format!("{label} completed unsuccessfully. Error was: {detail}")
            }
            Self::Info { detail, elapsed } => {
                format!("{detail}\nElapsed time (sec): {elapsed}")
            }
        }
    }
}

/// Interprets a probe result according to the probe kind's semantics.
#[must_use]
pub fn summarize(kind: ProbeKind, result: &ProbeResult) -> Outcome {
    if matches!(kind, ProbeKind::ShowCerts) {
        return Outcome::Info {
            detail: result.results.clone(),
            elapsed: result.elapsed,
        };
    }

    if result.results.is_empty() {
        Outcome::Failure {
            detail: result.error.clone(),
        }
    } else {
        Outcome::Success {
            detail: result.results.clone(),
            elapsed: result.elapsed,
        }
    }
}
