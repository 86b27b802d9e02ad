use std::fmt;
use std::time::Duration;

use crate::mx::{DEFAULT_DNS_TIMEOUT, Error as MxError};
use crate::smtp::{ProbeFailure, ProbeOptions, ProbeResult, Verdict};
use crate::validator::EmailError;

/// Controls how [`check_email_deliverability_with_options`](super::check_email_deliverability_with_options)
/// resolves and probes.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOptions {
    pub dns_timeout: Duration,
    pub probe: ProbeOptions,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            probe: ProbeOptions::default(),
        }
    }
}

/// The stage at which a check stopped short of a positive answer.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// The address is not `local-part@domain`. Nothing was sent on the wire.
    Format { reasons: Vec<String> },
    /// No usable MX record. `no_records` separates an empty answer from a
    /// DNS error.
    Resolution { message: String, no_records: bool },
    /// The mail exchanger could not be reached.
    Connection { message: String },
    /// The SMTP dialogue broke down before `RCPT TO` was answered.
    Protocol { message: String },
    /// `RCPT TO` was answered with something other than 250/251.
    Rejection { code: u16, message: String },
}

impl CheckFailure {
    pub(crate) fn from_email_error(err: EmailError) -> Self {
        Self::Format {
            reasons: err.reasons().to_vec(),
        }
    }

    pub(crate) fn from_mx_error(err: &MxError) -> Self {
        Self::Resolution {
            message: err.to_string(),
            no_records: err.is_no_records(),
        }
    }

    pub(crate) fn from_probe(result: &ProbeResult) -> Option<Self> {
        if result.deliverable() {
            return None;
        }
        let message = result.detail().to_string();
        Some(match (result.failure(), result.reply()) {
            (Some(ProbeFailure::Connection), _) => Self::Connection { message },
            (Some(ProbeFailure::Protocol), _) => Self::Protocol { message },
            (None, Some(reply)) => Self::Rejection {
                code: reply.code,
                message: reply.message.clone(),
            },
            (None, None) => Self::Protocol { message },
        })
    }

    /// Verdict implied by a failure at this stage.
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Format { .. } => Verdict::Rejected,
            Self::Resolution { no_records, .. } => {
                if *no_records {
                    Verdict::Rejected
                } else {
                    Verdict::Undeterminable
                }
            }
            Self::Connection { .. } | Self::Protocol { .. } => Verdict::Undeterminable,
            Self::Rejection { code, .. } => Verdict::from_rcpt_code(*code),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { reasons } => write!(f, "invalid format: {}", reasons.join("; ")),
            Self::Resolution { message, .. } => write!(f, "MX resolution failed: {message}"),
            Self::Connection { message } => write!(f, "connection failed: {message}"),
            Self::Protocol { message } => write!(f, "SMTP protocol failure: {message}"),
            Self::Rejection { code, message } => {
                if message.is_empty() {
                    write!(f, "recipient refused ({code})")
                } else {
                    write!(f, "recipient refused ({code} {message})")
                }
            }
        }
    }
}

/// Everything one check learned, stage by stage.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverabilityReport {
    pub email: String,
    /// ASCII form of the domain, once the format check passed.
    pub domain: Option<String>,
    /// Exchanger selected by MX resolution.
    pub mx_host: Option<String>,
    pub probe: Option<ProbeResult>,
    pub failure: Option<CheckFailure>,
    pub verdict: Verdict,
    pub deliverable: bool,
}

impl DeliverabilityReport {
    pub(crate) fn failed(
        email: impl Into<String>,
        domain: Option<String>,
        failure: CheckFailure,
    ) -> Self {
        Self {
            email: email.into(),
            domain,
            mx_host: None,
            probe: None,
            verdict: failure.verdict(),
            failure: Some(failure),
            deliverable: false,
        }
    }

    pub(crate) fn probed(email: impl Into<String>, domain: String, probe: ProbeResult) -> Self {
        let failure = CheckFailure::from_probe(&probe);
        let verdict = match &failure {
            Some(failure) => failure.verdict(),
            None => probe.verdict(),
        };
        Self {
            email: email.into(),
            domain: Some(domain),
            mx_host: Some(probe.mx_host().to_string()),
            deliverable: probe.deliverable(),
            probe: Some(probe),
            failure,
            verdict,
        }
    }

    /// Reply code of `RCPT TO`, when the dialogue got that far.
    pub fn reply_code(&self) -> Option<u16> {
        self.probe.as_ref().and_then(ProbeResult::reply_code)
    }

    /// One human-readable line per stage reached.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(CheckFailure::Format { reasons }) = &self.failure {
            lines.push(format!(
                "The email address format is invalid ({}).",
                reasons.join("; ")
            ));
            return lines;
        }
        lines.push("The email address format is valid.".to_string());

        let domain = self.domain.as_deref().unwrap_or_default();
        if let Some(CheckFailure::Resolution { message, .. }) = &self.failure {
            lines.push(format!(
                "Could not find MX records for domain '{domain}' ({message}). The email is likely undeliverable."
            ));
            return lines;
        }

        if let Some(mx_host) = &self.mx_host {
            lines.push(format!("MX host for '{domain}': {mx_host}"));
            lines.push(format!("Connecting to mail server: {mx_host}"));
        }

        match (&self.failure, self.reply_code()) {
            (Some(CheckFailure::Connection { message }), _) => {
                lines.push(format!("Could not connect to the mail server: {message}"));
            }
            (Some(CheckFailure::Protocol { message }), _) => {
                lines.push(format!("An error occurred during SMTP communication: {message}"));
            }
            (_, Some(code)) if self.deliverable => lines.push(format!(
                "The email address '{}' appears to be deliverable (SMTP response code: {code}).",
                self.email
            )),
            (_, Some(code)) => lines.push(format!(
                "The email address '{}' was rejected (SMTP response code: {code}).",
                self.email
            )),
            (_, None) => {}
        }
        lines
    }
}
