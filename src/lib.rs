#![forbid(unsafe_code)]
//! mxprobe: email deliverability probe: format check, MX lookup, SMTP
//! `RCPT TO` without sending a message.

pub mod check;
pub mod mx;
pub mod smtp;
pub mod validator;

pub use check::{
    CheckFailure, CheckOptions, DeliverabilityReport, check_email_deliverability,
    check_email_deliverability_with_options, check_with,
};
pub use mx::{Error as MxError, LookupMx, MxRecord, MxStatus, check_mx, resolve_mx};
pub use smtp::{
    ProbeError, ProbeFailure, ProbeOptions, ProbeResult, ProbeStage, Prober, SmtpEvent, SmtpProber,
    SmtpReply, Verdict,
};
pub use validator::{EmailAddress, EmailError, ValidationReport, validate_email};
