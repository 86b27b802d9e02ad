//! SMTP recipient probing.
//!
//! [`SmtpProber`] opens one plain TCP connection to a mail exchanger, walks
//! `HELO` → `MAIL FROM` → `RCPT TO`, always says `QUIT`, and reports the
//! `RCPT TO` reply as a [`ProbeResult`]. No message data is ever sent, no TLS
//! is negotiated and no other host is tried.

mod error;
mod options;
mod probe;
mod session;
mod types;

pub use error::ProbeError;
pub use options::{DEFAULT_MAIL_FROM, DEFAULT_PROBE_TIMEOUT, DEFAULT_SMTP_PORT, ProbeOptions};
pub use probe::{Prober, SmtpProber, probe};
pub use types::{ProbeFailure, ProbeResult, ProbeStage, SmtpEvent, SmtpReply, Verdict};

#[cfg(test)]
pub(crate) use probe::tests::spawn_mock_server;
