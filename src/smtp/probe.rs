use tracing::{info, info_span, warn};

use crate::validator::EmailAddress;

use super::error::ProbeError;
use super::options::ProbeOptions;
use super::session::{SmtpSession, resolve_socket_addrs};
use super::types::{ProbeResult, ProbeStage, SmtpEvent, SmtpReply};

/// Anything able to ask a mail exchanger whether it would take a recipient.
///
/// Implementations must not fail: every error becomes a [`ProbeResult`].
pub trait Prober {
    fn probe(&self, mx_host: &str, recipient: &EmailAddress) -> ProbeResult;
}

/// Runs `HELO`, `MAIL FROM` and `RCPT TO` over plain TCP and stops before
/// `DATA`.
#[derive(Debug, Clone, Default)]
pub struct SmtpProber {
    options: ProbeOptions,
}

impl SmtpProber {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    fn open(&self, mx_host: &str) -> Result<SmtpSession, ProbeError> {
        let addrs = resolve_socket_addrs(mx_host, self.options.port)?;
        let (session, peer) = SmtpSession::connect(mx_host, &addrs, self.options.timeout())?;
        info!(%peer, "connected");
        Ok(session)
    }

    fn converse(
        &self,
        session: &mut SmtpSession,
        recipient: &EmailAddress,
    ) -> Result<SmtpReply, ProbeError> {
        let greeting = session.read_greeting()?;
        if !greeting.is_positive_completion() {
            return Err(ProbeError::Protocol {
                stage: ProbeStage::Greeting,
                message: format!("unexpected greeting: {greeting}"),
            });
        }

        let helo = format!("HELO {}", self.options.helo_name());
        session.command(ProbeStage::Helo, &helo)?;

        // The MAIL FROM reply is informational; a refusing server fails RCPT.
        let mail_from = format!("MAIL FROM:<{}>", self.options.mail_from());
        session.command(ProbeStage::MailFrom, &mail_from)?;

        let rcpt = format!("RCPT TO:<{recipient}>");
        session.command(ProbeStage::RcptTo, &rcpt)
    }
}

impl Prober for SmtpProber {
    fn probe(&self, mx_host: &str, recipient: &EmailAddress) -> ProbeResult {
        let span = info_span!("smtp_probe", mx_host, port = self.options.port);
        let _guard = span.enter();

        let mut session = match self.open(mx_host) {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "could not reach mail server");
                let transcript = vec![SmtpEvent::Error {
                    stage: ProbeStage::Connect,
                    message: err.to_string(),
                }];
                return ProbeResult::from_error(mx_host, &err, transcript);
            }
        };

        let outcome = self.converse(&mut session, recipient);
        session.quit(outcome.as_ref().map_or_else(|err| !err.is_transport(), |_| true));
        let transcript = session.into_transcript();

        match outcome {
            Ok(reply) => {
                info!(code = reply.code, "RCPT TO answered");
                ProbeResult::from_rcpt_reply(mx_host, reply, transcript)
            }
            Err(err) => {
                warn!(error = %err, "SMTP dialogue failed");
                ProbeResult::from_error(mx_host, &err, transcript)
            }
        }
    }
}

/// Probes `mx_host` for `recipient` with [`ProbeOptions::default`].
pub fn probe(mx_host: &str, recipient: &EmailAddress) -> ProbeResult {
    SmtpProber::default().probe(mx_host, recipient)
}
