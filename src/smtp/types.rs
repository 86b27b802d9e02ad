use std::fmt;

use super::error::ProbeError;

/// Steps of the probe dialogue, in the order they run.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl fmt::Display for ProbeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "HELO",
            Self::MailFrom => "MAIL FROM",
            Self::RcptTo => "RCPT TO",
            Self::Quit => "QUIT",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.message)
        }
    }
}

/// A recorded SMTP transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent {
        stage: ProbeStage,
        command: String,
    },
    Received {
        stage: ProbeStage,
        reply: SmtpReply,
    },
    Error {
        stage: ProbeStage,
        message: String,
    },
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {reply}"),
            Self::Error { stage, message } => write!(f, "!  {stage}: {message}"),
        }
    }
}

/// Three-way reading of a probe or a whole check.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The server accepted the recipient (250 or 251).
    Deliverable,
    /// The address or its domain was refused outright.
    Rejected,
    /// Nothing conclusive: transient codes, timeouts, broken dialogues.
    Undeterminable,
}

impl Verdict {
    /// Maps the `RCPT TO` reply code onto a verdict. Only 250 and 251 count
    /// as acceptance; other 2xx/3xx/4xx codes stay inconclusive.
    pub fn from_rcpt_code(code: u16) -> Self {
        match code {
            250 | 251 => Self::Deliverable,
            500..=599 => Self::Rejected,
            _ => Self::Undeterminable,
        }
    }

    pub fn is_deliverable(self) -> bool {
        matches!(self, Self::Deliverable)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deliverable => "deliverable",
            Self::Rejected => "rejected",
            Self::Undeterminable => "undeterminable",
        })
    }
}

/// Why a probe produced no `RCPT TO` code.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The TCP connection could not be opened.
    Connection,
    /// The connection was up but the dialogue broke down.
    Protocol,
}

/// Terminal outcome of one probe against one mail exchanger.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    mx_host: String,
    reply: Option<SmtpReply>,
    verdict: Verdict,
    failure: Option<ProbeFailure>,
    detail: String,
    transcript: Vec<SmtpEvent>,
}

impl ProbeResult {
    /// Builds the result from the server's answer to `RCPT TO`.
    pub fn from_rcpt_reply(
        mx_host: impl Into<String>,
        reply: SmtpReply,
        transcript: Vec<SmtpEvent>,
    ) -> Self {
        let mx_host = mx_host.into();
        let verdict = Verdict::from_rcpt_code(reply.code);
        let detail = match verdict {
            Verdict::Deliverable => format!(
                "{mx_host} accepted the recipient (SMTP response code: {})",
                reply.code
            ),
            Verdict::Rejected => format!(
                "{mx_host} rejected the recipient (SMTP response code: {})",
                reply.code
            ),
            Verdict::Undeterminable => format!(
                "{mx_host} answered RCPT TO inconclusively (SMTP response code: {})",
                reply.code
            ),
        };
        Self {
            mx_host,
            reply: Some(reply),
            verdict,
            failure: None,
            detail,
            transcript,
        }
    }

    /// Builds the result for a dialogue that ended before `RCPT TO` got an
    /// answer.
    pub fn from_error(
        mx_host: impl Into<String>,
        error: &ProbeError,
        transcript: Vec<SmtpEvent>,
    ) -> Self {
        Self {
            mx_host: mx_host.into(),
            reply: None,
            verdict: Verdict::Undeterminable,
            failure: Some(error.failure()),
            detail: error.to_string(),
            transcript,
        }
    }

    pub fn mx_host(&self) -> &str {
        &self.mx_host
    }

    pub fn reply_code(&self) -> Option<u16> {
        self.reply.as_ref().map(|reply| reply.code)
    }

    pub fn reply(&self) -> Option<&SmtpReply> {
        self.reply.as_ref()
    }

    pub fn deliverable(&self) -> bool {
        self.verdict.is_deliverable()
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn failure(&self) -> Option<ProbeFailure> {
        self.failure
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn transcript(&self) -> &[SmtpEvent] {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcpt_codes_map_to_verdicts() {
        assert_eq!(Verdict::from_rcpt_code(250), Verdict::Deliverable);
        assert_eq!(Verdict::from_rcpt_code(251), Verdict::Deliverable);
        assert_eq!(Verdict::from_rcpt_code(252), Verdict::Undeterminable);
        assert_eq!(Verdict::from_rcpt_code(354), Verdict::Undeterminable);
        assert_eq!(Verdict::from_rcpt_code(451), Verdict::Undeterminable);
        assert_eq!(Verdict::from_rcpt_code(550), Verdict::Rejected);
        assert_eq!(Verdict::from_rcpt_code(553), Verdict::Rejected);
    }

    #[test]
    fn rejected_result_keeps_code() {
        let result = ProbeResult::from_rcpt_reply(
            "mx.example.com",
            SmtpReply::new(550, "no such user"),
            vec![],
        );
        assert!(!result.deliverable());
        assert_eq!(result.reply_code(), Some(550));
        assert_eq!(result.verdict(), Verdict::Rejected);
        assert!(result.failure().is_none());
        assert!(result.detail().contains("550"));
    }

    #[test]
    fn error_result_has_no_code() {
        let err = ProbeError::Protocol {
            stage: ProbeStage::Greeting,
            message: "unexpected greeting 554".to_string(),
        };
        let result = ProbeResult::from_error("mx.example.com", &err, vec![]);
        assert!(!result.deliverable());
        assert_eq!(result.reply_code(), None);
        assert_eq!(result.failure(), Some(ProbeFailure::Protocol));
        assert_eq!(
            result.detail(),
            "protocol error during greeting: unexpected greeting 554"
        );
    }

    #[test]
    fn events_render_like_a_transcript() {
        let sent = SmtpEvent::Sent {
            stage: ProbeStage::Helo,
            command: "HELO probe.local".to_string(),
        };
        let received = SmtpEvent::Received {
            stage: ProbeStage::Helo,
            reply: SmtpReply::new(250, "hello"),
        };
        assert_eq!(sent.to_string(), "C: HELO probe.local");
        assert_eq!(received.to_string(), "S: 250 hello");
    }
}
