use std::borrow::Cow;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

/// Envelope sender used when none is configured.
pub const DEFAULT_MAIL_FROM: &str = "test@example.com";
/// SMTP relay port.
pub const DEFAULT_SMTP_PORT: u16 = 25;
/// Connect, read and write bound for every network step.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration knobs for [`SmtpProber`](super::SmtpProber).
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    pub port: u16,
    pub timeout: Duration,
    /// Name announced in `HELO`. `None` uses the local host name.
    pub helo_name: Option<String>,
    pub mail_from: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: DEFAULT_SMTP_PORT,
            timeout: DEFAULT_PROBE_TIMEOUT,
            helo_name: None,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
        }
    }
}

impl ProbeOptions {
    /// Return the timeout as an `Option`. A zero timeout disables the
    /// connection/read deadline.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout.is_zero() {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Name sent with `HELO`: the configured one, else this machine's host
    /// name, else `localhost`. Blank or multi-line values are ignored.
    pub fn helo_name(&self) -> Cow<'_, str> {
        if let Some(name) = self.helo_name.as_deref().filter(|n| is_command_arg(n)) {
            return Cow::Borrowed(name);
        }
        hostname::get()
            .ok()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| is_command_arg(name))
            .map(Cow::Owned)
            .unwrap_or(Cow::Borrowed("localhost"))
    }

    /// Envelope sender for `MAIL FROM`; an empty or multi-line value falls
    /// back to [`DEFAULT_MAIL_FROM`].
    pub fn mail_from(&self) -> &str {
        if is_command_arg(&self.mail_from) {
            self.mail_from.as_str()
        } else {
            DEFAULT_MAIL_FROM
        }
    }
}

/// Non-blank and free of CR/LF, so it cannot end the command line early.
fn is_command_arg(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_probe_contract() {
        let options = ProbeOptions::default();
        assert_eq!(options.port, 25);
        assert_eq!(options.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(options.mail_from(), "test@example.com");
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let options = ProbeOptions {
            timeout: Duration::ZERO,
            ..ProbeOptions::default()
        };
        assert_eq!(options.timeout(), None);
    }

    #[test]
    fn explicit_helo_name_wins() {
        let options = ProbeOptions {
            helo_name: Some("probe.example.net".to_string()),
            ..ProbeOptions::default()
        };
        assert_eq!(options.helo_name(), "probe.example.net");
    }

    #[test]
    fn blank_helo_name_falls_back() {
        let options = ProbeOptions {
            helo_name: Some("   ".to_string()),
            ..ProbeOptions::default()
        };
        assert!(!options.helo_name().trim().is_empty());
    }

    #[test]
    fn helo_name_with_line_break_falls_back() {
        let options = ProbeOptions {
            helo_name: Some("probe.test\r\nRSET".to_string()),
            ..ProbeOptions::default()
        };
        let helo = options.helo_name();
        assert!(!helo.contains(['\r', '\n']), "{helo}");
        assert_ne!(helo, "probe.test\r\nRSET");
    }

    #[test]
    fn sender_with_line_break_uses_placeholder() {
        let options = ProbeOptions {
            mail_from: "a@b.test>\r\nRCPT TO:<victim@example.com".to_string(),
            ..ProbeOptions::default()
        };
        assert_eq!(options.mail_from(), DEFAULT_MAIL_FROM);
    }

    #[test]
    fn empty_sender_uses_placeholder() {
        let options = ProbeOptions {
            mail_from: String::new(),
            ..ProbeOptions::default()
        };
        assert_eq!(options.mail_from(), DEFAULT_MAIL_FROM);
    }
}
