//! End-to-end deliverability check: format → MX → SMTP probe.
//!
//! Nothing here returns an error. Every failure, whatever the stage, ends up
//! in the [`DeliverabilityReport`] with `deliverable == false`.

mod types;

pub use types::{CheckFailure, CheckOptions, DeliverabilityReport};

use tracing::{info, warn};

use crate::mx::{self, LookupMx};
use crate::smtp::{Prober, SmtpProber};
use crate::validator::EmailAddress;

/// Checks `email` with [`CheckOptions::default`].
pub fn check_email_deliverability(email: &str) -> DeliverabilityReport {
    check_email_deliverability_with_options(email, &CheckOptions::default())
}

/// Identical to [`check_email_deliverability`], but allows tweaking timeouts,
/// the `HELO` identity and the envelope sender.
pub fn check_email_deliverability_with_options(
    email: &str,
    options: &CheckOptions,
) -> DeliverabilityReport {
    let address = match parse_address(email) {
        Ok(address) => address,
        Err(report) => return report,
    };
    let prober = SmtpProber::new(options.probe.clone());
    match mx::system_resolver(options.dns_timeout) {
        Ok(resolver) => check_address(address, &resolver, &prober),
        Err(err) => {
            warn!(error = %err, "DNS resolver unavailable");
            let domain = address.domain().to_string();
            DeliverabilityReport::failed(
                address.as_str(),
                Some(domain),
                CheckFailure::from_mx_error(&err),
            )
        }
    }
}

/// Runs the check against caller-supplied DNS and SMTP backends.
pub fn check_with<R, P>(email: &str, resolver: &R, prober: &P) -> DeliverabilityReport
where
    R: LookupMx + ?Sized,
    P: Prober + ?Sized,
{
    match parse_address(email) {
        Ok(address) => check_address(address, resolver, prober),
        Err(report) => report,
    }
}

fn parse_address(email: &str) -> Result<EmailAddress, DeliverabilityReport> {
    EmailAddress::parse(email).map_err(|err| {
        warn!(email, error = %err, "address format is invalid");
        DeliverabilityReport::failed(email.trim(), None, CheckFailure::from_email_error(err))
    })
}

fn check_address<R, P>(address: EmailAddress, resolver: &R, prober: &P) -> DeliverabilityReport
where
    R: LookupMx + ?Sized,
    P: Prober + ?Sized,
{
    info!(email = %address, "address format is valid");

    let domain = match mx::normalize_domain(address.domain()) {
        Ok(domain) => domain,
        Err(err) => {
            warn!(domain = address.domain(), error = %err, "domain cannot be queried");
            return DeliverabilityReport::failed(
                address.as_str(),
                Some(address.domain().to_string()),
                CheckFailure::from_mx_error(&err),
            );
        }
    };

    let record = match mx::resolve_with(resolver, &domain) {
        Ok(record) => record,
        Err(err) => {
            warn!(domain = %domain, error = %err, "no usable MX record");
            return DeliverabilityReport::failed(
                address.as_str(),
                Some(domain),
                CheckFailure::from_mx_error(&err),
            );
        }
    };
    info!(
        domain = %domain,
        mx_host = %record.exchange,
        preference = record.preference,
        "MX host found"
    );

    let result = prober.probe(&record.exchange, &address);
    let report = DeliverabilityReport::probed(address.as_str(), domain, result);
    info!(
        email = %report.email,
        code = ?report.reply_code(),
        verdict = %report.verdict,
        "check finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mx::MxRecord;
    use crate::mx::tests::StubResolver;
    use crate::smtp::{
        ProbeError, ProbeOptions, ProbeResult, ProbeStage, SmtpReply, Verdict, spawn_mock_server,
    };
    use std::cell::RefCell;
    use std::time::Duration;
    use trust_dns_resolver::error::ResolveError;

    /// Answers every probe with a fixed reply and remembers who was asked.
    struct StubProber {
        answer: Box<dyn Fn(&str) -> ProbeResult>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl StubProber {
        fn replying(code: u16, message: &'static str) -> Self {
            Self {
                answer: Box::new(move |host: &str| {
                    ProbeResult::from_rcpt_reply(host, SmtpReply::new(code, message), Vec::new())
                }),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> ProbeError) -> Self {
            Self {
                answer: Box::new(move |host: &str| {
                    ProbeResult::from_error(host, &err(), Vec::new())
                }),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Prober for StubProber {
        fn probe(&self, mx_host: &str, recipient: &EmailAddress) -> ProbeResult {
            self.calls
                .borrow_mut()
                .push((mx_host.to_string(), recipient.to_string()));
            (self.answer)(mx_host)
        }
    }

    fn example_resolver() -> StubResolver {
        StubResolver::new(|domain| {
            assert_eq!(domain, "example.com");
            Ok(vec![
                MxRecord::new(20, "backup.example.com."),
                MxRecord::new(10, "mail.example.com."),
            ])
        })
    }

    #[test]
    fn invalid_format_skips_network() {
        let resolver = StubResolver::returning(Vec::new());
        let prober = StubProber::replying(250, "Ok");

        for input in ["invalid", "a@b", "two@@example.com", "", "user@exa mple.com"] {
            let report = check_with(input, &resolver, &prober);
            assert!(!report.deliverable, "{input}");
            assert!(matches!(report.failure, Some(CheckFailure::Format { .. })));
            assert_eq!(report.verdict, Verdict::Rejected);
        }
        assert_eq!(resolver.calls.get(), 0);
        assert!(prober.calls.borrow().is_empty());
    }

    #[test]
    fn missing_mx_skips_smtp() {
        let resolver = StubResolver::returning(Vec::new());
        let prober = StubProber::replying(250, "Ok");

        let report = check_with("user@example.com", &resolver, &prober);

        assert!(!report.deliverable);
        assert_eq!(resolver.calls.get(), 1);
        assert!(prober.calls.borrow().is_empty());
        assert!(matches!(
            report.failure,
            Some(CheckFailure::Resolution {
                no_records: true,
                ..
            })
        ));
        assert_eq!(report.verdict, Verdict::Rejected);
        assert_eq!(report.mx_host, None);
    }

    #[test]
    fn null_mx_is_rejected_without_probing() {
        let resolver = StubResolver::returning(vec![MxRecord::new(0, ".")]);
        let prober = StubProber::replying(250, "Ok");

        let report = check_with("user@example.com", &resolver, &prober);

        assert!(!report.deliverable);
        assert!(prober.calls.borrow().is_empty());
        assert_eq!(report.verdict, Verdict::Rejected);
        assert_eq!(report.mx_host, None);
    }

    #[test]
    fn dns_error_is_undeterminable() {
        let resolver = StubResolver::new(|_| Err(ResolveError::from("request timed out")));
        let prober = StubProber::replying(250, "Ok");

        let report = check_with("user@example.com", &resolver, &prober);

        assert!(!report.deliverable);
        assert!(prober.calls.borrow().is_empty());
        assert_eq!(report.verdict, Verdict::Undeterminable);
    }

    #[test]
    fn probes_preferred_exchange_only() {
        let resolver = example_resolver();
        let prober = StubProber::replying(250, "2.1.5 Ok");

        let report = check_with("user@example.com", &resolver, &prober);

        assert!(report.deliverable);
        assert_eq!(report.verdict, Verdict::Deliverable);
        assert_eq!(report.reply_code(), Some(250));
        assert_eq!(report.mx_host.as_deref(), Some("mail.example.com"));
        assert_eq!(report.failure, None);
        assert_eq!(
            *prober.calls.borrow(),
            vec![(
                "mail.example.com".to_string(),
                "user@example.com".to_string()
            )]
        );
    }

    #[test]
    fn rejection_surfaces_code() {
        let report = check_with(
            "nobody@example.com",
            &example_resolver(),
            &StubProber::replying(550, "5.1.1 User unknown"),
        );
        assert!(!report.deliverable);
        assert_eq!(report.reply_code(), Some(550));
        assert_eq!(
            report.failure,
            Some(CheckFailure::Rejection {
                code: 550,
                message: "5.1.1 User unknown".to_string(),
            })
        );
        assert_eq!(report.verdict, Verdict::Rejected);
    }

    #[test]
    fn connection_failure_is_reported() {
        let prober = StubProber::failing(|| ProbeError::Connect {
            host: "mail.example.com".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        });
        let report = check_with("user@example.com", &example_resolver(), &prober);

        assert!(!report.deliverable);
        assert_eq!(report.reply_code(), None);
        assert!(matches!(report.failure, Some(CheckFailure::Connection { .. })));
        assert_eq!(report.verdict, Verdict::Undeterminable);
    }

    #[test]
    fn protocol_failure_is_reported() {
        let prober = StubProber::failing(|| ProbeError::Protocol {
            stage: ProbeStage::Greeting,
            message: "unexpected greeting: 554".to_string(),
        });
        let report = check_with("user@example.com", &example_resolver(), &prober);
        assert!(matches!(report.failure, Some(CheckFailure::Protocol { .. })));
        assert!(
            report
                .diagnostics()
                .last()
                .is_some_and(|line| line.starts_with("An error occurred during SMTP communication"))
        );
    }

    #[test]
    fn repeated_checks_are_identical() {
        let resolver = example_resolver();
        let prober = StubProber::replying(250, "Ok");
        let first = check_with("user@example.com", &resolver, &prober);
        let second = check_with("user@example.com", &resolver, &prober);
        assert_eq!(first, second);
    }

    #[test]
    fn diagnostics_walk_each_stage() {
        let report = check_with(
            "user@example.com",
            &example_resolver(),
            &StubProber::replying(250, "Ok"),
        );
        assert_eq!(
            report.diagnostics(),
            vec![
                "The email address format is valid.".to_string(),
                "MX host for 'example.com': mail.example.com".to_string(),
                "Connecting to mail server: mail.example.com".to_string(),
                "The email address 'user@example.com' appears to be deliverable (SMTP response code: 250)."
                    .to_string(),
            ]
        );
    }

    #[test]
    fn end_to_end_over_loopback() {
        let (port, handle) = spawn_mock_server(
            "220 mock.smtp.test ESMTP\r\n",
            vec![
                ("HELO", "250 mock.smtp.test\r\n"),
                ("MAIL FROM:<test@example.com>", "250 2.1.0 Ok\r\n"),
                ("RCPT TO:<user@example.com>", "250 2.1.5 Ok\r\n"),
                ("QUIT", "221 2.0.0 Bye\r\n"),
            ],
        );
        let resolver = StubResolver::new(|domain| {
            assert_eq!(domain, "example.com");
            Ok(vec![MxRecord::new(10, "127.0.0.1")])
        });
        let prober = SmtpProber::new(ProbeOptions {
            port,
            timeout: Duration::from_secs(5),
            ..ProbeOptions::default()
        });

        let report = check_with("user@example.com", &resolver, &prober);
        handle.join().expect("server thread");

        assert!(report.deliverable, "{report:?}");
        assert_eq!(report.reply_code(), Some(250));
        assert_eq!(report.mx_host.as_deref(), Some("127.0.0.1"));
    }
}
