//! Surface syntax checks for `local-part@domain` addresses.
//!
//! The check is intentionally shallow: a single ASCII pattern plus the
//! length limits of RFC 5321. Nothing here touches the network.

mod types;

pub use types::{EmailAddress, EmailError, ValidationReport};

use std::sync::LazyLock;

use regex::Regex;

static ADDRESS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$")
        .expect("address pattern is a valid regex")
});

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// Validates `email` and lists every rule it breaks. Surrounding whitespace
/// is ignored.
pub fn validate_email(email: &str) -> ValidationReport {
    let input = email.trim();
    let mut reasons = Vec::new();

    if input.len() > MAX_ADDRESS_LEN {
        reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", input.len()));
    }

    let parts: Vec<&str> = input.split('@').collect();
    if parts.len() != 2 {
        reasons.push("must contain exactly one '@'".to_string());
        return ValidationReport { ok: false, reasons };
    }
    let (local, domain) = (parts[0], parts[1]);

    if local.is_empty() || local.len() > MAX_LOCAL_LEN {
        reasons.push(format!(
            "local part length {} invalid (1..={MAX_LOCAL_LEN})",
            local.len()
        ));
    }
    if domain.is_empty() {
        reasons.push("domain is empty".to_string());
    } else if !domain.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    if !ADDRESS_PATTERN.is_match(input) {
        reasons.push("address does not match local-part@domain pattern".to_string());
    }

    ValidationReport {
        ok: reasons.is_empty(),
        reasons,
    }
}

impl EmailAddress {
    /// Parses and validates `input` into an [`EmailAddress`].
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let report = validate_email(input);
        if !report.ok {
            return Err(EmailError::InvalidFormat {
                reasons: report.reasons,
            });
        }
        Self::from_validated(input.trim().to_string()).ok_or_else(|| EmailError::InvalidFormat {
            reasons: vec!["must contain exactly one '@'".to_string()],
        })
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
