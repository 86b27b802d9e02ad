use std::fmt;

use thiserror::Error;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

/// A syntactically valid `local-part@domain` address.
///
/// Only [`EmailAddress::parse`] builds one, so holders can rely on exactly
/// one `@`, a non-empty local part and a domain containing a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress {
    raw: String,
    at: usize,
}

impl EmailAddress {
    pub(crate) fn from_validated(raw: String) -> Option<Self> {
        let at = raw.find('@')?;
        Some(Self { raw, at })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn local(&self) -> &str {
        &self.raw[..self.at]
    }

    pub fn domain(&self) -> &str {
        &self.raw[self.at + 1..]
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("invalid email address: {}", reasons.join("; "))]
    InvalidFormat { reasons: Vec<String> },
}

impl EmailError {
    pub fn reasons(&self) -> &[String] {
        match self {
            Self::InvalidFormat { reasons } => reasons,
        }
    }
}
