use std::fmt::Display;

use thiserror::Error;

/// Everything that can go wrong while picking a mail exchanger. Callers treat
/// all variants as the same "domain likely undeliverable" outcome.
#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {0}")]
    ResolverInit(String),
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
    #[error("no MX records found for '{domain}'")]
    NoRecords { domain: String },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init<T: Display>(err: T) -> Self {
        Self::ResolverInit(err.to_string())
    }

    pub(crate) fn lookup(source: trust_dns_resolver::error::ResolveError) -> Self {
        Self::Lookup { source }
    }

    /// `true` when the domain answered but publishes no mail exchanger.
    pub fn is_no_records(&self) -> bool {
        matches!(self, Self::NoRecords { .. })
    }
}
