use std::time::Duration;

use tracing::debug;
use trust_dns_resolver::{
    Resolver,
    error::{ResolveError, ResolveErrorKind},
    system_conf,
};

use super::{Error, MxRecord, MxStatus};

/// Bound applied to each DNS query when no explicit timeout is given.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] contains the sorted list of records (ascending preference,
/// ties ordered by hostname).
pub fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver(DEFAULT_DNS_TIMEOUT)?;
    records_with(&resolver, &ascii)
}

/// Returns the mail exchanger with the lowest preference for `domain`.
///
/// Equal preferences are broken by the lexicographically smallest hostname.
/// A domain without MX records is an error; no A/AAAA fallback is tried.
pub fn resolve_mx(domain: &str) -> Result<MxRecord, Error> {
    resolve_mx_with_timeout(domain, DEFAULT_DNS_TIMEOUT)
}

pub fn resolve_mx_with_timeout(domain: &str, timeout: Duration) -> Result<MxRecord, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver(timeout)?;
    resolve_with(&resolver, &ascii)
}

/// Builds a blocking resolver from the system configuration with a single
/// attempt bounded by `timeout`.
pub fn system_resolver(timeout: Duration) -> Result<Resolver, Error> {
    let (config, mut opts) = system_conf::read_system_conf().map_err(Error::resolver_init)?;
    opts.timeout = timeout;
    opts.attempts = 1;
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

pub(crate) fn records_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx + ?Sized,
{
    debug!(domain = ascii_domain, "querying MX records");
    let mut records: Vec<MxRecord> = resolver
        .lookup_mx(ascii_domain)
        .map_err(Error::lookup)?
        .into_iter()
        .map(|record| MxRecord::new(record.preference, normalize_exchange(record.exchange)))
        // null MX (`0 .`): the domain accepts no mail
        .filter(|record| !record.exchange.is_empty())
        .collect();

    records.sort();
    records.dedup();
    debug!(domain = ascii_domain, count = records.len(), "MX lookup finished");

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
    }
}

pub(crate) fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxRecord, Error>
where
    R: LookupMx + ?Sized,
{
    match records_with(resolver, ascii_domain)? {
        MxStatus::Records(records) => records.into_iter().next().ok_or_else(|| Error::NoRecords {
            domain: ascii_domain.to_string(),
        }),
        MxStatus::NoRecords => Err(Error::NoRecords {
            domain: ascii_domain.to_string(),
        }),
    }
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// Source of MX answers. Implemented for the blocking `trust-dns` resolver;
/// tests and embedders can plug in their own.
pub trait LookupMx {
    /// Returns the raw records for `domain`. An empty list means the domain
    /// has no MX records. Exchange names may keep their trailing dot.
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = match Resolver::mx_lookup(self, domain) {
            Ok(lookup) => lookup,
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };
        let mut records = Vec::new();
        for mx in lookup.iter() {
            records.push(MxRecord::new(mx.preference(), mx.exchange().to_utf8()));
        }
        Ok(records)
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        self.calls.set(self.calls.get() + 1);
        (self.on_lookup)(domain)
    }
}
