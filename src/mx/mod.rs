//! DNS MX resolution.
//!
//! [`resolve_mx`] picks the single mail exchanger a probe should talk to;
//! [`check_mx`] returns the whole sorted answer for diagnostics. Both use the
//! system resolver configuration with a bounded per-query timeout.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{
    DEFAULT_DNS_TIMEOUT, LookupMx, check_mx, resolve_mx, resolve_mx_with_timeout, system_resolver,
};
pub use types::{MxRecord, MxStatus};

pub(crate) use resolver::{normalize_domain, resolve_with};
