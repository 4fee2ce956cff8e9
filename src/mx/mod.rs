//! DNS MX resolution.
//!
//! The public entry point is [`check_mx`], which performs a lookup through the
//! system resolver and returns a [`MxStatus`] describing the outcome. The
//! [`LookupMx`] trait is the seam the verifier uses, so tests can swap in a
//! stub that never touches the network.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{DnsResolver, LookupMx, check_mx};
pub use types::{MxRecord, MxStatus};

pub(crate) use resolver::{normalize_domain, resolve_with};
