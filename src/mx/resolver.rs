use async_trait::async_trait;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};

use super::{Error, MxRecord, MxStatus};

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. The resulting
/// [`MxStatus`] contains the sorted list of records (ascending preference).
pub async fn check_mx(domain: &str) -> Result<MxStatus, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = DnsResolver::from_system_conf()?;
    resolve_with(&resolver, &ascii).await
}

/// Source of MX answers. Implemented by [`DnsResolver`] and by test doubles.
#[async_trait]
pub trait LookupMx: Send + Sync {
    /// Returns the raw records for an already ASCII-normalized domain.
    ///
    /// "No such records" is an empty vector, not an error.
    async fn lookup_mx(&self, ascii_domain: &str) -> Result<Vec<MxRecord>, Error>;
}

/// [`LookupMx`] backed by trust-dns and the host's resolver configuration.
#[derive(Clone)]
pub struct DnsResolver {
    inner: TokioAsyncResolver,
}

impl DnsResolver {
    pub fn from_system_conf() -> Result<Self, Error> {
        let inner = TokioAsyncResolver::tokio_from_system_conf().map_err(Error::resolver_init)?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl LookupMx for DnsResolver {
    async fn lookup_mx(&self, ascii_domain: &str) -> Result<Vec<MxRecord>, Error> {
        let lookup = match self.inner.mx_lookup(ascii_domain).await {
            Ok(lookup) => lookup,
            Err(err) if should_treat_as_empty(&err) => return Ok(Vec::new()),
            Err(err) => return Err(Error::lookup(err)),
        };
        let records = lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(mx.exchange().to_utf8())))
            .collect();
        Ok(records)
    }
}

pub(crate) async fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<MxStatus, Error>
where
    R: LookupMx + ?Sized,
{
    let mut records = resolver.lookup_mx(ascii_domain).await?;

    records.sort();
    records.dedup();

    if records.is_empty() {
        Ok(MxStatus::NoRecords)
    } else {
        Ok(MxStatus::Records(records))
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

// NXDOMAIN et NOERROR sans réponse arrivent tous deux ici
fn should_treat_as_empty(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}
