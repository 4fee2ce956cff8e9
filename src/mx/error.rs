use std::time::Duration;

use thiserror::Error;
use trust_dns_resolver::error::ResolveError;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: ResolveError,
    },
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: ResolveError,
    },
    #[error("MX lookup timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("resolver fault: {0}")]
    Other(String),
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: ResolveError) -> Self {
        Self::ResolverInit { source }
    }

    pub fn lookup(source: ResolveError) -> Self {
        Self::Lookup { source }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Ordinary DNS failures, treated like an answer without records.
    ///
    /// `false` means the resolver itself is broken; callers surface that as
    /// "unable to verify" rather than blaming the domain.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Self::EmptyDomain | Self::IdnaConversion { .. } | Self::Lookup { .. } | Self::Timeout { .. }
        )
    }
}
