//! Per-address verification pipeline.
//!
//! An address moves through [`Stage::FormatChecked`], [`Stage::ExchangerResolved`]
//! and [`Stage::Probed`] and always ends with a [`Verdict`]. One MX lookup and
//! one probe are made, without retries; any failure is final for that address.
//!
//! A `Valid` verdict only means the preferred exchanger answered with a
//! greeting. Plenty of servers greet everyone and refuse recipients later, so
//! it does not prove the mailbox exists.

mod options;
mod types;

pub use options::VerifyOptions;
pub use types::{Reason, Stage, ValidationResult, Verdict};

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use tokio::time;
use tracing::{debug, trace, warn};

use crate::format::{check_format, split_address};
use crate::mx::{self, DnsResolver, LookupMx, MxStatus};
use crate::probe::{ProbeFailure, ProbeOutcome, Prober, SmtpProber};

/// Verifies one address with the system resolver and default options.
pub async fn verify_one(address: &str) -> Verdict {
    match Verifier::system(VerifyOptions::default()) {
        Ok(verifier) => verifier.verify_one(address).await,
        Err(err) => fallback_verdict(address, &err),
    }
}

/// Verdict used when no resolver could be built at all.
pub(crate) fn fallback_verdict(address: &str, err: &mx::Error) -> Verdict {
    if !check_format(address) {
        return Verdict::invalid(address, Reason::InvalidFormat);
    }
    warn!(address, error = %err, "resolver unavailable");
    Verdict::invalid(address, Reason::Unverifiable)
}

/// Runs the format / MX / handshake pipeline with pluggable collaborators.
pub struct Verifier<R, P> {
    resolver: R,
    prober: P,
    options: VerifyOptions,
}

impl Verifier<DnsResolver, SmtpProber> {
    /// Production wiring: trust-dns system resolver and a real SMTP prober.
    pub fn system(options: VerifyOptions) -> Result<Self, mx::Error> {
        let resolver = DnsResolver::from_system_conf()?;
        let prober = SmtpProber::new(options.probe.clone());
        Ok(Self::new(resolver, prober, options))
    }
}

impl<R, P> Verifier<R, P>
where
    R: LookupMx,
    P: Prober,
{
    pub fn new(resolver: R, prober: P, options: VerifyOptions) -> Self {
        Self {
            resolver,
            prober,
            options,
        }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Never fails: every error path ends in an `Invalid` verdict.
    pub async fn verify_one(&self, address: &str) -> Verdict {
        trace!(address, stage = ?Stage::Unvalidated, "verifying");
        let Some((_, domain)) = split_address(address) else {
            debug!(address, stage = ?Stage::FormatChecked, "malformed address");
            return Verdict::invalid(address, Reason::InvalidFormat);
        };

        let checked = AssertUnwindSafe(self.check_mail_service(address, domain))
            .catch_unwind()
            .await;
        let verdict = match checked {
            Ok(Ok(())) => Verdict::valid(address),
            Ok(Err(reason)) => Verdict::invalid(address, reason),
            Err(payload) => {
                warn!(
                    address,
                    panic = panic_message(payload.as_ref()),
                    "collaborator panicked during verification"
                );
                Verdict::invalid(address, Reason::Unverifiable)
            }
        };
        trace!(address, stage = ?Stage::Done, result = %verdict.validation_result, "verified");
        verdict
    }

    async fn check_mail_service(&self, address: &str, domain: &str) -> Result<(), Reason> {
        let status = self.resolve(domain).await.map_err(|err| {
            if err.is_resolution_failure() {
                debug!(address, domain, stage = ?Stage::ExchangerResolved, error = %err, "MX resolution failed");
                Reason::NoMailServer
            } else {
                warn!(address, domain, error = %err, "resolver fault");
                Reason::Unverifiable
            }
        })?;

        let Some(primary) = status.primary() else {
            debug!(address, domain, stage = ?Stage::ExchangerResolved, "no MX records");
            return Err(Reason::NoMailServer);
        };

        let budget = self.options.probe.budget();
        let outcome = time::timeout(budget, self.prober.probe(&primary.exchange))
            .await
            .unwrap_or_else(|_| {
                debug!(address, exchange = %primary.exchange, after = ?budget, "probe exceeded its budget");
                ProbeOutcome::Unreachable(ProbeFailure::Timeout)
            });
        match outcome {
            ProbeOutcome::Reachable => {
                debug!(address, exchange = %primary.exchange, stage = ?Stage::Probed, "exchanger reachable");
                Ok(())
            }
            ProbeOutcome::Unreachable(cause) => {
                debug!(address, exchange = %primary.exchange, stage = ?Stage::Probed, %cause, "exchanger unreachable");
                Err(Reason::NoMailServer)
            }
        }
    }

    async fn resolve(&self, domain: &str) -> Result<MxStatus, mx::Error> {
        let ascii = mx::normalize_domain(domain)?;
        let limit = self.options.resolve_timeout();
        time::timeout(limit, mx::resolve_with(&self.resolver, &ascii))
            .await
            .unwrap_or_else(|_| Err(mx::Error::Timeout { after: limit }))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
