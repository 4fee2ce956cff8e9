//! SMTP reachability probe.
//!
//! [`SmtpProber`] connects to an exchanger, reads its greeting, says `QUIT`
//! and hangs up. No `EHLO`, `MAIL FROM` or `RCPT TO` is ever sent, so a
//! reachable exchanger says nothing about whether a given mailbox exists.

mod error;
mod options;
mod session;
mod types;

pub use error::ProbeError;
pub use options::ProbeOptions;
pub use types::{ProbeFailure, ProbeOutcome, SmtpReply};

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::{net, time};
use tracing::{debug, trace};

use session::SmtpSession;

/// Reachability check for one exchanger host.
///
/// Implementations must not fail: every problem is reported as
/// [`ProbeOutcome::Unreachable`].
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str) -> ProbeOutcome;
}

#[derive(Debug, Clone, Default)]
pub struct SmtpProber {
    options: ProbeOptions,
}

impl SmtpProber {
    pub fn new(options: ProbeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Runs the connect / greeting / `QUIT` exchange and returns the greeting.
    ///
    /// The connection is closed before this returns, whatever the outcome.
    pub async fn handshake(&self, host: &str) -> Result<SmtpReply, ProbeError> {
        let options = &self.options;
        let addrs = resolve_socket_addrs(host, options.port, options.connect_timeout()).await?;
        let (mut session, peer) = SmtpSession::connect(&addrs, options.connect_timeout()).await?;
        trace!(host, %peer, "connected");

        let greeting = session
            .read_reply("greeting", options.greeting_timeout())
            .await;
        session.quit(options.quit_timeout()).await;

        let greeting = greeting?;
        if greeting.is_positive_completion() {
            Ok(greeting)
        } else {
            Err(ProbeError::Rejected { reply: greeting })
        }
    }
}

#[async_trait]
impl Prober for SmtpProber {
    async fn probe(&self, host: &str) -> ProbeOutcome {
        match self.handshake(host).await {
            Ok(greeting) => {
                debug!(host, code = greeting.code, "exchanger greeted");
                ProbeOutcome::Reachable
            }
            Err(err) => {
                debug!(host, error = %err, "handshake failed");
                ProbeOutcome::Unreachable(err.failure())
            }
        }
    }
}

async fn resolve_socket_addrs(
    host: &str,
    port: u16,
    limit: Duration,
) -> Result<Vec<SocketAddr>, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }
    let lookup = time::timeout(limit, net::lookup_host((host, port)))
        .await
        .map_err(|_| ProbeError::timeout("host resolution", limit))?
        .map_err(|source| ProbeError::HostResolution {
            host: host.to_string(),
            source,
        })?;
    let addrs: Vec<SocketAddr> = lookup.collect();
    if addrs.is_empty() {
        return Err(ProbeError::NoAddresses {
            host: host.to_string(),
        });
    }
    Ok(addrs)
}

#[cfg(test)]
pub(crate) mod tests;
