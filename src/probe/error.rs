use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use super::types::{ProbeFailure, SmtpReply};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("resolving {host} failed: {source}")]
    HostResolution {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("{host} has no socket addresses")]
    NoAddresses { host: String },
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("greeting rejected: {reply}")]
    Rejected { reply: SmtpReply },
}

impl ProbeError {
    pub(crate) fn timeout(stage: &'static str, after: Duration) -> Self {
        Self::Timeout { stage, after }
    }

    pub(crate) fn io(source: io::Error) -> Self {
        Self::Io { source }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Collapses the error into the coarse cause carried by `ProbeOutcome`.
    pub fn failure(&self) -> ProbeFailure {
        match self {
            Self::HostResolution { .. } | Self::NoAddresses { .. } => ProbeFailure::HostResolution,
            Self::Connect { source, .. } => match source.kind() {
                io::ErrorKind::ConnectionRefused => ProbeFailure::Refused,
                io::ErrorKind::TimedOut => ProbeFailure::Timeout,
                _ => ProbeFailure::Io,
            },
            Self::Timeout { .. } => ProbeFailure::Timeout,
            Self::Io { source } if source.kind() == io::ErrorKind::TimedOut => ProbeFailure::Timeout,
            Self::Io { .. } => ProbeFailure::Io,
            Self::Protocol(_) => ProbeFailure::Protocol,
            Self::Rejected { reply } => ProbeFailure::Rejected { code: reply.code },
        }
    }
}
