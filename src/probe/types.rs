use std::fmt;

use serde::{Deserialize, Serialize};

/// A raw SMTP reply, preserving the numeric status code and message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Why a handshake did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeFailure {
    /// The exchanger name did not resolve to any socket address.
    HostResolution,
    Refused,
    Timeout,
    /// The server greeted with a non-2xx code.
    Rejected { code: u16 },
    /// The greeting could not be parsed as an SMTP reply.
    Protocol,
    Io,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostResolution => f.write_str("host resolution failed"),
            Self::Refused => f.write_str("connection refused"),
            Self::Timeout => f.write_str("timed out"),
            Self::Rejected { code } => write!(f, "greeting rejected ({code})"),
            Self::Protocol => f.write_str("protocol error"),
            Self::Io => f.write_str("I/O error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}
