use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs for [`SmtpProber`](crate::probe::SmtpProber).
///
/// Every network wait is bounded; a zero timeout fails the stage at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeOptions {
    pub port: u16,
    /// Bounds host resolution and each connection attempt.
    pub connect_timeout_ms: u64,
    pub greeting_timeout_ms: u64,
    pub quit_timeout_ms: u64,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: 25,
            connect_timeout_ms: 5_000,
            greeting_timeout_ms: 5_000,
            quit_timeout_ms: 2_000,
        }
    }
}

impl ProbeOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn greeting_timeout(&self) -> Duration {
        Duration::from_millis(self.greeting_timeout_ms)
    }

    pub fn quit_timeout(&self) -> Duration {
        Duration::from_millis(self.quit_timeout_ms)
    }

    /// Upper bound for a whole probe: host resolution, one connection
    /// attempt, the greeting and `QUIT`.
    pub fn budget(&self) -> Duration {
        self.connect_timeout() * 2 + self.greeting_timeout() + self.quit_timeout()
    }
}
