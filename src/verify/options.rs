use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchOptions;
use crate::probe::ProbeOptions;

/// Everything a [`Verifier`](crate::Verifier) needs to know, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyOptions {
    pub resolve_timeout_ms: u64,
    pub probe: ProbeOptions,
    pub batch: BatchOptions,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            resolve_timeout_ms: 5_000,
            probe: ProbeOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl VerifyOptions {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }
}
