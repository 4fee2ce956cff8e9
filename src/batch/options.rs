use serde::{Deserialize, Serialize};

use super::BatchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Rows per progress report.
    pub chunk_size: usize,
    /// Upper bound on verifications in flight at once.
    pub concurrency: usize,
    /// Column holding the address in each row.
    pub address_field: String,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            concurrency: 10,
            address_field: "email".to_string(),
        }
    }
}

impl BatchOptions {
    pub(crate) fn validate(&self) -> Result<(), BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::InvalidOptions("chunk_size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(BatchError::InvalidOptions("concurrency must be at least 1"));
        }
        Ok(())
    }
}
