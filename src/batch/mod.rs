//! Ordered, bounded-concurrency verification of many rows.
//!
//! Rows are handled chunk by chunk. Inside a chunk at most
//! [`BatchOptions::concurrency`] verifications are in flight, and results are
//! collected in input order whatever order the probes finish in. The observer
//! hears about progress after every chunk.

mod cancel;
mod options;
mod progress;

pub use cancel::Cancellation;
pub use options::BatchOptions;
pub use progress::{Progress, ProgressObserver};

use futures_util::stream::{self, StreamExt};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::mx::{DnsResolver, LookupMx};
use crate::probe::{Prober, SmtpProber};
use crate::verify::{Verdict, Verifier, VerifyOptions, fallback_verdict};

/// One input record: the address field plus any number of extra columns.
pub type Row = Map<String, Value>;

pub const RESULT_FIELD: &str = "validation_result";
pub const REASON_FIELD: &str = "validation_reason";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch cancelled after {processed} rows")]
    Cancelled { processed: usize },
    #[error("invalid batch options: {0}")]
    InvalidOptions(&'static str),
}

/// Verifies `rows` with the system resolver and default options.
pub async fn verify_batch<O>(rows: Vec<Row>, observer: &O) -> Result<Vec<Row>, BatchError>
where
    O: ProgressObserver + ?Sized,
{
    let options = VerifyOptions::default();
    match Verifier::<DnsResolver, SmtpProber>::system(options.clone()) {
        Ok(verifier) => verifier.verify_rows(rows, observer).await,
        Err(err) => {
            let field = options.batch.address_field.as_str();
            let total = rows.len();
            let out: Vec<Row> = rows
                .into_iter()
                .map(|row| {
                    let verdict = fallback_verdict(address_of(&row, field), &err);
                    merge_verdict(row, &verdict)
                })
                .collect();
            observer.on_progress(Progress::new(total, total));
            Ok(out)
        }
    }
}

/// Copies the verdict fields into `row`, replacing same-named columns.
pub fn merge_verdict(mut row: Row, verdict: &Verdict) -> Row {
    row.insert(
        RESULT_FIELD.to_string(),
        Value::String(verdict.validation_result.as_str().to_string()),
    );
    row.insert(
        REASON_FIELD.to_string(),
        Value::String(verdict.validation_reason.as_str().to_string()),
    );
    row
}

// champ absent ou non textuel -> "" (rejeté par le contrôle de format)
fn address_of<'a>(row: &'a Row, field: &str) -> &'a str {
    row.get(field).and_then(Value::as_str).unwrap_or_default()
}

impl<R, P> Verifier<R, P>
where
    R: LookupMx,
    P: Prober,
{
    /// [`verify_batch`](Self::verify_batch) without a cancellation source.
    pub async fn verify_rows<O>(&self, rows: Vec<Row>, observer: &O) -> Result<Vec<Row>, BatchError>
    where
        O: ProgressObserver + ?Sized,
    {
        self.verify_batch(rows, observer, &Cancellation::new()).await
    }

    /// Returns one row per input row, in input order, each carrying
    /// `validation_result` and `validation_reason`.
    ///
    /// On cancellation the in-flight probes are dropped (closing their
    /// sockets) and [`BatchError::Cancelled`] reports how many rows were
    /// finished in completed chunks.
    pub async fn verify_batch<O>(
        &self,
        rows: Vec<Row>,
        observer: &O,
        cancel: &Cancellation,
    ) -> Result<Vec<Row>, BatchError>
    where
        O: ProgressObserver + ?Sized,
    {
        let options = &self.options().batch;
        options.validate()?;

        let total = rows.len();
        info!(total, chunk_size = options.chunk_size, concurrency = options.concurrency, "batch started");

        let mut done = Vec::with_capacity(total);
        if cancel.is_cancelled() {
            return Err(cancelled(&done, total));
        }
        for chunk in rows.chunks(options.chunk_size) {
            let verified = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(&done, total)),
                verified = stream::iter(chunk)
                    .map(|row| self.verify_row(row))
                    .buffered(options.concurrency)
                    .collect::<Vec<Row>>() => verified,
            };
            done.extend(verified);
            observer.on_progress(Progress::new(done.len(), total));
        }
        if total == 0 {
            observer.on_progress(Progress::new(0, 0));
        }
        info!(total, "batch finished");
        Ok(done)
    }

    async fn verify_row(&self, row: &Row) -> Row {
        let address = address_of(row, &self.options().batch.address_field);
        let verdict = self.verify_one(address).await;
        merge_verdict(row.clone(), &verdict)
    }
}

/// In-flight probes are dropped with the chunk future; only whole chunks count.
fn cancelled(done: &[Row], total: usize) -> BatchError {
    let processed = done.len();
    warn!(processed, total, "batch cancelled");
    BatchError::Cancelled { processed }
}
