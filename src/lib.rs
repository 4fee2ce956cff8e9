#![forbid(unsafe_code)]
//! mailverify_lib : vérification d'adresses e-mail sans envoi
//!
//! Each address goes through three stages: a permissive format check, an MX
//! lookup for its domain, and a greeting-only SMTP handshake with the
//! preferred exchanger. The result is a [`Verdict`] with one of four fixed
//! reasons. Batches keep their extra columns and their order.
//!
//! A `Valid` verdict is a reachability signal for the domain's mail server,
//! not a promise that the mailbox accepts mail: many servers greet everyone
//! and only refuse a recipient later in the dialogue.
//!
//! ```no_run
//! # async fn demo() {
//! let verdict = mailverify_lib::verify_one("alice@example.com").await;
//! println!("{} / {}", verdict.validation_result, verdict.validation_reason);
//! # }
//! ```

pub mod batch;
pub mod format;
pub mod mx;
pub mod probe;
pub mod verify;

pub use batch::{
    BatchError, BatchOptions, Cancellation, Progress, ProgressObserver, Row, merge_verdict,
    verify_batch,
};
pub use format::{check_format, split_address};
pub use mx::{DnsResolver, Error as MxError, LookupMx, MxRecord, MxStatus, check_mx};
pub use probe::{ProbeFailure, ProbeOptions, ProbeOutcome, Prober, SmtpProber};
pub use verify::{Reason, ValidationResult, Verdict, Verifier, VerifyOptions, verify_one};
