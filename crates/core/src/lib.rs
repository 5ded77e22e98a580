//! pdfjob - find where a PDF print job ends, one chunk at a time.
//!
//! [`ParseSession`] consumes a job as arbitrarily sized chunks, spools
//! every byte through a [`SpoolSink`] and reports the exact length of
//! the PDF (up to its final `%%EOF`) with memory independent of the
//! job's size. [`api::jobs::scan_jobs`] builds on it to split a spool
//! of concatenated jobs.

pub mod api;
pub mod error;
pub mod params;
pub mod parser;
pub mod session;
pub mod sink;

pub use api::jobs::{JobKind, JobSpan, ScanOptions, scan_jobs};
pub use error::{JobError, Result};
pub use params::JobParams;
pub use parser::structure::StructureState;
pub use session::{FeedStatus, ParseSession};
pub use sink::{MemorySpool, SpoolSink, TailSpool, WriterSpool};
