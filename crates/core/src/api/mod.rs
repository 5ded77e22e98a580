//! High-level API built on [`crate::ParseSession`].
//!
//! # Example
//!
//! ```
//! use pdfjob_core::api::jobs::{JobKind, ScanOptions, scan_jobs};
//!
//! let spool: &[u8] = b"%PDF-1.4\ntrailer\n<< >>\nstartxref\n0\n%%EOF\n%!PS-Adobe-3.0\n";
//! let spans = scan_jobs(spool, &ScanOptions::default())?;
//! assert_eq!(spans.len(), 2);
//! assert_eq!(spans[0].kind, JobKind::Pdf);
//! assert_eq!(spans[1].kind, JobKind::Other);
//! # Ok::<(), pdfjob_core::JobError>(())
//! ```

pub mod jobs;

// Re-export for convenience
pub use jobs::{JobKind, JobScanner, JobSpan, ScanOptions, scan_jobs};
