//! The parse driver.
//!
//! A [`ParseSession`] accepts a PDF print job as a sequence of
//! arbitrarily split chunks, spools every byte to its sink and decides
//! where the job ends. All progress between chunks lives in the session;
//! chunks are never retained.
//!
//! # Example
//!
//! ```
//! use pdfjob_core::{FeedStatus, MemorySpool, ParseSession};
//!
//! let job = b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< >>\nstartxref\n9\n%%EOF\n";
//! let mut session = ParseSession::new(MemorySpool::new());
//! for chunk in job.chunks(7) {
//!     assert_eq!(session.feed(chunk)?, FeedStatus::NeedMoreData);
//! }
//! assert_eq!(session.finalize()?, FeedStatus::EndOfJob);
//! assert_eq!(session.pdf_length(), Some(job.len() as u64));
//! # Ok::<(), pdfjob_core::JobError>(())
//! ```

use tracing::debug;

use crate::error::{JobError, Result};
use crate::params::JobParams;
use crate::parser::cursor::Cursor;
use crate::parser::structure::{JobMachine, StructureState};
use crate::sink::SpoolSink;

/// Non-error outcome of [`ParseSession::feed`] and [`ParseSession::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedStatus {
    /// The job boundary is not known yet.
    NeedMoreData,
    /// The input does not start with a PDF header.
    NotPdf,
    /// The job boundary is final. Bytes past [`ParseSession::pdf_length`]
    /// belong to the next job.
    EndOfJob,
}

impl FeedStatus {
    /// Whether no further parsing will happen.
    pub fn is_final(self) -> bool {
        self != FeedStatus::NeedMoreData
    }
}

/// Incremental job-boundary parser over a spool sink.
#[derive(Debug)]
pub struct ParseSession<S: SpoolSink> {
    sink: S,
    machine: JobMachine,
    params: JobParams,
    bytes_fed: u64,
    verdict: Option<FeedStatus>,
    failed: bool,
}

impl<S: SpoolSink> ParseSession<S> {
    pub fn new(sink: S) -> Self {
        Self::with_params(sink, JobParams::default())
    }

    pub fn with_params(sink: S, params: JobParams) -> Self {
        Self {
            machine: JobMachine::new(&params),
            sink,
            params,
            bytes_fed: 0,
            verdict: None,
            failed: false,
        }
    }

    /// Spool `chunk` and advance the parse over it.
    ///
    /// Once a final verdict or an error has been returned, later chunks
    /// are still spooled but not parsed; the verdict is repeated and
    /// errors come back as [`JobError::Poisoned`].
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FeedStatus> {
        if let Err(err) = self.sink.append(chunk) {
            debug!(error = %err, "spool append failed");
            self.failed = true;
            return Err(JobError::Spool(err));
        }
        self.bytes_fed += chunk.len() as u64;

        if self.failed {
            return Err(JobError::Poisoned);
        }
        if let Some(verdict) = self.verdict {
            return Ok(verdict);
        }

        let mut cur = Cursor::new(chunk);
        match self.machine.run(&mut cur, self.bytes_fed, &mut self.sink) {
            Ok(status) => {
                if status.is_final() {
                    debug!(?status, fed = self.bytes_fed, length = ?self.pdf_length(), "verdict");
                    self.verdict = Some(status);
                }
                Ok(status)
            }
            Err(err) => {
                self.failed = true;
                Err(err)
            }
        }
    }

    /// Declare that no more input will arrive.
    ///
    /// Completes a token cut short by end-of-input (notably a `%%EOF`
    /// without a trailing newline), then returns [`FeedStatus::EndOfJob`]
    /// if any `%%EOF` was recorded, [`FeedStatus::NotPdf`] if the header
    /// never got confirmed, and [`FeedStatus::NeedMoreData`] for a job
    /// truncated before its first `%%EOF`.
    pub fn finalize(&mut self) -> Result<FeedStatus> {
        if self.failed {
            return Err(JobError::Poisoned);
        }
        if let Some(verdict) = self.verdict {
            return Ok(verdict);
        }

        let flushed = match self.machine.finish(self.bytes_fed, &mut self.sink) {
            Ok(flushed) => flushed,
            Err(err) => {
                self.failed = true;
                return Err(err);
            }
        };
        let status = match flushed {
            Some(status) => status,
            None if self.has_seen_eof() => FeedStatus::EndOfJob,
            None if self.machine.state() == StructureState::Header => FeedStatus::NotPdf,
            None => FeedStatus::NeedMoreData,
        };
        debug!(?status, fed = self.bytes_fed, length = ?self.pdf_length(), "finalized");
        self.verdict = Some(status);
        Ok(status)
    }

    /// Whether at least one `%%EOF` has been recorded.
    pub fn has_seen_eof(&self) -> bool {
        self.machine.pdf_length().is_some()
    }

    /// Length reported at the most recent `%%EOF`.
    pub fn pdf_length(&self) -> Option<u64> {
        self.machine.pdf_length()
    }

    /// Total bytes handed to [`Self::feed`].
    pub fn bytes_fed(&self) -> u64 {
        self.bytes_fed
    }

    /// Top of the structure stack.
    pub fn state(&self) -> StructureState {
        self.machine.state()
    }

    /// Current structure nesting depth.
    pub fn depth(&self) -> usize {
        self.machine.depth()
    }

    pub fn params(&self) -> &JobParams {
        &self.params
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Tear the session down, returning its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}
