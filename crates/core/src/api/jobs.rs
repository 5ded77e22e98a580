//! Splitting a spool of concatenated jobs.
//!
//! A spool file often holds several jobs back to back: PDFs, PostScript,
//! or anything else. [`JobScanner`] runs one [`ParseSession`] per job and
//! replays the overrun of each finished PDF into a fresh session. Bytes
//! after an `%%EOF` are held only while the parser is still between
//! updates; once an incremental update starts they belong to the current
//! job and are dropped.

use std::io::{ErrorKind, Read};

use tracing::{debug, warn};

use crate::error::{JobError, Result};
use crate::params::JobParams;
use crate::parser::classify::is_whitespace;
use crate::parser::structure::StructureState;
use crate::session::{FeedStatus, ParseSession};
use crate::sink::TailSpool;

/// Default number of bytes read per `feed`.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Options for [`scan_jobs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Bytes read from the input per session feed.
    pub chunk_size: usize,

    /// Parameters for every session the scanner starts.
    pub params: JobParams,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            params: JobParams::default(),
        }
    }
}

/// What a span of the spool turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    /// A PDF ending at its final `%%EOF`.
    Pdf,
    /// A PDF that ended before any `%%EOF`.
    Truncated,
    /// Anything that is not a PDF, or failed to parse as one.
    Other,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Pdf => "pdf",
            JobKind::Truncated => "truncated",
            JobKind::Other => "other",
        }
    }
}

/// One job found in the spool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSpan {
    pub index: usize,
    /// Byte offset of the job's first byte.
    pub offset: u64,
    pub length: u64,
    pub kind: JobKind,
}

impl JobSpan {
    /// Offset one past the job's last byte.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

enum Current {
    Session {
        session: ParseSession<TailSpool>,
        significant: bool,
    },
    /// The rest of the input is one non-PDF span.
    Other,
}

/// Push-based job splitter.
pub struct JobScanner {
    params: JobParams,
    spans: Vec<JobSpan>,
    job_start: u64,
    total: u64,
    current: Current,
}

impl JobScanner {
    pub fn new(params: JobParams) -> Self {
        let current = Self::fresh(&params);
        Self {
            params,
            spans: Vec::new(),
            job_start: 0,
            total: 0,
            current,
        }
    }

    fn fresh(params: &JobParams) -> Current {
        Current::Session {
            session: ParseSession::with_params(TailSpool::new(), params.clone()),
            significant: false,
        }
    }

    /// Spans closed so far.
    pub fn spans(&self) -> &[JobSpan] {
        &self.spans
    }

    /// Total bytes pushed.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Offset where the job currently being parsed starts.
    pub fn job_start(&self) -> u64 {
        self.job_start
    }

    /// Bytes the current session holds for a possible next job.
    pub fn held(&self) -> usize {
        match &self.current {
            Current::Session { session, .. } => session.sink().held(),
            Current::Other => 0,
        }
    }

    /// Feed the next chunk of the spool.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        self.total += chunk.len() as u64;
        let overrun = self.feed(chunk)?;
        self.replay(overrun)
    }

    /// Replay overrun bytes until no finished job leaves any behind.
    fn replay(&mut self, mut overrun: Option<Vec<u8>>) -> Result<()> {
        while let Some(bytes) = overrun {
            debug!(offset = self.job_start, bytes = bytes.len(), "replaying overrun");
            overrun = self.feed(&bytes)?;
        }
        Ok(())
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<Option<Vec<u8>>> {
        let Current::Session {
            session,
            significant,
        } = &mut self.current
        else {
            return Ok(None);
        };
        if !*significant {
            *significant = bytes.iter().any(|&b| !is_whitespace(b));
        }

        match session.feed(bytes) {
            Ok(FeedStatus::NeedMoreData) => {
                // End-of-job is only detected from `Incremental`, after a
                // newer `%%EOF` report, so nothing held now can be overrun.
                if session.state() != StructureState::Incremental {
                    session.sink_mut().discard_held();
                }
                Ok(None)
            }
            Ok(FeedStatus::NotPdf) => {
                debug!(offset = self.job_start, "not a PDF, rest of input is one span");
                self.current = Current::Other;
                Ok(None)
            }
            Ok(FeedStatus::EndOfJob) => Ok(Some(self.close_pdf())),
            Err(err) => {
                self.abandon(err);
                Ok(None)
            }
        }
    }

    /// Record the finished PDF and start a new session; returns the overrun.
    fn close_pdf(&mut self) -> Vec<u8> {
        let Current::Session { session, .. } =
            std::mem::replace(&mut self.current, Self::fresh(&self.params))
        else {
            return Vec::new();
        };
        let length = session.pdf_length().unwrap_or_else(|| session.bytes_fed());
        self.close_span(length, JobKind::Pdf);
        session.into_sink().take_overrun()
    }

    /// A parse error: keep what was recorded, the rest is one span.
    fn abandon(&mut self, err: JobError) {
        warn!(offset = self.job_start, error = %err, "job abandoned");
        if let Current::Session { session, .. } = std::mem::replace(&mut self.current, Current::Other) {
            if let Some(length) = session.pdf_length() {
                self.close_span(length, JobKind::Pdf);
            }
        }
    }

    fn close_span(&mut self, length: u64, kind: JobKind) {
        let span = JobSpan {
            index: self.spans.len(),
            offset: self.job_start,
            length,
            kind,
        };
        debug!(index = span.index, offset = span.offset, length, kind = kind.as_str(), "job span");
        self.spans.push(span);
        self.job_start += length;
    }

    /// End of input: close whatever is open and return all spans.
    pub fn finish(mut self) -> Result<Vec<JobSpan>> {
        loop {
            match std::mem::replace(&mut self.current, Current::Other) {
                Current::Other => {
                    let rest = self.total - self.job_start;
                    if rest > 0 {
                        self.close_span(rest, JobKind::Other);
                    }
                    break;
                }
                Current::Session {
                    mut session,
                    significant,
                } => match session.finalize() {
                    Ok(FeedStatus::EndOfJob) => {
                        let unread = session
                            .pdf_length()
                            .map_or(0, |length| session.bytes_fed() - length);
                        self.current = Current::Session {
                            session,
                            significant,
                        };
                        let overrun = self.close_pdf();
                        if (overrun.len() as u64) < unread {
                            // An unfinished update was dropped from the spool.
                            debug!(offset = self.job_start, "unfinished update, rest of input is one span");
                            self.current = Current::Other;
                            continue;
                        }
                        let overrun = self.feed(&overrun)?;
                        self.replay(overrun)?;
                    }
                    Ok(FeedStatus::NotPdf) => {
                        if significant {
                            self.close_span(self.total - self.job_start, JobKind::Other);
                        }
                        break;
                    }
                    Ok(FeedStatus::NeedMoreData) => {
                        self.close_span(self.total - self.job_start, JobKind::Truncated);
                        break;
                    }
                    Err(err) => {
                        warn!(offset = self.job_start, error = %err, "job abandoned");
                        if let Some(length) = session.pdf_length() {
                            self.close_span(length, JobKind::Pdf);
                        }
                    }
                },
            }
        }
        Ok(self.spans)
    }
}

/// Read `reader` to its end and split it into jobs.
pub fn scan_jobs<R: Read>(mut reader: R, options: &ScanOptions) -> Result<Vec<JobSpan>> {
    let mut scanner = JobScanner::new(options.params.clone());
    let mut buf = vec![0u8; options.chunk_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(JobError::Read(err)),
        };
        scanner.push(&buf[..n])?;
    }
    scanner.finish()
}
