//! Spool sinks: where every byte fed to a session ends up.

use std::io::{self, Write};

use tracing::trace;

/// Destination for the raw bytes of a job.
///
/// `append` receives every byte handed to the session, in order,
/// whatever the parse outcome. `report_pdf_length` is called once per
/// recognized `%%EOF` with the cumulative job length up to and
/// including that marker's line.
pub trait SpoolSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn report_pdf_length(&mut self, length: u64);
}

impl<S: SpoolSink + ?Sized> SpoolSink for &mut S {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).append(bytes)
    }

    fn report_pdf_length(&mut self, length: u64) {
        (**self).report_pdf_length(length)
    }
}

impl<S: SpoolSink + ?Sized> SpoolSink for Box<S> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).append(bytes)
    }

    fn report_pdf_length(&mut self, length: u64) {
        (**self).report_pdf_length(length)
    }
}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySpool {
    data: Vec<u8>,
    lengths: Vec<u64>,
}

impl MemorySpool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Every length reported so far, oldest first.
    pub fn reported_lengths(&self) -> &[u64] {
        &self.lengths
    }

    pub fn last_length(&self) -> Option<u64> {
        self.lengths.last().copied()
    }

    /// The job bytes up to the last reported length.
    pub fn job(&self) -> Option<&[u8]> {
        let len = usize::try_from(self.last_length()?).ok()?;
        self.data.get(..len)
    }

    /// Bytes fed after the last reported length.
    pub fn overrun(&self) -> &[u8] {
        let start = self
            .last_length()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0)
            .min(self.data.len());
        &self.data[start..]
    }
}

impl SpoolSink for MemorySpool {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    fn report_pdf_length(&mut self, length: u64) {
        self.lengths.push(length);
    }
}

/// Writes through to any [`Write`].
#[derive(Debug)]
pub struct WriterSpool<W: Write> {
    inner: W,
    written: u64,
    last_length: Option<u64>,
}

impl<W: Write> WriterSpool<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            last_length: None,
        }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn last_length(&self) -> Option<u64> {
        self.last_length
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> SpoolSink for WriterSpool<W> {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn report_pdf_length(&mut self, length: u64) {
        self.last_length = Some(length);
    }
}

/// Keeps only what may belong to the next job.
///
/// Before the first `%%EOF` only the latest chunk is held. Afterwards
/// every byte past the most recently reported length is held, so the
/// overrun can be replayed into a fresh session once the current one
/// reports end-of-job. The owner calls [`TailSpool::discard_held`] once
/// the held bytes are known to belong to the current job, for example
/// when the parser has moved into an incremental update.
#[derive(Debug, Clone, Default)]
pub struct TailSpool {
    tail: Vec<u8>,
    tail_start: u64,
    total: u64,
    reported: Option<u64>,
}

impl TailSpool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes appended.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last_length(&self) -> Option<u64> {
        self.reported
    }

    /// Bytes after the last reported length, or `None` before any report.
    pub fn overrun(&self) -> Option<&[u8]> {
        self.reported.map(|_| self.tail.as_slice())
    }

    /// Number of bytes currently held.
    pub fn held(&self) -> usize {
        self.tail.len()
    }

    /// Drop every held byte. Bytes appended later are held again, and
    /// the last reported length is kept.
    pub fn discard_held(&mut self) {
        self.tail_start = self.total;
        self.tail.clear();
    }

    /// Take the overrun, leaving the spool empty.
    pub fn take_overrun(&mut self) -> Vec<u8> {
        if self.reported.is_none() {
            return Vec::new();
        }
        std::mem::take(&mut self.tail)
    }
}

impl SpoolSink for TailSpool {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.reported.is_none() {
            self.tail.clear();
            self.tail_start = self.total;
        }
        self.tail.extend_from_slice(bytes);
        self.total += bytes.len() as u64;
        Ok(())
    }

    fn report_pdf_length(&mut self, length: u64) {
        let drop = length.saturating_sub(self.tail_start);
        let drop = usize::try_from(drop).unwrap_or(usize::MAX).min(self.tail.len());
        self.tail.drain(..drop);
        self.tail_start += drop as u64;
        self.reported = Some(length);
        trace!(length, held = self.tail.len(), "tail trimmed");
    }
}
