//! Job-structure state machine.
//!
//! An explicit bounded stack of [`StructureState`] mirrors PDF's
//! object / dictionary / array / procedure nesting and the
//! `xref` / `trailer` / `startxref` / `%%EOF` sequence. Because all
//! progress lives in the stack and the lexer, parsing can stop at any
//! byte and pick up again with the next chunk.
//!
//! Unexpected tokens are ignored in place: real spool data is full of
//! damaged PDFs whose boundaries still have to be found.

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::accumulator::Accumulator;
use super::classify::is_whitespace;
use super::cursor::Cursor;
use super::lexer::{Lexer, Token};
use super::stream_skip::{ENDSTREAM, StreamSkip};
use crate::error::{JobError, Result};
use crate::params::JobParams;
use crate::session::FeedStatus;
use crate::sink::SpoolSink;

/// Hard upper bound on structure nesting.
pub const MAX_STRUCTURE_DEPTH: usize = 32;

/// One frame of the structure stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructureState {
    /// Waiting for the `%PDF-x.y` comment.
    Header,
    /// Expecting an object number, `xref`, `trailer` or `startxref`.
    ObjectNum,
    ObjectGen,
    ObjectObj,
    /// Inside `N G obj`, before any stream.
    ObjectBody,
    /// Inside `N G obj` after its stream payload; waiting for `endobj`.
    ObjectEndobj,
    CompositeDict,
    CompositeArray,
    CompositeProc,
    /// Consuming the line terminator after `stream` (counted path).
    StreamStart,
    /// Discarding a declared number of payload bytes.
    StreamLen,
    /// Searching for the literal `endstream`.
    StreamSearch,
    /// Found `endstream` by search; the next byte must be whitespace.
    StreamCheck,
    /// Counted payload consumed; expecting the `endstream` keyword.
    StreamEnd,
    Xref,
    Trailer,
    TrailerStartxref,
    /// Scanning for the `%%EOF` comment.
    TrailerEof,
    /// After `%%EOF`: incremental update or the next job.
    Incremental,
}

/// Bounded stack of structure states. Never empty.
#[derive(Debug, Clone)]
pub struct StructureStack {
    states: SmallVec<[StructureState; MAX_STRUCTURE_DEPTH]>,
    limit: usize,
}

impl StructureStack {
    pub fn new(initial: StructureState, limit: usize) -> Self {
        let mut states = SmallVec::new();
        states.push(initial);
        Self {
            states,
            limit: limit.clamp(1, MAX_STRUCTURE_DEPTH),
        }
    }

    pub fn top(&self) -> StructureState {
        // The stack is never empty: pop refuses to remove the last frame.
        self.states[self.states.len() - 1]
    }

    pub fn set_top(&mut self, state: StructureState) {
        let last = self.states.len() - 1;
        self.states[last] = state;
    }

    pub fn push(&mut self, state: StructureState) -> Result<()> {
        if self.states.len() >= self.limit {
            warn!(depth = self.states.len(), limit = self.limit, ?state, "structure stack overflow");
            return Err(JobError::StackOverflow {
                depth: self.states.len() + 1,
                limit: self.limit,
            });
        }
        self.states.push(state);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<StructureState> {
        if self.states.len() <= 1 {
            return Err(JobError::StackUnderflow);
        }
        self.states.pop().ok_or(JobError::StackUnderflow)
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }
}

/// What the machine knows about the dictionary being scanned.
#[derive(Debug, Clone, Default)]
struct DictTracking {
    depth: u32,
    after_length_key: bool,
    prev_numeric: bool,
    stream_length: Option<u64>,
}

impl DictTracking {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn at_top_level(&self) -> bool {
        self.depth == 1
    }

    fn on_name(&mut self, text: &Accumulator) {
        self.after_length_key = text.equals(b"Length");
        self.prev_numeric = false;
    }

    fn on_integer(&mut self, value: i32) {
        if self.after_length_key {
            if self.prev_numeric {
                // `/Length N G R`: the length lives in another object.
                self.stream_length = None;
                self.after_length_key = false;
            } else {
                self.stream_length = u64::try_from(value).ok().filter(|&n| n > 0);
            }
        }
        self.prev_numeric = true;
    }

    fn on_real(&mut self) {
        if self.after_length_key {
            self.stream_length = None;
            self.after_length_key = false;
        }
        self.prev_numeric = true;
    }

    fn on_other(&mut self) {
        self.after_length_key = false;
        self.prev_numeric = false;
    }
}

/// Result of the checks made between tokens.
enum Gate {
    Proceed,
    Again,
    NeedMore,
    Verdict(FeedStatus),
}

/// The structural parser driven by [`crate::ParseSession`].
#[derive(Debug, Clone)]
pub struct JobMachine {
    stack: StructureStack,
    lexer: Lexer,
    skip: StreamSkip,
    dict: DictTracking,
    trust_declared_length: bool,
    skip_leading_whitespace: bool,
    pdf_length: Option<u64>,
}

impl JobMachine {
    pub fn new(params: &JobParams) -> Self {
        Self {
            stack: StructureStack::new(StructureState::Header, params.max_depth),
            lexer: Lexer::new(),
            skip: StreamSkip::new(),
            dict: DictTracking::default(),
            trust_declared_length: params.trust_declared_length,
            skip_leading_whitespace: params.skip_leading_whitespace,
            pdf_length: None,
        }
    }

    pub fn state(&self) -> StructureState {
        self.stack.top()
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Length reported at the most recent `%%EOF`.
    pub fn pdf_length(&self) -> Option<u64> {
        self.pdf_length
    }

    /// Drive the machine over `cur`.
    ///
    /// `fed` is the total number of bytes handed to the session,
    /// including all of `cur`.
    pub fn run<S: SpoolSink + ?Sized>(
        &mut self,
        cur: &mut Cursor<'_>,
        fed: u64,
        sink: &mut S,
    ) -> Result<FeedStatus> {
        loop {
            let state = self.stack.top();
            if matches!(
                state,
                StructureState::StreamStart
                    | StructureState::StreamLen
                    | StructureState::StreamSearch
                    | StructureState::StreamCheck
            ) {
                if !self.step_stream(state, cur)? {
                    return Ok(FeedStatus::NeedMoreData);
                }
                continue;
            }

            if self.lexer.is_idle() {
                match self.gate(state, cur) {
                    Gate::Proceed => {}
                    Gate::Again => continue,
                    Gate::NeedMore => return Ok(FeedStatus::NeedMoreData),
                    Gate::Verdict(status) => return Ok(status),
                }
            }

            let Some(token) = self.lexer.next_token(cur) else {
                if state == StructureState::Header
                    && self.lexer.in_comment()
                    && !header_prefix_plausible(self.lexer.text())
                {
                    debug!("header comment is not %PDF-");
                    return Ok(FeedStatus::NotPdf);
                }
                return Ok(FeedStatus::NeedMoreData);
            };

            let at = fed - cur.remaining() as u64;
            if let Some(status) = self.on_token(token, at, sink)? {
                return Ok(status);
            }
        }
    }

    /// Flush the token that end-of-input interrupted.
    ///
    /// Returns a verdict if the flushed token decided one.
    pub fn finish<S: SpoolSink + ?Sized>(
        &mut self,
        fed: u64,
        sink: &mut S,
    ) -> Result<Option<FeedStatus>> {
        match self.lexer.finish() {
            Some(token) => self.on_token(token, fed, sink),
            None => Ok(None),
        }
    }

    fn step_stream(&mut self, state: StructureState, cur: &mut Cursor<'_>) -> Result<bool> {
        match state {
            StructureState::StreamStart => {
                if !self.skip.align_eol(cur) {
                    return Ok(false);
                }
                if self.skip.remaining() == 0 {
                    self.stack.set_top(StructureState::StreamEnd);
                } else {
                    self.stack.set_top(StructureState::StreamLen);
                }
            }
            StructureState::StreamLen => {
                if !self.skip.consume_counted(cur) {
                    return Ok(false);
                }
                self.stack.set_top(StructureState::StreamEnd);
            }
            StructureState::StreamSearch => {
                if !self.skip.search(cur) {
                    if self.skip.is_spanning() {
                        trace!("endstream candidate spans chunk boundary");
                    }
                    return Ok(false);
                }
                self.stack.set_top(StructureState::StreamCheck);
            }
            StructureState::StreamCheck => {
                let Some(b) = cur.peek() else {
                    return Ok(false);
                };
                if is_whitespace(b) {
                    self.stack.pop()?;
                    trace!("stream payload skipped by search");
                } else {
                    trace!(next = b, "endstream inside payload, searching on");
                    self.skip.start_search();
                    self.stack.set_top(StructureState::StreamSearch);
                }
            }
            _ => {}
        }
        Ok(true)
    }

    fn gate(&mut self, state: StructureState, cur: &mut Cursor<'_>) -> Gate {
        match state {
            StructureState::Header => {
                let next = if self.skip_leading_whitespace {
                    self.lexer.peek_significant(cur)
                } else {
                    cur.peek()
                };
                match next {
                    None => Gate::NeedMore,
                    Some(b'%') => Gate::Proceed,
                    Some(_) => {
                        debug!("first token is not a comment");
                        Gate::Verdict(FeedStatus::NotPdf)
                    }
                }
            }
            StructureState::StreamEnd => match self.lexer.peek_significant(cur) {
                None => Gate::NeedMore,
                Some(b) if b == ENDSTREAM[0] => Gate::Proceed,
                Some(_) => {
                    self.fall_back_to_search();
                    Gate::Again
                }
            },
            _ => Gate::Proceed,
        }
    }

    fn fall_back_to_search(&mut self) {
        warn!("declared /Length does not end at endstream, searching instead");
        self.skip.start_search();
        self.stack.set_top(StructureState::StreamSearch);
    }

    fn is_keyword(&self, token: Token, keyword: &[u8]) -> bool {
        token == Token::Keyword && self.lexer.text().equals(keyword)
    }

    /// Apply one token to the current state. `at` is the offset just
    /// past the token.
    fn on_token<S: SpoolSink + ?Sized>(
        &mut self,
        token: Token,
        at: u64,
        sink: &mut S,
    ) -> Result<Option<FeedStatus>> {
        use StructureState as St;

        match self.stack.top() {
            St::Header => {
                if token == Token::Comment && is_pdf_header(self.lexer.text()) {
                    debug!(
                        header = %String::from_utf8_lossy(self.lexer.text().as_bytes()),
                        "PDF header accepted"
                    );
                    self.stack.set_top(St::ObjectNum);
                } else {
                    debug!(?token, "not a PDF header");
                    return Ok(Some(FeedStatus::NotPdf));
                }
            }
            St::ObjectNum => self.on_top_level(token),
            St::ObjectGen => {
                if let Token::Integer(_) = token {
                    self.stack.set_top(St::ObjectObj);
                } else {
                    self.stack.set_top(St::ObjectNum);
                    return self.on_token(token, at, sink);
                }
            }
            St::ObjectObj => match token {
                // `N G` followed by another integer: keep the last pair.
                Token::Integer(_) => {}
                _ if self.is_keyword(token, b"obj") => {
                    self.dict.reset();
                    self.stack.set_top(St::ObjectBody);
                }
                _ => {
                    self.stack.set_top(St::ObjectNum);
                    return self.on_token(token, at, sink);
                }
            },
            St::ObjectBody | St::ObjectEndobj => self.on_object_body(token)?,
            St::CompositeDict => self.on_dict(token)?,
            St::CompositeArray => self.on_nested(token, Token::ArrayClose)?,
            St::CompositeProc => self.on_nested(token, Token::ProcClose)?,
            St::StreamEnd => {
                if self.is_keyword(token, ENDSTREAM) {
                    self.stack.pop()?;
                    trace!("stream payload skipped by declared length");
                } else {
                    self.fall_back_to_search();
                }
            }
            St::Xref => {
                if self.is_keyword(token, b"trailer") {
                    debug!(offset = at, "trailer");
                    self.stack.set_top(St::Trailer);
                } else if self.is_keyword(token, b"startxref") {
                    self.stack.set_top(St::TrailerStartxref);
                }
            }
            St::Trailer => {
                if token == Token::DictOpen {
                    self.dict.reset();
                    self.dict.depth = 1;
                    self.stack.push(St::CompositeDict)?;
                } else if self.is_keyword(token, b"startxref") {
                    self.stack.set_top(St::TrailerStartxref);
                }
            }
            St::TrailerStartxref => match token {
                Token::Integer(_) => self.stack.set_top(St::TrailerEof),
                Token::Comment => {
                    self.stack.set_top(St::TrailerEof);
                    return self.on_token(token, at, sink);
                }
                _ => {}
            },
            St::TrailerEof => {
                if token == Token::Comment && is_eof_marker(self.lexer.text()) {
                    self.record_eof(at, sink);
                }
            }
            St::Incremental => return Ok(self.on_incremental(token)),
            St::StreamStart | St::StreamLen | St::StreamSearch | St::StreamCheck => {}
        }
        Ok(None)
    }

    /// Tokens between objects.
    fn on_top_level(&mut self, token: Token) {
        use StructureState as St;

        if let Token::Integer(_) = token {
            self.stack.set_top(St::ObjectGen);
        } else if self.is_keyword(token, b"xref") {
            debug!("xref table");
            self.stack.set_top(St::Xref);
        } else if self.is_keyword(token, b"startxref") {
            // Cross-reference-stream files have no `xref` keyword.
            self.stack.set_top(St::TrailerEof);
        } else if self.is_keyword(token, b"trailer") {
            self.stack.set_top(St::Trailer);
        }
    }

    fn on_object_body(&mut self, token: Token) -> Result<()> {
        use StructureState as St;

        match token {
            Token::DictOpen => {
                self.dict.depth += 1;
                self.stack.push(St::CompositeDict)?;
            }
            Token::ArrayOpen => self.stack.push(St::CompositeArray)?,
            Token::ProcOpen => self.stack.push(St::CompositeProc)?,
            Token::Keyword => {
                if self.is_keyword(token, b"endobj") {
                    self.dict.reset();
                    self.stack.set_top(St::ObjectNum);
                } else if self.is_keyword(token, b"stream") {
                    self.begin_stream()?;
                } else if self.is_keyword(token, b"trailer") {
                    self.stack.set_top(St::Trailer);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn begin_stream(&mut self) -> Result<()> {
        use StructureState as St;

        self.stack.set_top(St::ObjectEndobj);
        let declared = self.dict.stream_length.take();
        match declared {
            Some(length) if self.trust_declared_length => {
                trace!(length, "stream payload by declared length");
                self.skip.start_counted(length);
                self.stack.push(St::StreamStart)
            }
            _ => {
                trace!("stream payload by endstream search");
                self.skip.start_search();
                self.stack.push(St::StreamSearch)
            }
        }
    }

    fn on_dict(&mut self, token: Token) -> Result<()> {
        use StructureState as St;

        let top_level = self.dict.at_top_level();
        match token {
            Token::DictOpen => {
                self.dict.depth += 1;
                self.stack.push(St::CompositeDict)?;
            }
            Token::DictClose => {
                self.dict.depth = self.dict.depth.saturating_sub(1);
                self.stack.pop()?;
            }
            Token::ArrayOpen => self.stack.push(St::CompositeArray)?,
            Token::ProcOpen => self.stack.push(St::CompositeProc)?,
            Token::Name if top_level => self.dict.on_name(self.lexer.text()),
            Token::Integer(value) if top_level => self.dict.on_integer(value),
            Token::Real(_) if top_level => self.dict.on_real(),
            _ if top_level => self.dict.on_other(),
            _ => {}
        }
        Ok(())
    }

    /// Arrays and procedures: only nesting matters.
    fn on_nested(&mut self, token: Token, close: Token) -> Result<()> {
        use StructureState as St;

        match token {
            t if t == close => {
                self.stack.pop()?;
            }
            Token::DictOpen => {
                self.dict.depth += 1;
                self.stack.push(St::CompositeDict)?;
            }
            Token::ArrayOpen => self.stack.push(St::CompositeArray)?,
            Token::ProcOpen => self.stack.push(St::CompositeProc)?,
            _ => {}
        }
        Ok(())
    }

    fn on_incremental(&mut self, token: Token) -> Option<FeedStatus> {
        use StructureState as St;

        match token {
            Token::Comment => {
                let text = self.lexer.text();
                if text.starts_with(b"PDF-") || text.starts_with(b"!PS") {
                    debug!(length = ?self.pdf_length, "next job begins");
                    return Some(FeedStatus::EndOfJob);
                }
                None
            }
            // Objects of an incremental update.
            Token::Integer(_) => {
                self.stack.set_top(St::ObjectGen);
                None
            }
            _ if self.is_keyword(token, b"xref") => {
                debug!("incremental update xref");
                self.stack.set_top(St::Xref);
                None
            }
            _ if self.is_keyword(token, b"trailer") => {
                self.stack.set_top(St::Trailer);
                None
            }
            _ if self.is_keyword(token, b"startxref") => {
                self.stack.set_top(St::TrailerEof);
                None
            }
            _ => {
                debug!(?token, length = ?self.pdf_length, "unexpected token after %%EOF");
                Some(FeedStatus::EndOfJob)
            }
        }
    }

    fn record_eof<S: SpoolSink + ?Sized>(&mut self, length: u64, sink: &mut S) {
        debug!(length, "%%EOF recorded");
        self.pdf_length = Some(length);
        sink.report_pdf_length(length);
        self.stack.set_top(StructureState::Incremental);
    }
}

/// `PDF-<digits>.<digits>`, optionally followed by whitespace.
pub fn is_pdf_header(text: &Accumulator) -> bool {
    let Some(rest) = text.as_bytes().strip_prefix(b"PDF-") else {
        return false;
    };
    let major = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if major == 0 {
        return false;
    }
    let Some(rest) = rest[major..].strip_prefix(b".") else {
        return false;
    };
    let minor = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if minor == 0 {
        return false;
    }
    match rest.get(minor) {
        None => !text.is_truncated(),
        Some(&b) => is_whitespace(b),
    }
}

/// Whether a partial header comment can still become `PDF-`.
fn header_prefix_plausible(text: &Accumulator) -> bool {
    let seen = text.as_bytes();
    let n = seen.len().min(4);
    seen[..n] == b"PDF-"[..n]
}

/// `%EOF` (the comment text of `%%EOF`), optionally followed by whitespace.
pub fn is_eof_marker(text: &Accumulator) -> bool {
    text.starts_with_then_whitespace(b"%EOF")
}
