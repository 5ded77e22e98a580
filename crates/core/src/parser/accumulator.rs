//! Fixed-capacity text buffer for the token being recognized.
//!
//! Appending past capacity silently truncates. No keyword the parser
//! compares against is longer than the capacity, so a truncated token
//! can never compare equal to one.

use super::classify::is_whitespace;

/// Capacity of the accumulator in bytes.
pub const ACCUMULATOR_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
pub struct Accumulator {
    bytes: [u8; ACCUMULATOR_CAPACITY],
    len: usize,
    truncated: bool,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    pub const fn new() -> Self {
        Self {
            bytes: [0; ACCUMULATOR_CAPACITY],
            len: 0,
            truncated: false,
        }
    }

    pub fn reset(&mut self) {
        self.len = 0;
        self.truncated = false;
    }

    /// Append one byte; a no-op once full.
    pub fn push(&mut self, b: u8) {
        if self.len < ACCUMULATOR_CAPACITY {
            self.bytes[self.len] = b;
            self.len += 1;
        } else {
            self.truncated = true;
        }
    }

    /// Append as many of `src` as still fit.
    pub fn extend_from_slice(&mut self, src: &[u8]) {
        let room = ACCUMULATOR_CAPACITY - self.len;
        let n = room.min(src.len());
        self.bytes[self.len..self.len + n].copy_from_slice(&src[..n]);
        self.len += n;
        if n < src.len() {
            self.truncated = true;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether bytes were dropped since the last reset.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Exact comparison. A truncated token never matches.
    pub fn equals(&self, literal: &[u8]) -> bool {
        !self.truncated && self.as_bytes() == literal
    }

    pub fn starts_with(&self, literal: &[u8]) -> bool {
        self.as_bytes().starts_with(literal)
    }

    /// `literal` followed by nothing, or by a whitespace byte.
    pub fn starts_with_then_whitespace(&self, literal: &[u8]) -> bool {
        if !self.starts_with(literal) {
            return false;
        }
        match self.as_bytes().get(literal.len()) {
            None => !self.truncated,
            Some(&b) => is_whitespace(b),
        }
    }
}
