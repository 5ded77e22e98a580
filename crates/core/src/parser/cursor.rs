//! Read position over one caller-supplied chunk.

/// A bounds-checked position over a borrowed chunk.
///
/// Lives for exactly one `feed` call. Supports one byte of put-back,
/// which is all the lookahead the scanners need.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Take the current byte and advance past it.
    #[inline]
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Step back over the byte most recently taken.
    #[inline]
    pub fn put_back(&mut self) {
        debug_assert!(self.pos > 0, "put_back at start of chunk");
        self.pos = self.pos.saturating_sub(1);
    }

    /// Advance by up to `n` bytes, returning how many were skipped.
    pub fn advance(&mut self, n: usize) -> usize {
        let n = n.min(self.remaining());
        self.pos += n;
        n
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}
