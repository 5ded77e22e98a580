//! Skipping `stream ... endstream` payloads without buffering them.
//!
//! Two strategies:
//! - counted: discard exactly the declared `/Length` bytes;
//! - search: Boyer-Moore-Horspool for the literal `endstream`, with a
//!   small lookback buffer so a match may straddle two chunks.

use super::cursor::Cursor;

/// The keyword that ends a stream payload.
pub const ENDSTREAM: &[u8; 9] = b"endstream";

const PATTERN_LEN: usize = ENDSTREAM.len();
const LAST: usize = PATTERN_LEN - 1;

/// Bad-character shifts for [`ENDSTREAM`].
static SKIP_TABLE: [u8; 256] = {
    let mut table = [PATTERN_LEN as u8; 256];
    let mut i = 0;
    while i < LAST {
        table[ENDSTREAM[i] as usize] = (LAST - i) as u8;
        i += 1;
    }
    table
};

/// Shift for the byte aligned with the end of the pattern.
#[inline]
pub fn skip_for(b: u8) -> usize {
    SKIP_TABLE[b as usize] as usize
}

/// Horspool scan over a haystack addressed through `at`.
///
/// `end` is the index of the last byte of the first candidate window.
/// Returns the index just past a match, or the end index of the next
/// window to try, which is always beyond `len`.
fn horspool(len: usize, at: impl Fn(usize) -> u8, mut end: usize) -> Result<usize, usize> {
    while end < len {
        let mut k = 0;
        while k < PATTERN_LEN && at(end - k) == ENDSTREAM[LAST - k] {
            k += 1;
        }
        if k == PATTERN_LEN {
            return Ok(end + 1);
        }
        end += skip_for(at(end));
    }
    Err(end)
}

/// Find `endstream` in a single slice, returning the index past the match.
pub fn find_endstream(data: &[u8]) -> Option<usize> {
    horspool(data.len(), |i| data[i], LAST).ok()
}

/// Progress through one stream payload, carried across chunks.
#[derive(Debug, Clone, Default)]
pub struct StreamSkip {
    remaining: u64,
    eol_cr: bool,
    carry: [u8; LAST],
    carry_len: usize,
}

impl StreamSkip {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the counted path for a payload of `length` bytes.
    pub fn start_counted(&mut self, length: u64) {
        self.remaining = length;
        self.eol_cr = false;
        self.carry_len = 0;
    }

    /// Arm the search path, forgetting any partial match.
    pub fn start_search(&mut self) {
        self.remaining = 0;
        self.eol_cr = false;
        self.carry_len = 0;
    }

    /// Payload bytes still to discard on the counted path.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether a candidate match is pending across a chunk boundary.
    pub fn is_spanning(&self) -> bool {
        self.carry_len > 0
    }

    /// Consume the line terminator that follows the `stream` keyword.
    ///
    /// CR LF and LF are terminators. A CR followed by anything else
    /// counts both bytes as payload. Returns `true` once aligned.
    pub fn align_eol(&mut self, cur: &mut Cursor<'_>) -> bool {
        while let Some(b) = cur.next_byte() {
            if self.eol_cr {
                self.eol_cr = false;
                if b != b'\n' {
                    self.remaining = self.remaining.saturating_sub(2);
                }
                return true;
            }
            match b {
                b'\n' => return true,
                b'\r' => self.eol_cr = true,
                _ => {
                    cur.put_back();
                    return true;
                }
            }
        }
        false
    }

    /// Discard declared payload bytes. Returns `true` when all are gone.
    pub fn consume_counted(&mut self, cur: &mut Cursor<'_>) -> bool {
        let want = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        let taken = cur.advance(want);
        self.remaining -= taken as u64;
        self.remaining == 0
    }

    /// Search for `endstream`. On success the cursor is left just past
    /// the keyword and `true` is returned; otherwise the whole chunk is
    /// consumed and any undecided tail is kept for the next chunk.
    pub fn search(&mut self, cur: &mut Cursor<'_>) -> bool {
        let data = cur.rest();
        let carry_len = self.carry_len;
        let total = carry_len + data.len();

        let outcome = if carry_len == 0 {
            horspool(data.len(), |i| data[i], LAST)
        } else {
            let carry = &self.carry[..carry_len];
            horspool(
                total,
                |i| {
                    if i < carry_len {
                        carry[i]
                    } else {
                        data[i - carry_len]
                    }
                },
                LAST,
            )
        };

        match outcome {
            Ok(past) => {
                cur.advance(past - carry_len);
                self.carry_len = 0;
                true
            }
            Err(next_end) => {
                let window_start = next_end - LAST;
                let mut kept = [0u8; LAST];
                let keep = total - window_start;
                for (k, slot) in kept.iter_mut().take(keep).enumerate() {
                    let i = window_start + k;
                    *slot = if i < carry_len {
                        self.carry[i]
                    } else {
                        data[i - carry_len]
                    };
                }
                self.carry = kept;
                self.carry_len = keep;
                cur.advance(data.len());
                false
            }
        }
    }
}
