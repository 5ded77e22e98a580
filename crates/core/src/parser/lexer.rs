//! Resumable PDF tokenizer.
//!
//! `Lexer::next_token` consumes bytes from a [`Cursor`] until either a
//! token completes or the chunk runs out. In the latter case every piece
//! of partial progress (string nesting, name escapes, numeric digits)
//! stays in the lexer, so the next chunk continues the same token. Bytes
//! are never referenced across calls; token text is copied into the
//! [`Accumulator`].

use tracing::trace;

use super::accumulator::Accumulator;
use super::classify::{hex_value, is_digit, is_regular, is_whitespace};
use super::cursor::Cursor;

/// Significant-digit count at which an integer may no longer fit in 32 bits.
const INT_PROMOTION_DIGITS: u32 = 10;

/// A completed PDF lexical token.
///
/// Text of comments, names and keywords is left in the lexer's
/// accumulator until the next token starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    /// `%...` up to and including the line terminator; text excludes the `%`.
    Comment,
    /// `(...)`; content is not retained.
    LiteralString,
    /// `<...>`; content is not retained.
    HexString,
    /// `/Name`; text is the decoded name without the slash.
    Name,
    Integer(i32),
    Real(f64),
    /// Any other run of regular bytes (`obj`, `endstream`, `R`, `true`...).
    Keyword,
    DictOpen,
    DictClose,
    ArrayOpen,
    ArrayClose,
    ProcOpen,
    ProcClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Comment { after_cr: bool },
    LiteralString { depth: u32, escape: bool, octal_digits: u8 },
    HexString,
    /// Saw `<`; the next byte decides between `<<` and a hex string.
    DictOpenPending,
    /// Saw `>`; a second `>` is swallowed if present.
    DictClosePending,
    /// Name (`name == true`), number or keyword.
    Regular { name: bool },
}

/// Progress through a `#hh` escape inside a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameEscape {
    None,
    Hash,
    High { raw: u8, value: u8 },
}

/// Numeric interpretation of a regular token, tracked byte by byte.
#[derive(Debug, Clone, Copy)]
struct NumberState {
    possible: bool,
    negative: bool,
    seen_sign_or_digit: bool,
    seen_point: bool,
    /// Digits ignoring leading zeros of the integer part.
    significant: u32,
    digits: u32,
    frac_digits: u32,
    int_acc: i64,
    real_acc: f64,
}

impl Default for NumberState {
    fn default() -> Self {
        Self {
            possible: true,
            negative: false,
            seen_sign_or_digit: false,
            seen_point: false,
            significant: 0,
            digits: 0,
            frac_digits: 0,
            int_acc: 0,
            real_acc: 0.0,
        }
    }
}

impl NumberState {
    fn feed(&mut self, b: u8) {
        if !self.possible {
            return;
        }
        match b {
            b'+' | b'-' if !self.seen_sign_or_digit && !self.seen_point => {
                self.negative = b == b'-';
                self.seen_sign_or_digit = true;
            }
            b'.' if !self.seen_point => self.seen_point = true,
            _ if is_digit(b) => {
                let d = b - b'0';
                self.seen_sign_or_digit = true;
                self.digits += 1;
                if self.seen_point {
                    self.frac_digits += 1;
                } else if self.significant > 0 || d != 0 {
                    self.significant += 1;
                }
                if !self.seen_point && self.significant <= INT_PROMOTION_DIGITS {
                    self.int_acc = self.int_acc * 10 + i64::from(d);
                }
                self.real_acc = self.real_acc * 10.0 + f64::from(d);
            }
            _ => self.possible = false,
        }
    }

    /// Resolve to a numeric token, or `None` if the text is not a number.
    fn resolve(&self) -> Option<Token> {
        if !self.possible || self.digits == 0 {
            return None;
        }
        let sign = if self.negative { -1.0 } else { 1.0 };
        if self.seen_point {
            let value = self.real_acc / 10f64.powi(self.frac_digits as i32);
            return Some(Token::Real(sign * value));
        }
        if self.significant > INT_PROMOTION_DIGITS {
            return Some(Token::Real(sign * self.real_acc));
        }
        let value = if self.negative {
            -self.int_acc
        } else {
            self.int_acc
        };
        match i32::try_from(value) {
            Ok(v) => Some(Token::Integer(v)),
            Err(_) => Some(Token::Real(value as f64)),
        }
    }
}

/// Resumable tokenizer state.
#[derive(Debug, Clone)]
pub struct Lexer {
    state: ScanState,
    text: Accumulator,
    number: NumberState,
    escape: NameEscape,
    last: Option<Token>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            text: Accumulator::new(),
            number: NumberState::default(),
            escape: NameEscape::None,
            last: None,
        }
    }

    /// Whether no token is partially scanned.
    pub fn is_idle(&self) -> bool {
        self.state == ScanState::Idle
    }

    /// Whether the partially scanned token is a comment.
    pub fn in_comment(&self) -> bool {
        matches!(self.state, ScanState::Comment { .. })
    }

    /// Text of the token most recently completed or in progress.
    pub fn text(&self) -> &Accumulator {
        &self.text
    }

    /// The most recently completed token.
    pub fn last_token(&self) -> Option<Token> {
        self.last
    }

    /// Drop any partial token.
    pub fn reset(&mut self) {
        self.state = ScanState::Idle;
        self.text.reset();
        self.escape = NameEscape::None;
        self.number = NumberState::default();
    }

    /// Skip whitespace and return the next byte without consuming it.
    ///
    /// Only meaningful between tokens.
    pub fn peek_significant(&self, cur: &mut Cursor<'_>) -> Option<u8> {
        debug_assert!(self.is_idle());
        while let Some(b) = cur.peek() {
            if !is_whitespace(b) {
                return Some(b);
            }
            cur.advance(1);
        }
        None
    }

    /// Scan the next token, or `None` if `cur` ran out first.
    pub fn next_token(&mut self, cur: &mut Cursor<'_>) -> Option<Token> {
        loop {
            let done = match self.state {
                ScanState::Idle => {
                    let b = cur.next_byte()?;
                    if is_whitespace(b) {
                        continue;
                    }
                    self.begin(b)
                }
                ScanState::Comment { after_cr } => self.scan_comment(cur, after_cr),
                ScanState::LiteralString {
                    depth,
                    escape,
                    octal_digits,
                } => self.scan_literal_string(cur, depth, escape, octal_digits),
                ScanState::HexString => self.scan_hex_string(cur),
                ScanState::DictOpenPending => self.scan_dict_open(cur),
                ScanState::DictClosePending => self.scan_dict_close(cur),
                ScanState::Regular { name } => self.scan_regular(cur, name),
            };
            match done {
                Some(token) => return Some(self.complete(token)),
                None if cur.is_empty() => return None,
                None => {}
            }
        }
    }

    /// Complete whatever token end-of-input interrupted.
    ///
    /// Comments, names, numbers, keywords and a lone `>` are complete
    /// without their terminator; unterminated strings are dropped.
    pub fn finish(&mut self) -> Option<Token> {
        let token = match self.state {
            ScanState::Comment { .. } => Some(Token::Comment),
            ScanState::DictClosePending => Some(Token::DictClose),
            ScanState::Regular { name } => Some(self.finish_regular(name)),
            ScanState::Idle
            | ScanState::LiteralString { .. }
            | ScanState::HexString
            | ScanState::DictOpenPending => None,
        };
        self.state = ScanState::Idle;
        token.map(|t| self.complete(t))
    }

    fn complete(&mut self, token: Token) -> Token {
        self.state = ScanState::Idle;
        self.last = Some(token);
        trace!(?token, text = ?String::from_utf8_lossy(self.text.as_bytes()), "token");
        token
    }

    /// Start a token whose first byte is `b`. Single-byte tokens
    /// complete immediately.
    fn begin(&mut self, b: u8) -> Option<Token> {
        self.text.reset();
        match b {
            b'%' => {
                self.state = ScanState::Comment { after_cr: false };
                None
            }
            b'(' => {
                self.state = ScanState::LiteralString {
                    depth: 1,
                    escape: false,
                    octal_digits: 0,
                };
                None
            }
            b'<' => {
                self.state = ScanState::DictOpenPending;
                None
            }
            b'>' => {
                self.state = ScanState::DictClosePending;
                None
            }
            b'[' => Some(Token::ArrayOpen),
            b']' => Some(Token::ArrayClose),
            b'{' => Some(Token::ProcOpen),
            b'}' => Some(Token::ProcClose),
            b')' => {
                // Stray closing paren: report it as a one-byte keyword.
                self.text.push(b);
                Some(Token::Keyword)
            }
            b'/' => {
                self.start_regular(true);
                None
            }
            _ => {
                self.start_regular(false);
                self.number.feed(b);
                self.text.push(b);
                None
            }
        }
    }

    fn start_regular(&mut self, name: bool) {
        self.state = ScanState::Regular { name };
        self.number = NumberState::default();
        self.escape = NameEscape::None;
    }

    fn scan_comment(&mut self, cur: &mut Cursor<'_>, mut after_cr: bool) -> Option<Token> {
        while let Some(b) = cur.next_byte() {
            if after_cr {
                // Only the first CR/LF pair belongs to the comment.
                if b != b'\n' {
                    cur.put_back();
                }
                return Some(Token::Comment);
            }
            match b {
                b'\n' => return Some(Token::Comment),
                b'\r' => {
                    after_cr = true;
                    self.state = ScanState::Comment { after_cr };
                }
                _ => self.text.push(b),
            }
        }
        None
    }

    fn scan_literal_string(
        &mut self,
        cur: &mut Cursor<'_>,
        mut depth: u32,
        mut escape: bool,
        mut octal_digits: u8,
    ) -> Option<Token> {
        let mut finished = false;
        while let Some(b) = cur.next_byte() {
            if octal_digits > 0 {
                if octal_digits < 3 && matches!(b, b'0'..=b'7') {
                    octal_digits += 1;
                    continue;
                }
                octal_digits = 0;
            }
            if escape {
                escape = false;
                if matches!(b, b'0'..=b'7') {
                    octal_digits = 1;
                }
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        finished = true;
                        break;
                    }
                }
                _ => {}
            }
        }
        self.state = ScanState::LiteralString {
            depth,
            escape,
            octal_digits,
        };
        finished.then_some(Token::LiteralString)
    }

    fn scan_hex_string(&mut self, cur: &mut Cursor<'_>) -> Option<Token> {
        while let Some(b) = cur.next_byte() {
            if b == b'>' {
                return Some(Token::HexString);
            }
        }
        None
    }

    fn scan_dict_open(&mut self, cur: &mut Cursor<'_>) -> Option<Token> {
        let b = cur.next_byte()?;
        if b == b'<' {
            return Some(Token::DictOpen);
        }
        // The first '<' opened a hex string; rescan `b` as its content.
        cur.put_back();
        self.state = ScanState::HexString;
        None
    }

    fn scan_dict_close(&mut self, cur: &mut Cursor<'_>) -> Option<Token> {
        let b = cur.next_byte()?;
        if b != b'>' {
            cur.put_back();
        }
        Some(Token::DictClose)
    }

    fn scan_regular(&mut self, cur: &mut Cursor<'_>, name: bool) -> Option<Token> {
        while let Some(b) = cur.next_byte() {
            if name {
                match self.scan_name_byte(cur, b) {
                    NameStep::Continue => continue,
                    NameStep::End => return Some(self.finish_regular(true)),
                }
            }
            if !is_regular(b) {
                cur.put_back();
                return Some(self.finish_regular(false));
            }
            self.number.feed(b);
            self.text.push(b);
        }
        None
    }

    fn scan_name_byte(&mut self, cur: &mut Cursor<'_>, b: u8) -> NameStep {
        match self.escape {
            NameEscape::Hash => match hex_value(b) {
                Some(value) => {
                    self.escape = NameEscape::High { raw: b, value };
                    return NameStep::Continue;
                }
                // Not an escape: the '#' is dropped and `b` read normally.
                None => self.escape = NameEscape::None,
            },
            NameEscape::High { raw, value } => match hex_value(b) {
                Some(low) => {
                    let decoded = (value << 4) | low;
                    self.escape = NameEscape::None;
                    match decoded {
                        // #00 is not a legal escape; it ends the name.
                        0 => return NameStep::End,
                        // An escaped '#' starts another escape.
                        b'#' => self.escape = NameEscape::Hash,
                        _ => self.text.push(decoded),
                    }
                    return NameStep::Continue;
                }
                None => {
                    self.escape = NameEscape::None;
                    self.text.push(raw);
                }
            },
            NameEscape::None => {}
        }
        if !is_regular(b) {
            cur.put_back();
            return NameStep::End;
        }
        if b == b'#' {
            self.escape = NameEscape::Hash;
        } else {
            self.text.push(b);
        }
        NameStep::Continue
    }

    fn finish_regular(&mut self, name: bool) -> Token {
        if name {
            if let NameEscape::High { raw, .. } = self.escape {
                self.text.push(raw);
            }
            self.escape = NameEscape::None;
            return Token::Name;
        }
        self.number.resolve().unwrap_or(Token::Keyword)
    }
}

enum NameStep {
    Continue,
    End,
}
