//! Lexical classes of PDF bytes.
//!
//! The table is built at compile time; lookups are a single index.

use bitflags::bitflags;

bitflags! {
    /// Lexical class flags for a single byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// A byte with neither `DELIMITER` nor `WHITESPACE` is regular.
    pub struct ByteClass: u8 {
        const DELIMITER = 1 << 0;
        const WHITESPACE = 1 << 1;
        const DIGIT = 1 << 2;
        /// CR or LF.
        const EOL = 1 << 3;
        const HEX_DIGIT = 1 << 4;
    }
}

const fn class_of(b: u8) -> ByteClass {
    let mut class = match b {
        0x00 | b'\t' | b'\x0c' | b' ' => ByteClass::WHITESPACE,
        b'\r' | b'\n' => ByteClass::WHITESPACE.union(ByteClass::EOL),
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' => {
            ByteClass::DELIMITER
        }
        _ => ByteClass::empty(),
    };
    if b.is_ascii_digit() {
        class = class.union(ByteClass::DIGIT);
    }
    if b.is_ascii_hexdigit() {
        class = class.union(ByteClass::HEX_DIGIT);
    }
    class
}

static CLASS_TABLE: [ByteClass; 256] = {
    let mut table = [ByteClass::empty(); 256];
    let mut i = 0;
    while i < 256 {
        table[i] = class_of(i as u8);
        i += 1;
    }
    table
};

/// Look up the class flags of `b`.
#[inline]
pub fn classify(b: u8) -> ByteClass {
    CLASS_TABLE[b as usize]
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    classify(b).contains(ByteClass::WHITESPACE)
}

#[inline]
pub fn is_regular(b: u8) -> bool {
    !classify(b).intersects(ByteClass::DELIMITER.union(ByteClass::WHITESPACE))
}

#[inline]
pub fn is_digit(b: u8) -> bool {
    classify(b).contains(ByteClass::DIGIT)
}

#[inline]
pub fn is_eol(b: u8) -> bool {
    classify(b).contains(ByteClass::EOL)
}

/// Value of a hex digit, or `None` for any other byte.
#[inline]
pub fn hex_value(b: u8) -> Option<u8> {
    let class = classify(b);
    if !class.contains(ByteClass::HEX_DIGIT) {
        return None;
    }
    if class.contains(ByteClass::DIGIT) {
        Some(b - b'0')
    } else {
        Some((b | 0x20) - b'a' + 10)
    }
}
