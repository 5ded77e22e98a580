//! Incremental PDF parsing modules.
//!
//! - `classify`: byte classes (whitespace, delimiter, regular)
//! - `accumulator`: fixed-capacity token text
//! - `cursor`: read position over one chunk
//! - `lexer`: resumable tokenizer
//! - `stream_skip`: discarding stream payloads by count or by search
//! - `structure`: the job-structure state machine

pub mod accumulator;
pub mod classify;
pub mod cursor;
pub mod lexer;
pub mod stream_skip;
pub mod structure;

// Re-export main types for convenience
pub use accumulator::Accumulator;
pub use classify::ByteClass;
pub use cursor::Cursor;
pub use lexer::{Lexer, Token};
pub use stream_skip::{StreamSkip, find_endstream};
pub use structure::{JobMachine, StructureStack, StructureState};
