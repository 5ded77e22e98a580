//! Session parameters.
//!
//! Contains JobParams for controlling how a parse session treats
//! declared lengths, leading whitespace and nesting depth.

use crate::parser::structure::MAX_STRUCTURE_DEPTH;

/// Parameters for a [`crate::ParseSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobParams {
    /// Structure stack bound. Clamped to `1..=32`; deeper nesting is a
    /// parse error.
    pub max_depth: usize,

    /// Skip stream payloads by their declared `/Length` when one was
    /// captured. When false every payload is found by searching for
    /// `endstream`.
    pub trust_declared_length: bool,

    /// Tolerate whitespace before the `%PDF-` header.
    pub skip_leading_whitespace: bool,
}

impl Default for JobParams {
    fn default() -> Self {
        Self {
            max_depth: MAX_STRUCTURE_DEPTH,
            trust_declared_length: true,
            skip_leading_whitespace: true,
        }
    }
}

impl JobParams {
    /// Creates parameters with the given values, clamping `max_depth`.
    pub fn new(max_depth: usize, trust_declared_length: bool, skip_leading_whitespace: bool) -> Self {
        Self {
            max_depth: max_depth.clamp(1, MAX_STRUCTURE_DEPTH),
            trust_declared_length,
            skip_leading_whitespace,
        }
    }
}
