//! Labels for structured control flow
//!
//! See: <https://webassembly.github.io/spec/core/exec/runtime.html#labels>
//!
//! From the WebAssembly specification:
//! > "Labels carry an arity n and their associated branch target, which is expressed
//! > syntactically as an instruction sequence"
//!
//! Labels live on the run-time stack interleaved with values and frames. The
//! branch target is kept as an instruction offset into the current frame's body.

use super::instruction::InstructionPointer;
use std::fmt;

/// A branch target on the run-time stack
///
/// The continuation depends on the construct that pushed the label:
/// - `block`/`if`: the instruction following the matching `end`
/// - `loop`: the `loop` instruction itself, which re-establishes the label
/// - a function frame: the end of the body, so branching there returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    arity: usize,
    continuation: InstructionPointer,
}

impl Label {
    pub fn new(arity: usize, continuation: InstructionPointer) -> Self {
        Label { arity, continuation }
    }

    /// Number of values carried when branching to this label
    ///
    /// From the WebAssembly specification (4.4.8 br l):
    /// > "Let n be the arity of L"
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Where execution resumes after a branch to this label
    pub fn continuation(&self) -> InstructionPointer {
        self.continuation
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label(arity: {}, continuation: {})", self.arity, self.continuation)
    }
}
