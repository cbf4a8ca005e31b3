//! WebAssembly abstract machine
//!
//! This module provides the execution engine: the run-time stack of values,
//! labels and frames, the [`Configuration`] that owns call/branch/unwind
//! semantics, and a reference [`BytecodeInterpreter`] dispatch table.

pub mod config;
pub mod configuration;
pub mod control;
pub mod frame;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod store;
pub mod test_utils;
pub mod value;

pub use config::{ConfigError, EngineConfig};
pub use configuration::{CallFrameHandle, Configuration, ExecutionStats};
pub use control::Label;
pub use frame::Frame;
pub use instruction::{BlockType, FunctionType, Instruction, InstructionPointer, LinkError};
pub use interpreter::{BytecodeInterpreter, Flow, Interpreter};
pub use memory::{Memory, MemoryError};
pub use stack::{Entry, Stack};
pub use store::{FuncAddr, FunctionInstance, Global, GlobalAddr, MemoryAddr, Store};
pub use value::{Value, ValueType};

/// Outcome of calling a function - either its results or the trap that ended it
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// Execution completed with these return values
    Values(Vec<Value>),
    /// Execution was aborted by a trap
    Trap(Trap),
}

impl ExecutionResult {
    pub fn is_trap(&self) -> bool {
        matches!(self, ExecutionResult::Trap(_))
    }

    /// The returned values, if execution completed
    pub fn values(&self) -> Option<&[Value]> {
        match self {
            ExecutionResult::Values(values) => Some(values),
            ExecutionResult::Trap(_) => None,
        }
    }

    /// The trap, if execution was aborted
    pub fn trap(&self) -> Option<&Trap> {
        match self {
            ExecutionResult::Values(_) => None,
            ExecutionResult::Trap(trap) => Some(trap),
        }
    }

    pub fn into_result(self) -> Result<Vec<Value>, Trap> {
        self.into()
    }
}

impl From<Result<Vec<Value>, Trap>> for ExecutionResult {
    fn from(result: Result<Vec<Value>, Trap>) -> Self {
        match result {
            Ok(values) => ExecutionResult::Values(values),
            Err(trap) => ExecutionResult::Trap(trap),
        }
    }
}

impl From<ExecutionResult> for Result<Vec<Value>, Trap> {
    fn from(result: ExecutionResult) -> Self {
        match result {
            ExecutionResult::Values(values) => Ok(values),
            ExecutionResult::Trap(trap) => Err(trap),
        }
    }
}

/// Abnormal termination of a call chain
///
/// Traps are carried upward through every enclosing call unchanged. Variants
/// marked as invariant violations only occur for input that would not have
/// passed validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Trap {
    #[error("function not found")]
    FunctionNotFound(FuncAddr),
    #[error("argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCountMismatch { expected: usize, actual: usize },
    #[error("call stack exhausted")]
    CallStackExhausted,
    #[error("result arity mismatch: expected {expected} values, got {actual}")]
    ResultArityMismatch { expected: usize, actual: usize },
    #[error("configuration already trapped")]
    Poisoned,

    // Invariant violations
    #[error("invalid label index {0}")]
    InvalidLabel(u32),
    #[error("no active call frame")]
    NoActiveFrame,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: ValueType, actual: ValueType },
    #[error("local variable index out of bounds: {0}")]
    LocalIndexOutOfBounds(u32),
    #[error("global not found: {0:?}")]
    GlobalNotFound(GlobalAddr),
    #[error("cannot set immutable global {0:?}")]
    ImmutableGlobal(GlobalAddr),
    #[error("memory not found: {0:?}")]
    MemoryNotFound(MemoryAddr),

    // Instruction traps
    #[error("unreachable")]
    Unreachable,
    #[error("integer divide by zero")]
    IntegerDivideByZero,
    #[error("integer overflow")]
    IntegerOverflow,
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,
    #[error("{0}")]
    Host(String),
}
