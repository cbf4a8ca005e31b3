//! WebAssembly operation implementations
//!
//! This module contains the handlers behind [`super::BytecodeInterpreter`],
//! organized by category according to the WebAssembly specification.

pub mod control;
pub mod memory;
pub mod numeric;
pub mod parametric;
pub mod variable;

// Re-export commonly used types for operation implementations
pub(crate) use crate::runtime::configuration::Configuration;
pub(crate) use crate::runtime::interpreter::Flow;
pub(crate) use crate::runtime::stack::Stack;
pub(crate) use crate::runtime::store::Store;
pub(crate) use crate::runtime::{Trap, Value};
