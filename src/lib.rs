//! The execution core of a WebAssembly abstract machine.
//!
//! wasm-machine runs already-validated instruction sequences against a
//! stack-based virtual machine and produces either result values or a trap.
//! It provides the run-time stack of values, labels and frames, the
//! [`runtime::Configuration`] that owns call, branch and unwind semantics, the
//! [`runtime::CallFrameHandle`] scope guard, and a reference
//! [`runtime::BytecodeInterpreter`] for a small instruction set.
//!
//! # Modules
//!
//! - [`runtime`] -- Stack, configuration, interpreter, store, memory and instruction handlers.
//!
//! # Example
//!
//! Allocate a function in a store and call it:
//!
//! ```
//! use wasm_machine::runtime::{FunctionType, Instruction, Store, Value, ValueType};
//!
//! let mut store = Store::new();
//! let add = store
//!     .allocate_wasm_function(
//!         FunctionType::new(vec![ValueType::I32, ValueType::I32], vec![ValueType::I32]),
//!         vec![],
//!         vec![
//!             Instruction::LocalGet { local_idx: 0 },
//!             Instruction::LocalGet { local_idx: 1 },
//!             Instruction::I32Add,
//!         ],
//!     )
//!     .unwrap();
//!
//! let result = store.invoke(add, vec![Value::I32(2), Value::I32(3)]);
//! assert_eq!(result.values(), Some(&[Value::I32(5)][..]));
//! ```
//!
//! # Specification
//!
//! Execution follows the [WebAssembly specification](https://webassembly.github.io/spec/core/)
//! section 4.4 (Instructions) and 4.5.3 (Function Calls) for the instructions
//! it bundles.

pub mod runtime;
