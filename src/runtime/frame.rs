//! WebAssembly call frame
//!
//! Represents the activation record of one function invocation, containing
//! its locals and the body being executed.

use super::{instruction::Instruction, store::FuncAddr, Value, ValueType};
use std::fmt;
use std::rc::Rc;

/// Activation record for a function call
#[derive(Debug, Clone)]
pub struct Frame {
    /// Address of the function being executed
    pub function: FuncAddr,
    /// Local variables (parameters + declared locals)
    pub locals: Vec<Value>,
    /// Number of values this function should return
    pub arity: usize,
    /// The function body
    pub instructions: Rc<[Instruction]>,
}

impl Frame {
    pub fn new(function: FuncAddr, locals: Vec<Value>, arity: usize, instructions: Rc<[Instruction]>) -> Self {
        Frame {
            function,
            locals,
            arity,
            instructions,
        }
    }

    /// Frame for a call: the arguments followed by zeroed declared locals
    pub fn with_declared_locals(
        function: FuncAddr,
        arguments: Vec<Value>,
        declared: &[ValueType],
        arity: usize,
        instructions: Rc<[Instruction]>,
    ) -> Self {
        let mut locals = arguments;
        locals.extend(declared.iter().map(|typ| typ.zero()));
        Frame::new(function, locals, arity, instructions)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame(function: {}, arity: {}, locals: [", self.function.0, self.arity)?;
        for (i, local) in self.locals.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{local}")?;
        }
        write!(f, "])")
    }
}
