//! WebAssembly Store - the registry of addressable runtime objects
//!
//! The Store owns every function, memory and global instance and hands out
//! globally-unique addresses for them. A [`Configuration`] borrows the Store
//! for the duration of one invocation: it resolves callees through it, and
//! instructions read and write memories and globals through it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Store                     │
//! │  functions: FuncAddr   -> FunctionInstance   │
//! │  memories:  MemoryAddr -> Memory             │
//! │  globals:   GlobalAddr -> Global             │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Function instances are reference counted so a callee can be resolved and
//! run while the Store itself stays mutably borrowed by the Configuration.

use super::configuration::Configuration;
use super::instruction::{self, FunctionType, Instruction, LinkError};
use super::interpreter::BytecodeInterpreter;
use super::{ExecutionResult, Memory, Trap, Value, ValueType};
use std::fmt;
use std::rc::Rc;

/// Type alias for host function implementations
///
/// Host functions receive the calling configuration so they can re-enter the
/// engine or access the store.
pub type HostFunc = Box<dyn Fn(&mut Configuration<'_>, &[Value]) -> Result<Vec<Value>, Trap>>;

/// Global function address - index into the Store's function space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncAddr(pub usize);

/// Global memory address - index into the Store's memory registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryAddr(pub usize);

/// Global address - index into the Store's global registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalAddr(pub usize);

/// A function instance in the Store
pub enum FunctionInstance {
    /// WebAssembly function
    Wasm {
        func_type: FunctionType,
        /// Declared locals, following the parameters
        locals: Vec<ValueType>,
        body: Rc<[Instruction]>,
    },
    /// Host function - native Rust function
    Host { func_type: FunctionType, func: HostFunc },
}

impl FunctionInstance {
    pub fn func_type(&self) -> &FunctionType {
        match self {
            FunctionInstance::Wasm { func_type, .. } => func_type,
            FunctionInstance::Host { func_type, .. } => func_type,
        }
    }
}

impl fmt::Debug for FunctionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionInstance::Wasm { func_type, locals, body } => f
                .debug_struct("Wasm")
                .field("func_type", func_type)
                .field("locals", locals)
                .field("body_len", &body.len())
                .finish(),
            FunctionInstance::Host { func_type, .. } => f
                .debug_struct("Host")
                .field("func_type", func_type)
                .finish_non_exhaustive(),
        }
    }
}

/// A global variable instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Global {
    pub value: Value,
    pub mutable: bool,
}

/// The WebAssembly Store
#[derive(Debug, Default)]
pub struct Store {
    functions: Vec<Rc<FunctionInstance>>,
    memories: Vec<Memory>,
    globals: Vec<Global>,
}

impl Store {
    /// Create a new empty Store
    pub fn new() -> Self {
        Store::default()
    }

    /// Allocate a function in the Store and return its address
    pub fn allocate_function(&mut self, func: FunctionInstance) -> FuncAddr {
        let addr = FuncAddr(self.functions.len());
        self.functions.push(Rc::new(func));
        addr
    }

    /// The address the next allocated function will receive
    ///
    /// Lets a body refer to itself (recursion) before it is allocated.
    pub fn next_function_addr(&self) -> FuncAddr {
        FuncAddr(self.functions.len())
    }

    /// Link `body` and allocate it as a WebAssembly function
    pub fn allocate_wasm_function(
        &mut self,
        func_type: FunctionType,
        locals: Vec<ValueType>,
        body: Vec<Instruction>,
    ) -> Result<FuncAddr, LinkError> {
        let body = instruction::link(body)?;
        Ok(self.allocate_function(FunctionInstance::Wasm { func_type, locals, body }))
    }

    /// Allocate a host function
    pub fn allocate_host_function(
        &mut self,
        func_type: FunctionType,
        func: impl Fn(&mut Configuration<'_>, &[Value]) -> Result<Vec<Value>, Trap> + 'static,
    ) -> FuncAddr {
        self.allocate_function(FunctionInstance::Host {
            func_type,
            func: Box::new(func),
        })
    }

    /// Resolve a function address
    pub fn function(&self, addr: FuncAddr) -> Option<Rc<FunctionInstance>> {
        self.functions.get(addr.0).cloned()
    }

    /// Allocate a memory in the Store and return its address
    pub fn allocate_memory(&mut self, memory: Memory) -> MemoryAddr {
        let addr = MemoryAddr(self.memories.len());
        self.memories.push(memory);
        addr
    }

    pub fn memory(&self, addr: MemoryAddr) -> Option<&Memory> {
        self.memories.get(addr.0)
    }

    pub fn memory_mut(&mut self, addr: MemoryAddr) -> Option<&mut Memory> {
        self.memories.get_mut(addr.0)
    }

    /// Allocate a global in the Store and return its address
    pub fn allocate_global(&mut self, value: Value, mutable: bool) -> GlobalAddr {
        let addr = GlobalAddr(self.globals.len());
        self.globals.push(Global { value, mutable });
        addr
    }

    pub fn global(&self, addr: GlobalAddr) -> Option<&Global> {
        self.globals.get(addr.0)
    }

    pub fn global_mut(&mut self, addr: GlobalAddr) -> Option<&mut Global> {
        self.globals.get_mut(addr.0)
    }

    /// Call a function with the default engine settings and interpreter
    pub fn invoke(&mut self, addr: FuncAddr, args: Vec<Value>) -> ExecutionResult {
        let mut interpreter = BytecodeInterpreter::new();
        Configuration::new(self).call(&mut interpreter, addr, args)
    }
}
