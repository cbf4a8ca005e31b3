//! Execution context for one call chain
//!
//! A [`Configuration`] owns the run-time stack, the instruction pointer, the
//! index of the current frame and the call depth, and borrows the [`Store`].
//! It implements the generic machinery every instruction relies on: entering
//! and leaving frames, branching to labels, and unwinding the stack on every
//! exit path.
//!
//! ```text
//!  call(f, args)
//!    ├─ resolve f in the store, check arity and depth
//!    ├─ CallFrameHandle::new      snapshot (frame_index, stack_size, ip), depth += 1
//!    ├─ set_frame                 push Frame, push Label(arity, end of body)
//!    ├─ execute                   fetch / interpret / advance until the body ends
//!    │    └─ Flow::Call(g)        push g's Frame and Label in the same loop,
//!    │                            unwind to the caller when g's body ends
//!    └─ drop(CallFrameHandle)     unwind: truncate to stack_size, keep results,
//!                                 restore frame_index and ip, depth -= 1
//! ```
//!
//! Only host functions nest on the host stack; a chain of wasm calls of any
//! depth runs in one `execute` loop and is bounded by
//! [`EngineConfig::max_call_depth`].

use super::control::Label;
use super::frame::Frame;
use super::instruction::{Instruction, InstructionPointer};
use super::interpreter::{Flow, Interpreter};
use super::stack::{Entry, Stack};
use super::store::{FuncAddr, FunctionInstance, Store};
use super::{EngineConfig, ExecutionResult, Trap, Value};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use tracing::{debug, trace};

/// Counters accumulated over the lifetime of a configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of instructions dispatched
    pub instructions_executed: u64,
    /// Number of function calls entered (wasm and host)
    pub function_calls: u64,
    /// Number of call frames unwound
    pub unwinds: u64,
    /// Deepest call nesting reached
    pub max_depth: usize,
}

/// The mutable execution context bound to one call stack
pub struct Configuration<'s> {
    store: &'s mut Store,
    config: EngineConfig,
    stack: Stack,
    current_frame_index: usize,
    ip: InstructionPointer,
    depth: usize,
    trapped: bool,
    stats: ExecutionStats,
}

impl<'s> Configuration<'s> {
    pub fn new(store: &'s mut Store) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: &'s mut Store, config: EngineConfig) -> Self {
        Configuration {
            store,
            config,
            stack: Stack::new(),
            current_frame_index: 0,
            ip: 0,
            depth: 0,
            trapped: false,
            stats: ExecutionStats::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &*self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut *self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    /// Split borrow for instructions that move values between the stack and the store
    pub fn stack_and_store_mut(&mut self) -> (&mut Stack, &mut Store) {
        (&mut self.stack, &mut *self.store)
    }

    pub fn ip(&self) -> InstructionPointer {
        self.ip
    }

    pub fn set_ip(&mut self, ip: InstructionPointer) {
        self.ip = ip;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn current_frame_index(&self) -> usize {
        self.current_frame_index
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Whether a trap has escaped a call on this configuration
    pub fn is_trapped(&self) -> bool {
        self.trapped
    }

    /// The frame of the function currently executing
    pub fn frame(&self) -> Result<&Frame, Trap> {
        self.stack.frame(self.current_frame_index).ok_or(Trap::NoActiveFrame)
    }

    pub fn frame_mut(&mut self) -> Result<&mut Frame, Trap> {
        self.stack.frame_mut(self.current_frame_index).ok_or(Trap::NoActiveFrame)
    }

    /// Install `frame` as the current frame
    ///
    /// The frame is followed by a label whose continuation is the end of the
    /// body, so running off the end of the function behaves like a branch to
    /// that label.
    pub fn set_frame(&mut self, frame: Frame) {
        self.current_frame_index = self.stack.len();
        let label = Label::new(frame.arity, frame.instructions.len());
        self.stack.push(frame);
        self.stack.push(label);
        self.ip = 0;
    }

    /// Call the function at `address` and collect its results
    ///
    /// This is the entry point for callers outside the engine. Once a trap has
    /// been returned the configuration refuses further calls.
    pub fn call(
        &mut self,
        interpreter: &mut dyn Interpreter,
        address: FuncAddr,
        arguments: Vec<Value>,
    ) -> ExecutionResult {
        if self.trapped {
            return ExecutionResult::Trap(Trap::Poisoned);
        }

        let result = self.invoke(interpreter, address, arguments);
        if let Err(trap) = &result {
            debug!(function = address.0, depth = self.depth, %trap, "call trapped");
            self.trapped = true;
        }
        result.into()
    }

    /// Call the function at `address`, propagating traps with `?`
    ///
    /// Used by host functions and embedders for nested calls. On return the
    /// stack is exactly as it was before the call, whatever the outcome.
    pub fn invoke(
        &mut self,
        interpreter: &mut dyn Interpreter,
        address: FuncAddr,
        arguments: Vec<Value>,
    ) -> Result<Vec<Value>, Trap> {
        let function = self.store.function(address).ok_or(Trap::FunctionNotFound(address))?;
        let func_type = function.func_type();

        if arguments.len() != func_type.params.len() {
            return Err(Trap::ArgumentCountMismatch {
                expected: func_type.params.len(),
                actual: arguments.len(),
            });
        }
        self.check_depth()?;

        let arity = func_type.results.len();
        self.stats.function_calls += 1;
        trace!(function = address.0, depth = self.depth, "call");

        match &*function {
            FunctionInstance::Wasm { locals, body, .. } => {
                let frame = Frame::with_declared_locals(address, arguments, locals, arity, Rc::clone(body));

                let mut handle = CallFrameHandle::new(self);
                handle.set_frame(frame);
                handle.execute(interpreter)?;
                handle.retain_results(arity)?;
            }
            FunctionInstance::Host { func, .. } => {
                let mut handle = CallFrameHandle::new(self);
                let results = func(&mut *handle, &arguments)?;
                if results.len() != arity {
                    return Err(Trap::ResultArityMismatch {
                        expected: arity,
                        actual: results.len(),
                    });
                }
                handle.stack.push_values(results);
                handle.retain_results(arity)?;
            }
        }

        // The handle has unwound and left the results on top of the caller's stack
        self.stack.pop_values(arity)
    }

    /// Run the current frame until its body ends, it returns, or it traps
    ///
    /// Calls between wasm functions stay in this loop: the callee's frame is
    /// pushed onto the run-time stack and the caller resumes when it ends, so
    /// call depth never grows the host stack. Each of those calls is recorded
    /// here and unwound, innermost first, when a trap escapes.
    pub fn execute(&mut self, interpreter: &mut dyn Interpreter) -> Result<(), Trap> {
        let mut calls = Vec::new();
        let result = self.run(interpreter, &mut calls);
        if result.is_err() {
            while let Some(snapshot) = calls.pop() {
                self.unwind(snapshot, 0);
            }
        }
        result
    }

    fn run(&mut self, interpreter: &mut dyn Interpreter, calls: &mut Vec<CallFrameSnapshot>) -> Result<(), Trap> {
        let mut instructions = Rc::clone(&self.frame()?.instructions);

        loop {
            if self.ip >= instructions.len() {
                let Some(snapshot) = calls.last().copied() else {
                    return Ok(());
                };
                let arity = self.frame()?.arity;
                self.check_results(arity)?;
                calls.pop();
                self.unwind(snapshot, arity);

                // Resume after the call instruction
                self.ip += 1;
                instructions = Rc::clone(&self.frame()?.instructions);
                continue;
            }

            let instruction = &instructions[self.ip];
            self.stats.instructions_executed += 1;
            trace!(ip = self.ip, depth = self.depth, instruction = instruction.name(), "execute");

            match interpreter.interpret(self, instruction)? {
                Flow::Next => self.ip += 1,
                Flow::Jump | Flow::Return => {}
                Flow::Call(address) => {
                    if let Some(body) = self.enter_call(interpreter, address, calls)? {
                        instructions = body;
                    }
                }
            }
        }
    }

    /// Start a call requested by the instruction at the current ip
    ///
    /// A wasm callee gets its frame and label pushed and its body returned for
    /// the dispatch loop to switch to. A host function runs to completion
    /// under a [`CallFrameHandle`] and its results are pushed.
    fn enter_call(
        &mut self,
        interpreter: &mut dyn Interpreter,
        address: FuncAddr,
        calls: &mut Vec<CallFrameSnapshot>,
    ) -> Result<Option<Rc<[Instruction]>>, Trap> {
        let function = self.store.function(address).ok_or(Trap::FunctionNotFound(address))?;
        let func_type = function.func_type();

        let FunctionInstance::Wasm { locals, body, .. } = &*function else {
            let arguments = self.stack.pop_values(func_type.params.len())?;
            let results = self.invoke(interpreter, address, arguments)?;
            self.stack.push_values(results);
            self.ip += 1;
            return Ok(None);
        };

        self.check_depth()?;
        let arguments = self.stack.pop_values(func_type.params.len())?;
        let arity = func_type.results.len();
        self.stats.function_calls += 1;
        trace!(function = address.0, depth = self.depth, "call");

        calls.push(self.open_call_frame());
        self.set_frame(Frame::with_declared_locals(address, arguments, locals, arity, Rc::clone(body)));
        Ok(Some(Rc::clone(body)))
    }

    fn check_depth(&self) -> Result<(), Trap> {
        if self.depth >= self.config.max_call_depth {
            return Err(Trap::CallStackExhausted);
        }
        Ok(())
    }

    /// The top `arity` entries must be values when a body ends
    fn check_results(&self, arity: usize) -> Result<(), Trap> {
        self.stack.ensure_values(arity).map_err(|_| Trap::ResultArityMismatch {
            expected: arity,
            actual: self.stack.top_value_count(),
        })
    }

    /// Push a label for a block, loop or if
    ///
    /// The block's parameters stay on top of the new label.
    pub fn enter_block(&mut self, params: usize, label: Label) -> Result<(), Trap> {
        let params = self.stack.pop_values(params)?;
        self.stack.push(label);
        self.stack.push_values(params);
        Ok(())
    }

    /// Leave the innermost block normally, keeping every value it produced
    pub fn end_block(&mut self) -> Result<(), Trap> {
        let position = self.label_position(0)?.0;
        let produced = self.stack.len() - position - 1;
        self.stack.ensure_values(produced)?;
        self.stack.unwind(position, produced);
        Ok(())
    }

    /// Branch to the `label_idx`-th enclosing label
    ///
    /// Everything pushed since the label was established is discarded except
    /// the label's arity of values from the top, and execution continues at
    /// the label's continuation.
    pub fn branch(&mut self, label_idx: u32) -> Result<Flow, Trap> {
        let (position, label) = self.label_position(label_idx)?;
        self.unwind_to_label(position, label)?;
        Ok(Flow::Jump)
    }

    /// Branch to the current frame's own label
    pub fn return_from_frame(&mut self) -> Result<Flow, Trap> {
        let position = self.current_frame_index + 1;
        let label = match self.stack.get(position) {
            Some(Entry::Label(label)) => *label,
            _ => return Err(Trap::NoActiveFrame),
        };
        self.unwind_to_label(position, label)?;
        Ok(Flow::Return)
    }

    /// Locate a label belonging to the current frame
    fn label_position(&self, label_idx: u32) -> Result<(usize, Label), Trap> {
        match self.stack.nth_label_position(label_idx as usize) {
            Some((position, label)) if position > self.current_frame_index => Ok((position, label)),
            _ => Err(Trap::InvalidLabel(label_idx)),
        }
    }

    fn unwind_to_label(&mut self, position: usize, label: Label) -> Result<(), Trap> {
        self.stack.ensure_values(label.arity())?;
        self.stack.unwind(position, label.arity());
        self.ip = label.continuation();
        trace!(
            position,
            arity = label.arity(),
            continuation = label.continuation(),
            "branch"
        );
        Ok(())
    }

    /// Record the caller's state and enter one call level
    fn open_call_frame(&mut self) -> CallFrameSnapshot {
        let snapshot = CallFrameSnapshot {
            frame_index: self.current_frame_index,
            stack_size: self.stack.len(),
            ip: self.ip,
        };
        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);
        snapshot
    }

    /// Restore the state recorded when a call was entered
    fn unwind(&mut self, snapshot: CallFrameSnapshot, keep: usize) {
        self.stack.unwind(snapshot.stack_size, keep);
        self.current_frame_index = snapshot.frame_index;
        self.ip = snapshot.ip;
        self.depth -= 1;
        self.stats.unwinds += 1;
        trace!(depth = self.depth, stack_size = self.stack.len(), kept = keep, "unwind call frame");
    }

    /// Render the stack, top first, and log it at debug level
    pub fn dump_stack(&self) -> String {
        let dump = format!(
            "depth: {}, ip: {}, frame: {}\n{}",
            self.depth, self.ip, self.current_frame_index, self.stack
        );
        debug!("stack dump\n{dump}");
        dump
    }
}

#[derive(Debug, Clone, Copy)]
struct CallFrameSnapshot {
    frame_index: usize,
    stack_size: usize,
    ip: InstructionPointer,
}

/// Scope guard bracketing one call
///
/// Records the caller's frame index, stack size and instruction pointer and
/// increments the depth on creation. Dropping it unwinds the configuration
/// back to that state on every exit path. Results marked with
/// [`CallFrameHandle::retain_results`] survive the unwind on top of the
/// caller's stack.
pub struct CallFrameHandle<'c, 's> {
    snapshot: CallFrameSnapshot,
    keep: usize,
    configuration: &'c mut Configuration<'s>,
}

impl<'c, 's> CallFrameHandle<'c, 's> {
    pub fn new(configuration: &'c mut Configuration<'s>) -> Self {
        let snapshot = configuration.open_call_frame();
        CallFrameHandle {
            snapshot,
            keep: 0,
            configuration,
        }
    }

    /// Keep the top `arity` values when this handle unwinds
    pub fn retain_results(&mut self, arity: usize) -> Result<(), Trap> {
        self.configuration.check_results(arity)?;
        self.keep = arity;
        Ok(())
    }

    pub fn stack_size(&self) -> usize {
        self.snapshot.stack_size
    }

    pub fn saved_ip(&self) -> InstructionPointer {
        self.snapshot.ip
    }
}

impl<'s> Deref for CallFrameHandle<'_, 's> {
    type Target = Configuration<'s>;

    fn deref(&self) -> &Self::Target {
        &*self.configuration
    }
}

impl<'s> DerefMut for CallFrameHandle<'_, 's> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.configuration
    }
}

impl Drop for CallFrameHandle<'_, '_> {
    fn drop(&mut self) {
        self.configuration.unwind(self.snapshot, self.keep);
    }
}
