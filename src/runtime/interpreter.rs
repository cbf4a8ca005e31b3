//! Instruction dispatch
//!
//! The [`Configuration`] drives the fetch/dispatch/advance loop; an
//! [`Interpreter`] applies one instruction at a time. The reference
//! [`BytecodeInterpreter`] dispatches to the handlers in [`super::ops`].

use super::configuration::Configuration;
use super::instruction::Instruction;
use super::store::FuncAddr;
use super::{ops, Trap};

/// What the configuration does after an instruction has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Advance to the next instruction
    Next,
    /// Control was transferred; the instruction pointer already holds the continuation
    Jump,
    /// Leave the current frame
    Return,
    /// Call the function at this address, then advance past the instruction
    Call(FuncAddr),
}

/// A dispatch table for instructions
///
/// Implementations may push and pop values, branch through
/// [`Configuration::branch`], request a call with [`Flow::Call`], or return a
/// trap. A trap must be returned as-is; handlers never recover from one.
///
/// The configuration performs requested calls itself and keeps dispatching
/// the callee's body to the same interpreter.
pub trait Interpreter {
    fn interpret(&mut self, configuration: &mut Configuration<'_>, instruction: &Instruction) -> Result<Flow, Trap>;
}

/// Reference interpreter for the bundled instruction set
#[derive(Debug, Default, Clone, Copy)]
pub struct BytecodeInterpreter;

impl BytecodeInterpreter {
    pub fn new() -> Self {
        BytecodeInterpreter
    }
}

impl Interpreter for BytecodeInterpreter {
    fn interpret(&mut self, configuration: &mut Configuration<'_>, instruction: &Instruction) -> Result<Flow, Trap> {
        use Instruction::*;

        // Handlers that only touch the value stack
        macro_rules! stack_op {
            ($module:ident :: $op:ident $(, $arg:expr)*) => {{
                ops::$module::$op(configuration.stack_mut() $(, $arg)*)?;
                Ok(Flow::Next)
            }};
        }

        // Handlers that move values between the stack and the store
        macro_rules! store_op {
            ($module:ident :: $op:ident $(, $arg:expr)*) => {{
                let (stack, store) = configuration.stack_and_store_mut();
                ops::$module::$op(stack, store $(, $arg)*)?;
                Ok(Flow::Next)
            }};
        }

        match instruction {
            // ----------------------------------------------------------------
            // 4.4.8 Control Instructions
            Unreachable => ops::control::unreachable(),
            Nop => Ok(Flow::Next),
            Block { block_type, end } => ops::control::block(configuration, *block_type, *end),
            Loop { block_type } => ops::control::loop_(configuration, *block_type),
            If {
                block_type,
                else_ip,
                end,
            } => ops::control::if_(configuration, *block_type, *else_ip, *end),
            Else { end } => ops::control::else_(configuration, *end),
            End => ops::control::end(configuration),
            Br { label_idx } => ops::control::br(configuration, *label_idx),
            BrIf { label_idx } => ops::control::br_if(configuration, *label_idx),
            BrTable { labels, default } => ops::control::br_table(configuration, labels, *default),
            Return => ops::control::return_op(configuration),
            Call { func } => ops::control::call(*func),

            // ----------------------------------------------------------------
            // 4.4.4 Parametric Instructions
            Drop => stack_op!(parametric::drop),
            Select => stack_op!(parametric::select),

            // ----------------------------------------------------------------
            // 4.4.5 Variable Instructions
            LocalGet { local_idx } => ops::variable::local_get(configuration, *local_idx),
            LocalSet { local_idx } => ops::variable::local_set(configuration, *local_idx),
            LocalTee { local_idx } => ops::variable::local_tee(configuration, *local_idx),
            GlobalGet { global } => store_op!(variable::global_get, *global),
            GlobalSet { global } => store_op!(variable::global_set, *global),

            // ----------------------------------------------------------------
            // 4.4.7 Memory Instructions
            I32Load { memory, offset } => store_op!(memory::i32_load, *memory, *offset),
            I64Load { memory, offset } => store_op!(memory::i64_load, *memory, *offset),
            I32Store { memory, offset } => store_op!(memory::i32_store, *memory, *offset),
            I64Store { memory, offset } => store_op!(memory::i64_store, *memory, *offset),
            MemorySize { memory } => store_op!(memory::memory_size, *memory),
            MemoryGrow { memory } => store_op!(memory::memory_grow, *memory),

            // ----------------------------------------------------------------
            // 4.4.1 Numeric Instructions
            I32Const { value } => stack_op!(numeric::i32_const, *value),
            I64Const { value } => stack_op!(numeric::i64_const, *value),
            F32Const { value } => stack_op!(numeric::f32_const, *value),
            F64Const { value } => stack_op!(numeric::f64_const, *value),

            I32Eqz => stack_op!(numeric::i32_eqz),
            I32Eq => stack_op!(numeric::i32_eq),
            I32Ne => stack_op!(numeric::i32_ne),
            I32LtS => stack_op!(numeric::i32_lt_s),
            I32LtU => stack_op!(numeric::i32_lt_u),
            I32GtS => stack_op!(numeric::i32_gt_s),
            I32GtU => stack_op!(numeric::i32_gt_u),
            I32LeS => stack_op!(numeric::i32_le_s),
            I32GeS => stack_op!(numeric::i32_ge_s),

            I32Add => stack_op!(numeric::i32_add),
            I32Sub => stack_op!(numeric::i32_sub),
            I32Mul => stack_op!(numeric::i32_mul),
            I32DivS => stack_op!(numeric::i32_div_s),
            I32DivU => stack_op!(numeric::i32_div_u),
            I32RemS => stack_op!(numeric::i32_rem_s),
            I32RemU => stack_op!(numeric::i32_rem_u),
            I32And => stack_op!(numeric::i32_and),
            I32Or => stack_op!(numeric::i32_or),
            I32Xor => stack_op!(numeric::i32_xor),
            I32Shl => stack_op!(numeric::i32_shl),
            I32ShrS => stack_op!(numeric::i32_shr_s),
            I32ShrU => stack_op!(numeric::i32_shr_u),

            I64Eqz => stack_op!(numeric::i64_eqz),
            I64Eq => stack_op!(numeric::i64_eq),
            I64LtS => stack_op!(numeric::i64_lt_s),
            I64GtS => stack_op!(numeric::i64_gt_s),
            I64Add => stack_op!(numeric::i64_add),
            I64Sub => stack_op!(numeric::i64_sub),
            I64Mul => stack_op!(numeric::i64_mul),

            F64Add => stack_op!(numeric::f64_add),
            F64Sub => stack_op!(numeric::f64_sub),
            F64Mul => stack_op!(numeric::f64_mul),
            F64Div => stack_op!(numeric::f64_div),
        }
    }
}
