//! Control flow operations for WebAssembly
//!
//! This module provides implementations of control flow operations
//! as specified in the WebAssembly specification section 4.4.8 (Control Instructions).
//!
//! Structured instructions push labels onto the run-time stack; branches
//! resolve and unwind through [`Configuration::branch`].

use super::*;
use crate::runtime::control::Label;
use crate::runtime::instruction::{BlockType, InstructionPointer};
use crate::runtime::store::FuncAddr;

/// unreachable - Trap immediately
/// WebAssembly core 4.4.8
pub fn unreachable() -> Result<Flow, Trap> {
    Err(Trap::Unreachable)
}

/// block bt instr* end
/// WebAssembly core 4.4.8
///
/// From the WebAssembly specification:
/// 1. Let m and n be the parameter and result arity of the block type.
/// 2. Let L be the label whose arity is n and whose continuation is the end of the block.
/// 3. Pop the values val^m from the stack.
/// 4. Enter the block val^m instr* with label L.
pub fn block(configuration: &mut Configuration<'_>, block_type: BlockType, end: InstructionPointer) -> Result<Flow, Trap> {
    let label = Label::new(block_type.results(), end + 1);
    configuration.enter_block(block_type.params(), label)?;
    Ok(Flow::Next)
}

/// loop bt instr* end
/// WebAssembly core 4.4.8
///
/// The label of a loop carries the loop's *parameters* and targets the loop
/// instruction itself, so a branch re-enters the loop with a fresh label.
pub fn loop_(configuration: &mut Configuration<'_>, block_type: BlockType) -> Result<Flow, Trap> {
    let label = Label::new(block_type.params(), configuration.ip());
    configuration.enter_block(block_type.params(), label)?;
    Ok(Flow::Next)
}

/// if bt instr1* else instr2* end
/// WebAssembly core 4.4.8
///
/// From the WebAssembly specification:
/// 1. Pop the value i32.const c from the stack.
/// 2. If c is non-zero, enter the block instr1*.
/// 3. Else enter the block instr2*.
///
/// Without an `else` arm a false condition skips the construct entirely; its
/// parameters become its results.
pub fn if_(
    configuration: &mut Configuration<'_>,
    block_type: BlockType,
    else_ip: Option<InstructionPointer>,
    end: InstructionPointer,
) -> Result<Flow, Trap> {
    let condition = configuration.stack_mut().pop_i32()?;
    let label = Label::new(block_type.results(), end + 1);

    if condition != 0 {
        configuration.enter_block(block_type.params(), label)?;
        return Ok(Flow::Next);
    }

    match else_ip {
        Some(else_ip) => {
            configuration.enter_block(block_type.params(), label)?;
            configuration.set_ip(else_ip + 1);
        }
        None => configuration.set_ip(end + 1),
    }
    Ok(Flow::Jump)
}

/// else - reached at the end of the `then` arm; skip to the matching `end`
pub fn else_(configuration: &mut Configuration<'_>, end: InstructionPointer) -> Result<Flow, Trap> {
    configuration.set_ip(end);
    Ok(Flow::Jump)
}

/// end - leave the innermost block, keeping its results
pub fn end(configuration: &mut Configuration<'_>) -> Result<Flow, Trap> {
    configuration.end_block()?;
    Ok(Flow::Next)
}

/// br l - Unconditional branch
/// WebAssembly core 4.4.8
///
/// From the WebAssembly specification:
/// 1. Assert: due to validation, the stack contains at least l + 1 labels.
/// 2. Let L be the l-th label appearing on the stack, starting from the top and counting from zero.
/// 3. Let n be the arity of L.
/// 4. Assert: due to validation, there are at least n values on the top of the stack.
/// 5. Pop the values val^n from the stack.
/// 6. Repeat l + 1 times: pop a label from the stack.
/// 7. Push the values val^n to the stack.
/// 8. Jump to the continuation of L.
pub fn br(configuration: &mut Configuration<'_>, label_idx: u32) -> Result<Flow, Trap> {
    configuration.branch(label_idx)
}

/// br_if l - Conditional branch
/// WebAssembly core 4.4.8
///
/// From the WebAssembly specification:
/// 1. Assert: due to validation, a value of type i32 is on the top of the stack.
/// 2. Pop the value c from the stack.
/// 3. If c is non-zero, then execute the instruction br l.
/// 4. Else, do nothing.
pub fn br_if(configuration: &mut Configuration<'_>, label_idx: u32) -> Result<Flow, Trap> {
    let condition = configuration.stack_mut().pop_i32()?;
    if condition != 0 {
        configuration.branch(label_idx)
    } else {
        Ok(Flow::Next)
    }
}

/// br_table l* lN - Indirect branch via table
/// WebAssembly core 4.4.8
///
/// 1. Pop i32 index from stack
/// 2. If `index` < len(labels), branch to labels\[index\]
/// 3. Else branch to default
pub fn br_table(configuration: &mut Configuration<'_>, labels: &[u32], default: u32) -> Result<Flow, Trap> {
    let index = configuration.stack_mut().pop_i32()? as u32;
    let target = labels.get(index as usize).copied().unwrap_or(default);
    configuration.branch(target)
}

/// return - Return from function
/// WebAssembly core 4.4.8
///
/// A branch to the outermost label of the frame.
pub fn return_op(configuration: &mut Configuration<'_>) -> Result<Flow, Trap> {
    configuration.return_from_frame()
}

/// call x
/// WebAssembly core 4.4.8
///
/// The configuration pops the callee's arguments, pushes its frame and runs
/// its body in the same dispatch loop. Its results replace the arguments on
/// return; a trap in the callee propagates unchanged.
pub fn call(func: FuncAddr) -> Result<Flow, Trap> {
    Ok(Flow::Call(func))
}

#[cfg(test)]
mod tests {
    use crate::runtime::instruction::{BlockType, Instruction};
    use crate::runtime::store::FuncAddr;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::{Value, ValueType};
    use rstest::rstest;

    // ============================================================================
    // Block and Control Flow Tests
    // ============================================================================

    #[test]
    fn block_empty() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 42 })
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(42)]);
    }

    #[test]
    fn block_with_value() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 42 })
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(42)]);
    }

    #[test]
    fn block_with_params() {
        // (block (param i32 i32) (result i32) i32.add)
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 40 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::block(BlockType::Arity { params: 2, results: 1 }))
            .inst(Instruction::I32Add)
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(42)]);
    }

    #[test]
    fn nested_blocks() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::I32Const { value: 42 })
            .inst(Instruction::Drop)
            .inst(Instruction::End)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 7 })
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(7)]);
    }

    #[test]
    fn br_simple() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 42 })
            .inst(Instruction::Br { label_idx: 0 })
            .inst(Instruction::I32Const { value: 99 }) // Should be skipped
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(42)]);
    }

    #[test]
    fn br_discards_intermediate_values() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::I32Const { value: 3 })
            .inst(Instruction::Br { label_idx: 0 })
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(3)]);
    }

    #[rstest]
    #[case(0, 30)]
    #[case(1, 20)]
    #[case(2, 10)]
    fn br_to_nth_enclosing_block(#[case] depth: u32, #[case] expected: i32) {
        // Each block adds its own marker after the inner block exits; branching
        // to depth n skips every marker from the n innermost blocks.
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::block(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 5 })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::Br { label_idx: depth })
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 10 })
            .inst(Instruction::I32Add)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 10 })
            .inst(Instruction::I32Add)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 10 })
            .inst(Instruction::I32Add)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[test]
    fn br_if_taken_and_not_taken() {
        for (condition, expected) in [(1, 1), (0, 2)] {
            ExecutorTest::new()
                .inst(Instruction::block(BlockType::Value(ValueType::I32)))
                .inst(Instruction::I32Const { value: 1 })
                .inst(Instruction::I32Const { value: condition })
                .inst(Instruction::BrIf { label_idx: 0 })
                .inst(Instruction::Drop)
                .inst(Instruction::I32Const { value: 2 })
                .inst(Instruction::End)
                .returns(vec![ValueType::I32])
                .expect_stack(vec![Value::I32(expected)]);
        }
    }

    #[rstest]
    #[case(0, 100)]
    #[case(1, 101)]
    #[case(2, 102)]
    #[case(7, 102)]
    #[case(-1, 102)]
    fn br_table_selects_target(#[case] index: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::I32Const { value: index })
            .inst(Instruction::BrTable {
                labels: vec![0, 1],
                default: 2,
            })
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 100 })
            .inst(Instruction::Return)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 101 })
            .inst(Instruction::Return)
            .inst(Instruction::End)
            .inst(Instruction::I32Const { value: 102 })
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[test]
    fn br_invalid_label_traps() {
        ExecutorTest::new()
            .inst(Instruction::Br { label_idx: 1 })
            .expect_trap("invalid label index 1");
    }

    #[test]
    fn br_to_frame_label_returns() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::I32Const { value: 5 })
            .inst(Instruction::Br { label_idx: 1 })
            .inst(Instruction::End)
            .inst(Instruction::Unreachable)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(5)]);
    }

    // ============================================================================
    // Loop Tests
    // ============================================================================

    #[test]
    fn loop_falls_through() {
        ExecutorTest::new()
            .inst(Instruction::loop_(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 3 })
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(3)]);
    }

    #[test]
    fn loop_counts_down() {
        // local 0 = n; loop { local0 -= 1; br_if 0 (local0 != 0) }; local 1 counts iterations
        ExecutorTest::new()
            .arg(Value::I32(5))
            .local(ValueType::I32)
            .inst(Instruction::loop_(BlockType::Empty))
            .inst(Instruction::LocalGet { local_idx: 1 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Add)
            .inst(Instruction::LocalSet { local_idx: 1 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Sub)
            .inst(Instruction::LocalTee { local_idx: 0 })
            .inst(Instruction::BrIf { label_idx: 0 })
            .inst(Instruction::End)
            .inst(Instruction::LocalGet { local_idx: 1 })
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(5)]);
    }

    #[test]
    fn loop_with_params_carries_values() {
        // (loop (param i32) (result i32) ...) decrementing until zero
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 4 })
            .inst(Instruction::loop_(BlockType::Arity { params: 1, results: 1 }))
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Sub)
            .inst(Instruction::LocalTee { local_idx: 0 })
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::BrIf { label_idx: 0 })
            .inst(Instruction::End)
            .local(ValueType::I32)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(0)]);
    }

    // ============================================================================
    // If Tests
    // ============================================================================

    #[rstest]
    #[case(1, 10)]
    #[case(0, 20)]
    fn if_else(#[case] condition: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: condition })
            .inst(Instruction::if_(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 10 })
            .inst(Instruction::else_())
            .inst(Instruction::I32Const { value: 20 })
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[test]
    fn if_without_else_skips_when_false() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::if_(BlockType::Empty))
            .inst(Instruction::Unreachable)
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1)]);
    }

    #[test]
    fn br_out_of_if() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::if_(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 7 })
            .inst(Instruction::Br { label_idx: 0 })
            .inst(Instruction::else_())
            .inst(Instruction::I32Const { value: 8 })
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(7)]);
    }

    // ============================================================================
    // Return / Unreachable / Call
    // ============================================================================

    #[test]
    fn return_skips_rest_of_body() {
        ExecutorTest::new()
            .inst(Instruction::block(BlockType::Empty))
            .inst(Instruction::loop_(BlockType::Empty))
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Const { value: 2 })
            .inst(Instruction::Return)
            .inst(Instruction::End)
            .inst(Instruction::End)
            .inst(Instruction::Unreachable)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(2)]);
    }

    #[test]
    fn unreachable_traps() {
        ExecutorTest::new()
            .inst(Instruction::Unreachable)
            .expect_trap("unreachable");
    }

    #[test]
    fn call_unknown_function_traps() {
        ExecutorTest::new()
            .inst(Instruction::Call { func: FuncAddr(5) })
            .expect_trap("function not found");
    }

    #[test]
    fn call_self_until_exhausted() {
        // The function under test is always allocated first
        ExecutorTest::new()
            .inst(Instruction::Call { func: FuncAddr(0) })
            .max_call_depth(16)
            .expect_trap("call stack exhausted");
    }

    #[test]
    fn call_self_with_default_depth_traps() {
        ExecutorTest::new()
            .inst(Instruction::Call { func: FuncAddr(0) })
            .expect_trap("call stack exhausted");
    }

    #[test]
    fn call_with_too_few_operands_traps() {
        // The function under test takes one i32 and calls itself with none
        ExecutorTest::new()
            .arg(Value::I32(1))
            .inst(Instruction::Call { func: FuncAddr(0) })
            .expect_trap("stack underflow");
    }

    #[test]
    fn recursive_countdown() {
        // f(n) = n == 0 ? 0 : 1 + f(n - 1)
        ExecutorTest::new()
            .arg(Value::I32(10))
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Eqz)
            .inst(Instruction::if_(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::else_())
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Sub)
            .inst(Instruction::Call { func: FuncAddr(0) })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Add)
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(10)]);
    }

    #[test]
    fn deep_recursion_stays_within_default_depth() {
        // 1000 nested calls, each returning through its caller's frame
        ExecutorTest::new()
            .arg(Value::I32(1000))
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Eqz)
            .inst(Instruction::if_(BlockType::Value(ValueType::I32)))
            .inst(Instruction::I32Const { value: 0 })
            .inst(Instruction::else_())
            .inst(Instruction::LocalGet { local_idx: 0 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Sub)
            .inst(Instruction::Call { func: FuncAddr(0) })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Add)
            .inst(Instruction::End)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1000)]);
    }
}
