//! Numeric operations for WebAssembly
//!
//! This module implements the numeric instructions of the bundled instruction set:
//! - Section 4.4.1.1: Constants (t.const)
//! - Section 4.4.1.3: Binary operations (t.binop)
//! - Section 4.4.1.4: Test operations (t.testop)
//! - Section 4.4.1.5: Comparison operations (t.relop)
//!
//! Operands are popped with a type check; a value of the wrong type traps
//! with [`Trap::TypeMismatch`].

use super::{Stack, Trap, Value};

// ============================================================================
// Numeric Constants (Section 4.4.1.1)
// ============================================================================

/// i32.const
/// From the WebAssembly specification (4.4.1.1):
/// Push the value i32.const c to the stack.
pub fn i32_const(stack: &mut Stack, value: i32) -> Result<(), Trap> {
    stack.push(Value::I32(value));
    Ok(())
}

/// i64.const
pub fn i64_const(stack: &mut Stack, value: i64) -> Result<(), Trap> {
    stack.push(Value::I64(value));
    Ok(())
}

/// f32.const
pub fn f32_const(stack: &mut Stack, value: f32) -> Result<(), Trap> {
    stack.push(Value::F32(value));
    Ok(())
}

/// f64.const
pub fn f64_const(stack: &mut Stack, value: f64) -> Result<(), Trap> {
    stack.push(Value::F64(value));
    Ok(())
}

// ============================================================================
// Test and Comparison Operations (Sections 4.4.1.4 and 4.4.1.5)
// ============================================================================

/// i32.eqz
/// From the WebAssembly specification (4.4.1.4 - t.testop):
/// 1. Pop value c1 from stack
/// 2. Push i32.const 1 if c1 is zero, 0 otherwise
pub fn i32_eqz(stack: &mut Stack) -> Result<(), Trap> {
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32((c1 == 0) as i32));
    Ok(())
}

/// i64.eqz
pub fn i64_eqz(stack: &mut Stack) -> Result<(), Trap> {
    let c1 = stack.pop_i64()?;
    stack.push(Value::I32((c1 == 0) as i32));
    Ok(())
}

// t.relop: pop c2 then c1, push i32 1 if the relation holds, 0 otherwise
macro_rules! relop {
    ($(#[$doc:meta])* $name:ident, $pop:ident, $as:ty, $op:tt) => {
        $(#[$doc])*
        pub fn $name(stack: &mut Stack) -> Result<(), Trap> {
            let c2 = stack.$pop()? as $as;
            let c1 = stack.$pop()? as $as;
            stack.push(Value::I32((c1 $op c2) as i32));
            Ok(())
        }
    };
}

relop!(
    /// i32.eq
    i32_eq, pop_i32, i32, ==
);
relop!(
    /// i32.ne
    i32_ne, pop_i32, i32, !=
);
relop!(
    /// i32.lt_s
    i32_lt_s, pop_i32, i32, <
);
relop!(
    /// i32.lt_u - operands are reinterpreted as unsigned
    i32_lt_u, pop_i32, u32, <
);
relop!(
    /// i32.gt_s
    i32_gt_s, pop_i32, i32, >
);
relop!(
    /// i32.gt_u - operands are reinterpreted as unsigned
    i32_gt_u, pop_i32, u32, >
);
relop!(
    /// i32.le_s
    i32_le_s, pop_i32, i32, <=
);
relop!(
    /// i32.ge_s
    i32_ge_s, pop_i32, i32, >=
);
relop!(
    /// i64.eq
    i64_eq, pop_i64, i64, ==
);
relop!(
    /// i64.lt_s
    i64_lt_s, pop_i64, i64, <
);
relop!(
    /// i64.gt_s
    i64_gt_s, pop_i64, i64, >
);

// ============================================================================
// Integer Binary Operations (Section 4.4.1.3)
// ============================================================================

/// i32.add
/// From the WebAssembly specification (4.4.1.3 - t.binop):
/// 1. Pop value c2 from stack
/// 2. Pop value c1 from stack
/// 3. If either value is not i32, trap
/// 4. Compute c1 + c2 modulo 2^32
/// 5. Push result to stack
pub fn i32_add(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_add(c2)));
    Ok(())
}

/// i32.sub - c1 - c2 modulo 2^32
pub fn i32_sub(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_sub(c2)));
    Ok(())
}

/// i32.mul - c1 * c2 modulo 2^32
pub fn i32_mul(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_mul(c2)));
    Ok(())
}

/// i32.div_s
/// From the WebAssembly specification (4.4.1.3 - idiv_s):
/// - If c2 is 0, then the result is undefined (trap)
/// - Else if c1 / c2 is 2^31, then the result is undefined (trap)
/// - Else return the result of dividing c1 by c2, truncated toward zero
pub fn i32_div_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    let result = c1.checked_div(c2).ok_or(Trap::IntegerOverflow)?;
    stack.push(Value::I32(result));
    Ok(())
}

/// i32.div_u
pub fn i32_div_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    let result = c1.checked_div(c2).ok_or(Trap::IntegerDivideByZero)?;
    stack.push(Value::I32(result as i32));
    Ok(())
}

/// i32.rem_s
/// From the WebAssembly specification (4.4.1.3 - irem_s):
/// - If c2 is 0, then the result is undefined (trap)
/// - Else return the remainder, with the sign of the dividend
///
/// `i32::MIN rem_s -1` is 0, not an overflow.
pub fn i32_rem_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    if c2 == 0 {
        return Err(Trap::IntegerDivideByZero);
    }
    stack.push(Value::I32(c1.wrapping_rem(c2)));
    Ok(())
}

/// i32.rem_u
pub fn i32_rem_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()? as u32;
    let c1 = stack.pop_i32()? as u32;
    let result = c1.checked_rem(c2).ok_or(Trap::IntegerDivideByZero)?;
    stack.push(Value::I32(result as i32));
    Ok(())
}

/// i32.and
pub fn i32_and(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 & c2));
    Ok(())
}

/// i32.or
pub fn i32_or(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 | c2));
    Ok(())
}

/// i32.xor
pub fn i32_xor(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1 ^ c2));
    Ok(())
}

/// i32.shl
/// From the WebAssembly specification (4.4.1.3 - ishl):
/// Let k be c2 modulo 32; return c1 shifted left by k bits, modulo 2^32.
pub fn i32_shl(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_shl(c2 as u32)));
    Ok(())
}

/// i32.shr_s - arithmetic shift, k = c2 modulo 32
pub fn i32_shr_s(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()?;
    stack.push(Value::I32(c1.wrapping_shr(c2 as u32)));
    Ok(())
}

/// i32.shr_u - logical shift, k = c2 modulo 32
pub fn i32_shr_u(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i32()?;
    let c1 = stack.pop_i32()? as u32;
    stack.push(Value::I32(c1.wrapping_shr(c2 as u32) as i32));
    Ok(())
}

/// i64.add - c1 + c2 modulo 2^64
pub fn i64_add(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_add(c2)));
    Ok(())
}

/// i64.sub - c1 - c2 modulo 2^64
pub fn i64_sub(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_sub(c2)));
    Ok(())
}

/// i64.mul - c1 * c2 modulo 2^64
pub fn i64_mul(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_i64()?;
    let c1 = stack.pop_i64()?;
    stack.push(Value::I64(c1.wrapping_mul(c2)));
    Ok(())
}

// ============================================================================
// Floating-Point Binary Operations (Section 4.4.1.3)
// ============================================================================

/// f64.add
/// IEEE 754 addition; NaN operands propagate.
pub fn f64_add(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 + c2));
    Ok(())
}

/// f64.sub
pub fn f64_sub(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 - c2));
    Ok(())
}

/// f64.mul
pub fn f64_mul(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 * c2));
    Ok(())
}

/// f64.div
/// Division by zero yields an infinity or NaN; it never traps.
pub fn f64_div(stack: &mut Stack) -> Result<(), Trap> {
    let c2 = stack.pop_f64()?;
    let c1 = stack.pop_f64()?;
    stack.push(Value::F64(c1 / c2));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::runtime::instruction::Instruction;
    use crate::runtime::test_utils::test::ExecutorTest;
    use crate::runtime::{Value, ValueType};
    use rstest::rstest;

    fn i32_binop(a: i32, b: i32, op: Instruction) -> ExecutorTest {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: a })
            .inst(Instruction::I32Const { value: b })
            .inst(op)
            .returns(vec![ValueType::I32])
    }

    fn i64_binop(a: i64, b: i64, op: Instruction, result: ValueType) -> ExecutorTest {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: a })
            .inst(Instruction::I64Const { value: b })
            .inst(op)
            .returns(vec![result])
    }

    #[rstest]
    #[case(Instruction::I32Add, 7, 5, 12)]
    #[case(Instruction::I32Add, i32::MAX, 1, i32::MIN)]
    #[case(Instruction::I32Sub, 5, 7, -2)]
    #[case(Instruction::I32Sub, i32::MIN, 1, i32::MAX)]
    #[case(Instruction::I32Mul, 6, 7, 42)]
    #[case(Instruction::I32Mul, 0x10000, 0x10000, 0)]
    #[case(Instruction::I32DivS, -7, 2, -3)]
    #[case(Instruction::I32DivU, -1, 2, 0x7fffffff)]
    #[case(Instruction::I32RemS, -7, 2, -1)]
    #[case(Instruction::I32RemS, i32::MIN, -1, 0)]
    #[case(Instruction::I32RemU, 7, 3, 1)]
    #[case(Instruction::I32And, 0b1100, 0b1010, 0b1000)]
    #[case(Instruction::I32Or, 0b1100, 0b1010, 0b1110)]
    #[case(Instruction::I32Xor, 0b1100, 0b1010, 0b0110)]
    #[case(Instruction::I32Shl, 1, 33, 2)]
    #[case(Instruction::I32ShrS, -8, 1, -4)]
    #[case(Instruction::I32ShrU, -8, 28, 0xf)]
    fn i32_binary(#[case] op: Instruction, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        i32_binop(a, b, op).expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(Instruction::I32Eq, 3, 3, 1)]
    #[case(Instruction::I32Ne, 3, 3, 0)]
    #[case(Instruction::I32LtS, -1, 0, 1)]
    #[case(Instruction::I32LtU, -1, 0, 0)]
    #[case(Instruction::I32GtS, -1, 0, 0)]
    #[case(Instruction::I32GtU, -1, 0, 1)]
    #[case(Instruction::I32LeS, 4, 4, 1)]
    #[case(Instruction::I32GeS, 3, 4, 0)]
    fn i32_comparison(#[case] op: Instruction, #[case] a: i32, #[case] b: i32, #[case] expected: i32) {
        i32_binop(a, b, op).expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(5, 0)]
    #[case(i32::MIN, 0)]
    fn i32_eqz(#[case] value: i32, #[case] expected: i32) {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value })
            .inst(Instruction::I32Eqz)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(expected)]);
    }

    #[rstest]
    #[case(Instruction::I32DivS, 1, 0, "integer divide by zero")]
    #[case(Instruction::I32DivU, 1, 0, "integer divide by zero")]
    #[case(Instruction::I32RemS, 1, 0, "integer divide by zero")]
    #[case(Instruction::I32RemU, 1, 0, "integer divide by zero")]
    #[case(Instruction::I32DivS, i32::MIN, -1, "integer overflow")]
    fn i32_division_traps(#[case] op: Instruction, #[case] a: i32, #[case] b: i32, #[case] message: &str) {
        i32_binop(a, b, op).expect_trap(message);
    }

    #[rstest]
    #[case(Instruction::I64Add, i64::MAX, 1, Value::I64(i64::MIN))]
    #[case(Instruction::I64Sub, 10, 15, Value::I64(-5))]
    #[case(Instruction::I64Mul, 1 << 32, 1 << 31, Value::I64(1 << 63))]
    #[case(Instruction::I64Eq, 9, 9, Value::I32(1))]
    #[case(Instruction::I64LtS, -9, 9, Value::I32(1))]
    #[case(Instruction::I64GtS, -9, 9, Value::I32(0))]
    fn i64_binary(#[case] op: Instruction, #[case] a: i64, #[case] b: i64, #[case] expected: Value) {
        i64_binop(a, b, op, expected.typ()).expect_stack(vec![expected]);
    }

    #[test]
    fn i64_eqz() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 0 })
            .inst(Instruction::I64Eqz)
            .returns(vec![ValueType::I32])
            .expect_stack(vec![Value::I32(1)]);
    }

    #[rstest]
    #[case(Instruction::F64Add, 1.5, 2.25, 3.75)]
    #[case(Instruction::F64Sub, 1.5, 2.25, -0.75)]
    #[case(Instruction::F64Mul, 1.5, -2.0, -3.0)]
    #[case(Instruction::F64Div, 1.0, 0.0, f64::INFINITY)]
    fn f64_binary(#[case] op: Instruction, #[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        ExecutorTest::new()
            .inst(Instruction::F64Const { value: a })
            .inst(Instruction::F64Const { value: b })
            .inst(op)
            .returns(vec![ValueType::F64])
            .expect_stack(vec![Value::F64(expected)]);
    }

    #[test]
    fn f64_div_zero_by_zero_is_nan() {
        let result = ExecutorTest::new()
            .inst(Instruction::F64Const { value: 0.0 })
            .inst(Instruction::F64Const { value: 0.0 })
            .inst(Instruction::F64Div)
            .returns(vec![ValueType::F64])
            .run();
        let values = result.values().expect("Division should not trap");
        assert!(values[0].as_f64().unwrap().is_nan());
    }

    #[test]
    fn constants() {
        ExecutorTest::new()
            .inst(Instruction::I32Const { value: -1 })
            .inst(Instruction::I64Const { value: 1 << 40 })
            .inst(Instruction::F32Const { value: 0.5 })
            .inst(Instruction::F64Const { value: -0.25 })
            .returns(vec![ValueType::I32, ValueType::I64, ValueType::F32, ValueType::F64])
            .expect_stack(vec![
                Value::I32(-1),
                Value::I64(1 << 40),
                Value::F32(0.5),
                Value::F64(-0.25),
            ]);
    }

    #[test]
    fn operand_type_mismatch_traps() {
        ExecutorTest::new()
            .inst(Instruction::I64Const { value: 1 })
            .inst(Instruction::I32Const { value: 1 })
            .inst(Instruction::I32Add)
            .returns(vec![ValueType::I32])
            .expect_trap("type mismatch: expected i32, got i64");
    }
}
