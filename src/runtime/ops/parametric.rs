//! Parametric operations for WebAssembly
//!
//! This module provides implementations of parametric operations
//! as specified in the WebAssembly specification section 4.4.4 (Parametric Instructions).

use super::*;

/// drop - Drop value from stack
/// WebAssembly core 4.4.4
///
/// From the WebAssembly specification:
/// 1. Assert: due to validation, a value is on the top of the stack.
/// 2. Pop the value val from the stack.
pub fn drop(stack: &mut Stack) -> Result<(), Trap> {
    stack.pop_value()?;
    Ok(())
}

/// select - Select one of two values based on condition
/// WebAssembly core 4.4.4
///
/// From the WebAssembly specification:
/// 1. Assert: due to validation, a value of type i32 is on the top of the stack.
/// 2. Pop the value i32.const c from the stack.
/// 3. Assert: due to validation, two more values (of the same value type) are on the top of the stack.
/// 4. Pop the value val2 from the stack.
/// 5. Pop the value val1 from the stack.
/// 6. If c is not 0, then push the value val1 back to the stack.
/// 7. Else, push the value val2 back to the stack.
pub fn select(stack: &mut Stack) -> Result<(), Trap> {
    let condition = stack.pop_i32()?;
    let val2 = stack.pop_value()?;
    let val1 = stack.pop_typed(val2.typ())?;
    stack.push(if condition != 0 { val1 } else { val2 });
    Ok(())
}
