//! Variable operations for WebAssembly
//!
//! This module provides implementations of variable operations
//! as specified in the WebAssembly specification section 4.4.5 (Variable Instructions).
//!
//! Locals live in the current frame on the run-time stack; globals live in
//! the store and are shared by every configuration over it.

use super::*;
use crate::runtime::store::GlobalAddr;

/// local.get x - Get local variable
/// WebAssembly core 4.4.5
///
/// From the WebAssembly specification:
/// 1. Let F be the current frame.
/// 2. Assert: due to validation, F.locals[x] exists.
/// 3. Let val be the value F.locals[x].
/// 4. Push the value val to the stack.
pub fn local_get(configuration: &mut Configuration<'_>, local_idx: u32) -> Result<Flow, Trap> {
    let value = *configuration
        .frame()?
        .locals
        .get(local_idx as usize)
        .ok_or(Trap::LocalIndexOutOfBounds(local_idx))?;
    configuration.stack_mut().push(value);
    Ok(Flow::Next)
}

/// local.set x - Set local variable
/// WebAssembly core 4.4.5
///
/// From the WebAssembly specification:
/// 1. Let F be the current frame.
/// 2. Assert: due to validation, F.locals[x] exists.
/// 3. Assert: due to validation, a value is on the top of the stack.
/// 4. Pop the value val from the stack.
/// 5. Replace F.locals[x] with the value val.
pub fn local_set(configuration: &mut Configuration<'_>, local_idx: u32) -> Result<Flow, Trap> {
    let value = configuration.stack_mut().pop_value()?;
    store_local(configuration, local_idx, value)?;
    Ok(Flow::Next)
}

/// local.tee x - Set local variable but keep value on stack
/// WebAssembly core 4.4.5
///
/// Equivalent to duplicating the top of the stack, then local.set x.
pub fn local_tee(configuration: &mut Configuration<'_>, local_idx: u32) -> Result<Flow, Trap> {
    let value = configuration.stack_mut().pop_value()?;
    store_local(configuration, local_idx, value)?;
    configuration.stack_mut().push(value);
    Ok(Flow::Next)
}

fn store_local(configuration: &mut Configuration<'_>, local_idx: u32, value: Value) -> Result<(), Trap> {
    let local = configuration
        .frame_mut()?
        .locals
        .get_mut(local_idx as usize)
        .ok_or(Trap::LocalIndexOutOfBounds(local_idx))?;
    if local.typ() != value.typ() {
        return Err(Trap::TypeMismatch {
            expected: local.typ(),
            actual: value.typ(),
        });
    }
    *local = value;
    Ok(())
}

/// global.get x - Get global variable
/// WebAssembly core 4.4.5
///
/// From the WebAssembly specification:
/// 1. Let a be the global address.
/// 2. Assert: due to validation, S.globals[a] exists.
/// 3. Let val be the value S.globals[a].value.
/// 4. Push the value val to the stack.
pub fn global_get(stack: &mut Stack, store: &mut Store, global: GlobalAddr) -> Result<(), Trap> {
    let value = store.global(global).ok_or(Trap::GlobalNotFound(global))?.value;
    stack.push(value);
    Ok(())
}

/// global.set x - Set global variable
/// WebAssembly core 4.4.5
///
/// From the WebAssembly specification:
/// 1. Let a be the global address.
/// 2. Assert: due to validation, S.globals[a] exists and is mutable.
/// 3. Pop the value val from the stack.
/// 4. Replace S.globals[a].value with the value val.
pub fn global_set(stack: &mut Stack, store: &mut Store, global: GlobalAddr) -> Result<(), Trap> {
    let slot = store.global_mut(global).ok_or(Trap::GlobalNotFound(global))?;
    if !slot.mutable {
        return Err(Trap::ImmutableGlobal(global));
    }
    let value = stack.pop_typed(slot.value.typ())?;
    slot.value = value;
    Ok(())
}
