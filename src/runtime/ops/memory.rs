//! Memory operations for WebAssembly
//!
//! This module provides implementations of memory load and store operations
//! as specified in the WebAssembly specification section 4.4.7 (Memory Instructions).
//!
//! Memories are resolved through the store by address, so writes made by one
//! call chain are visible to any other configuration over the same store.

use super::*;
use crate::runtime::memory::Memory;
use crate::runtime::store::MemoryAddr;

fn memory(store: &Store, addr: MemoryAddr) -> Result<&Memory, Trap> {
    store.memory(addr).ok_or(Trap::MemoryNotFound(addr))
}

fn memory_mut(store: &mut Store, addr: MemoryAddr) -> Result<&mut Memory, Trap> {
    store.memory_mut(addr).ok_or(Trap::MemoryNotFound(addr))
}

// ============================================================================
// Memory Load Operations (WebAssembly core 4.4.7.1)
// ============================================================================

/// i32.load - Load 32-bit integer from memory
/// WebAssembly core 4.4.7.1
/// [i32] → [i32]
///
/// From the WebAssembly specification:
/// 1. Pop the value i32.const i from the stack.
/// 2. Let ea be the integer i + memarg.offset.
/// 3. If ea + N/8 is larger than the length of mem.data, then trap.
/// 4. Let b* be the byte sequence mem.data[ea : N/8] and push its little-endian value.
pub fn i32_load(stack: &mut Stack, store: &mut Store, addr: MemoryAddr, offset: u32) -> Result<(), Trap> {
    let base = stack.pop_i32()? as u32;
    let value = memory(store, addr)?.read_u32(base, offset)?;
    stack.push(Value::I32(value as i32));
    Ok(())
}

/// i64.load - Load 64-bit integer from memory
/// WebAssembly core 4.4.7.1
/// [i32] → [i64]
pub fn i64_load(stack: &mut Stack, store: &mut Store, addr: MemoryAddr, offset: u32) -> Result<(), Trap> {
    let base = stack.pop_i32()? as u32;
    let value = memory(store, addr)?.read_u64(base, offset)?;
    stack.push(Value::I64(value as i64));
    Ok(())
}

// ============================================================================
// Memory Store Operations (WebAssembly core 4.4.7.2)
// ============================================================================

/// i32.store - Store 32-bit integer to memory
/// WebAssembly core 4.4.7.2
/// [i32 i32] → []
pub fn i32_store(stack: &mut Stack, store: &mut Store, addr: MemoryAddr, offset: u32) -> Result<(), Trap> {
    let value = stack.pop_i32()?;
    let base = stack.pop_i32()? as u32;
    memory_mut(store, addr)?.write_u32(base, offset, value as u32)
}

/// i64.store - Store 64-bit integer to memory
/// WebAssembly core 4.4.7.2
/// [i32 i64] → []
pub fn i64_store(stack: &mut Stack, store: &mut Store, addr: MemoryAddr, offset: u32) -> Result<(), Trap> {
    let value = stack.pop_i64()?;
    let base = stack.pop_i32()? as u32;
    memory_mut(store, addr)?.write_u64(base, offset, value as u64)
}

// ============================================================================
// Memory Size Operations (WebAssembly core 4.4.7.3)
// ============================================================================

/// memory.size - Get current memory size in pages
/// WebAssembly core 4.4.7.3
/// [] → [i32]
pub fn memory_size(stack: &mut Stack, store: &mut Store, addr: MemoryAddr) -> Result<(), Trap> {
    let pages = memory(store, addr)?.size();
    stack.push(Value::I32(pages as i32));
    Ok(())
}

/// memory.grow - Grow memory by delta pages
/// WebAssembly core 4.4.7.4
/// [i32] → [i32]
///
/// Pushes the previous size in pages, or -1 if the memory cannot grow.
/// Failure to grow is not a trap.
pub fn memory_grow(stack: &mut Stack, store: &mut Store, addr: MemoryAddr) -> Result<(), Trap> {
    let delta = stack.pop_i32()? as u32;
    let previous = memory_mut(store, addr)?.grow(delta);
    stack.push(Value::I32(previous));
    Ok(())
}
