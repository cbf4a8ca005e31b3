//! WebAssembly linear memory implementation
//!
//! Memory layout follows the WebAssembly specification:
//! - Page size: 64KB (65,536 bytes)
//! - Address space: 32-bit (max 4GB)
//! - Bounds checking: Required for all accesses
//! - Out-of-bounds access: Traps

use super::Trap;

/// WebAssembly page size in bytes (64KB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages (2^16 = 64K pages = 4GB total)
pub const MAX_PAGES: u32 = 65536;

/// Invalid memory limits
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("initial size {initial} pages exceeds maximum {max} pages")]
    InitialExceedsMaximum { initial: u32, max: u32 },
    #[error("maximum size {0} pages exceeds system maximum {MAX_PAGES} pages")]
    MaximumTooLarge(u32),
}

/// A WebAssembly linear memory instance
///
/// All access is bounds-checked before touching the underlying data.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    current_pages: u32,
    max_pages: Option<u32>,
}

impl Memory {
    /// Create a new zero-filled memory instance with the given limits
    pub fn new(initial_pages: u32, max_pages: Option<u32>) -> Result<Self, MemoryError> {
        if initial_pages > MAX_PAGES {
            return Err(MemoryError::InitialExceedsMaximum {
                initial: initial_pages,
                max: MAX_PAGES,
            });
        }

        if let Some(max) = max_pages {
            if max > MAX_PAGES {
                return Err(MemoryError::MaximumTooLarge(max));
            }
            if initial_pages > max {
                return Err(MemoryError::InitialExceedsMaximum {
                    initial: initial_pages,
                    max,
                });
            }
        }

        Ok(Memory {
            data: vec![0u8; initial_pages as usize * PAGE_SIZE],
            current_pages: initial_pages,
            max_pages,
        })
    }

    /// Get the current memory size in pages
    pub fn size(&self) -> u32 {
        self.current_pages
    }

    /// Grow memory by the specified number of pages
    ///
    /// Returns the previous size in pages, or -1 if growth fails
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let current = self.current_pages;

        let Some(new_pages) = current.checked_add(delta_pages) else {
            return -1;
        };

        if new_pages > self.max_pages.unwrap_or(MAX_PAGES) {
            return -1;
        }

        let new_bytes = new_pages as usize * PAGE_SIZE;
        match self.data.try_reserve(new_bytes - self.data.len()) {
            Ok(()) => {
                self.data.resize(new_bytes, 0);
                self.current_pages = new_pages;
                current as i32
            }
            Err(_) => -1,
        }
    }

    /// Validate an access of `size` bytes at `addr + offset`
    ///
    /// The effective address is computed in 64 bits so the sum cannot wrap.
    #[inline]
    fn check_bounds(&self, addr: u32, offset: u32, size: usize) -> Result<usize, Trap> {
        let start = addr as u64 + offset as u64;
        let end = start.checked_add(size as u64).ok_or(Trap::MemoryOutOfBounds)?;
        if end > self.data.len() as u64 {
            return Err(Trap::MemoryOutOfBounds);
        }
        Ok(start as usize)
    }

    /// Read a little-endian u32
    pub fn read_u32(&self, addr: u32, offset: u32) -> Result<u32, Trap> {
        let start = self.check_bounds(addr, offset, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[start..start + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    /// Read a little-endian u64
    pub fn read_u64(&self, addr: u32, offset: u32) -> Result<u64, Trap> {
        let start = self.check_bounds(addr, offset, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[start..start + 8]);
        Ok(u64::from_le_bytes(bytes))
    }

    /// Write a little-endian u32
    pub fn write_u32(&mut self, addr: u32, offset: u32, value: u32) -> Result<(), Trap> {
        let start = self.check_bounds(addr, offset, 4)?;
        self.data[start..start + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Write a little-endian u64
    pub fn write_u64(&mut self, addr: u32, offset: u32, value: u64) -> Result<(), Trap> {
        let start = self.check_bounds(addr, offset, 8)?;
        self.data[start..start + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Copy `len` bytes out of memory
    pub fn read_bytes(&self, addr: u32, len: usize) -> Result<Vec<u8>, Trap> {
        let start = self.check_bounds(addr, 0, len)?;
        Ok(self.data[start..start + len].to_vec())
    }

    /// Copy `bytes` into memory
    pub fn write_bytes(&mut self, addr: u32, bytes: &[u8]) -> Result<(), Trap> {
        let start = self.check_bounds(addr, 0, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_creation() {
        let mem = Memory::new(1, None).unwrap();
        assert_eq!(mem.size(), 1);
        assert_eq!(mem.data.len(), PAGE_SIZE);

        assert_eq!(
            Memory::new(2, Some(1)).unwrap_err(),
            MemoryError::InitialExceedsMaximum { initial: 2, max: 1 }
        );
        assert_eq!(
            Memory::new(0, Some(MAX_PAGES + 1)).unwrap_err(),
            MemoryError::MaximumTooLarge(MAX_PAGES + 1)
        );
    }

    #[test]
    fn test_memory_grow() {
        let mut mem = Memory::new(1, Some(3)).unwrap();
        assert_eq!(mem.grow(1), 1);
        assert_eq!(mem.size(), 2);
        assert_eq!(mem.grow(2), -1);
        assert_eq!(mem.size(), 2);
        assert_eq!(mem.grow(0), 2);
    }

    #[test]
    fn test_read_write() {
        let mut mem = Memory::new(1, None).unwrap();
        mem.write_u32(8, 4, 0xdead_beef).unwrap();
        assert_eq!(mem.read_u32(12, 0).unwrap(), 0xdead_beef);
        assert_eq!(mem.read_bytes(12, 4).unwrap(), vec![0xef, 0xbe, 0xad, 0xde]);

        mem.write_u64(100, 0, u64::MAX - 1).unwrap();
        assert_eq!(mem.read_u64(96, 4).unwrap(), u64::MAX - 1);

        mem.write_bytes(0, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read_bytes(0, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_bounds() {
        let mut mem = Memory::new(1, None).unwrap();
        let last = (PAGE_SIZE - 4) as u32;
        assert!(mem.read_u32(last, 0).is_ok());
        assert_eq!(mem.read_u32(last + 1, 0), Err(Trap::MemoryOutOfBounds));
        assert_eq!(mem.read_u32(u32::MAX, u32::MAX), Err(Trap::MemoryOutOfBounds));
        assert_eq!(mem.write_u64(last, 0, 0), Err(Trap::MemoryOutOfBounds));

        let empty = Memory::new(0, None).unwrap();
        assert_eq!(empty.read_u32(0, 0), Err(Trap::MemoryOutOfBounds));
    }
}
