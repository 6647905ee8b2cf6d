use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::error::SerialError;

/// Default capacity of a [`ScratchBuffer`] in bytes.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 1024;

/// Fixed-capacity buffer for enum text.
///
/// Owned by a [`WalkContext`](super::WalkContext), so a walk never touches
/// global or thread-local state. It never grows: writing past the capacity
/// fails with [`SerialError::Capacity`].
#[derive(Debug, Clone)]
pub struct ScratchBuffer {
    bytes: Vec<u8>,
    len: usize,
    needed: usize,
}

impl ScratchBuffer {
    /// Creates a buffer holding at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
            len: 0,
            needed: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.needed = 0;
    }

    /// The filled part as text.
    pub fn as_str(&self) -> Result<&str, SerialError> {
        core::str::from_utf8(&self.bytes[..self.len]).map_err(|_| SerialError::InvalidUtf8)
    }

    /// The whole backing storage, for a serializer to read into.
    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Marks the first `len` bytes of the storage as filled.
    pub(crate) fn set_len(&mut self, len: usize) -> Result<(), SerialError> {
        if len > self.capacity() {
            return Err(self.overflow(len));
        }
        self.len = len;
        Ok(())
    }

    /// The error reported after a failed [`fmt::Write`].
    pub(crate) fn overflow(&self, needed: usize) -> SerialError {
        SerialError::Capacity {
            needed: needed.max(self.needed),
            capacity: self.capacity(),
        }
    }
}

impl Default for ScratchBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SCRATCH_CAPACITY)
    }
}

impl fmt::Write for ScratchBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len + s.len();
        if end > self.capacity() {
            self.needed = end;
            return Err(fmt::Error);
        }
        self.bytes[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use super::*;

    #[test]
    fn rejects_overflow() {
        let mut scratch = ScratchBuffer::with_capacity(4);
        scratch.write_str("abc").unwrap();
        assert!(scratch.write_str("de").is_err());
        assert_eq!(scratch.as_str().unwrap(), "abc");

        let err = scratch.overflow(scratch.len());
        assert!(matches!(err, SerialError::Capacity { needed: 5, capacity: 4 }));
    }
}
