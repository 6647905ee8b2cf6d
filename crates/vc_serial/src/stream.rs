//! The byte pipe a serializer backend reads from or writes to.
//!
//! No format logic lives here. With the `std` feature any
//! `std::io::Read + Write + Seek` value is a [`Stream`], e.g.
//! `Cursor<Vec<u8>>` or `File`. Without it, implement the trait directly.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::SerialError;

/// Cursor movement, the same three origins as `std::io::SeekFrom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    End(i64),
    Current(i64),
}

/// Minimal stream capability consumed by the serializer backends.
pub trait Stream {
    /// Read up to `buf.len()` bytes, returns the number read (0 at the end).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// Write up to `buf.len()` bytes, returns the number written.
    fn write(&mut self, buf: &[u8]) -> Result<usize, SerialError>;

    /// Move the cursor, returns the new offset from the start.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, SerialError>;

    /// Total size of the stream in bytes.
    fn size(&mut self) -> Result<u64, SerialError>;

    /// Current offset from the start.
    fn offset(&mut self) -> Result<u64, SerialError>;

    /// Bytes between the current offset and the end.
    fn remaining(&mut self) -> Result<u64, SerialError> {
        let offset = self.offset()?;
        Ok(self.size()?.saturating_sub(offset))
    }

    /// Fill `buf` completely or fail with [`SerialError::UnexpectedEof`].
    fn read_exact_bytes(&mut self, mut buf: &mut [u8]) -> Result<(), SerialError> {
        while !buf.is_empty() {
            match self.read(buf)? {
                0 => return Err(SerialError::UnexpectedEof { missing: buf.len() }),
                n => buf = &mut buf[n..],
            }
        }
        Ok(())
    }

    /// Write all of `buf` or fail with [`SerialError::WriteZero`].
    fn write_all_bytes(&mut self, mut buf: &[u8]) -> Result<(), SerialError> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(SerialError::WriteZero { pending: buf.len() }),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }

    /// Read everything from the current offset to the end.
    fn read_remaining(&mut self) -> Result<Vec<u8>, SerialError> {
        let remaining = self.remaining()?;
        let len = usize::try_from(remaining).map_err(|_| SerialError::Capacity {
            needed: usize::MAX,
            capacity: isize::MAX as usize,
        })?;
        let mut buf = vec![0; len];
        self.read_exact_bytes(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(feature = "std")]
mod io_impls {
    use std::io::{self, ErrorKind, Read, Seek, Write};

    use super::{SeekFrom, Stream};
    use crate::error::SerialError;

    impl From<SeekFrom> for io::SeekFrom {
        fn from(pos: SeekFrom) -> Self {
            match pos {
                SeekFrom::Start(n) => io::SeekFrom::Start(n),
                SeekFrom::End(n) => io::SeekFrom::End(n),
                SeekFrom::Current(n) => io::SeekFrom::Current(n),
            }
        }
    }

    impl<T: Read + Write + Seek> Stream for T {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
            loop {
                match Read::read(self, buf) {
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    other => return Ok(other?),
                }
            }
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize, SerialError> {
            loop {
                match Write::write(self, buf) {
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    other => return Ok(other?),
                }
            }
        }

        #[inline]
        fn seek(&mut self, pos: SeekFrom) -> Result<u64, SerialError> {
            Ok(Seek::seek(self, pos.into())?)
        }

        fn size(&mut self) -> Result<u64, SerialError> {
            let offset = Seek::stream_position(self)?;
            let size = Seek::seek(self, io::SeekFrom::End(0))?;
            if offset != size {
                Seek::seek(self, io::SeekFrom::Start(offset))?;
            }
            Ok(size)
        }

        #[inline]
        fn offset(&mut self) -> Result<u64, SerialError> {
            Ok(Seek::stream_position(self)?)
        }
    }
}
