use alloc::format;

use crate::error::SerialError;
use crate::info::SerializationFlags;
use crate::ser::serializer::Session;
use crate::ser::{FieldHeader, Format, FundamentalMut, Mode, Serializer, StreamFlags};
use crate::stream::Stream;

// -----------------------------------------------------------------------------
// BinarySerializer

/// Compact binary backend.
///
/// - Counts and lengths: little-endian `i32`, negative values are rejected.
/// - Version: little-endian `i32`. Flags word: little-endian `u32`.
/// - Field header: two little-endian `u32`, type hash then field hash.
/// - Primitives: native byte order, their in-memory size.
/// - Record boundaries, field names and key markers produce no bytes.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use vc_serial::ser::{BinarySerializer, FundamentalMut, Serializer};
///
/// let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
/// ser.begin().unwrap();
/// let mut count = 3_u32;
/// ser.begin_array(&mut count).unwrap();
/// ser.end_array().unwrap();
/// ser.serialize_fundamental(FundamentalMut::Bool(&mut true)).unwrap();
/// ser.end().unwrap();
///
/// assert_eq!(ser.into_inner().into_inner(), [3, 0, 0, 0, 1]);
/// ```
#[derive(Debug)]
pub struct BinarySerializer<S> {
    stream: S,
    mode: Mode,
    flags: StreamFlags,
    session: Session,
}

impl<S: Stream> BinarySerializer<S> {
    /// Creates a serializer that writes into `stream`.
    pub const fn writer(stream: S) -> Self {
        Self::new(stream, Mode::Writing)
    }

    /// Creates a serializer that reads from `stream`.
    pub const fn reader(stream: S) -> Self {
        Self::new(stream, Mode::Reading)
    }

    const fn new(stream: S, mode: Mode) -> Self {
        Self {
            stream,
            mode,
            flags: StreamFlags::empty(),
            session: Session::Idle,
        }
    }

    /// Sets the stream options, see [`StreamFlags`].
    pub const fn with_flags(mut self, flags: StreamFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    #[inline]
    fn check_active(&self) -> Result<(), SerialError> {
        self.session.check_active()
    }

    fn transfer<const N: usize>(&mut self, bytes: &mut [u8; N]) -> Result<(), SerialError> {
        self.check_active()?;
        match self.mode {
            Mode::Writing => self.stream.write_all_bytes(bytes)?,
            Mode::Reading => self.stream.read_exact_bytes(bytes)?,
        }
        Ok(())
    }

    fn transfer_slice(&mut self, buf: &mut [u8]) -> Result<(), SerialError> {
        self.check_active()?;
        match self.mode {
            Mode::Writing => self.stream.write_all_bytes(buf)?,
            Mode::Reading => self.stream.read_exact_bytes(buf)?,
        }
        Ok(())
    }

    /// Counts and lengths travel as little-endian `i32`.
    fn serialize_count(&mut self, count: &mut u32, what: &str) -> Result<(), SerialError> {
        let mut bytes = match self.mode {
            Mode::Writing => {
                let value = i32::try_from(*count).map_err(|_| SerialError::Capacity {
                    needed: *count as usize,
                    capacity: i32::MAX as usize,
                })?;
                value.to_le_bytes()
            }
            Mode::Reading => [0; 4],
        };
        self.transfer(&mut bytes)?;
        if self.mode == Mode::Reading {
            let value = i32::from_le_bytes(bytes);
            *count = u32::try_from(value)
                .map_err(|_| SerialError::malformed(format!("negative {what} {value}")))?;
        }
        Ok(())
    }

    /// A payload length, which cannot exceed the bytes left when reading.
    fn serialize_length(&mut self, len: &mut u32, what: &str) -> Result<(), SerialError> {
        self.serialize_count(len, what)?;
        if self.mode == Mode::Reading {
            let remaining = self.stream.remaining()?;
            if u64::from(*len) > remaining {
                return Err(SerialError::malformed(format!(
                    "{what} {len} exceeds the {remaining} bytes left"
                )));
            }
        }
        Ok(())
    }
}

macro_rules! transfer_ne {
    ($this:ident, $value:ident, $ty:ty) => {{
        let mut bytes = <$ty>::to_ne_bytes(*$value);
        $this.transfer(&mut bytes)?;
        if $this.mode == Mode::Reading {
            *$value = <$ty>::from_ne_bytes(bytes);
        }
        Ok(())
    }};
}

impl<S: Stream> Serializer for BinarySerializer<S> {
    #[inline]
    fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    fn format(&self) -> Format {
        Format::Binary
    }

    #[inline]
    fn flags(&self) -> StreamFlags {
        self.flags
    }

    fn begin(&mut self) -> Result<(), SerialError> {
        self.session.begin()
    }

    fn end(&mut self) -> Result<(), SerialError> {
        self.session.end()
    }

    fn begin_record(&mut self, _name: &str) -> Result<(), SerialError> {
        self.check_active()
    }

    fn end_record(&mut self) -> Result<(), SerialError> {
        self.check_active()
    }

    fn begin_array(&mut self, count: &mut u32) -> Result<(), SerialError> {
        self.serialize_count(count, "array count")
    }

    fn end_array(&mut self) -> Result<(), SerialError> {
        self.check_active()
    }

    fn begin_object(&mut self, count: &mut u32) -> Result<(), SerialError> {
        self.serialize_count(count, "object count")
    }

    fn end_object(&mut self) -> Result<(), SerialError> {
        self.check_active()
    }

    fn begin_text(&mut self, len: &mut u32) -> Result<(), SerialError> {
        self.serialize_length(len, "text length")
    }

    fn end_text(&mut self, buf: &mut [u8], len: u32) -> Result<(), SerialError> {
        let len = len as usize;
        if len > buf.len() {
            return Err(SerialError::Capacity {
                needed: len,
                capacity: buf.len(),
            });
        }
        self.transfer_slice(&mut buf[..len])
    }

    fn begin_bytes(&mut self, len: &mut u32) -> Result<(), SerialError> {
        self.serialize_length(len, "byte length")
    }

    fn end_bytes(&mut self, buf: &mut [u8]) -> Result<(), SerialError> {
        self.transfer_slice(buf)
    }

    fn serialize_field(&mut self, _name: &str) -> Result<(), SerialError> {
        self.check_active()
    }

    fn serialize_key(&mut self) -> Result<(), SerialError> {
        self.check_active()
    }

    fn serialize_version(&mut self, version: &mut u32) -> Result<(), SerialError> {
        self.serialize_count(version, "version")
    }

    fn serialize_flags(&mut self, flags: &mut SerializationFlags) -> Result<(), SerialError> {
        let mut bytes = flags.bits().to_le_bytes();
        self.transfer(&mut bytes)?;
        if self.mode == Mode::Reading {
            *flags = SerializationFlags::from_bits_retain(u32::from_le_bytes(bytes));
        }
        Ok(())
    }

    fn serialize_field_header(&mut self, header: &mut FieldHeader) -> Result<(), SerialError> {
        let mut type_hash = header.type_hash.to_le_bytes();
        let mut field_hash = header.field_hash.to_le_bytes();
        self.transfer(&mut type_hash)?;
        self.transfer(&mut field_hash)?;
        if self.mode == Mode::Reading {
            header.type_hash = u32::from_le_bytes(type_hash);
            header.field_hash = u32::from_le_bytes(field_hash);
        }
        Ok(())
    }

    fn serialize_fundamental(&mut self, value: FundamentalMut<'_>) -> Result<(), SerialError> {
        match value {
            FundamentalMut::Bool(v) => {
                let mut bytes = [u8::from(*v)];
                self.transfer(&mut bytes)?;
                if self.mode == Mode::Reading {
                    *v = bytes[0] != 0;
                }
                Ok(())
            }
            FundamentalMut::I8(v) => transfer_ne!(self, v, i8),
            FundamentalMut::U8(v) => transfer_ne!(self, v, u8),
            FundamentalMut::I16(v) => transfer_ne!(self, v, i16),
            FundamentalMut::U16(v) => transfer_ne!(self, v, u16),
            FundamentalMut::I32(v) => transfer_ne!(self, v, i32),
            FundamentalMut::U32(v) => transfer_ne!(self, v, u32),
            FundamentalMut::I64(v) => transfer_ne!(self, v, i64),
            FundamentalMut::U64(v) => transfer_ne!(self, v, u64),
            FundamentalMut::I128(v) => transfer_ne!(self, v, i128),
            FundamentalMut::U128(v) => transfer_ne!(self, v, u128),
            FundamentalMut::F32(v) => transfer_ne!(self, v, f32),
            FundamentalMut::F64(v) => transfer_ne!(self, v, f64),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
