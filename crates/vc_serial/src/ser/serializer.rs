use bitflags::bitflags;

use crate::error::SerialError;
use crate::info::{FundamentalKind, SerializationFlags};

// -----------------------------------------------------------------------------
// Mode & Format

/// Direction of a [`Serializer`], fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Reading,
    Writing,
}

/// Encoding family of a [`Serializer`], fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Binary,
    Text,
}

bitflags! {
    /// Options of one serialized stream.
    ///
    /// Reader and writer must agree on them, they are not recorded in the stream.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StreamFlags: u32 {
        /// Records carry no leading version integer.
        const UNVERSIONED = 1 << 0;
        /// Records carry no leading serialization-flags word.
        const NO_FLAGS = 1 << 1;
        /// Table entries without a matching field are decoded and dropped
        /// instead of failing, as long as their type is registered.
        const SKIP_UNKNOWN_FIELDS = 1 << 2;
    }
}

// -----------------------------------------------------------------------------
// Session

/// `begin`/`end` bookkeeping shared by the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Session {
    Idle,
    Active,
    Done,
}

impl Session {
    #[inline]
    pub(super) fn check_active(self) -> Result<(), SerialError> {
        match self {
            Self::Active => Ok(()),
            Self::Idle | Self::Done => Err(SerialError::NotBegun),
        }
    }

    pub(super) fn begin(&mut self) -> Result<(), SerialError> {
        match self {
            Self::Idle => {
                *self = Self::Active;
                Ok(())
            }
            Self::Active | Self::Done => Err(SerialError::AlreadyBegun),
        }
    }

    pub(super) fn end(&mut self) -> Result<(), SerialError> {
        self.check_active()?;
        *self = Self::Done;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// FieldHeader

/// Header preceding each value in table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldHeader {
    pub type_hash: u32,
    pub field_hash: u32,
}

// -----------------------------------------------------------------------------
// FundamentalMut

/// A mutable reference to one primitive value.
///
/// Writing serializers read through it, reading serializers store through it.
#[derive(Debug)]
pub enum FundamentalMut<'a> {
    Bool(&'a mut bool),
    I8(&'a mut i8),
    U8(&'a mut u8),
    I16(&'a mut i16),
    U16(&'a mut u16),
    I32(&'a mut i32),
    U32(&'a mut u32),
    I64(&'a mut i64),
    U64(&'a mut u64),
    I128(&'a mut i128),
    U128(&'a mut u128),
    F32(&'a mut f32),
    F64(&'a mut f64),
}

impl FundamentalMut<'_> {
    /// Returns the kind of the referenced primitive.
    pub const fn kind(&self) -> FundamentalKind {
        match self {
            Self::Bool(_) => FundamentalKind::Bool,
            Self::I8(_) => FundamentalKind::I8,
            Self::U8(_) => FundamentalKind::U8,
            Self::I16(_) => FundamentalKind::I16,
            Self::U16(_) => FundamentalKind::U16,
            Self::I32(_) => FundamentalKind::I32,
            Self::U32(_) => FundamentalKind::U32,
            Self::I64(_) => FundamentalKind::I64,
            Self::U64(_) => FundamentalKind::U64,
            Self::I128(_) => FundamentalKind::I128,
            Self::U128(_) => FundamentalKind::U128,
            Self::F32(_) => FundamentalKind::F32,
            Self::F64(_) => FundamentalKind::F64,
        }
    }
}

// -----------------------------------------------------------------------------
// Serializer

/// Primitive operations a format backend provides.
///
/// The contract is direction-symmetric: the walk issues the same sequence of
/// calls when writing and when reading, and the backend either emits or
/// consumes. Size parameters are in/out: the caller supplies them when
/// writing, the backend fills them in when reading.
///
/// Nothing may be called before [`begin`](Self::begin) succeeds. Stream
/// failures surface as [`SerialError::Stream`] without being rewrapped.
pub trait Serializer {
    fn mode(&self) -> Mode;

    fn format(&self) -> Format;

    fn flags(&self) -> StreamFlags;

    /// Returns `true` in [`Mode::Reading`].
    #[inline]
    fn is_reading(&self) -> bool {
        self.mode() == Mode::Reading
    }

    /// Start the session. On failure the whole operation must be abandoned.
    fn begin(&mut self) -> Result<(), SerialError>;

    /// Finish the session, flushing anything buffered.
    fn end(&mut self) -> Result<(), SerialError>;

    /// Open a composite value. `name` is the record's type name.
    fn begin_record(&mut self, name: &str) -> Result<(), SerialError>;

    fn end_record(&mut self) -> Result<(), SerialError>;

    /// Open a sequence of `count` elements.
    fn begin_array(&mut self, count: &mut u32) -> Result<(), SerialError>;

    fn end_array(&mut self) -> Result<(), SerialError>;

    /// Open a keyed container of `count` entries.
    fn begin_object(&mut self, count: &mut u32) -> Result<(), SerialError>;

    fn end_object(&mut self) -> Result<(), SerialError>;

    /// Open an inline string of `len` bytes.
    fn begin_text(&mut self, len: &mut u32) -> Result<(), SerialError>;

    /// Transfer the string opened by [`begin_text`](Self::begin_text).
    ///
    /// `buf.len()` is the capacity, a longer string is [`SerialError::Capacity`].
    fn end_text(&mut self, buf: &mut [u8], len: u32) -> Result<(), SerialError>;

    /// Open a raw byte blob of `len` bytes.
    fn begin_bytes(&mut self, len: &mut u32) -> Result<(), SerialError>;

    /// Transfer exactly `buf.len()` bytes of the blob.
    fn end_bytes(&mut self, buf: &mut [u8]) -> Result<(), SerialError>;

    /// Mark the start of the named record member.
    fn serialize_field(&mut self, name: &str) -> Result<(), SerialError>;

    /// Mark the value just transferred as the key of a keyed-container entry.
    fn serialize_key(&mut self) -> Result<(), SerialError>;

    /// The leading version integer of a record.
    fn serialize_version(&mut self, version: &mut u32) -> Result<(), SerialError>;

    /// The leading serialization-flags word of a record.
    fn serialize_flags(&mut self, flags: &mut SerializationFlags) -> Result<(), SerialError>;

    /// The header preceding a table-format value.
    fn serialize_field_header(&mut self, header: &mut FieldHeader) -> Result<(), SerialError>;

    /// One primitive value.
    ///
    /// Booleans are written as canonical `0`/`1`, any nonzero stored value
    /// reads back as `true`.
    fn serialize_fundamental(&mut self, value: FundamentalMut<'_>) -> Result<(), SerialError>;
}
