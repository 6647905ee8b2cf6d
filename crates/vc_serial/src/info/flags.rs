use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// How a type is encoded.
    ///
    /// The flags are informative rather than exclusive. A type may set both
    /// `PACKED_FORMAT` and `TABLE_FORMAT`; see [`Encoding`](crate::walk::Encoding)
    /// for how the walk picks one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SerializationFlags: u32 {
        /// Positional fields without self-description.
        const PACKED_FORMAT = 1 << 0;
        /// Each field is preceded by a `(type hash, field hash)` header.
        const TABLE_FORMAT = 1 << 1;
        /// Serialized by a hand-written builder registered for the type.
        const USES_BUILDER = 1 << 2;
        /// The whole value is copied as raw bytes.
        const RAW_BYTES = 1 << 3;
    }
}

bitflags! {
    /// Qualifiers of a field's declared type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct QualifierFlags: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const REFERENCE = 1 << 2;
        const POINTER = 1 << 3;
    }
}

impl QualifierFlags {
    /// Pointer and reference fields refer to data the record does not own.
    #[inline]
    pub const fn is_indirect(self) -> bool {
        self.intersects(Self::REFERENCE.union(Self::POINTER))
    }
}

bitflags! {
    /// Per-field encoding overrides.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FieldFlags: u8 {
        /// Copy the field's bytes verbatim instead of walking its type.
        const RAW_BYTES = 1 << 0;
    }
}
