use alloc::borrow::Cow;
use core::{error, fmt};

use serde::{Deserialize, Serialize};

use crate::info::{ArrayType, EnumType, FundamentalKind, FundamentalType, RecordType};
use crate::info::{HashedName, SerializationFlags, TypeHash};

// -----------------------------------------------------------------------------
// TypeHeader

/// Layout and versioning metadata shared by every [`TypeDescriptor`].
///
/// A `serialized_version` of 0 means the type is not serializable, the
/// walk rejects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeHeader {
    name: HashedName,
    size: usize,
    alignment: usize,
    #[serde(default)]
    serialized_version: u32,
    #[serde(default)]
    serialization_flags: SerializationFlags,
}

impl TypeHeader {
    /// Create a header with version 0 and no flags.
    pub fn new(name: impl Into<Cow<'static, str>>, size: usize, alignment: usize) -> Self {
        Self {
            name: HashedName::new(name),
            size,
            alignment,
            serialized_version: 0,
            serialization_flags: SerializationFlags::empty(),
        }
    }

    /// Replace the current serialized version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.serialized_version = version;
        self
    }

    /// Replace the serialization flags.
    pub fn with_flags(mut self, flags: SerializationFlags) -> Self {
        self.serialization_flags = flags;
        self
    }

    /// Returns the stable identity of the type.
    #[inline]
    pub const fn hash(&self) -> TypeHash {
        TypeHash::from_raw(self.name.hash())
    }

    /// Returns the fully-qualified name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline]
    pub const fn serialized_version(&self) -> u32 {
        self.serialized_version
    }

    #[inline]
    pub const fn serialization_flags(&self) -> SerializationFlags {
        self.serialization_flags
    }

    /// Returns `true` if the type may be serialized at all.
    #[inline]
    pub const fn is_serializable(&self) -> bool {
        self.serialized_version > 0
    }
}

// -----------------------------------------------------------------------------
// TypeKind

/// The kind of a [`TypeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Fundamental,
    Enum,
    Array,
    Record,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fundamental => f.pad("Fundamental"),
            Self::Enum => f.pad("Enum"),
            Self::Array => f.pad("Array"),
            Self::Record => f.pad("Record"),
        }
    }
}

/// Error returned when a [`TypeDescriptor`] is not the expected [`TypeKind`].
#[derive(Debug)]
pub struct TypeKindError {
    pub expected: TypeKind,
    pub received: TypeKind,
}

impl fmt::Display for TypeKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type kind mismatch: expected {}, received {}",
            self.expected, self.received
        )
    }
}

impl error::Error for TypeKindError {}

// -----------------------------------------------------------------------------
// TypeDescriptor

/// Runtime description of a type's shape.
///
/// Descriptors are produced once by an external reflection stage, registered
/// in a [`TypeRegistry`](crate::registry::TypeRegistry) and never mutated
/// afterwards. Cross references (fields, bases, array elements) are
/// [`TypeHash`]es resolved through the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Fundamental(FundamentalType),
    Enum(EnumType),
    Array(ArrayType),
    Record(RecordType),
}

// Helper macro that implements type-safe accessor methods like `as_record`.
macro_rules! impl_cast_method {
    ($name:ident : $kind:ident => $info:ident) => {
        /// Convert [`TypeDescriptor`] to the descriptor of a specific kind.
        pub const fn $name(&self) -> Result<&$info, TypeKindError> {
            match self {
                Self::$kind(info) => Ok(info),
                _ => Err(TypeKindError {
                    expected: TypeKind::$kind,
                    received: self.kind(),
                }),
            }
        }
    };
}

impl TypeDescriptor {
    impl_cast_method!(as_fundamental: Fundamental => FundamentalType);
    impl_cast_method!(as_enum: Enum => EnumType);
    impl_cast_method!(as_array: Array => ArrayType);
    impl_cast_method!(as_record: Record => RecordType);

    /// Shorthand for `TypeDescriptor::Fundamental(FundamentalType::new(kind))`.
    #[inline]
    pub fn fundamental(kind: FundamentalKind) -> Self {
        Self::Fundamental(FundamentalType::new(kind))
    }

    /// Returns the [`TypeHeader`].
    pub const fn header(&self) -> &TypeHeader {
        match self {
            Self::Fundamental(info) => info.header(),
            Self::Enum(info) => info.header(),
            Self::Array(info) => info.header(),
            Self::Record(info) => info.header(),
        }
    }

    /// Returns the [`TypeKind`].
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Fundamental(_) => TypeKind::Fundamental,
            Self::Enum(_) => TypeKind::Enum,
            Self::Array(_) => TypeKind::Array,
            Self::Record(_) => TypeKind::Record,
        }
    }

    #[inline]
    pub const fn hash(&self) -> TypeHash {
        self.header().hash()
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.header().name()
    }

    #[inline]
    pub const fn size(&self) -> usize {
        self.header().size()
    }

    #[inline]
    pub const fn serialized_version(&self) -> u32 {
        self.header().serialized_version()
    }

    #[inline]
    pub const fn serialization_flags(&self) -> SerializationFlags {
        self.header().serialization_flags()
    }
}

impl From<FundamentalType> for TypeDescriptor {
    #[inline]
    fn from(value: FundamentalType) -> Self {
        Self::Fundamental(value)
    }
}

impl From<EnumType> for TypeDescriptor {
    #[inline]
    fn from(value: EnumType) -> Self {
        Self::Enum(value)
    }
}

impl From<ArrayType> for TypeDescriptor {
    #[inline]
    fn from(value: ArrayType) -> Self {
        Self::Array(value)
    }
}

impl From<RecordType> for TypeDescriptor {
    #[inline]
    fn from(value: RecordType) -> Self {
        Self::Record(value)
    }
}
