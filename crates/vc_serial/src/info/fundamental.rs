use core::fmt;

use serde::{Deserialize, Serialize};

use crate::info::{TypeHash, TypeHeader};

// -----------------------------------------------------------------------------
// FundamentalKind

/// The primitive kinds a [`FundamentalType`] can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FundamentalKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    F32,
    F64,
}

impl FundamentalKind {
    /// Every kind, in declaration order.
    pub const ALL: [FundamentalKind; 13] = [
        Self::Bool,
        Self::I8,
        Self::U8,
        Self::I16,
        Self::U16,
        Self::I32,
        Self::U32,
        Self::I64,
        Self::U64,
        Self::I128,
        Self::U128,
        Self::F32,
        Self::F64,
    ];

    /// Size in bytes, equal to `size_of` the Rust primitive.
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
            Self::I128 | Self::U128 => 16,
        }
    }

    /// Alignment in bytes, equal to `align_of` the Rust primitive.
    pub const fn alignment(self) -> usize {
        match self {
            Self::I128 => align_of::<i128>(),
            Self::U128 => align_of::<u128>(),
            _ => self.size(),
        }
    }

    /// The type name, which is also what [`TypeHash`] is computed from.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::I16 => "i16",
            Self::U16 => "u16",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::I128 => "i128",
            Self::U128 => "u128",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// Returns the [`TypeHash`] of this kind's descriptor.
    #[inline]
    pub const fn type_hash(self) -> TypeHash {
        TypeHash::of(self.type_name())
    }

    /// Returns `true` for the integer kinds up to 64 bits, the ones usable under an enum.
    pub const fn is_enum_compatible(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::U8
                | Self::I16
                | Self::U16
                | Self::I32
                | Self::U32
                | Self::I64
                | Self::U64
        )
    }

    /// Returns `true` for signed integer kinds.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::I128)
    }
}

impl fmt::Display for FundamentalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.type_name())
    }
}

// -----------------------------------------------------------------------------
// FundamentalType

/// Descriptor of a primitive value.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{FundamentalKind, FundamentalType, TypeHash};
///
/// let info = FundamentalType::new(FundamentalKind::U16);
/// assert_eq!(info.header().size(), 2);
/// assert_eq!(info.header().hash(), TypeHash::of("u16"));
/// assert_eq!(info.header().serialized_version(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalType {
    header: TypeHeader,
    kind: FundamentalKind,
}

impl FundamentalType {
    /// Create the descriptor of a primitive, serializable at version 1.
    pub fn new(kind: FundamentalKind) -> Self {
        Self {
            header: TypeHeader::new(kind.type_name(), kind.size(), kind.alignment())
                .with_version(1),
            kind,
        }
    }

    /// Returns the [`TypeHeader`].
    #[inline]
    pub const fn header(&self) -> &TypeHeader {
        &self.header
    }

    /// Returns the primitive kind.
    #[inline]
    pub const fn kind(&self) -> FundamentalKind {
        self.kind
    }
}
