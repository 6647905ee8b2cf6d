use alloc::borrow::Cow;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::info::{FundamentalKind, HashedName, TypeHeader};

// -----------------------------------------------------------------------------
// EnumConstant

/// A named constant of an [`EnumType`].
///
/// Values are kept as `i64`. Constants of a `u64` enum above `i64::MAX`
/// are stored with the same bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumConstant {
    name: HashedName,
    value: i64,
}

impl EnumConstant {
    /// Create a constant.
    pub fn new(name: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self {
            name: HashedName::new(name),
            value,
        }
    }

    /// Returns the constant name.
    #[inline]
    pub const fn name(&self) -> &HashedName {
        &self.name
    }

    /// Returns the constant value.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.value
    }
}

// -----------------------------------------------------------------------------
// EnumType

/// Descriptor of an enumeration over an integer [`FundamentalKind`].
///
/// In binary formats an enum is its underlying integer. Text formats write
/// constant names, see [`enum_codec`](crate::walk::enum_codec).
///
/// # Examples
///
/// ```
/// use vc_serial::info::{EnumType, FundamentalKind};
///
/// let info = EnumType::new("game::Access", FundamentalKind::U8)
///     .flags()
///     .with_constant("Read", 1)
///     .with_constant("Write", 2);
///
/// assert!(info.is_flags());
/// assert_eq!(info.header().size(), 1);
/// assert_eq!(info.find_by_value(2).unwrap().name().as_str(), "Write");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    header: TypeHeader,
    underlying: FundamentalKind,
    #[serde(default)]
    constants: Vec<EnumConstant>,
    #[serde(default)]
    is_flags: bool,
}

impl EnumType {
    /// Create an enum without constants, serializable at version 1.
    pub fn new(name: impl Into<Cow<'static, str>>, underlying: FundamentalKind) -> Self {
        Self {
            header: TypeHeader::new(name, underlying.size(), underlying.alignment())
                .with_version(1),
            underlying,
            constants: Vec::new(),
            is_flags: false,
        }
    }

    /// Mark the enum as a bitmask.
    pub fn flags(mut self) -> Self {
        self.is_flags = true;
        self
    }

    /// Append a constant, declaration order is kept.
    pub fn with_constant(mut self, name: impl Into<Cow<'static, str>>, value: i64) -> Self {
        self.constants.push(EnumConstant::new(name, value));
        self
    }

    /// Replace the [`TypeHeader`]'s version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.header = self.header.with_version(version);
        self
    }

    /// Returns the [`TypeHeader`].
    #[inline]
    pub const fn header(&self) -> &TypeHeader {
        &self.header
    }

    /// Returns the underlying integer kind.
    #[inline]
    pub const fn underlying(&self) -> FundamentalKind {
        self.underlying
    }

    /// Returns `true` if values are OR-combined bitmasks.
    #[inline]
    pub const fn is_flags(&self) -> bool {
        self.is_flags
    }

    /// Returns the constants in declaration order.
    #[inline]
    pub fn constants(&self) -> &[EnumConstant] {
        &self.constants
    }

    /// Returns the first constant with exactly this value.
    pub fn find_by_value(&self, value: i64) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.value == value)
    }

    /// Returns the first constant whose name hashes to `hash`.
    pub fn find_by_name_hash(&self, hash: u32) -> Option<&EnumConstant> {
        self.constants.iter().find(|c| c.name.hash() == hash)
    }
}
