use alloc::borrow::Cow;
use alloc::string::String;
use core::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vc_utils::hash::fnv1a_32;

// -----------------------------------------------------------------------------
// TypeHash

/// Stable identity of a type, the FNV-1a 32 hash of its fully-qualified name.
///
/// # Interchange form
///
/// `TypeHash` serializes as a plain `u32`. When deserializing it also accepts
/// a string, which is hashed, so a hand-written type graph can refer to
/// `"i32"` instead of its hash.
///
/// # Examples
///
/// ```
/// use vc_serial::info::TypeHash;
///
/// let hash = TypeHash::of("game::Player");
/// assert_eq!(hash, TypeHash::of("game::Player"));
/// assert_ne!(hash, TypeHash::of("game::Enemy"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHash(u32);

impl TypeHash {
    /// Hash a fully-qualified type name.
    #[inline]
    pub const fn of(name: &str) -> Self {
        Self(fnv1a_32(name))
    }

    /// Wrap a hash that was computed elsewhere, e.g. read from a stream.
    #[inline]
    pub const fn from_raw(hash: u32) -> Self {
        Self(hash)
    }

    /// Returns the raw 32-bit hash.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#010x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Serialize for TypeHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for TypeHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TypeHashVisitor;

        impl Visitor<'_> for TypeHashVisitor {
            type Value = TypeHash;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a type name or a 32-bit type hash")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TypeHash::of(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                u32::try_from(v)
                    .map(TypeHash)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u32::try_from(v)
                    .map(TypeHash)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(TypeHashVisitor)
    }
}

// -----------------------------------------------------------------------------
// HashedName

/// A type, field or constant name stored with its FNV-1a 32 hash.
///
/// The hash is always recomputed from the text, it is never read from
/// interchange data. Serializes as a plain string.
#[derive(Clone)]
pub struct HashedName {
    text: Cow<'static, str>,
    hash: u32,
}

impl HashedName {
    /// Create a name and hash it.
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        let text = text.into();
        let hash = fnv1a_32(&text);
        Self { text, hash }
    }

    /// Returns the name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the FNV-1a 32 hash of the name.
    #[inline]
    pub const fn hash(&self) -> u32 {
        self.hash
    }
}

impl PartialEq for HashedName {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for HashedName {}

impl PartialEq<str> for HashedName {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl fmt::Debug for HashedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.text, f)
    }
}

impl fmt::Display for HashedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}

impl From<&'static str> for HashedName {
    #[inline]
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl Serialize for HashedName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for HashedName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::new(text))
    }
}
