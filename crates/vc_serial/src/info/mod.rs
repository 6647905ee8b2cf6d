//! The immutable type graph consumed by the walk engine.
//!
//! ## Menu
//!
//! - [`TypeHash`]: 32-bit FNV-1a of a fully-qualified type name, the key of every cross reference.
//! - [`HashedName`]: a name stored together with its hash.
//! - [`TypeHeader`]: layout and versioning metadata shared by every descriptor.
//! - [`TypeDescriptor`]: a closed enum over the descriptor kinds:
//!     - [`FundamentalType`]: `bool`, integers up to 128 bits, `f32` and `f64`.
//!     - [`EnumType`]: named integer constants over an integer [`FundamentalKind`],
//!       optionally bitflags.
//!     - [`ArrayType`]: a fixed number of elements of one type.
//!     - [`RecordType`]: ordered [`Field`]s at byte offsets, base records and generic arguments.
//! - Flags:
//!     - [`SerializationFlags`]: `PACKED_FORMAT`, `TABLE_FORMAT`, `USES_BUILDER`, `RAW_BYTES`.
//!     - [`QualifierFlags`]: `CONST`, `VOLATILE`, `REFERENCE`, `POINTER`.
//!     - [`FieldFlags`]: per-field overrides.
//! - [`TypeKind`]: the discriminant of a [`TypeDescriptor`].
//!
//! Descriptors never hold references to each other, only [`TypeHash`]es
//! that are resolved through the [`TypeRegistry`](crate::registry::TypeRegistry).

// -----------------------------------------------------------------------------
// Modules

mod array_type;
mod enum_type;
mod flags;
mod fundamental;
mod name;
mod record_type;
mod type_descriptor;

// -----------------------------------------------------------------------------
// Exports

pub use array_type::ArrayType;
pub use enum_type::{EnumConstant, EnumType};
pub use flags::{FieldFlags, QualifierFlags, SerializationFlags};
pub use fundamental::{FundamentalKind, FundamentalType};
pub use name::{HashedName, TypeHash};
pub use record_type::{Field, RecordType};
pub use type_descriptor::{TypeDescriptor, TypeHeader, TypeKind, TypeKindError};
