//! The format backend capability and its binary and text implementations.
//!
//! ## Menu
//!
//! - [`Serializer`]: the direction-symmetric primitive contract. The same
//!   calls read or write depending on [`Mode`].
//! - [`BinarySerializer`]: compact little-endian framing, native-order primitives.
//! - [`TextSerializer`]: a whitespace-separated, human-readable token stream.
//! - [`FundamentalMut`]: one `&mut` primitive handed to [`Serializer::serialize_fundamental`].
//! - [`FieldHeader`]: the `(type hash, field hash)` pair preceding table-format values.
//! - [`StreamFlags`]: per-stream options (`UNVERSIONED`, `NO_FLAGS`, `SKIP_UNKNOWN_FIELDS`).

// -----------------------------------------------------------------------------
// Modules

mod binary;
mod serializer;
mod text;

// -----------------------------------------------------------------------------
// Exports

pub use binary::BinarySerializer;
pub use serializer::{FieldHeader, Format, FundamentalMut, Mode, Serializer, StreamFlags};
pub use text::TextSerializer;
