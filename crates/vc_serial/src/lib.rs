#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod builder;
pub mod error;
pub mod info;
pub mod registry;
pub mod ser;
pub mod stream;
pub mod walk;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use builder::{Archive, SerializationBuilder, archive};
pub use error::{SchemaError, SerialError};
pub use registry::TypeRegistry;
pub use ser::{BinarySerializer, Serializer, TextSerializer};
pub use walk::{WalkContext, serialize, serialize_type, serialize_with};
