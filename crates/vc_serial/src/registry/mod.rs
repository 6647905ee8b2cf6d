//! Type lookup by hash, builder registration and schema validation.
//!
//! ## Menu
//!
//! - [`TypeRegistry`]: owns every [`TypeDescriptor`](crate::info::TypeDescriptor)
//!   and the hand-written builders, keyed by [`TypeHash`](crate::info::TypeHash).
//! - [`TypeGraph`]: the serde interchange form produced by a codegen stage.
//!
//! A registry is built once, validated with [`TypeRegistry::validate`] and
//! then shared by reference. The walk never mutates it.

// -----------------------------------------------------------------------------
// Modules

mod graph;
mod type_registry;
mod validate;

// -----------------------------------------------------------------------------
// Exports

pub use graph::TypeGraph;
pub use type_registry::TypeRegistry;
