//! Hand-written serialization logic.
//!
//! ## Menu
//!
//! - [`SerializationBuilder`]: a scope over one serializer that writes or
//!   reads a record with explicitly versioned fields, or a container.
//! - [`BuilderFn`]: the signature of builders registered in a
//!   [`TypeRegistry`], run by the walk for `USES_BUILDER` types and for
//!   fields naming a custom serializer.
//! - [`Archive`]: typed Rust values that serialize through a builder, with
//!   implementations for primitives, strings, paths and std containers.
//! - [`archive`]: serializes one [`Archive`] value as a complete session.

use crate::error::SerialError;
use crate::registry::TypeRegistry;
use crate::ser::Serializer;
use crate::walk::WalkContext;

// -----------------------------------------------------------------------------
// Modules

mod archive_impls;
mod serialization_builder;

// -----------------------------------------------------------------------------
// Exports

pub use serialization_builder::{ContainerKind, SerializationBuilder};

/// A builder registered for a type or by name.
///
/// `data` is the instance bytes of the type being serialized.
pub type BuilderFn =
    fn(builder: &mut SerializationBuilder<'_, '_>, data: &mut [u8]) -> Result<(), SerialError>;

// -----------------------------------------------------------------------------
// Archive

/// A Rust value that serializes through a [`SerializationBuilder`].
///
/// Implementations open their own scope with [`SerializationBuilder::nested`]
/// when they need one, so they can be used as fields, elements and keys.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use vc_serial::builder::{Archive, SerializationBuilder, archive};
/// use vc_serial::error::SerialError;
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::ser::BinarySerializer;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Player {
///     name: String,
///     level: u16,
/// }
///
/// impl Archive for Player {
///     fn archive(
///         &mut self,
///         builder: &mut SerializationBuilder<'_, '_>,
///     ) -> Result<(), SerialError> {
///         let mut scope = builder.nested();
///         scope.structure(2)?;
///         scope.add_field(1, &mut self.name, "name")?;
///         scope.add_field(2, &mut self.level, "level")?;
///         scope.finish()
///     }
/// }
///
/// let registry = TypeRegistry::new();
/// let mut player = Player { name: "ada".into(), level: 7 };
///
/// let mut writer = BinarySerializer::writer(Cursor::new(Vec::new()));
/// archive(&mut writer, &registry, &mut player).unwrap();
///
/// let mut back = Player::default();
/// let mut reader = BinarySerializer::reader(Cursor::new(writer.into_inner().into_inner()));
/// archive(&mut reader, &registry, &mut back).unwrap();
/// assert_eq!(back, player);
/// ```
pub trait Archive {
    fn archive(&mut self, builder: &mut SerializationBuilder<'_, '_>) -> Result<(), SerialError>;
}

/// Serializes one [`Archive`] value as a complete session.
///
/// Runs [`Serializer::begin`] and [`Serializer::end`] around it.
pub fn archive<T: Archive + ?Sized>(
    serializer: &mut dyn Serializer,
    registry: &TypeRegistry,
    value: &mut T,
) -> Result<(), SerialError> {
    let mut ctx = WalkContext::new(registry);
    let result = archive_session(serializer, &mut ctx, value);
    if let Err(err) = &result {
        log::error!(
            "failed to archive `{}`: {err} [path: {}]",
            core::any::type_name::<T>(),
            ctx.type_path()
        );
    }
    result
}

fn archive_session<T: Archive + ?Sized>(
    serializer: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    value: &mut T,
) -> Result<(), SerialError> {
    serializer.begin()?;
    let mut builder = SerializationBuilder::new(serializer, ctx, None);
    value.archive(&mut builder)?;
    builder.finish()?;
    serializer.end()
}
