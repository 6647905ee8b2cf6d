use crate::builder::Archive;
use crate::error::SerialError;
use crate::info::{SerializationFlags, TypeDescriptor, TypeHash};
use crate::ser::{FundamentalMut, Serializer, StreamFlags};
use crate::walk::{WalkContext, WalkOptions, walk_type};

// -----------------------------------------------------------------------------
// ContainerKind

/// The container a [`SerializationBuilder`] scope can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Elements in order, see [`Serializer::begin_array`].
    Sequential,
    /// Key and value pairs, see [`Serializer::begin_object`].
    KeyValue,
    /// A string, closed with [`SerializationBuilder::text`].
    Text,
    /// A byte blob, closed with [`SerializationBuilder::bytes`].
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    None,
    Record,
    Sequential,
    KeyValue,
    Text,
    Bytes,
}

// -----------------------------------------------------------------------------
// SerializationBuilder

/// A scope over one serializer for hand-written serialization.
///
/// A builder declares at most one scope: a record with
/// [`structure`](Self::structure) or a container with
/// [`container`](Self::container). The same calls write or read, depending
/// on the serializer's mode.
///
/// [`finish`](Self::finish) closes the scope and reports errors. Dropping
/// an unfinished builder closes record and container scopes too, logging
/// failures. Text and bytes scopes must be closed with [`text`](Self::text)
/// or [`bytes`](Self::bytes), leaving them open is a bug.
pub struct SerializationBuilder<'a, 'r> {
    ser: &'a mut dyn Serializer,
    ctx: &'a mut WalkContext<'r>,
    ty: Option<&'a TypeDescriptor>,
    scope: Scope,
    version: u32,
}

impl<'a, 'r> SerializationBuilder<'a, 'r> {
    /// Creates a builder without a scope.
    ///
    /// `ty` is the descriptor being serialized, if any. It names the record
    /// scope and provides the flags word written by [`structure`](Self::structure).
    pub fn new(
        ser: &'a mut dyn Serializer,
        ctx: &'a mut WalkContext<'r>,
        ty: Option<&'a TypeDescriptor>,
    ) -> Self {
        Self {
            ser,
            ctx,
            ty,
            scope: Scope::None,
            version: 0,
        }
    }

    /// Creates a builder for a sub-value, sharing the serializer and context.
    pub fn nested(&mut self) -> SerializationBuilder<'_, 'r> {
        SerializationBuilder::new(&mut *self.ser, &mut *self.ctx, None)
    }

    #[inline]
    pub fn is_reading(&self) -> bool {
        self.ser.is_reading()
    }

    /// The version of the open record scope, `0` before [`structure`](Self::structure).
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    #[inline]
    pub fn descriptor(&self) -> Option<&'a TypeDescriptor> {
        self.ty
    }

    /// Direct access to the serializer, for primitives not covered here.
    #[inline]
    pub fn serializer(&mut self) -> &mut dyn Serializer {
        &mut *self.ser
    }

    #[inline]
    pub fn context(&mut self) -> &mut WalkContext<'r> {
        &mut *self.ctx
    }

    fn expect_scope(&self, expected: &[Scope], operation: &'static str) -> Result<(), SerialError> {
        if expected.contains(&self.scope) {
            Ok(())
        } else {
            Err(SerialError::Unsupported(operation))
        }
    }

    // -------------------------------------------------------------------------
    // Scopes

    /// Declares this scope as a record at the current `version`.
    ///
    /// Transfers the leading version unless the stream is unversioned, then
    /// the flags word unless the stream omits it. Returns the version the
    /// fields are gated by: `version` when writing, the streamed one when
    /// reading.
    pub fn structure(&mut self, version: u32) -> Result<u32, SerialError> {
        self.expect_scope(&[Scope::None], "structure in an open scope")?;
        let name = self.ty.map_or("", |ty| ty.name());
        self.ser.begin_record(name)?;
        self.scope = Scope::Record;

        let mut effective = version;
        if !self.ser.flags().contains(StreamFlags::UNVERSIONED) {
            self.ser.serialize_version(&mut effective)?;
        }
        if effective > version {
            return Err(SerialError::FutureVersion {
                type_name: name.into(),
                found: effective,
                current: version,
            });
        }

        if !self.ser.flags().contains(StreamFlags::NO_FLAGS) {
            let mut flags = self
                .ty
                .map_or(SerializationFlags::empty(), |ty| ty.serialization_flags());
            self.ser.serialize_flags(&mut flags)?;
        }

        self.version = effective;
        Ok(effective)
    }

    /// Declares this scope as a container of `len` elements or bytes.
    ///
    /// `len` is read from the stream when reading.
    pub fn container(&mut self, kind: ContainerKind, len: &mut u32) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::None], "container in an open scope")?;
        match kind {
            ContainerKind::Sequential => self.ser.begin_array(len)?,
            ContainerKind::KeyValue => self.ser.begin_object(len)?,
            ContainerKind::Text => self.ser.begin_text(len)?,
            ContainerKind::Bytes => self.ser.begin_bytes(len)?,
        }
        self.scope = match kind {
            ContainerKind::Sequential => Scope::Sequential,
            ContainerKind::KeyValue => Scope::KeyValue,
            ContainerKind::Text => Scope::Text,
            ContainerKind::Bytes => Scope::Bytes,
        };
        Ok(())
    }

    /// Closes a text scope, transferring `len` bytes of `buf`.
    pub fn text(&mut self, buf: &mut [u8], len: u32) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::Text], "text outside a text scope")?;
        self.scope = Scope::None;
        self.ser.end_text(buf, len)
    }

    /// Closes a bytes scope, transferring all of `buf`.
    pub fn bytes(&mut self, buf: &mut [u8]) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::Bytes], "bytes outside a bytes scope")?;
        self.scope = Scope::None;
        self.ser.end_bytes(buf)
    }

    /// Closes the scope.
    pub fn finish(mut self) -> Result<(), SerialError> {
        self.close()
    }

    /// Drops the builder without closing its scope, e.g. after an error.
    pub fn abandon(mut self) {
        self.scope = Scope::None;
    }

    fn close(&mut self) -> Result<(), SerialError> {
        let scope = core::mem::replace(&mut self.scope, Scope::None);
        match scope {
            Scope::None => Ok(()),
            Scope::Record => self.ser.end_record(),
            Scope::Sequential => self.ser.end_array(),
            Scope::KeyValue => self.ser.end_object(),
            Scope::Text | Scope::Bytes => Err(SerialError::Unsupported(
                "text and bytes scopes must be closed explicitly",
            )),
        }
    }

    // -------------------------------------------------------------------------
    // Fields

    /// Transfers a field present since version `added`.
    ///
    /// Outside its range the field is not visited and a read leaves `value`
    /// untouched.
    pub fn add_field<T: Archive + ?Sized>(
        &mut self,
        added: u32,
        value: &mut T,
        name: &str,
    ) -> Result<(), SerialError> {
        self.versioned_field(added, None, value, name)
    }

    /// Transfers a field present in versions `[added, removed)`.
    pub fn add_field_until<T: Archive + ?Sized>(
        &mut self,
        added: u32,
        removed: u32,
        value: &mut T,
        name: &str,
    ) -> Result<(), SerialError> {
        self.versioned_field(added, Some(removed), value, name)
    }

    /// Consumes a field that no longer has a destination.
    ///
    /// Writing old versions emits `default`, reading discards the value.
    pub fn remove_field<T: Archive>(
        &mut self,
        added: u32,
        removed: u32,
        default: T,
        name: &str,
    ) -> Result<(), SerialError> {
        let mut throwaway = default;
        self.versioned_field(added, Some(removed), &mut throwaway, name)
    }

    fn versioned_field<T: Archive + ?Sized>(
        &mut self,
        added: u32,
        removed: Option<u32>,
        value: &mut T,
        name: &str,
    ) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::Record], "field outside a record scope")?;
        let version = self.version;
        if version < added || removed.is_some_and(|removed| version >= removed) {
            log::trace!("skipping field `{name}` at version {version}");
            return Ok(());
        }
        self.ser.serialize_field(name)?;
        value.archive(self)
    }

    // -------------------------------------------------------------------------
    // Containers

    /// Transfers one element of a sequential or key-value scope.
    pub fn element<T: Archive + ?Sized>(&mut self, value: &mut T) -> Result<(), SerialError> {
        self.expect_scope(
            &[Scope::Sequential, Scope::KeyValue],
            "element outside a container scope",
        )?;
        value.archive(self)
    }

    /// Transfers the key of the next key-value entry.
    pub fn key<T: Archive + ?Sized>(&mut self, key: &mut T) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::KeyValue], "key outside a key-value scope")?;
        key.archive(self)?;
        self.ser.serialize_key()
    }

    /// Transfers one primitive.
    #[inline]
    pub fn value(&mut self, value: FundamentalMut<'_>) -> Result<(), SerialError> {
        self.ser.serialize_fundamental(value)
    }

    // -------------------------------------------------------------------------
    // Descriptor-typed values

    /// Walks a value described by the registered type `ty`.
    pub fn walk(&mut self, ty: TypeHash, data: &mut [u8]) -> Result<(), SerialError> {
        let ty = self.ctx.registry().resolve(ty)?;
        walk_type(&mut *self.ser, &mut *self.ctx, ty, data, WalkOptions::default())
    }

    /// Walks the fields of the record `record` into the open record scope.
    ///
    /// No scope, version or flags are transferred for it and its bases are
    /// skipped. Its fields are gated by this scope's version.
    pub fn append(&mut self, record: TypeHash, data: &mut [u8]) -> Result<(), SerialError> {
        self.expect_scope(&[Scope::Record], "append outside a record scope")?;
        let ty = self.ctx.registry().resolve(record)?;
        ty.as_record()
            .map_err(|_| SerialError::Unsupported("append of a type that is not a record"))?;
        let options = WalkOptions {
            append: true,
            version: Some(self.version),
        };
        walk_type(&mut *self.ser, &mut *self.ctx, ty, data, options)
    }
}

impl Drop for SerializationBuilder<'_, '_> {
    fn drop(&mut self) {
        match self.scope {
            Scope::None => {}
            Scope::Text | Scope::Bytes => {
                log::warn!("serialization builder dropped with an open text or bytes scope");
                #[cfg(feature = "std")]
                let unwinding = std::thread::panicking();
                #[cfg(not(feature = "std"))]
                let unwinding = false;
                if !unwinding {
                    debug_assert!(false, "text and bytes scopes must be closed explicitly");
                }
                self.scope = Scope::None;
            }
            Scope::Record | Scope::Sequential | Scope::KeyValue => {
                if let Err(err) = self.close() {
                    log::error!("failed to close serialization builder scope: {err}");
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;
    use std::io::Cursor;

    use super::*;
    use crate::builder::archive;
    use crate::registry::TypeRegistry;
    use crate::ser::{BinarySerializer, TextSerializer};

    /// `mana` exists in versions `[3, 5)`.
    #[derive(Debug, Default)]
    struct Gated {
        version: u32,
        hp: u32,
        mana: u32,
    }

    impl Archive for Gated {
        fn archive(
            &mut self,
            builder: &mut SerializationBuilder<'_, '_>,
        ) -> Result<(), SerialError> {
            let mut scope = builder.nested();
            scope.structure(self.version)?;
            scope.add_field(1, &mut self.hp, "hp")?;
            scope.add_field_until(3, 5, &mut self.mana, "mana")?;
            scope.finish()
        }
    }

    fn write(value: &mut impl Archive) -> Vec<u8> {
        let registry = TypeRegistry::new();
        let mut writer = BinarySerializer::writer(Cursor::new(Vec::new()));
        archive(&mut writer, &registry, value).unwrap();
        writer.into_inner().into_inner()
    }

    fn read(bytes: Vec<u8>, value: &mut impl Archive) -> Result<(), SerialError> {
        let registry = TypeRegistry::new();
        let mut reader = BinarySerializer::reader(Cursor::new(bytes));
        archive(&mut reader, &registry, value)
    }

    #[test]
    fn fields_follow_their_version_range() {
        for version in 2..=5 {
            let bytes = write(&mut Gated {
                version,
                hp: 10,
                mana: 9,
            });

            let mut back = Gated {
                version: 5,
                hp: 0,
                mana: 77,
            };
            read(bytes, &mut back).unwrap();

            assert_eq!(back.hp, 10);
            let expected = if (3..5).contains(&version) { 9 } else { 77 };
            assert_eq!(back.mana, expected, "version {version}");
        }
    }

    #[test]
    fn newer_stream_is_rejected() {
        let bytes = write(&mut Gated {
            version: 4,
            ..Gated::default()
        });
        let mut back = Gated {
            version: 3,
            ..Gated::default()
        };
        let err = read(bytes, &mut back).unwrap_err();
        assert!(matches!(err, SerialError::FutureVersion { found: 4, current: 3, .. }));
    }

    /// Version 2 dropped `legacy`, old streams still carry it.
    struct Migrated {
        version: u32,
        id: u64,
    }

    impl Archive for Migrated {
        fn archive(
            &mut self,
            builder: &mut SerializationBuilder<'_, '_>,
        ) -> Result<(), SerialError> {
            let mut scope = builder.nested();
            scope.structure(self.version)?;
            scope.remove_field(1, 2, 0xAAAA_u16, "legacy")?;
            scope.add_field(1, &mut self.id, "id")?;
            scope.finish()
        }
    }

    /// The version 1 layout, before `legacy` was removed.
    #[derive(Debug, Default)]
    struct Original {
        legacy: u16,
        id: u64,
    }

    impl Archive for Original {
        fn archive(
            &mut self,
            builder: &mut SerializationBuilder<'_, '_>,
        ) -> Result<(), SerialError> {
            let mut scope = builder.nested();
            scope.structure(1)?;
            scope.add_field(1, &mut self.legacy, "legacy")?;
            scope.add_field(1, &mut self.id, "id")?;
            scope.finish()
        }
    }

    #[test]
    fn removed_field_is_consumed() {
        let old = write(&mut Migrated { version: 1, id: 5 });
        let new = write(&mut Migrated { version: 2, id: 5 });
        assert_eq!(old.len(), new.len() + 2);

        // Old streams carry the default in the removed slot.
        let mut original = Original::default();
        read(old.clone(), &mut original).unwrap();
        assert_eq!(original.legacy, 0xAAAA);
        assert_eq!(original.id, 5);

        let mut back = Migrated { version: 2, id: 0 };
        read(old, &mut back).unwrap();
        assert_eq!(back.id, 5);
    }

    #[test]
    fn removed_field_is_skipped_in_new_streams() {
        let new = write(&mut Migrated { version: 2, id: 9 });
        let mut back = Migrated { version: 2, id: 0 };
        read(new, &mut back).unwrap();
        assert_eq!(back.id, 9);

        let mut original = Original::default();
        let err = read(write(&mut Migrated { version: 2, id: 9 }), &mut original).unwrap_err();
        assert!(matches!(err, SerialError::FutureVersion { found: 2, current: 1, .. }));
    }

    #[test]
    fn drop_closes_record() {
        let registry = TypeRegistry::new();
        let mut ctx = WalkContext::new(&registry);
        let mut ser = TextSerializer::writer(Cursor::new(Vec::new()));
        ser.begin().unwrap();
        {
            let mut builder = SerializationBuilder::new(&mut ser, &mut ctx, None);
            builder.structure(1).unwrap();
            builder.add_field(1, &mut 3_u8, "x").unwrap();
        }
        ser.end().unwrap();

        let text = String::from_utf8(ser.into_inner().into_inner()).unwrap();
        assert_eq!(text, "{ @1 %0 x: 3 }\n");
    }

    #[test]
    fn stream_flags_omit_headers() {
        let registry = TypeRegistry::new();
        let mut ser = TextSerializer::writer(Cursor::new(Vec::new()))
            .with_flags(StreamFlags::UNVERSIONED | StreamFlags::NO_FLAGS);
        archive(
            &mut ser,
            &registry,
            &mut Gated {
                version: 3,
                hp: 1,
                mana: 2,
            },
        )
        .unwrap();

        let text = String::from_utf8(ser.into_inner().into_inner()).unwrap();
        assert_eq!(text, "{ hp: 1 mana: 2 }\n");
    }

    #[test]
    fn scope_misuse_is_reported() {
        let registry = TypeRegistry::new();
        let mut ctx = WalkContext::new(&registry);
        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        ser.begin().unwrap();

        let mut builder = SerializationBuilder::new(&mut ser, &mut ctx, None);
        let err = builder.add_field(1, &mut 0_u8, "x").unwrap_err();
        assert!(matches!(err, SerialError::Unsupported(_)));

        builder.container(ContainerKind::Sequential, &mut 0).unwrap();
        assert!(builder.structure(1).is_err());
        assert!(builder.key(&mut 0_u8).is_err());
        builder.finish().unwrap();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "closed explicitly")]
    fn open_text_scope_on_drop() {
        let registry = TypeRegistry::new();
        let mut ctx = WalkContext::new(&registry);
        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        ser.begin().unwrap();

        let mut builder = SerializationBuilder::new(&mut ser, &mut ctx, None);
        builder.container(ContainerKind::Text, &mut 0).unwrap();
        drop(builder);
    }
}
