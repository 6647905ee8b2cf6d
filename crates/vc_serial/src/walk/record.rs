use alloc::format;
use alloc::vec;

use crate::builder::SerializationBuilder;
use crate::error::{SchemaError, SerialError};
use crate::info::{Field, FieldFlags, RecordType, TypeDescriptor, TypeHash, TypeHeader};
use crate::ser::{FieldHeader, Serializer, StreamFlags};
use crate::walk::{Encoding, WalkContext, WalkOptions, blit, stream_len, walk_type};

// -----------------------------------------------------------------------------
// Record

pub(super) fn walk_record(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    data: &mut [u8],
    options: WalkOptions,
) -> Result<(), SerialError> {
    let header = record.header();

    if options.append {
        let version = options.version.unwrap_or(header.serialized_version());
        let encoding = Encoding::select(ser.format(), header.serialization_flags());
        return walk_fields(ser, ctx, record, data, version, encoding);
    }

    for &base in record.bases() {
        let base = ctx.registry().resolve(base)?;
        walk_type(ser, ctx, base, data, WalkOptions::default())?;
    }

    ser.begin_record(header.name())?;

    let version = record_version(ser, header, options.version)?;

    let mut flags = header.serialization_flags();
    if !ser.flags().contains(StreamFlags::NO_FLAGS) {
        ser.serialize_flags(&mut flags)?;
    }

    let encoding = Encoding::select(ser.format(), flags);
    walk_fields(ser, ctx, record, data, version, encoding)?;

    ser.end_record()
}

/// Transfers the leading version of a record and checks it against the schema.
///
/// Unversioned streams use `requested`, falling back to the current version.
pub(crate) fn record_version(
    ser: &mut dyn Serializer,
    header: &TypeHeader,
    requested: Option<u32>,
) -> Result<u32, SerialError> {
    let current = header.serialized_version();
    let mut version = current;

    if ser.flags().contains(StreamFlags::UNVERSIONED) {
        version = requested.unwrap_or(current);
    } else {
        ser.serialize_version(&mut version)?;
    }

    if version == 0 {
        return Err(SerialError::malformed(format!(
            "`{}` has version 0 in the stream",
            header.name()
        )));
    }
    if version > current {
        return Err(SerialError::FutureVersion {
            type_name: header.name().into(),
            found: version,
            current,
        });
    }
    Ok(version)
}

fn walk_fields(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    data: &mut [u8],
    version: u32,
    encoding: Encoding,
) -> Result<(), SerialError> {
    match encoding {
        Encoding::Packed => walk_packed(ser, ctx, record, data, version),
        Encoding::Table if ser.is_reading() => read_table(ser, ctx, record, data, version),
        Encoding::Table => write_table(ser, ctx, record, data, version),
    }
}

/// Fields that take part at `version`, in declaration order.
fn live_fields(record: &RecordType, version: u32) -> impl Iterator<Item = &Field> + Clone {
    record
        .fields()
        .iter()
        .filter(move |field| !field.is_indirect() && field.in_version(version))
}

// -----------------------------------------------------------------------------
// Packed

fn walk_packed(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    data: &mut [u8],
    version: u32,
) -> Result<(), SerialError> {
    for field in live_fields(record, version) {
        ser.serialize_field(field.name().as_str())?;
        walk_field_in_place(ser, ctx, record, field, data)?;
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// Table

fn write_table(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    data: &mut [u8],
    version: u32,
) -> Result<(), SerialError> {
    let fields = live_fields(record, version);
    let mut count = stream_len(fields.clone().count())?;
    ser.begin_object(&mut count)?;

    for field in fields {
        let mut header = FieldHeader {
            type_hash: field_type(record, field)?.get(),
            field_hash: field.name().hash(),
        };
        ser.serialize_field_header(&mut header)?;
        walk_field_in_place(ser, ctx, record, field, data)?;
    }

    ser.end_object()
}

fn read_table(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    data: &mut [u8],
    version: u32,
) -> Result<(), SerialError> {
    let mut count = 0;
    ser.begin_object(&mut count)?;

    for _ in 0..count {
        let mut header = FieldHeader::default();
        ser.serialize_field_header(&mut header)?;
        let type_hash = TypeHash::from_raw(header.type_hash);

        match record.find_field(type_hash, header.field_hash) {
            Some(field) if field.in_version(version) => {
                walk_field_in_place(ser, ctx, record, field, data)?;
            }
            Some(field) => {
                log::debug!(
                    "`{}::{}` is outside version {version}, discarding its value",
                    record.header().name(),
                    field.name()
                );
                let ty = ctx.registry().resolve(type_hash)?;
                let mut throwaway = vec![0; ty.size()];
                walk_field(ser, ctx, field, ty, &mut throwaway)?;
            }
            None => match ctx.registry().get(type_hash) {
                Some(ty) if ser.flags().contains(StreamFlags::SKIP_UNKNOWN_FIELDS) => {
                    log::warn!(
                        "`{}` has no field {:#010x} of type `{}`, skipping it",
                        record.header().name(),
                        header.field_hash,
                        ty.name()
                    );
                    let mut throwaway = vec![0; ty.size()];
                    walk_type(ser, ctx, ty, &mut throwaway, WalkOptions::default())?;
                }
                _ => {
                    return Err(SerialError::MissingField {
                        record: record.header().name().into(),
                        type_hash,
                        field_hash: header.field_hash,
                    });
                }
            },
        }
    }

    ser.end_object()
}

// -----------------------------------------------------------------------------
// Fields

fn field_type(record: &RecordType, field: &Field) -> Result<TypeHash, SerialError> {
    record.field_type(field).ok_or_else(|| {
        SerialError::Schema(SchemaError::TemplateBindingOutOfRange {
            owner: record.header().name().into(),
            field: field.name().as_str().into(),
            binding: field.template_argument_binding().unwrap_or_default(),
            len: record.generic_arguments().len(),
        })
    })
}

fn walk_field_in_place(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    record: &RecordType,
    field: &Field,
    data: &mut [u8],
) -> Result<(), SerialError> {
    let ty = ctx.registry().resolve(field_type(record, field)?)?;
    let start = field.offset();
    let available = data.len();
    let slot = start
        .checked_add(ty.size())
        .and_then(move |end| data.get_mut(start..end))
        .ok_or_else(|| SerialError::BufferTooSmall {
            type_name: record.header().name().into(),
            needed: start.saturating_add(ty.size()),
            available,
        })?;
    walk_field(ser, ctx, field, ty, slot)
}

/// Walks one field value, honoring its custom serializer and raw-bytes flag.
fn walk_field(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    field: &Field,
    ty: &TypeDescriptor,
    slot: &mut [u8],
) -> Result<(), SerialError> {
    if let Some(name) = field.custom_serializer() {
        let builder = ctx.registry().named_builder(name.as_str()).ok_or_else(|| {
            SerialError::MissingBuilder {
                name: name.as_str().into(),
            }
        })?;
        let mut scope = SerializationBuilder::new(ser, ctx, Some(ty));
        builder(&mut scope, slot)?;
        return scope.finish();
    }

    if field.flags().contains(FieldFlags::RAW_BYTES) {
        return blit(ser, slot);
    }

    walk_type(ser, ctx, ty, slot, WalkOptions::default())
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;
    use std::io::Cursor;

    use vc_utils::hash::fnv1a_32;

    use crate::builder::SerializationBuilder;
    use crate::error::SerialError;
    use crate::info::{ArrayType, Field, FundamentalKind, QualifierFlags, RecordType};
    use crate::info::{SerializationFlags, TypeDescriptor, TypeHash};
    use crate::registry::TypeRegistry;
    use crate::ser::{BinarySerializer, StreamFlags, TextSerializer};
    use crate::walk::{WalkContext, serialize, serialize_with};

    const U16: TypeHash = FundamentalKind::U16.type_hash();
    const U32: TypeHash = FundamentalKind::U32.type_hash();

    fn registry_with(types: impl IntoIterator<Item = RecordType>) -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        for ty in types {
            registry.register(ty).unwrap();
        }
        registry
    }

    fn write(registry: &TypeRegistry, ty: &str, data: &mut [u8]) -> Vec<u8> {
        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        serialize(&mut ser, registry, TypeHash::of(ty), data).unwrap();
        ser.into_inner().into_inner()
    }

    fn read(
        registry: &TypeRegistry,
        ty: &str,
        bytes: Vec<u8>,
        flags: StreamFlags,
        data: &mut [u8],
    ) -> Result<(), SerialError> {
        let mut ser = BinarySerializer::reader(Cursor::new(bytes)).with_flags(flags);
        serialize(&mut ser, registry, TypeHash::of(ty), data)
    }

    fn write_text(registry: &TypeRegistry, ty: &str, data: &mut [u8]) -> String {
        let mut ser = TextSerializer::writer(Cursor::new(Vec::new()));
        serialize(&mut ser, registry, TypeHash::of(ty), data).unwrap();
        String::from_utf8(ser.into_inner().into_inner()).unwrap()
    }

    fn words(a: u32, b: u32) -> [u8; 8] {
        let mut data = [0; 8];
        data[..4].copy_from_slice(&a.to_ne_bytes());
        data[4..].copy_from_slice(&b.to_ne_bytes());
        data
    }

    // -------------------------------------------------------------------------
    // Packed

    #[test]
    fn bases_come_first() {
        let registry = registry_with([
            RecordType::new("Base", 4, 4)
                .with_version(1)
                .with_field(Field::new("id", 0, U32)),
            RecordType::new("Derived", 8, 4)
                .with_version(1)
                .with_base(TypeHash::of("Base"))
                .with_field(Field::new("x", 4, FundamentalKind::F32.type_hash())),
        ]);

        let mut data = [0; 8];
        data[..4].copy_from_slice(&7_u32.to_ne_bytes());
        data[4..].copy_from_slice(&1.5_f32.to_ne_bytes());

        assert_eq!(
            write_text(&registry, "Derived", &mut data),
            "{ @1 %0 id: 7 } { @1 %0 x: 1.5 }\n"
        );

        let bytes = write(&registry, "Derived", &mut data);
        assert_eq!(bytes.len(), 24);
        let mut back = [0; 8];
        read(&registry, "Derived", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn nested_records_and_indirect_fields() {
        let registry = registry_with([
            RecordType::new("Point", 4, 2)
                .with_version(1)
                .with_field(Field::new("x", 0, U16))
                .with_field(Field::new("y", 2, U16)),
            RecordType::new("Node", 16, 8)
                .with_version(1)
                .with_field(Field::new("at", 0, TypeHash::of("Point")))
                .with_field(
                    Field::new("next", 8, TypeHash::of("Node"))
                        .with_qualifiers(QualifierFlags::POINTER),
                ),
        ]);

        let mut data = [0; 16];
        data[..2].copy_from_slice(&3_u16.to_ne_bytes());
        data[2..4].copy_from_slice(&4_u16.to_ne_bytes());
        data[8..].fill(0xee);

        assert_eq!(
            write_text(&registry, "Node", &mut data),
            "{ @1 %0 at: { @1 %0 x: 3 y: 4 } }\n"
        );

        let bytes = write(&registry, "Node", &mut data);
        let mut back = [0; 16];
        read(&registry, "Node", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back[..4], data[..4]);
        assert_eq!(back[8..], [0; 8]);
    }

    #[test]
    fn raw_fields_and_template_bindings() {
        let mut registry = TypeRegistry::new();
        let u8_info = TypeDescriptor::fundamental(FundamentalKind::U8);
        registry.register(ArrayType::of(&u8_info, 4)).unwrap();
        registry
            .register(
                RecordType::new("Slot<u16>", 6, 2)
                    .with_version(1)
                    .with_generic_argument(U16)
                    .with_field(Field::new("value", 0, TypeHash::of("T")).bound_to(0))
                    .with_field(Field::new("tag", 2, TypeHash::of("[u8; 4]")).raw_bytes()),
            )
            .unwrap();

        let mut data = [9, 0, 1, 2, 3, 4];
        let bytes = write(&registry, "Slot<u16>", &mut data);
        // version, flags, the u16 and a length-prefixed blob
        assert_eq!(bytes.len(), 4 + 4 + 2 + 4 + 4);
        assert_eq!(bytes[10..], [4, 0, 0, 0, 1, 2, 3, 4]);

        let mut back = [0; 6];
        read(&registry, "Slot<u16>", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, data);
    }

    // -------------------------------------------------------------------------
    // Versions

    fn gate() -> TypeRegistry {
        registry_with([RecordType::new("Gate", 8, 4)
            .with_version(5)
            .with_field(Field::new("hp", 0, U32))
            .with_field(Field::new("mana", 4, U32).since(3).until(5))])
    }

    #[test]
    fn unversioned_streams_use_the_override() {
        let registry = gate();
        let gate = TypeHash::of("Gate");

        for version in 2..=5 {
            let mut ctx = WalkContext::new(&registry).with_version_override(version);
            let mut writer = BinarySerializer::writer(Cursor::new(Vec::new()))
                .with_flags(StreamFlags::UNVERSIONED);
            serialize_with(&mut writer, &mut ctx, gate, &mut words(10, 9)).unwrap();
            let bytes = writer.into_inner().into_inner();

            let mut reader =
                BinarySerializer::reader(Cursor::new(bytes)).with_flags(StreamFlags::UNVERSIONED);
            let mut back = words(0, 77);
            serialize_with(&mut reader, &mut ctx, gate, &mut back).unwrap();

            let expected = if (3..5).contains(&version) { 9 } else { 77 };
            assert_eq!(back, words(10, expected), "version {version}");
        }

        let mut ctx = WalkContext::new(&registry).with_version_override(6);
        let mut writer =
            BinarySerializer::writer(Cursor::new(Vec::new())).with_flags(StreamFlags::UNVERSIONED);
        let err = serialize_with(&mut writer, &mut ctx, gate, &mut words(1, 2)).unwrap_err();
        assert!(matches!(err, SerialError::FutureVersion { found: 6, current: 5, .. }));
    }

    #[test]
    fn newer_stream_is_rejected() {
        let v3 = registry_with([RecordType::new("Rec", 4, 4)
            .with_version(3)
            .with_field(Field::new("a", 0, U32))]);
        let v2 = registry_with([RecordType::new("Rec", 4, 4)
            .with_version(2)
            .with_field(Field::new("a", 0, U32))]);

        let bytes = write(&v3, "Rec", &mut [1, 0, 0, 0]);
        let err = read(&v2, "Rec", bytes, StreamFlags::empty(), &mut [0; 4]).unwrap_err();
        assert!(matches!(err, SerialError::FutureVersion { found: 3, current: 2, .. }));
    }

    #[test]
    fn version_zero_in_stream_is_malformed() {
        let registry = gate();
        let mut bytes = write(&registry, "Gate", &mut words(1, 2));
        bytes[..4].fill(0);
        let err = read(&registry, "Gate", bytes, StreamFlags::empty(), &mut [0; 8]).unwrap_err();
        assert!(matches!(err, SerialError::Malformed(_)));
    }

    #[test]
    fn overflowing_field_extent_is_too_small() {
        let registry = registry_with([RecordType::new("Far", 4, 4)
            .with_version(1)
            .with_field(Field::new("x", usize::MAX, U32))]);

        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        let err = serialize(&mut ser, &registry, TypeHash::of("Far"), &mut [0; 4]).unwrap_err();
        assert!(matches!(
            err,
            SerialError::BufferTooSmall { needed: usize::MAX, available: 4, .. }
        ));
    }

    #[test]
    fn older_packed_stream_keeps_newer_fields() {
        let v1 = registry_with([RecordType::new("Save", 8, 4)
            .with_version(1)
            .with_field(Field::new("hp", 0, U32))]);
        let v2 = registry_with([RecordType::new("Save", 8, 4)
            .with_version(2)
            .with_field(Field::new("hp", 0, U32))
            .with_field(Field::new("mana", 4, U32).since(2))]);

        let bytes = write(&v1, "Save", &mut words(10, 0));
        // version, flags, hp
        assert_eq!(bytes.len(), 4 + 4 + 4);

        let mut back = words(0, 77);
        read(&v2, "Save", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, words(10, 77));
    }

    // -------------------------------------------------------------------------
    // Table

    /// `{a, b}` with `b` present in `[1, 3)`, written at version 2.
    fn thing_v2() -> (TypeRegistry, Vec<u8>) {
        let registry = registry_with([RecordType::new("Thing", 8, 4)
            .with_version(2)
            .with_flags(SerializationFlags::TABLE_FORMAT)
            .with_field(Field::new("a", 0, U32))
            .with_field(Field::new("b", 4, U32).until(3))]);
        let bytes = write(&registry, "Thing", &mut words(1, 2));
        (registry, bytes)
    }

    fn thing_v3(fields: impl IntoIterator<Item = Field>) -> TypeRegistry {
        let mut record = RecordType::new("Thing", 8, 4)
            .with_version(3)
            .with_flags(SerializationFlags::TABLE_FORMAT);
        for field in fields {
            record = record.with_field(field);
        }
        registry_with([record])
    }

    #[test]
    fn table_headers_identify_fields() {
        let (_, bytes) = thing_v2();
        // version, flags, count, then (type, field) headers and values
        assert_eq!(bytes.len(), 12 + 2 * (8 + 4));
        assert_eq!(bytes[8..12], [2, 0, 0, 0]);
        assert_eq!(bytes[12..16], U32.get().to_le_bytes());
        assert_eq!(bytes[16..20], fnv1a_32("a").to_le_bytes());
    }

    #[test]
    fn table_tolerates_reordering() {
        let (_, bytes) = thing_v2();
        let reader = thing_v3([
            Field::new("b", 0, U32).until(3),
            Field::new("a", 4, U32),
        ]);

        let mut back = [0; 8];
        read(&reader, "Thing", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, words(2, 1));
    }

    #[test]
    fn removed_field_still_decodes() {
        let (_, bytes) = thing_v2();
        let reader = thing_v3([Field::new("a", 0, U32), Field::new("b", 4, U32).until(3)]);

        let mut back = [0; 8];
        read(&reader, "Thing", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, words(1, 2));

        // At the current version `b` is no longer written.
        let bytes = write(&reader, "Thing", &mut back);
        assert_eq!(bytes.len(), 12 + 8 + 4);
    }

    #[test]
    fn gated_out_field_is_discarded() {
        let (_, bytes) = thing_v2();
        let reader = thing_v3([Field::new("a", 0, U32), Field::new("b", 4, U32).until(2)]);

        let mut back = words(0, 77);
        read(&reader, "Thing", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, words(1, 77));
    }

    #[test]
    fn deleted_field_is_missing() {
        let (_, bytes) = thing_v2();
        let reader = thing_v3([Field::new("a", 0, U32)]);

        let err = read(&reader, "Thing", bytes, StreamFlags::empty(), &mut [0; 8]).unwrap_err();
        assert!(matches!(
            err,
            SerialError::MissingField { field_hash, .. } if field_hash == fnv1a_32("b")
        ));
    }

    #[test]
    fn unknown_fields_can_be_skipped() {
        let (_, bytes) = thing_v2();
        let reader = thing_v3([Field::new("a", 0, U32)]);

        let mut back = words(0, 77);
        read(&reader, "Thing", bytes, StreamFlags::SKIP_UNKNOWN_FIELDS, &mut back).unwrap();
        assert_eq!(back, words(1, 77));
    }

    #[test]
    fn text_ignores_table_format() {
        let (registry, _) = thing_v2();
        assert_eq!(
            write_text(&registry, "Thing", &mut words(1, 2)),
            "{ @2 %2 a: 1 b: 2 }\n"
        );
    }

    // -------------------------------------------------------------------------
    // Append

    fn outer(
        builder: &mut SerializationBuilder<'_, '_>,
        data: &mut [u8],
    ) -> Result<(), SerialError> {
        builder.structure(1)?;
        builder.append(TypeHash::of("Inner"), data)
    }

    #[test]
    fn append_shares_the_open_record() {
        let mut registry = registry_with([
            RecordType::new("Inner", 2, 1)
                .with_version(2)
                .with_field(Field::new("p", 0, FundamentalKind::U8.type_hash()))
                .with_field(Field::new("q", 1, FundamentalKind::U8.type_hash()).since(2)),
            RecordType::new("Outer", 2, 1)
                .with_version(1)
                .with_flags(SerializationFlags::USES_BUILDER),
        ]);
        registry.register_builder(TypeHash::of("Outer"), outer);

        assert_eq!(write_text(&registry, "Outer", &mut [5, 6]), "{ @1 %4 p: 5 }\n");

        let bytes = write(&registry, "Outer", &mut [5, 6]);
        assert_eq!(bytes, [1, 0, 0, 0, 4, 0, 0, 0, 5]);
        let mut back = [0, 9];
        read(&registry, "Outer", bytes, StreamFlags::empty(), &mut back).unwrap();
        assert_eq!(back, [5, 9]);
    }
}
