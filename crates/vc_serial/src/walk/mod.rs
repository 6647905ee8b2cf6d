//! The generic walk engine.
//!
//! [`serialize_type`] walks an instance described by a [`TypeDescriptor`]
//! and drives a [`Serializer`]. The same call sequence writes or reads,
//! depending on the serializer's [`Mode`](crate::ser::Mode). Instances are
//! byte views laid out as the descriptor's sizes and offsets state,
//! primitives in native byte order. The walk only stores into them when
//! reading.
//!
//! Per type, first match wins:
//!
//! 1. `USES_BUILDER`: the builder registered for the type hash runs instead.
//! 2. `RAW_BYTES`: the whole instance is transferred as one byte blob.
//! 3. Records: bases, then the fields in packed or table [`Encoding`].
//! 4. Arrays, enums and fundamentals.
//!
//! The top-level entry points are [`serialize`] and [`serialize_with`],
//! which also run [`Serializer::begin`] and [`Serializer::end`].

use alloc::format;

use crate::builder::SerializationBuilder;
use crate::error::{SchemaError, SerialError};
use crate::info::{
    ArrayType, EnumType, FundamentalKind, SerializationFlags, TypeDescriptor, TypeHash,
};
use crate::registry::TypeRegistry;
use crate::ser::{Format, FundamentalMut, Serializer};

// -----------------------------------------------------------------------------
// Modules

mod context;
pub mod enum_codec;
mod record;
mod scratch;

// -----------------------------------------------------------------------------
// Exports

pub use context::{TypePath, WalkContext};
pub use scratch::{DEFAULT_SCRATCH_CAPACITY, ScratchBuffer};

// -----------------------------------------------------------------------------
// Encoding

/// Field encoding of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Fields in declaration order, no per-field metadata.
    Packed,
    /// A counted list of `(type hash, field hash)` headers each followed by
    /// its value. Tolerates reordered, added and removed fields.
    Table,
}

impl Encoding {
    /// Picks the encoding for a record with `flags` on a `format` stream.
    ///
    /// Text streams always use [`Packed`](Self::Packed). Binary streams use
    /// [`Table`](Self::Table) when only `TABLE_FORMAT` is set.
    pub const fn select(format: Format, flags: SerializationFlags) -> Self {
        match format {
            Format::Text => Self::Packed,
            Format::Binary => {
                if flags.contains(SerializationFlags::TABLE_FORMAT)
                    && !flags.contains(SerializationFlags::PACKED_FORMAT)
                {
                    Self::Table
                } else {
                    Self::Packed
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// WalkOptions

/// Options that only apply to one level of the walk.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WalkOptions {
    /// Walk a record into an already open scope: no bases, no record scope,
    /// no version or flags word.
    pub append: bool,
    /// Version to walk a record at instead of its current or streamed one.
    pub version: Option<u32>,
}

// -----------------------------------------------------------------------------
// Entry points

/// Serializes one value of the type `type_hash` as a complete session.
///
/// Runs [`Serializer::begin`], the walk and [`Serializer::end`]. Failures
/// are logged and returned, the destination may be partially read.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use vc_serial::info::{Field, FundamentalKind, RecordType, TypeHash};
/// use vc_serial::registry::TypeRegistry;
/// use vc_serial::ser::BinarySerializer;
/// use vc_serial::walk::serialize;
///
/// let mut registry = TypeRegistry::new();
/// registry
///     .register(
///         RecordType::new("Pair", 4, 2)
///             .with_version(1)
///             .with_field(Field::new("a", 0, FundamentalKind::U16.type_hash()))
///             .with_field(Field::new("b", 2, FundamentalKind::U16.type_hash())),
///     )
///     .unwrap();
///
/// let mut data = [1, 0, 2, 0];
/// let mut writer = BinarySerializer::writer(Cursor::new(Vec::new()));
/// serialize(&mut writer, &registry, TypeHash::of("Pair"), &mut data).unwrap();
///
/// let mut back = [0; 4];
/// let mut reader = BinarySerializer::reader(Cursor::new(writer.into_inner().into_inner()));
/// serialize(&mut reader, &registry, TypeHash::of("Pair"), &mut back).unwrap();
/// assert_eq!(back, data);
/// ```
pub fn serialize(
    serializer: &mut dyn Serializer,
    registry: &TypeRegistry,
    type_hash: TypeHash,
    data: &mut [u8],
) -> Result<(), SerialError> {
    let mut ctx = WalkContext::new(registry);
    serialize_with(serializer, &mut ctx, type_hash, data)
}

/// Like [`serialize`], with a caller-provided [`WalkContext`].
pub fn serialize_with(
    serializer: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    type_hash: TypeHash,
    data: &mut [u8],
) -> Result<(), SerialError> {
    ctx.reset();
    let result = run_session(serializer, ctx, type_hash, data);
    if let Err(err) = &result {
        log::error!(
            "failed to serialize {type_hash}: {err} [path: {}]",
            ctx.type_path()
        );
    }
    result
}

fn run_session(
    serializer: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    type_hash: TypeHash,
    data: &mut [u8],
) -> Result<(), SerialError> {
    serializer.begin()?;
    let ty = ctx.registry().resolve(type_hash)?;
    let options = WalkOptions {
        append: false,
        version: ctx.version_override(),
    };
    walk_type(serializer, ctx, ty, data, options)?;
    serializer.end()
}

/// Walks one value of `ty` inside an already begun session.
///
/// `data` must hold at least `ty.size()` bytes.
pub fn serialize_type(
    serializer: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    ty: &TypeDescriptor,
    data: &mut [u8],
) -> Result<(), SerialError> {
    walk_type(serializer, ctx, ty, data, WalkOptions::default())
}

// -----------------------------------------------------------------------------
// Dispatch

pub(crate) fn walk_type(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    ty: &TypeDescriptor,
    data: &mut [u8],
    options: WalkOptions,
) -> Result<(), SerialError> {
    let header = ty.header();
    if !header.is_serializable() {
        return Err(SerialError::NotSerializable {
            type_name: header.name().into(),
        });
    }
    if data.len() < header.size() {
        return Err(SerialError::BufferTooSmall {
            type_name: header.name().into(),
            needed: header.size(),
            available: data.len(),
        });
    }

    ctx.enter(ty.hash());
    dispatch(ser, ctx, ty, data, options)?;
    ctx.leave();
    Ok(())
}

fn dispatch(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    ty: &TypeDescriptor,
    data: &mut [u8],
    options: WalkOptions,
) -> Result<(), SerialError> {
    let flags = ty.serialization_flags();
    if flags.contains(SerializationFlags::USES_BUILDER) {
        let builder = ctx.registry().builder(ty.hash()).ok_or_else(|| {
            SerialError::MissingBuilder {
                name: ty.name().into(),
            }
        })?;
        let mut scope = SerializationBuilder::new(ser, ctx, Some(ty));
        builder(&mut scope, data)?;
        return scope.finish();
    }
    if flags.contains(SerializationFlags::RAW_BYTES) {
        return blit(ser, &mut data[..ty.size()]);
    }

    match ty {
        TypeDescriptor::Record(record) => record::walk_record(ser, ctx, record, data, options),
        TypeDescriptor::Array(array) => walk_array(ser, ctx, array, data),
        TypeDescriptor::Enum(info) => walk_enum(ser, ctx, info, data),
        TypeDescriptor::Fundamental(info) => walk_fundamental(ser, info.kind(), data),
    }
}

/// Converts an in-memory length to a stream count.
pub(crate) fn stream_len(len: usize) -> Result<u32, SerialError> {
    u32::try_from(len).map_err(|_| SerialError::Capacity {
        needed: len,
        capacity: u32::MAX as usize,
    })
}

/// Transfers `data` as one byte blob.
pub(crate) fn blit(ser: &mut dyn Serializer, data: &mut [u8]) -> Result<(), SerialError> {
    let mut len = stream_len(data.len())?;
    ser.begin_bytes(&mut len)?;
    if len as usize != data.len() {
        return Err(SerialError::malformed(format!(
            "expected {} raw bytes, found {len}",
            data.len()
        )));
    }
    ser.end_bytes(data)
}

// -----------------------------------------------------------------------------
// Arrays

fn walk_array(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    array: &ArrayType,
    data: &mut [u8],
) -> Result<(), SerialError> {
    let element = ctx.registry().resolve(array.element())?;
    let element_size = element.size();

    let mut count = stream_len(array.element_count())?;
    ser.begin_array(&mut count)?;
    let count = count as usize;
    if count > array.element_count() {
        return Err(SerialError::Capacity {
            needed: count,
            capacity: array.element_count(),
        });
    }

    let available = data.len();
    let data = count
        .checked_mul(element_size)
        .and_then(move |total| data.get_mut(..total))
        .ok_or_else(|| SerialError::BufferTooSmall {
            type_name: array.header().name().into(),
            needed: count.saturating_mul(element_size),
            available,
        })?;

    if element.serialization_flags().contains(SerializationFlags::RAW_BYTES) {
        blit(ser, data)?;
    } else {
        for index in 0..count {
            let start = index * element_size;
            let slot = &mut data[start..start + element_size];
            walk_type(ser, ctx, element, slot, WalkOptions::default())?;
        }
    }

    ser.end_array()
}

// -----------------------------------------------------------------------------
// Enums

fn walk_enum(
    ser: &mut dyn Serializer,
    ctx: &mut WalkContext<'_>,
    info: &EnumType,
    data: &mut [u8],
) -> Result<(), SerialError> {
    let kind = info.underlying();
    if ser.format() == Format::Binary {
        return walk_fundamental(ser, kind, data);
    }

    let not_integer = || SerialError::Schema(SchemaError::EnumNotInteger {
        owner: info.header().name().into(),
        kind,
    });
    let scratch = ctx.scratch_mut();
    scratch.clear();

    if ser.is_reading() {
        let mut len = 0;
        ser.begin_text(&mut len)?;
        ser.end_text(scratch.storage_mut(), len)?;
        scratch.set_len(len as usize)?;
        let value = enum_codec::parse_value(info, scratch.as_str()?);
        enum_codec::store(kind, value, data).ok_or_else(not_integer)
    } else {
        let value = enum_codec::load(kind, data).ok_or_else(not_integer)?;
        if enum_codec::format_value(info, value, &mut *scratch).is_err() {
            return Err(scratch.overflow(scratch.len()));
        }
        let mut len = stream_len(scratch.len())?;
        ser.begin_text(&mut len)?;
        ser.end_text(scratch.storage_mut(), len)
    }
}

// -----------------------------------------------------------------------------
// Fundamentals

/// Native-order bytes of a primitive at the start of `data`.
fn slot<const N: usize>(
    data: &mut [u8],
    kind: FundamentalKind,
) -> Result<&mut [u8; N], SerialError> {
    let available = data.len();
    data.first_chunk_mut::<N>()
        .ok_or_else(|| SerialError::BufferTooSmall {
            type_name: kind.type_name().into(),
            needed: N,
            available,
        })
}

macro_rules! walk_ne {
    ($ser:ident, $data:ident, $kind:ident, $ty:ty, $variant:ident) => {{
        let bytes = slot::<{ size_of::<$ty>() }>($data, $kind)?;
        let mut value = <$ty>::from_ne_bytes(*bytes);
        $ser.serialize_fundamental(FundamentalMut::$variant(&mut value))?;
        if $ser.is_reading() {
            *bytes = value.to_ne_bytes();
        }
        Ok(())
    }};
}

pub(crate) fn walk_fundamental(
    ser: &mut dyn Serializer,
    kind: FundamentalKind,
    data: &mut [u8],
) -> Result<(), SerialError> {
    match kind {
        FundamentalKind::Bool => {
            let bytes = slot::<1>(data, kind)?;
            let mut value = bytes[0] != 0;
            ser.serialize_fundamental(FundamentalMut::Bool(&mut value))?;
            if ser.is_reading() {
                bytes[0] = u8::from(value);
            }
            Ok(())
        }
        FundamentalKind::I8 => walk_ne!(ser, data, kind, i8, I8),
        FundamentalKind::U8 => walk_ne!(ser, data, kind, u8, U8),
        FundamentalKind::I16 => walk_ne!(ser, data, kind, i16, I16),
        FundamentalKind::U16 => walk_ne!(ser, data, kind, u16, U16),
        FundamentalKind::I32 => walk_ne!(ser, data, kind, i32, I32),
        FundamentalKind::U32 => walk_ne!(ser, data, kind, u32, U32),
        FundamentalKind::I64 => walk_ne!(ser, data, kind, i64, I64),
        FundamentalKind::U64 => walk_ne!(ser, data, kind, u64, U64),
        FundamentalKind::I128 => walk_ne!(ser, data, kind, i128, I128),
        FundamentalKind::U128 => walk_ne!(ser, data, kind, u128, U128),
        FundamentalKind::F32 => walk_ne!(ser, data, kind, f32, F32),
        FundamentalKind::F64 => walk_ne!(ser, data, kind, f64, F64),
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use std::io::Cursor;

    use super::*;
    use crate::builder::ContainerKind;
    use crate::info::{EnumType, Field, RecordType};
    use crate::ser::{BinarySerializer, StreamFlags, TextSerializer};

    fn put<const N: usize>(data: &mut [u8], offset: usize, bytes: [u8; N]) {
        data[offset..offset + N].copy_from_slice(&bytes);
    }

    fn write_binary(registry: &TypeRegistry, ty: &str, data: &mut [u8]) -> Vec<u8> {
        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        serialize(&mut ser, registry, TypeHash::of(ty), data).unwrap();
        ser.into_inner().into_inner()
    }

    fn read_binary(
        registry: &TypeRegistry,
        ty: &str,
        bytes: Vec<u8>,
        data: &mut [u8],
    ) -> Result<(), SerialError> {
        let mut ser = BinarySerializer::reader(Cursor::new(bytes));
        serialize(&mut ser, registry, TypeHash::of(ty), data)
    }

    fn write_text(registry: &TypeRegistry, ty: &str, data: &mut [u8]) -> String {
        let mut ser = TextSerializer::writer(Cursor::new(Vec::new()));
        serialize(&mut ser, registry, TypeHash::of(ty), data).unwrap();
        String::from_utf8(ser.into_inner().into_inner()).unwrap()
    }

    fn read_text(
        registry: &TypeRegistry,
        ty: &str,
        text: &str,
        data: &mut [u8],
    ) -> Result<(), SerialError> {
        let mut ser = TextSerializer::reader(Cursor::new(text.as_bytes().to_vec()));
        serialize(&mut ser, registry, TypeHash::of(ty), data)
    }

    // -------------------------------------------------------------------------
    // Fundamentals

    /// One field of every kind, naturally aligned.
    fn all_kinds() -> (TypeRegistry, [u8; 80]) {
        const LAYOUT: [(FundamentalKind, usize); 13] = [
            (FundamentalKind::Bool, 0),
            (FundamentalKind::I8, 1),
            (FundamentalKind::U8, 2),
            (FundamentalKind::I16, 4),
            (FundamentalKind::U16, 6),
            (FundamentalKind::I32, 8),
            (FundamentalKind::U32, 12),
            (FundamentalKind::I64, 16),
            (FundamentalKind::U64, 24),
            (FundamentalKind::I128, 32),
            (FundamentalKind::U128, 48),
            (FundamentalKind::F32, 64),
            (FundamentalKind::F64, 72),
        ];

        let mut record = RecordType::new("AllKinds", 80, 16).with_version(1);
        for (kind, offset) in LAYOUT {
            record = record.with_field(Field::new(kind.type_name(), offset, kind.type_hash()));
        }
        let mut registry = TypeRegistry::new();
        registry.register(record).unwrap();

        let mut data = [0_u8; 80];
        put(&mut data, 0, [1]);
        put(&mut data, 1, (-5_i8).to_ne_bytes());
        put(&mut data, 2, 200_u8.to_ne_bytes());
        put(&mut data, 4, i16::MIN.to_ne_bytes());
        put(&mut data, 6, u16::MAX.to_ne_bytes());
        put(&mut data, 8, (-123_456_i32).to_ne_bytes());
        put(&mut data, 12, 3_000_000_000_u32.to_ne_bytes());
        put(&mut data, 16, i64::MIN.to_ne_bytes());
        put(&mut data, 24, u64::MAX.to_ne_bytes());
        put(&mut data, 32, (-1_i128 << 100).to_ne_bytes());
        put(&mut data, 48, (u128::MAX - 7).to_ne_bytes());
        put(&mut data, 64, (-0.15625_f32).to_ne_bytes());
        put(&mut data, 72, core::f64::consts::PI.to_ne_bytes());
        (registry, data)
    }

    #[test]
    fn all_kinds_round_trip_binary() {
        let (registry, mut data) = all_kinds();
        let bytes = write_binary(&registry, "AllKinds", &mut data);
        // version + flags + the packed primitives
        assert_eq!(bytes.len(), 4 + 4 + 1 + 1 + 1 + 2 + 2 + 4 + 4 + 8 + 8 + 16 + 16 + 4 + 8);

        let mut back = [0_u8; 80];
        read_binary(&registry, "AllKinds", bytes, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn all_kinds_round_trip_text() {
        let (registry, mut data) = all_kinds();
        let text = write_text(&registry, "AllKinds", &mut data);
        assert!(text.starts_with("{ @1 %0 bool: true i8: -5 u8: 200 "));

        let mut back = [0_u8; 80];
        read_text(&registry, "AllKinds", &text, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn bool_is_normalized() {
        let registry = TypeRegistry::new();
        let mut data = [2_u8];
        let bytes = write_binary(&registry, "bool", &mut data);
        assert_eq!(bytes, [1]);
        assert_eq!(data, [2]);

        let mut back = [0_u8];
        read_binary(&registry, "bool", vec![2], &mut back).unwrap();
        assert_eq!(back, [1]);
    }

    // -------------------------------------------------------------------------
    // Arrays

    #[test]
    fn array_round_trip() {
        let mut registry = TypeRegistry::new();
        let u16_info = TypeDescriptor::fundamental(FundamentalKind::U16);
        registry.register(ArrayType::of(&u16_info, 3)).unwrap();

        let mut data = [1, 0, 2, 0, 3, 0];
        let bytes = write_binary(&registry, "[u16; 3]", &mut data);
        assert_eq!(bytes.len(), 4 + 6);

        let mut back = [0; 6];
        read_binary(&registry, "[u16; 3]", bytes, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn shorter_array_fills_prefix() {
        let mut writer = TypeRegistry::new();
        writer
            .register(ArrayType::new("Samples", FundamentalKind::U8.type_hash(), 1, 1, 2))
            .unwrap();
        let mut reader = TypeRegistry::new();
        reader
            .register(ArrayType::new("Samples", FundamentalKind::U8.type_hash(), 1, 1, 4))
            .unwrap();

        let bytes = write_binary(&writer, "Samples", &mut [7, 8]);
        let mut back = [0, 0, 9, 9];
        read_binary(&reader, "Samples", bytes.clone(), &mut back).unwrap();
        assert_eq!(back, [7, 8, 9, 9]);

        let bytes = write_binary(&reader, "Samples", &mut back);
        let err = read_binary(&writer, "Samples", bytes, &mut [0; 2]).unwrap_err();
        assert!(matches!(err, SerialError::Capacity { needed: 4, capacity: 2 }));
    }

    #[test]
    fn raw_elements_are_one_blob() {
        let mut registry = TypeRegistry::new();
        let pod = RecordType::new("Pod", 3, 1)
            .with_version(1)
            .with_flags(SerializationFlags::RAW_BYTES);
        let pods = ArrayType::of(&TypeDescriptor::from(pod.clone()), 2);
        registry.register(pod).unwrap();
        registry.register(pods).unwrap();

        let mut data = [1, 2, 3, 4, 5, 6];
        let bytes = write_binary(&registry, "[Pod; 2]", &mut data);
        assert_eq!(bytes, [2, 0, 0, 0, 6, 0, 0, 0, 1, 2, 3, 4, 5, 6]);

        let mut back = [0; 6];
        read_binary(&registry, "[Pod; 2]", bytes, &mut back).unwrap();
        assert_eq!(back, data);
    }

    // -------------------------------------------------------------------------
    // Enums

    fn enum_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                EnumType::new("Color", FundamentalKind::I32)
                    .with_constant("Red", 0)
                    .with_constant("Green", 1),
            )
            .unwrap();
        registry
            .register(
                EnumType::new("Abc", FundamentalKind::U8)
                    .flags()
                    .with_constant("A", 1)
                    .with_constant("B", 2)
                    .with_constant("C", 4),
            )
            .unwrap();
        registry
            .register(
                RecordType::new("Paint", 8, 4)
                    .with_version(1)
                    .with_field(Field::new("color", 0, TypeHash::of("Color")))
                    .with_field(Field::new("mask", 4, TypeHash::of("Abc"))),
            )
            .unwrap();
        registry
    }

    #[test]
    fn enums_are_names_in_text() {
        let registry = enum_registry();
        let mut data = [0_u8; 8];
        put(&mut data, 0, 1_i32.to_ne_bytes());
        data[4] = 5;

        let text = write_text(&registry, "Paint", &mut data);
        assert_eq!(text, "{ @1 %0 color: \"Green\" mask: \"A | C\" }\n");

        let mut back = [0_u8; 8];
        read_text(&registry, "Paint", &text, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn unnamed_enum_values_survive() {
        let registry = enum_registry();
        let mut data = [0_u8; 8];
        put(&mut data, 0, (-9_i32).to_ne_bytes());
        data[4] = 0x8b;

        let text = write_text(&registry, "Paint", &mut data);
        assert_eq!(text, "{ @1 %0 color: \"-9\" mask: \"A | B | 136\" }\n");

        let mut back = [0_u8; 8];
        read_text(&registry, "Paint", &text, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn unknown_flag_names_are_dropped() {
        let registry = enum_registry();
        let mut back = [0_u8; 8];
        read_text(&registry, "Paint", "{ @1 %0 color: \"Red\" mask: \"A | Z\" }", &mut back)
            .unwrap();
        assert_eq!(back[4], 1);
    }

    #[test]
    fn enums_are_integers_in_binary() {
        let registry = enum_registry();
        let mut data = [0_u8; 8];
        put(&mut data, 0, 1_i32.to_ne_bytes());
        data[4] = 6;

        let bytes = write_binary(&registry, "Paint", &mut data);
        assert_eq!(bytes.len(), 4 + 4 + 4 + 1);
    }

    #[test]
    fn enum_text_overflows_scratch() {
        let registry = enum_registry();
        let mut ctx = WalkContext::new(&registry).with_scratch_capacity(4);
        let mut data = [0_u8; 8];
        data[4] = 7;

        let mut ser = TextSerializer::writer(Cursor::new(Vec::new()));
        let paint = TypeHash::of("Paint");
        let err = serialize_with(&mut ser, &mut ctx, paint, &mut data).unwrap_err();
        assert!(matches!(err, SerialError::Capacity { capacity: 4, .. }));
    }

    #[test]
    fn long_enum_token_overflows_scratch_on_read() {
        let registry = enum_registry();
        let mut ctx = WalkContext::new(&registry).with_scratch_capacity(4);
        let text = "{ @1 %0 color: \"Green\" mask: \"A\" }\n";

        let mut ser = TextSerializer::reader(Cursor::new(text.as_bytes().to_vec()));
        let mut data = [0_u8; 8];
        let paint = TypeHash::of("Paint");
        let err = serialize_with(&mut ser, &mut ctx, paint, &mut data).unwrap_err();
        assert!(matches!(err, SerialError::Capacity { needed: 5, capacity: 4 }));
        assert_eq!(data, [0; 8]);
    }

    // -------------------------------------------------------------------------
    // Builders

    /// A length byte followed by up to 15 bytes of UTF-8.
    fn fixed_name(
        builder: &mut SerializationBuilder<'_, '_>,
        data: &mut [u8],
    ) -> Result<(), SerialError> {
        let (len, text) = data.split_at_mut(1);
        let mut count = u32::from(len[0]);
        builder.container(ContainerKind::Text, &mut count)?;
        builder.text(text, count)?;
        len[0] = count as u8;
        Ok(())
    }

    fn builder_registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordType::new("FixedName", 16, 1)
                    .with_version(1)
                    .with_flags(SerializationFlags::USES_BUILDER),
            )
            .unwrap();
        registry.register_builder(TypeHash::of("FixedName"), fixed_name);
        registry.register_named_builder("short_name", fixed_name);
        registry
            .register(
                RecordType::new("Tag", 17, 1)
                    .with_version(1)
                    .with_field(Field::new("id", 0, FundamentalKind::U8.type_hash()))
                    .with_field(
                        Field::new("label", 1, TypeHash::of("Label")).with_serializer("short_name"),
                    ),
            )
            .unwrap();
        registry.register(RecordType::new("Label", 16, 1)).unwrap();
        registry
    }

    fn name_bytes(text: &str) -> [u8; 16] {
        let mut data = [0_u8; 16];
        data[0] = text.len() as u8;
        data[1..=text.len()].copy_from_slice(text.as_bytes());
        data
    }

    #[test]
    fn type_builder_replaces_the_walk() {
        let registry = builder_registry();
        assert_eq!(registry.validate(), Ok(()));

        let mut data = name_bytes("hero");
        let text = write_text(&registry, "FixedName", &mut data);
        assert_eq!(text, "\"hero\"\n");

        let mut back = [0_u8; 16];
        read_text(&registry, "FixedName", &text, &mut back).unwrap();
        assert_eq!(back, data);

        let bytes = write_binary(&registry, "FixedName", &mut data);
        assert_eq!(bytes, [4, 0, 0, 0, b'h', b'e', b'r', b'o']);
    }

    #[test]
    fn field_builder_by_name() {
        let registry = builder_registry();
        let mut data = [0_u8; 17];
        data[0] = 3;
        data[1..].copy_from_slice(&name_bytes("ab"));

        let text = write_text(&registry, "Tag", &mut data);
        assert_eq!(text, "{ @1 %0 id: 3 label: \"ab\" }\n");

        let mut back = [0_u8; 17];
        read_text(&registry, "Tag", &text, &mut back).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn missing_builder() {
        let mut registry = TypeRegistry::new();
        registry
            .register(
                RecordType::new("Opaque", 4, 4)
                    .with_version(1)
                    .with_flags(SerializationFlags::USES_BUILDER),
            )
            .unwrap();

        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        let err = serialize(&mut ser, &registry, TypeHash::of("Opaque"), &mut [0; 4]).unwrap_err();
        assert!(matches!(err, SerialError::MissingBuilder { name } if name == "Opaque"));
    }

    // -------------------------------------------------------------------------
    // Failures

    #[test]
    fn rejects_unserializable_and_short_data() {
        let mut registry = TypeRegistry::new();
        registry.register(RecordType::new("Cache", 4, 4)).unwrap();

        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        let err = serialize(&mut ser, &registry, TypeHash::of("Cache"), &mut [0; 4]).unwrap_err();
        assert!(matches!(err, SerialError::NotSerializable { .. }));

        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        let err = serialize(&mut ser, &registry, TypeHash::of("u64"), &mut [0; 4]).unwrap_err();
        assert!(matches!(err, SerialError::BufferTooSmall { needed: 8, available: 4, .. }));

        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()));
        let err = serialize(&mut ser, &registry, TypeHash::of("Nope"), &mut []).unwrap_err();
        assert!(matches!(err, SerialError::UnknownType(_)));
    }

    #[test]
    fn overflowing_array_extent_is_too_small() {
        let mut registry = TypeRegistry::new();
        registry
            .register(RecordType::new("Blob", 1 << 62, 1).with_version(1))
            .unwrap();
        let json = r#"{
            "Array": {
                "header": { "name": "Blobs", "size": 0, "alignment": 1, "serialized_version": 1 },
                "element": "Blob",
                "element_count": 4
            }
        }"#;
        let blobs: TypeDescriptor = serde_json::from_str(json).unwrap();
        registry.register(blobs).unwrap();

        let err = read_binary(&registry, "Blobs", vec![3, 0, 0, 0], &mut []).unwrap_err();
        assert!(matches!(
            err,
            SerialError::BufferTooSmall { needed: usize::MAX, available: 0, .. }
        ));
    }

    #[test]
    fn encoding_selection() {
        let table = SerializationFlags::TABLE_FORMAT;
        let both = SerializationFlags::TABLE_FORMAT | SerializationFlags::PACKED_FORMAT;
        assert_eq!(Encoding::select(Format::Binary, table), Encoding::Table);
        assert_eq!(Encoding::select(Format::Binary, both), Encoding::Packed);
        assert_eq!(Encoding::select(Format::Binary, SerializationFlags::empty()), Encoding::Packed);
        assert_eq!(Encoding::select(Format::Text, table), Encoding::Packed);
    }

    #[test]
    fn unversioned_streams_skip_headers() {
        let (registry, mut data) = all_kinds();
        let mut ser = BinarySerializer::writer(Cursor::new(Vec::new()))
            .with_flags(StreamFlags::UNVERSIONED | StreamFlags::NO_FLAGS);
        serialize(&mut ser, &registry, TypeHash::of("AllKinds"), &mut data).unwrap();
        assert_eq!(ser.into_inner().into_inner().len(), 75);
    }
}
