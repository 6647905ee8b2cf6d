use alloc::string::String;

use thiserror::Error;

use crate::info::{FundamentalKind, TypeHash};

// -----------------------------------------------------------------------------
// SchemaError

/// A type graph that breaks the versioning or reference invariants.
///
/// Reported once, when the graph is validated, instead of on every call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("`{owner}` refers to unknown type {referenced}")]
    UnknownType { owner: String, referenced: TypeHash },

    #[error("`{owner}` uses `{referenced}`, which is not serializable (version 0)")]
    NotSerializable { owner: String, referenced: String },

    #[error("field `{owner}::{field}` has an invalid version range [{added}, {removed:?})")]
    InvalidVersionRange {
        owner: String,
        field: String,
        added: u32,
        removed: Option<u32>,
    },

    #[error("field `{owner}::{field}` is added in version {added}, after current {current}")]
    FieldFromFuture {
        owner: String,
        field: String,
        added: u32,
        current: u32,
    },

    #[error("field `{owner}::{field}` spans {size} bytes at {offset}, past the size {record_size}")]
    FieldOutOfBounds {
        owner: String,
        field: String,
        offset: usize,
        size: usize,
        record_size: usize,
    },

    #[error("field `{owner}::{field}` binds generic argument {binding} of {len}")]
    TemplateBindingOutOfRange {
        owner: String,
        field: String,
        binding: usize,
        len: usize,
    },

    #[error("`{owner}` declares `{base}` as a base, but it is not a record")]
    BaseNotRecord { owner: String, base: String },

    #[error("enum `{owner}` is backed by `{kind}`, expected an integer of at most 64 bits")]
    EnumNotInteger { owner: String, kind: FundamentalKind },

    #[error("array `{owner}` has size {size}, expected {expected} from its element type")]
    ArraySizeMismatch {
        owner: String,
        size: usize,
        expected: usize,
    },

    #[error("`{owner}` requires builder `{builder}`, which is not registered")]
    MissingBuilder { owner: String, builder: String },

    #[error("`{owner}` declares more than one field matching `{field}` with the same type")]
    DuplicateField { owner: String, field: String },

    #[error("`{owner}` has size {size}, expected {expected} from its underlying type")]
    SizeMismatch {
        owner: String,
        size: usize,
        expected: usize,
    },

    #[error("`{type_name}` contains itself by value")]
    Cycle { type_name: String },

    #[error("type `{incoming}` collides with registered type `{existing}` on hash {hash}")]
    HashCollision {
        existing: String,
        incoming: String,
        hash: TypeHash,
    },
}

// -----------------------------------------------------------------------------
// SerialError

/// Failure of one serialize or deserialize call.
///
/// Nothing is rolled back: the destination may be partially written.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SerialError {
    #[error("type `{type_name}` is not serializable (version 0)")]
    NotSerializable { type_name: String },

    #[error("type {0} is not registered")]
    UnknownType(TypeHash),

    #[error("no field of `{record}` matches type {type_hash}, field {field_hash:#010x}")]
    MissingField {
        record: String,
        type_hash: TypeHash,
        field_hash: u32,
    },

    #[error("builder `{name}` is not registered")]
    MissingBuilder { name: String },

    #[error("`{type_name}` was written with version {found}, newer than current {current}")]
    FutureVersion {
        type_name: String,
        found: u32,
        current: u32,
    },

    #[error("`{type_name}` needs {needed} bytes of instance data, {available} available")]
    BufferTooSmall {
        type_name: String,
        needed: usize,
        available: usize,
    },

    #[error("{needed} bytes exceed the capacity of {capacity}")]
    Capacity { needed: usize, capacity: usize },

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("invalid UTF-8 in text data")]
    InvalidUtf8,

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("serializer used before `begin`")]
    NotBegun,

    #[error("serializer already begun")]
    AlreadyBegun,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("stream ended with {missing} bytes still expected")]
    UnexpectedEof { missing: usize },

    #[error("stream accepted no more bytes, {pending} pending")]
    WriteZero { pending: usize },

    #[cfg(feature = "std")]
    #[error(transparent)]
    Stream(#[from] std::io::Error),
}

impl SerialError {
    /// Shorthand for [`SerialError::Malformed`].
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}
