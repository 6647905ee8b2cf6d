use alloc::borrow::Cow;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::info::{FieldFlags, HashedName, QualifierFlags, SerializationFlags};
use crate::info::{TypeHash, TypeHeader};

// -----------------------------------------------------------------------------
// Field

/// A member of a [`RecordType`].
///
/// A field participates at version `v` when `v` lies in the half-open
/// range `[version_added, version_removed)`; `version_removed == None`
/// means the field was never removed.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{Field, TypeHash};
///
/// let field = Field::new("mana", 8, TypeHash::of("i32")).since(3).until(5);
///
/// assert!(!field.in_version(2));
/// assert!(field.in_version(3));
/// assert!(field.in_version(4));
/// assert!(!field.in_version(5));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    name: HashedName,
    offset: usize,
    #[serde(rename = "type")]
    ty: TypeHash,
    #[serde(default)]
    qualifiers: QualifierFlags,
    #[serde(default)]
    flags: FieldFlags,
    #[serde(default = "first_version")]
    version_added: u32,
    #[serde(default)]
    version_removed: Option<u32>,
    #[serde(default)]
    template_argument_binding: Option<usize>,
    #[serde(default)]
    custom_serializer: Option<HashedName>,
}

fn first_version() -> u32 {
    1
}

impl Field {
    /// Create a field present since version 1.
    pub fn new(name: impl Into<Cow<'static, str>>, offset: usize, ty: TypeHash) -> Self {
        Self {
            name: HashedName::new(name),
            offset,
            ty,
            qualifiers: QualifierFlags::empty(),
            flags: FieldFlags::empty(),
            version_added: 1,
            version_removed: None,
            template_argument_binding: None,
            custom_serializer: None,
        }
    }

    /// Set the version the field was added in.
    pub fn since(mut self, version: u32) -> Self {
        self.version_added = version;
        self
    }

    /// Set the version the field was removed in (exclusive).
    pub fn until(mut self, version: u32) -> Self {
        self.version_removed = Some(version);
        self
    }

    /// Set the declared type's qualifiers.
    pub fn with_qualifiers(mut self, qualifiers: QualifierFlags) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Copy the field as raw bytes.
    pub fn raw_bytes(mut self) -> Self {
        self.flags |= FieldFlags::RAW_BYTES;
        self
    }

    /// Take the field's type from the owning record's generic argument `index`.
    pub fn bound_to(mut self, index: usize) -> Self {
        self.template_argument_binding = Some(index);
        self
    }

    /// Serialize the field with the builder registered under `name`.
    pub fn with_serializer(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.custom_serializer = Some(HashedName::new(name));
        self
    }

    /// Returns the field name.
    #[inline]
    pub const fn name(&self) -> &HashedName {
        &self.name
    }

    /// Returns the byte offset from the start of the record.
    #[inline]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the declared type.
    ///
    /// Fields with a [template binding](Self::template_argument_binding)
    /// resolve their type through [`RecordType::field_type`] instead.
    #[inline]
    pub const fn ty(&self) -> TypeHash {
        self.ty
    }

    /// Returns the declared type's qualifiers.
    #[inline]
    pub const fn qualifiers(&self) -> QualifierFlags {
        self.qualifiers
    }

    /// Returns the per-field encoding overrides.
    #[inline]
    pub const fn flags(&self) -> FieldFlags {
        self.flags
    }

    #[inline]
    pub const fn version_added(&self) -> u32 {
        self.version_added
    }

    #[inline]
    pub const fn version_removed(&self) -> Option<u32> {
        self.version_removed
    }

    #[inline]
    pub const fn template_argument_binding(&self) -> Option<usize> {
        self.template_argument_binding
    }

    /// Returns the name of the builder serializing this field, if any.
    #[inline]
    pub const fn custom_serializer(&self) -> Option<&HashedName> {
        self.custom_serializer.as_ref()
    }

    /// Returns `true` if the field participates at `version`.
    #[inline]
    pub fn in_version(&self, version: u32) -> bool {
        version >= self.version_added
            && self.version_removed.is_none_or(|removed| version < removed)
    }

    /// Pointer and reference fields are not owned data and never walked.
    #[inline]
    pub const fn is_indirect(&self) -> bool {
        self.qualifiers.is_indirect()
    }
}

// -----------------------------------------------------------------------------
// RecordType

/// Descriptor of a record (struct or class).
///
/// Base records are serialized before the record's own fields, at the same
/// address. Nested types are informational and never walked.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{Field, FundamentalKind, RecordType, SerializationFlags};
///
/// let info = RecordType::new("game::Stats", 8, 4)
///     .with_version(2)
///     .with_flags(SerializationFlags::TABLE_FORMAT)
///     .with_field(Field::new("health", 0, FundamentalKind::I32.type_hash()))
///     .with_field(Field::new("mana", 4, FundamentalKind::I32.type_hash()).since(2));
///
/// assert_eq!(info.fields().len(), 2);
/// assert_eq!(info.field("mana").unwrap().version_added(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordType {
    header: TypeHeader,
    #[serde(default)]
    fields: Vec<Field>,
    #[serde(default)]
    bases: Vec<TypeHash>,
    #[serde(default)]
    nested_types: Vec<TypeHash>,
    #[serde(default)]
    generic_arguments: Vec<TypeHash>,
}

impl RecordType {
    /// Create a record without fields.
    ///
    /// The version is 0 (not serializable) until [`with_version`](Self::with_version).
    pub fn new(name: impl Into<Cow<'static, str>>, size: usize, alignment: usize) -> Self {
        Self {
            header: TypeHeader::new(name, size, alignment),
            fields: Vec::new(),
            bases: Vec::new(),
            nested_types: Vec::new(),
            generic_arguments: Vec::new(),
        }
    }

    /// Set the current serialized version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.header = self.header.with_version(version);
        self
    }

    /// Set the serialization flags.
    pub fn with_flags(mut self, flags: SerializationFlags) -> Self {
        self.header = self.header.with_flags(flags);
        self
    }

    /// Append a field, declaration order is kept.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a base record.
    pub fn with_base(mut self, base: TypeHash) -> Self {
        self.bases.push(base);
        self
    }

    /// Append a nested type declaration.
    pub fn with_nested_type(mut self, nested: TypeHash) -> Self {
        self.nested_types.push(nested);
        self
    }

    /// Append a generic argument of this instantiation.
    pub fn with_generic_argument(mut self, argument: TypeHash) -> Self {
        self.generic_arguments.push(argument);
        self
    }

    /// Returns the [`TypeHeader`].
    #[inline]
    pub const fn header(&self) -> &TypeHeader {
        &self.header
    }

    /// Returns the fields in declaration order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[inline]
    pub fn bases(&self) -> &[TypeHash] {
        &self.bases
    }

    #[inline]
    pub fn nested_types(&self) -> &[TypeHash] {
        &self.nested_types
    }

    #[inline]
    pub fn generic_arguments(&self) -> &[TypeHash] {
        &self.generic_arguments
    }

    /// Returns the field with the given name.
    ///
    /// This is O(N) complexity.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == *name)
    }

    /// Resolve the type of `field`, following its template binding.
    ///
    /// Returns `None` if the binding is out of range.
    pub fn field_type(&self, field: &Field) -> Option<TypeHash> {
        match field.template_argument_binding {
            Some(index) => self.generic_arguments.get(index).copied(),
            None => Some(field.ty),
        }
    }

    /// Linear search for the field matching a table header.
    ///
    /// Both the resolved type hash and the field name hash must match,
    /// pointer and reference fields never match.
    pub fn find_field(&self, type_hash: TypeHash, field_hash: u32) -> Option<&Field> {
        self.fields.iter().find(|f| {
            !f.is_indirect()
                && f.name.hash() == field_hash
                && self.field_type(f) == Some(type_hash)
        })
    }
}
