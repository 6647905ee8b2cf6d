use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use vc_utils::hash::PreHashMap;

use crate::error::SchemaError;
use crate::info::{ArrayType, EnumType, FundamentalType, RecordType, SerializationFlags};
use crate::info::{TypeDescriptor, TypeHash};
use crate::registry::TypeRegistry;

impl TypeRegistry {
    /// Checks the versioning and reference invariants of every registered type.
    ///
    /// Returns the first violation in hash order, per-type checks before
    /// containment cycles. Run this once after all types and builders are
    /// registered, the walk does not repeat these checks.
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self.validation_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Collects every invariant violation, see [`validate`](Self::validate).
    pub fn validation_errors(&self) -> Vec<SchemaError> {
        let mut errors = Vec::new();
        for ty in self.sorted() {
            Validator {
                registry: self,
                errors: &mut errors,
            }
            .check(ty);
        }
        self.find_cycles(&mut errors);
        errors
    }

    /// Types a value of `ty` contains by value and the walk descends into.
    fn embedded(&self, ty: &TypeDescriptor) -> Vec<TypeHash> {
        let flags = ty.serialization_flags();
        if flags.intersects(SerializationFlags::USES_BUILDER | SerializationFlags::RAW_BYTES) {
            return Vec::new();
        }
        match ty {
            TypeDescriptor::Fundamental(_) | TypeDescriptor::Enum(_) => Vec::new(),
            TypeDescriptor::Array(info) => vec![info.element()],
            TypeDescriptor::Record(info) => {
                let fields = info.fields().iter().filter(|field| {
                    !field.is_indirect()
                        && field.custom_serializer().is_none()
                        && field.flags().is_empty()
                });
                info.bases()
                    .iter()
                    .copied()
                    .chain(fields.filter_map(|field| info.field_type(field)))
                    .collect()
            }
        }
    }

    /// Depth-first search over [`embedded`](Self::embedded) edges, one
    /// [`SchemaError::Cycle`] per type that closes a cycle.
    fn find_cycles(&self, errors: &mut Vec<SchemaError>) {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: PreHashMap<TypeHash, Mark> = PreHashMap::default();
        for root in self.sorted() {
            if marks.contains_key(&root.hash()) {
                continue;
            }
            marks.insert(root.hash(), Mark::Visiting);
            let mut stack = vec![(root, self.embedded(root), 0_usize)];

            while let Some((ty, children, next)) = stack.last_mut() {
                let Some(&child) = children.get(*next) else {
                    marks.insert(ty.hash(), Mark::Done);
                    stack.pop();
                    continue;
                };
                *next += 1;
                let Some(child_ty) = self.get(child) else {
                    continue;
                };
                match marks.get(&child) {
                    Some(Mark::Done) => {}
                    Some(Mark::Visiting) => {
                        let err = SchemaError::Cycle {
                            type_name: child_ty.name().into(),
                        };
                        if !errors.contains(&err) {
                            errors.push(err);
                        }
                    }
                    None => {
                        marks.insert(child, Mark::Visiting);
                        stack.push((child_ty, self.embedded(child_ty), 0));
                    }
                }
            }
        }
    }
}

struct Validator<'a> {
    registry: &'a TypeRegistry,
    errors: &'a mut Vec<SchemaError>,
}

impl<'a> Validator<'a> {
    fn check(&mut self, ty: &TypeDescriptor) {
        if ty
            .serialization_flags()
            .contains(SerializationFlags::USES_BUILDER)
            && self.registry.builder(ty.hash()).is_none()
        {
            self.errors.push(SchemaError::MissingBuilder {
                owner: ty.name().into(),
                builder: ty.name().into(),
            });
        }

        match ty {
            TypeDescriptor::Fundamental(info) => self.check_fundamental(info),
            TypeDescriptor::Enum(info) => self.check_enum(info),
            TypeDescriptor::Array(info) => self.check_array(info),
            TypeDescriptor::Record(info) => self.check_record(info),
        }
    }

    /// Resolves a reference, recording an error if it is missing or,
    /// when `participating`, not serializable.
    fn reference(
        &mut self,
        owner: &str,
        hash: TypeHash,
        participating: bool,
    ) -> Option<&'a TypeDescriptor> {
        let registry = self.registry;
        let Some(ty) = registry.get(hash) else {
            self.errors.push(SchemaError::UnknownType {
                owner: owner.into(),
                referenced: hash,
            });
            return None;
        };
        if participating && !ty.header().is_serializable() {
            self.errors.push(SchemaError::NotSerializable {
                owner: owner.into(),
                referenced: ty.name().into(),
            });
        }
        Some(ty)
    }

    fn check_size(&mut self, owner: &str, size: usize, expected: usize) {
        if size != expected {
            self.errors.push(SchemaError::SizeMismatch {
                owner: owner.into(),
                size,
                expected,
            });
        }
    }

    fn check_fundamental(&mut self, info: &FundamentalType) {
        let header = info.header();
        self.check_size(header.name(), header.size(), info.kind().size());
    }

    fn check_enum(&mut self, info: &EnumType) {
        let header = info.header();
        if !info.underlying().is_enum_compatible() {
            self.errors.push(SchemaError::EnumNotInteger {
                owner: header.name().into(),
                kind: info.underlying(),
            });
        }
        self.check_size(header.name(), header.size(), info.underlying().size());
    }

    fn check_array(&mut self, info: &ArrayType) {
        let header = info.header();
        let owner = header.name();
        let live = header.is_serializable();
        let Some(element) = self.reference(owner, info.element(), live) else {
            return;
        };
        match element.size().checked_mul(info.element_count()) {
            Some(expected) if expected == header.size() => {}
            expected => self.errors.push(SchemaError::ArraySizeMismatch {
                owner: owner.into(),
                size: header.size(),
                expected: expected.unwrap_or(usize::MAX),
            }),
        }
    }

    fn check_record(&mut self, info: &RecordType) {
        let header = info.header();
        let owner = header.name();
        let live = header.is_serializable();
        let registry = self.registry;

        for &base in info.bases() {
            if let Some(ty) = self.reference(owner, base, live)
                && ty.as_record().is_err()
            {
                self.errors.push(SchemaError::BaseNotRecord {
                    owner: owner.into(),
                    base: ty.name().into(),
                });
            }
        }
        for &nested in info.nested_types() {
            self.reference(owner, nested, false);
        }
        for &argument in info.generic_arguments() {
            self.reference(owner, argument, false);
        }

        let mut seen: Vec<(TypeHash, u32)> = Vec::with_capacity(info.fields().len());
        for field in info.fields() {
            if field.is_indirect() {
                continue;
            }
            let field_name = || -> String { field.name().as_str().into() };

            let added = field.version_added();
            let removed = field.version_removed();
            if added == 0 || removed.is_some_and(|removed| removed <= added) {
                self.errors.push(SchemaError::InvalidVersionRange {
                    owner: owner.into(),
                    field: field_name(),
                    added,
                    removed,
                });
            } else if live && added > header.serialized_version() {
                self.errors.push(SchemaError::FieldFromFuture {
                    owner: owner.into(),
                    field: field_name(),
                    added,
                    current: header.serialized_version(),
                });
            }

            if let Some(name) = field.custom_serializer()
                && registry.named_builder(name.as_str()).is_none()
            {
                self.errors.push(SchemaError::MissingBuilder {
                    owner: owner.into(),
                    builder: name.as_str().into(),
                });
            }

            let Some(hash) = info.field_type(field) else {
                self.errors.push(SchemaError::TemplateBindingOutOfRange {
                    owner: owner.into(),
                    field: field_name(),
                    binding: field.template_argument_binding().unwrap_or_default(),
                    len: info.generic_arguments().len(),
                });
                continue;
            };

            if seen.contains(&(hash, field.name().hash())) {
                self.errors.push(SchemaError::DuplicateField {
                    owner: owner.into(),
                    field: field_name(),
                });
            }
            seen.push((hash, field.name().hash()));

            // Raw and custom fields never walk their type.
            let walked = live && field.custom_serializer().is_none() && field.flags().is_empty();
            let Some(ty) = self.reference(owner, hash, walked) else {
                continue;
            };
            let end = field.offset().checked_add(ty.size());
            if end.is_none_or(|end| end > header.size()) {
                self.errors.push(SchemaError::FieldOutOfBounds {
                    owner: owner.into(),
                    field: field_name(),
                    offset: field.offset(),
                    size: ty.size(),
                    record_size: header.size(),
                });
            }
        }
    }
}
