use alloc::string::String;
use alloc::vec::Vec;

use vc_utils::hash::{PreHashMap, fnv1a_32};

use crate::builder::BuilderFn;
use crate::error::{SchemaError, SerialError};
use crate::info::{FundamentalKind, TypeDescriptor, TypeHash};

// -----------------------------------------------------------------------------
// TypeRegistry

/// Store of type descriptors and builders.
///
/// # Examples
///
/// ```
/// use vc_serial::info::{FundamentalKind, TypeHash};
/// use vc_serial::registry::TypeRegistry;
///
/// let registry = TypeRegistry::new();
/// let ty = registry.get_with_name("u32").unwrap();
/// assert_eq!(ty.hash(), FundamentalKind::U32.type_hash());
/// assert!(registry.get(TypeHash::of("Missing")).is_none());
/// ```
#[derive(Debug)]
pub struct TypeRegistry {
    types: PreHashMap<TypeHash, TypeDescriptor>,
    builders: PreHashMap<TypeHash, BuilderFn>,
    named_builders: PreHashMap<u32, NamedBuilder>,
}

#[derive(Debug, Clone)]
struct NamedBuilder {
    name: String,
    builder: BuilderFn,
}

impl Default for TypeRegistry {
    /// See [`TypeRegistry::new`].
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Creates a registry without any type.
    pub fn empty() -> Self {
        Self {
            types: PreHashMap::default(),
            builders: PreHashMap::default(),
            named_builders: PreHashMap::default(),
        }
    }

    /// Creates a registry holding the descriptors of all fundamental kinds.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in FundamentalKind::ALL {
            registry.insert(TypeDescriptor::fundamental(kind));
        }
        registry
    }

    /// Registers a descriptor.
    ///
    /// Registering a type whose name is already present keeps the first
    /// descriptor. A different name with the same hash is a
    /// [`SchemaError::HashCollision`].
    pub fn register(&mut self, ty: impl Into<TypeDescriptor>) -> Result<(), SchemaError> {
        let ty = ty.into();
        let hash = ty.hash();
        match self.types.get(&hash) {
            Some(existing) if existing.name() == ty.name() => {
                log::debug!("type `{}` is already registered", ty.name());
                Ok(())
            }
            Some(existing) => Err(SchemaError::HashCollision {
                existing: existing.name().into(),
                incoming: ty.name().into(),
                hash,
            }),
            None => {
                log::trace!("registered type `{}` as {hash}", ty.name());
                self.types.insert(hash, ty);
                Ok(())
            }
        }
    }

    /// Removes the descriptor registered under `hash`.
    pub(crate) fn unregister(&mut self, hash: TypeHash) -> Option<TypeDescriptor> {
        self.types.remove(&hash)
    }

    /// Inserts a descriptor, replacing any previous one with the same hash.
    pub fn insert(&mut self, ty: impl Into<TypeDescriptor>) -> Option<TypeDescriptor> {
        let ty = ty.into();
        self.types.insert(ty.hash(), ty)
    }

    /// Registers the builder run for every value of the type `ty`.
    ///
    /// Only used if the type carries `USES_BUILDER`.
    pub fn register_builder(&mut self, ty: TypeHash, builder: BuilderFn) {
        self.builders.insert(ty, builder);
    }

    /// Registers a builder that fields refer to by name.
    pub fn register_named_builder(&mut self, name: impl Into<String>, builder: BuilderFn) {
        let name = name.into();
        self.named_builders
            .insert(fnv1a_32(&name), NamedBuilder { name, builder });
    }

    #[inline]
    pub fn get(&self, hash: TypeHash) -> Option<&TypeDescriptor> {
        self.types.get(&hash)
    }

    /// Looks a type up by its fully-qualified name.
    pub fn get_with_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.get(TypeHash::of(name)).filter(|ty| ty.name() == name)
    }

    /// Like [`get`](Self::get), but a missing type is [`SerialError::UnknownType`].
    pub fn resolve(&self, hash: TypeHash) -> Result<&TypeDescriptor, SerialError> {
        self.get(hash).ok_or(SerialError::UnknownType(hash))
    }

    #[inline]
    pub fn contains(&self, hash: TypeHash) -> bool {
        self.types.contains_key(&hash)
    }

    /// Returns the builder registered for the type `ty`.
    #[inline]
    pub fn builder(&self, ty: TypeHash) -> Option<BuilderFn> {
        self.builders.get(&ty).copied()
    }

    /// Returns the builder registered under `name`.
    pub fn named_builder(&self, name: &str) -> Option<BuilderFn> {
        self.named_builders
            .get(&fnv1a_32(name))
            .filter(|entry| entry.name == name)
            .map(|entry| entry.builder)
    }

    /// Iterates over the registered descriptors in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Returns the descriptors ordered by hash.
    pub(crate) fn sorted(&self) -> Vec<&TypeDescriptor> {
        let mut types: Vec<_> = self.types.values().collect();
        types.sort_unstable_by_key(|ty| ty.hash());
        types
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
