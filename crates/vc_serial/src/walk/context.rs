use alloc::vec::Vec;

use core::fmt;

use crate::info::TypeHash;
use crate::registry::TypeRegistry;
use crate::walk::ScratchBuffer;

// -----------------------------------------------------------------------------
// WalkContext

/// Per-call state of a walk.
///
/// Holds the registry used to resolve type references, the scratch buffer
/// for enum text and, with the `debug` feature, the path of types being
/// walked. Create one per thread, it can be reused across calls.
#[derive(Debug)]
pub struct WalkContext<'r> {
    registry: &'r TypeRegistry,
    scratch: ScratchBuffer,
    version_override: Option<u32>,
    #[cfg(all(debug_assertions, feature = "debug"))]
    stack: TypeStack,
}

impl<'r> WalkContext<'r> {
    /// Creates a context with the default scratch capacity.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            scratch: ScratchBuffer::default(),
            version_override: None,
            #[cfg(all(debug_assertions, feature = "debug"))]
            stack: TypeStack::default(),
        }
    }

    /// Replaces the scratch buffer with one of `capacity` bytes.
    pub fn with_scratch_capacity(mut self, capacity: usize) -> Self {
        self.scratch = ScratchBuffer::with_capacity(capacity);
        self
    }

    /// Version assumed for the outermost record of an unversioned stream.
    ///
    /// Ignored when the stream carries versions.
    pub fn with_version_override(mut self, version: u32) -> Self {
        self.version_override = Some(version);
        self
    }

    #[inline]
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    #[inline]
    pub fn version_override(&self) -> Option<u32> {
        self.version_override
    }

    #[inline]
    pub(crate) fn scratch_mut(&mut self) -> &mut ScratchBuffer {
        &mut self.scratch
    }

    /// Returns a printable path of the types entered but not left.
    ///
    /// Empty without the `debug` feature.
    pub fn type_path(&self) -> TypePath<'_> {
        TypePath {
            registry: self.registry,
            #[cfg(all(debug_assertions, feature = "debug"))]
            stack: &self.stack.hashes,
        }
    }

    #[inline]
    pub(crate) fn enter(&mut self, _ty: TypeHash) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.hashes.push(_ty);
    }

    #[inline]
    pub(crate) fn leave(&mut self) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.hashes.pop();
    }

    #[inline]
    pub(crate) fn reset(&mut self) {
        self.scratch.clear();
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.stack.hashes.clear();
    }
}

// -----------------------------------------------------------------------------
// TypeStack

/// Types currently being walked, outermost first.
///
/// Entries are only popped on success, so after a failure the stack
/// shows where it happened.
#[cfg(all(debug_assertions, feature = "debug"))]
#[derive(Debug, Default, Clone)]
struct TypeStack {
    hashes: Vec<TypeHash>,
}

/// Display adapter returned by [`WalkContext::type_path`].
pub struct TypePath<'a> {
    registry: &'a TypeRegistry,
    #[cfg(all(debug_assertions, feature = "debug"))]
    stack: &'a [TypeHash],
}

impl fmt::Display for TypePath<'_> {
    #[cfg(all(debug_assertions, feature = "debug"))]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.stack.iter();
        if let Some(first) = iter.next() {
            self.write_one(f, *first)?;
        }
        for hash in iter {
            f.write_str(" -> ")?;
            self.write_one(f, *hash)?;
        }
        Ok(())
    }

    #[cfg(not(all(debug_assertions, feature = "debug")))]
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _ = self.registry;
        Ok(())
    }
}

impl TypePath<'_> {
    #[cfg(all(debug_assertions, feature = "debug"))]
    fn write_one(&self, f: &mut fmt::Formatter<'_>, hash: TypeHash) -> fmt::Result {
        match self.registry.get(hash) {
            Some(ty) => write!(f, "`{}`", ty.name()),
            None => write!(f, "{hash}"),
        }
    }
}

impl fmt::Debug for TypePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(all(test, debug_assertions, feature = "debug"))]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::info::FundamentalKind;

    #[test]
    fn path_names_registered_types() {
        let registry = TypeRegistry::new();
        let mut ctx = WalkContext::new(&registry);
        ctx.enter(FundamentalKind::U8.type_hash());
        ctx.enter(TypeHash::from_raw(7));
        assert_eq!(ctx.type_path().to_string(), "`u8` -> 0x00000007");

        ctx.leave();
        ctx.reset();
        assert_eq!(ctx.type_path().to_string(), "");
    }
}
