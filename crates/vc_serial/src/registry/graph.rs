use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::info::{TypeDescriptor, TypeHash};
use crate::registry::TypeRegistry;

/// The type graph handed over by a codegen stage.
///
/// Type references inside may be names or raw hashes, see
/// [`TypeHash`](crate::info::TypeHash). Name hashes are always recomputed.
///
/// # Examples
///
/// ```
/// use vc_serial::info::TypeHash;
/// use vc_serial::registry::{TypeGraph, TypeRegistry};
///
/// let graph: TypeGraph = serde_json::from_str(r#"{ "types": [
///     { "Enum": {
///         "header": { "name": "Mode", "size": 1, "alignment": 1, "serialized_version": 1 },
///         "underlying": "U8",
///         "constants": [ { "name": "Off", "value": 0 }, { "name": "On", "value": 1 } ]
///     } }
/// ] }"#).unwrap();
///
/// let registry = TypeRegistry::from_graph(graph).unwrap();
/// assert!(registry.contains(TypeHash::of("Mode")));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeGraph {
    pub types: Vec<TypeDescriptor>,
}

impl TypeRegistry {
    /// Creates a registry with the fundamentals and every type of `graph`,
    /// then validates it.
    pub fn from_graph(graph: TypeGraph) -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        registry.load_graph(graph)?;
        Ok(registry)
    }

    /// Registers every type of `graph`, then validates the whole registry.
    ///
    /// Builders referenced by the graph must be registered beforehand. On
    /// error the types added by this call are removed again.
    pub fn load_graph(&mut self, graph: TypeGraph) -> Result<(), SchemaError> {
        let mut added = Vec::with_capacity(graph.types.len());
        let result = self
            .register_all(graph, &mut added)
            .and_then(|()| self.validate());

        match &result {
            Ok(()) => log::debug!("loaded {} types from a type graph", added.len()),
            Err(err) => {
                log::debug!("type graph rejected, removing {} types: {err}", added.len());
                for hash in added {
                    self.unregister(hash);
                }
            }
        }
        result
    }

    fn register_all(
        &mut self,
        graph: TypeGraph,
        added: &mut Vec<TypeHash>,
    ) -> Result<(), SchemaError> {
        for ty in graph.types {
            let hash = ty.hash();
            let fresh = !self.contains(hash);
            self.register(ty)?;
            if fresh {
                added.push(hash);
            }
        }
        Ok(())
    }

    /// Exports the registered types, ordered by hash.
    pub fn to_graph(&self) -> TypeGraph {
        TypeGraph {
            types: self.sorted().into_iter().cloned().collect(),
        }
    }
}
