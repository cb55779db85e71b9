//! Type registry: type definitions and struct field tables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::TypeId;

/// The handful of primitive core types plus `Struct`, which carries a
/// field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreType {
    Unknown,
    Void,
    Number,
    String,
    Boolean,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub type_id: TypeId,
    pub name: String,
    pub core_type: CoreType,
    /// `(field name, field type)` pairs, in declaration order. Empty for
    /// non-struct types.
    pub fields: Vec<(String, TypeId)>,
}

impl TypeDef {
    #[must_use]
    pub fn primitive(type_id: TypeId, name: impl Into<String>, core_type: CoreType) -> Self {
        Self {
            type_id,
            name: name.into(),
            core_type,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn strukt(type_id: TypeId, name: impl Into<String>, fields: Vec<(String, TypeId)>) -> Self {
        Self {
            type_id,
            name: name.into(),
            core_type: CoreType::Struct,
            fields,
        }
    }

    #[must_use]
    pub fn field_type(&self, field_name: &str) -> Option<TypeId> {
        self.fields.iter().find(|(n, _)| n == field_name).map(|(_, t)| *t)
    }
}

/// Read-only-during-parse store of type definitions.
pub trait TypeRegistry {
    fn get(&self, type_id: TypeId) -> Option<&TypeDef>;
    fn get_all(&self) -> &[TypeDef];
}

/// Straightforward in-memory implementation, keyed by an [`IndexMap`] so
/// iteration order matches insertion order — useful for deterministic
/// suggestion-list ordering in tests, preferring `indexmap` over
/// `HashMap`.
#[derive(Debug, Default)]
pub struct InMemoryTypeRegistry {
    by_id: IndexMap<TypeId, TypeDef>,
    all: Vec<TypeDef>,
}

impl InMemoryTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: TypeDef) {
        self.all.push(def.clone());
        self.by_id.insert(def.type_id, def);
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn get(&self, type_id: TypeId) -> Option<&TypeDef> {
        self.by_id.get(&type_id)
    }

    fn get_all(&self) -> &[TypeDef] {
        &self.all
    }
}
