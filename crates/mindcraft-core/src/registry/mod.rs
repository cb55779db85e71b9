//! Read-only-during-parse registries.
//!
//! Each registry is exposed as a trait so the parser/type engine/suggestion
//! engine depend on an interface, never a concrete store: the host may
//! swap in whatever storage it likes as long as it implements these
//! traits.

pub mod catalog;
pub mod conversions;
pub mod functions;
pub mod operators;
pub mod types;

pub use catalog::{InMemoryTileCatalog, TileCatalog};
pub use conversions::{Conversion, ConversionRegistry, InMemoryConversionRegistry};
pub use functions::{ArgKind, ArgNode, ArgSlot, CallDef, CallSpec, FunctionEntry, FunctionRegistry, InMemoryFunctionRegistry};
pub use operators::{InMemoryOperatorTable, OpOverload, OperatorTable, RegisteredOperator};
pub use types::{CoreType, InMemoryTypeRegistry, TypeDef, TypeRegistry};

/// Borrow bundle threading the registries through the parser, type engine,
/// and suggestion engine without any process-wide mutable state: passed as
/// an explicit context parameter, never a singleton.
pub struct Ctx<'a> {
    pub tiles: &'a dyn TileCatalog,
    pub types: &'a dyn TypeRegistry,
    pub ops: &'a dyn OperatorTable,
    pub conversions: &'a dyn ConversionRegistry,
    pub functions: &'a dyn FunctionRegistry,
}

impl<'a> Ctx<'a> {
    #[must_use]
    pub fn new(
        tiles: &'a dyn TileCatalog,
        types: &'a dyn TypeRegistry,
        ops: &'a dyn OperatorTable,
        conversions: &'a dyn ConversionRegistry,
        functions: &'a dyn FunctionRegistry,
    ) -> Self {
        Self {
            tiles,
            types,
            ops,
            conversions,
            functions,
        }
    }
}
