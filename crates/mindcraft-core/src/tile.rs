//! Tile definitions: the atomic input symbols of Mindcraft.
//!
//! Pure data: a tagged enum carrying just enough per-kind state for the
//! parser, type engine, and suggestion engine to do their jobs without
//! re-deriving it.

use serde::{Deserialize, Serialize};

use crate::bitset::BitSet;
use crate::ids::{FnId, TileId, TypeId};

/// A constant value carried by a literal tile, as a tagged enum: the core
/// never evaluates these, it only reads them for labelling and for
/// implicit-conversion diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    Nil,
    /// Opaque struct value; the core never inspects struct contents, only
    /// the struct's `TypeId` (field access relies on the type registry).
    Struct(TypeId),
}

/// Operator fixity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fixity {
    Prefix,
    Infix,
}

/// Control-flow marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlFlowId {
    OpenParen,
    CloseParen,
}

/// The tag distinguishing tile kinds, plus each kind's extra fields: one
/// tagged enum with per-variant payloads instead of a class hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TileKind {
    Literal {
        value_type: TypeId,
        value: Value,
        value_label: String,
    },
    Variable {
        var_name: String,
        var_type: TypeId,
        unique_id: u64,
    },
    Operator {
        op_id: crate::ids::OpId,
        fixity: Fixity,
        precedence: u32,
        /// `true` for the assignment operator, which the Pratt parser binds
        /// right-associatively regardless of its declared `precedence`.
        is_assignment: bool,
    },
    ControlFlow {
        cf_id: ControlFlowId,
    },
    Parameter {
        parameter_id: String,
        data_type: TypeId,
    },
    Modifier {
        modifier_id: String,
    },
    Accessor {
        struct_type_id: TypeId,
        field_name: String,
        field_type_id: TypeId,
        read_only: bool,
    },
    Sensor {
        sensor_id: String,
        output_type: TypeId,
        function_entry: FnId,
    },
    Actuator {
        actuator_id: String,
        function_entry: FnId,
    },
    Factory {
        factory_id: String,
        produced_data_type: TypeId,
    },
    Page {
        page_id: String,
        value_type: TypeId,
    },
    /// Placeholder for unresolved references (e.g. a tile id the catalog
    /// no longer knows about).
    Missing,
}

impl TileKind {
    /// `true` for sensor tiles whose placement includes `Inline` — these
    /// are treated as ordinary value primaries by the Pratt NUD table
    /// rather than dispatched to the action-call parser.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        matches!(self, TileKind::Sensor { .. })
    }

    #[must_use]
    pub fn is_actuator(&self) -> bool {
        matches!(self, TileKind::Actuator { .. })
    }

    #[must_use]
    pub fn is_operator(&self) -> bool {
        matches!(self, TileKind::Operator { .. })
    }

    /// `true` for the assignment operator tile, the Pratt layer's
    /// right-associative special case.
    #[must_use]
    pub fn is_assignment_operator(&self) -> bool {
        matches!(self, TileKind::Operator { is_assignment: true, .. })
    }

    #[must_use]
    pub fn is_accessor(&self) -> bool {
        matches!(self, TileKind::Accessor { .. })
    }

    #[must_use]
    pub fn is_modifier(&self) -> bool {
        matches!(self, TileKind::Modifier { .. })
    }

    #[must_use]
    pub fn is_parameter(&self) -> bool {
        matches!(self, TileKind::Parameter { .. })
    }

    #[must_use]
    pub fn is_control_flow(&self, cf: ControlFlowId) -> bool {
        matches!(self, TileKind::ControlFlow { cf_id } if *cf_id == cf)
    }

    /// The function-entry reference carried by sensors/actuators, used to
    /// look up the call spec that drives `parse_action_call`.
    #[must_use]
    pub fn function_entry(&self) -> Option<FnId> {
        match self {
            TileKind::Sensor { function_entry, .. } | TileKind::Actuator { function_entry, .. } => {
                Some(*function_entry)
            }
            _ => None,
        }
    }
}

/// An immutable tile definition, addressed by `TileId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub tile_id: TileId,
    pub kind: TileKind,
    /// Placement bitmask; `None` means valid on any side.
    pub placement: Option<BitSet>,
    /// Capability bits that must all be present in the editor's
    /// `available_capabilities` for this tile to be suggestible.
    pub requirements: Option<BitSet>,
    /// Whether this tile definition should be persisted by the host
    /// (opaque to the core — carried through unexamined).
    pub persist: bool,
    /// Whether this tile should never be offered by the suggestion engine.
    pub hidden: bool,
}

impl TileDef {
    #[must_use]
    pub fn new(tile_id: TileId, kind: TileKind) -> Self {
        Self {
            tile_id,
            kind,
            placement: None,
            requirements: None,
            persist: true,
            hidden: false,
        }
    }

    #[must_use]
    pub fn with_placement(mut self, placement: BitSet) -> Self {
        self.placement = Some(placement);
        self
    }

    #[must_use]
    pub fn with_requirements(mut self, requirements: BitSet) -> Self {
        self.requirements = Some(requirements);
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The tile's declared output type, where that makes sense. Operators,
    /// control-flow, and modifiers have no single output type and return
    /// `None`.
    #[must_use]
    pub fn output_type(&self) -> Option<TypeId> {
        match &self.kind {
            TileKind::Literal { value_type, .. } => Some(*value_type),
            TileKind::Variable { var_type, .. } => Some(*var_type),
            TileKind::Accessor { field_type_id, .. } => Some(*field_type_id),
            TileKind::Sensor { output_type, .. } => Some(*output_type),
            TileKind::Factory { produced_data_type, .. } => Some(*produced_data_type),
            TileKind::Page { value_type, .. } => Some(*value_type),
            TileKind::Actuator { .. } => Some(crate::ids::TYPE_VOID),
            TileKind::Modifier { .. } => Some(crate::ids::TYPE_VOID),
            TileKind::Operator { .. }
            | TileKind::ControlFlow { .. }
            | TileKind::Parameter { .. }
            | TileKind::Missing => None,
        }
    }
}

/// Free function wrapping [`TileDef::output_type`], for callers that only
/// have a borrowed `&TileDef`.
#[must_use]
pub fn get_tile_output_type(tile_def: &TileDef) -> Option<TypeId> {
    tile_def.output_type()
}
