//! The type inference & conversion engine: a post-order visitor that
//! decorates a `TypeEnv` with inferred/expected types, resolves operator
//! overloads, inserts implicit conversions, and emits diagnostics. Never
//! halts — every node gets an entry, possibly left at `Unknown`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, ExprKind};
use crate::diag::{TypeDiagCode, TypeInfoDiag};
use crate::ids::{NodeId, TypeId, TYPE_UNKNOWN, TYPE_VOID};
use crate::registry::{Conversion, Ctx, OpOverload};

/// Per-node type information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub inferred: TypeId,
    pub expected: TypeId,
    pub is_l_val: bool,
    pub overload: Option<OpOverload>,
    pub conversion: Option<Conversion>,
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self {
            inferred: TYPE_UNKNOWN,
            expected: TYPE_UNKNOWN,
            is_l_val: false,
            overload: None,
            conversion: None,
        }
    }
}

/// `node_id -> TypeInfo` map, the mutable output of
/// [`compute_inferred_types`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeEnv {
    entries: HashMap<NodeId, TypeInfo>,
}

impl TypeEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&TypeInfo> {
        self.entries.get(&node_id)
    }

    pub fn entry_mut(&mut self, node_id: NodeId) -> &mut TypeInfo {
        self.entries.entry(node_id).or_default()
    }

    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.entries.contains_key(&node_id)
    }
}

/// `compute_inferred_types(root_expr, catalogs, env)`: mutates `env` in
/// place, post-order, returning the emitted diagnostics.
pub fn compute_inferred_types(root: &Expr, ctx: &Ctx<'_>, env: &mut TypeEnv) -> Vec<TypeInfoDiag> {
    let mut diags = Vec::new();
    visit(root, ctx, env, &mut diags);
    diags
}

fn visit(expr: &Expr, ctx: &Ctx<'_>, env: &mut TypeEnv, diags: &mut Vec<TypeInfoDiag>) {
    match &expr.kind {
        ExprKind::Empty => {
            env.entry_mut(expr.node_id);
        }
        ExprKind::Literal { tile } | ExprKind::Variable { tile } => {
            let inferred = tile_output_type(ctx, *tile, diags, expr.node_id);
            env.entry_mut(expr.node_id).inferred = inferred;
        }
        ExprKind::FieldAccess { object, accessor } => {
            visit(object, ctx, env, diags);
            let inferred = tile_output_type(ctx, *accessor, diags, expr.node_id);
            env.entry_mut(expr.node_id).inferred = inferred;
        }
        ExprKind::BinaryOp { op_id, left, right, .. } => {
            visit(left, ctx, env, diags);
            visit(right, ctx, env, diags);
            visit_binary_op(expr.node_id, *op_id, left.node_id, right.node_id, ctx, env, diags);
        }
        ExprKind::UnaryOp { op_id, operand, .. } => {
            visit(operand, ctx, env, diags);
            visit_unary_op(expr.node_id, *op_id, operand.node_id, ctx, env, diags);
        }
        ExprKind::Assignment { target, value } => {
            visit(target, ctx, env, diags);
            visit(value, ctx, env, diags);
            env.entry_mut(target.node_id).is_l_val = true;
            let value_type = env.get(value.node_id).map_or(TYPE_UNKNOWN, |t| t.inferred);
            let target_type = env.get(target.node_id).map_or(TYPE_UNKNOWN, |t| t.inferred);
            if target_type != TYPE_UNKNOWN && value_type != TYPE_UNKNOWN && target_type != value_type {
                diags.push(TypeInfoDiag::new(
                    TypeDiagCode::DataTypeMismatch,
                    format!("cannot assign {value_type} to a target of type {target_type}"),
                    expr.node_id,
                ));
            }
            // Narrow the target's inferred type to the assigned value's.
            env.entry_mut(target.node_id).inferred = value_type;
            env.entry_mut(expr.node_id).inferred = value_type;
        }
        ExprKind::Parameter { value, .. } => {
            visit(value, ctx, env, diags);
            let inferred = env.get(value.node_id).map_or(TYPE_UNKNOWN, |t| t.inferred);
            env.entry_mut(expr.node_id).inferred = inferred;
        }
        ExprKind::Modifier { .. } => {
            env.entry_mut(expr.node_id).inferred = TYPE_VOID;
        }
        ExprKind::Actuator {
            tile,
            anons,
            parameters,
            modifiers,
        } => {
            for slot in anons.iter().chain(parameters).chain(modifiers) {
                visit(&slot.expr, ctx, env, diags);
            }
            env.entry_mut(expr.node_id).inferred = TYPE_VOID;
            validate_call_slots(*tile, anons, parameters, ctx, env, diags);
        }
        ExprKind::Sensor {
            tile,
            anons,
            parameters,
            modifiers,
        } => {
            for slot in anons.iter().chain(parameters).chain(modifiers) {
                visit(&slot.expr, ctx, env, diags);
            }
            let inferred = tile_output_type(ctx, *tile, diags, expr.node_id);
            env.entry_mut(expr.node_id).inferred = inferred;
            validate_call_slots(*tile, anons, parameters, ctx, env, diags);
        }
        ExprKind::Error { partial_expr, .. } => {
            env.entry_mut(expr.node_id);
            if let Some(partial) = partial_expr {
                visit(partial, ctx, env, diags);
            }
        }
    }
}

fn tile_output_type(ctx: &Ctx<'_>, tile: crate::ids::TileId, diags: &mut Vec<TypeInfoDiag>, node_id: NodeId) -> TypeId {
    match ctx.tiles.get(tile) {
        Some(def) => def.output_type().unwrap_or(TYPE_UNKNOWN),
        None => {
            diags.push(TypeInfoDiag::new(
                TypeDiagCode::TileNotFound,
                format!("{tile} is not registered in the catalog"),
                node_id,
            ));
            TYPE_UNKNOWN
        }
    }
}

/// Direct overload, else right-coerce, else left-coerce, else
/// `NoOverloadForBinaryOp`. At most one side ever carries a `conversion` —
/// never both, to avoid double-converting the same operand.
fn visit_binary_op(
    node_id: NodeId,
    op_id: crate::ids::OpId,
    left_id: NodeId,
    right_id: NodeId,
    ctx: &Ctx<'_>,
    env: &mut TypeEnv,
    diags: &mut Vec<TypeInfoDiag>,
) {
    let left_type = env.get(left_id).map_or(TYPE_UNKNOWN, |t| t.inferred);
    let right_type = env.get(right_id).map_or(TYPE_UNKNOWN, |t| t.inferred);

    let Some(op) = ctx.ops.get(op_id) else {
        env.entry_mut(node_id);
        diags.push(TypeInfoDiag::new(
            TypeDiagCode::NoOverloadForBinaryOp,
            format!("operator {op_id} is not registered"),
            node_id,
        ));
        return;
    };

    if let Some(overload) = op.get(&[left_type, right_type]) {
        env.entry_mut(node_id).overload = Some(overload.clone());
        env.entry_mut(node_id).inferred = overload.result_type;
        return;
    }

    // Right-coerce: find R -> L, keep overload (L, L).
    if let Some(path) = ctx.conversions.find_best_path(right_type, left_type, Some(1)) {
        if let Some(conv) = path.into_iter().next() {
            if let Some(overload) = op.get(&[left_type, left_type]) {
                env.entry_mut(right_id).conversion = Some(conv);
                env.entry_mut(node_id).overload = Some(overload.clone());
                env.entry_mut(node_id).inferred = overload.result_type;
                diags.push(TypeInfoDiag::new(
                    TypeDiagCode::DataTypeConverted,
                    format!("converted right operand from {right_type} to {left_type}"),
                    right_id,
                ));
                return;
            }
        }
    }

    // Left-coerce, symmetrically.
    if let Some(path) = ctx.conversions.find_best_path(left_type, right_type, Some(1)) {
        if let Some(conv) = path.into_iter().next() {
            if let Some(overload) = op.get(&[right_type, right_type]) {
                env.entry_mut(left_id).conversion = Some(conv);
                env.entry_mut(node_id).overload = Some(overload.clone());
                env.entry_mut(node_id).inferred = overload.result_type;
                diags.push(TypeInfoDiag::new(
                    TypeDiagCode::DataTypeConverted,
                    format!("converted left operand from {left_type} to {right_type}"),
                    left_id,
                ));
                return;
            }
        }
    }

    env.entry_mut(node_id);
    diags.push(TypeInfoDiag::new(
        TypeDiagCode::NoOverloadForBinaryOp,
        format!("no overload of {op_id} accepts ({left_type}, {right_type})"),
        node_id,
    ));
}

/// Direct overload, else coerce the operand to Number, Boolean, then
/// String in that order, picking the first that has an overload.
fn visit_unary_op(
    node_id: NodeId,
    op_id: crate::ids::OpId,
    operand_id: NodeId,
    ctx: &Ctx<'_>,
    env: &mut TypeEnv,
    diags: &mut Vec<TypeInfoDiag>,
) {
    let operand_type = env.get(operand_id).map_or(TYPE_UNKNOWN, |t| t.inferred);

    let Some(op) = ctx.ops.get(op_id) else {
        env.entry_mut(node_id);
        diags.push(TypeInfoDiag::new(
            TypeDiagCode::NoOverloadForUnaryOp,
            format!("operator {op_id} is not registered"),
            node_id,
        ));
        return;
    };

    if let Some(overload) = op.get(&[operand_type]) {
        env.entry_mut(node_id).overload = Some(overload.clone());
        env.entry_mut(node_id).inferred = overload.result_type;
        return;
    }

    for candidate in coercion_order(ctx) {
        if candidate == operand_type {
            continue;
        }
        let Some(overload) = op.get(&[candidate]) else {
            continue;
        };
        let Some(path) = ctx.conversions.find_best_path(operand_type, candidate, Some(1)) else {
            continue;
        };
        let Some(conv) = path.into_iter().next() else {
            continue;
        };
        env.entry_mut(operand_id).conversion = Some(conv);
        env.entry_mut(node_id).overload = Some(overload.clone());
        env.entry_mut(node_id).inferred = overload.result_type;
        diags.push(TypeInfoDiag::new(
            TypeDiagCode::DataTypeConverted,
            format!("converted operand from {operand_type} to {candidate}"),
            operand_id,
        ));
        return;
    }

    env.entry_mut(node_id);
    diags.push(TypeInfoDiag::new(
        TypeDiagCode::NoOverloadForUnaryOp,
        format!("no overload of {op_id} accepts ({operand_type})"),
        node_id,
    ));
}

/// The fixed Number -> Boolean -> String coercion order for unary operands,
/// resolved against the type registry by `core_type` tag since only the
/// registry knows which `TypeId` is "the" Number/Boolean/String.
fn coercion_order(ctx: &Ctx<'_>) -> Vec<TypeId> {
    use crate::registry::CoreType;
    let mut order = Vec::new();
    for wanted in [CoreType::Number, CoreType::Boolean, CoreType::String] {
        if let Some(def) = ctx.types.get_all().iter().find(|t| t.core_type == wanted) {
            order.push(def.type_id);
        }
    }
    order
}

/// Validates each filled anonymous/parameter slot of an actuator/sensor
/// call: resolves its expected type (honouring choice groups) and
/// checks/coerces the value's inferred type against it.
fn validate_call_slots(
    tile: crate::ids::TileId,
    anons: &[crate::ast::SlotExpr],
    parameters: &[crate::ast::SlotExpr],
    ctx: &Ctx<'_>,
    env: &mut TypeEnv,
    diags: &mut Vec<TypeInfoDiag>,
) {
    let Some(def) = ctx.tiles.get(tile) else {
        diags.push(TypeInfoDiag::new(
            TypeDiagCode::TileNotFound,
            format!("{tile} is not registered in the catalog"),
            NodeId(0),
        ));
        return;
    };
    let Some(fn_id) = def.kind.function_entry() else {
        return;
    };
    let Some(entry) = ctx.functions.get(fn_id) else {
        return;
    };

    for slot_expr in anons.iter().chain(parameters) {
        let Some(arg_slot) = entry.call_def.slot(slot_expr.slot_id) else {
            continue;
        };
        let value_node = slot_expr.expr.node_id;
        let value_type = env.get(value_node).map_or(TYPE_UNKNOWN, |t| t.inferred);

        if let Some(group) = arg_slot.arg.choice_group {
            let expected_types: Vec<TypeId> = entry
                .call_def
                .arg_slots
                .iter()
                .filter(|s| s.arg.choice_group == Some(group))
                .filter_map(|s| expected_type_for_arg(ctx, &s.arg))
                .collect();
            if expected_types.iter().any(|t| *t == value_type) {
                continue;
            }
            let listing = expected_types
                .iter()
                .map(TypeId::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            diags.push(TypeInfoDiag::new(
                TypeDiagCode::DataTypeMismatch,
                format!("expected one of [{listing}], found {value_type}"),
                value_node,
            ));
            continue;
        }

        let Some(expected) = expected_type_for_arg(ctx, &arg_slot.arg) else {
            continue;
        };
        if expected == value_type {
            continue;
        }
        match ctx.conversions.find_best_path(value_type, expected, Some(1)) {
            Some(path) => {
                if let Some(conv) = path.into_iter().next() {
                    env.entry_mut(value_node).conversion = Some(conv);
                }
                diags.push(TypeInfoDiag::new(
                    TypeDiagCode::DataTypeConverted,
                    format!("converted slot value from {value_type} to {expected}"),
                    value_node,
                ));
            }
            None => {
                diags.push(TypeInfoDiag::new(
                    TypeDiagCode::DataTypeMismatch,
                    format!("expected {expected}, found {value_type}"),
                    value_node,
                ));
            }
        }
    }
}

/// The declared expected type for an `arg` slot. Parameter slots read their
/// tile's `data_type`; anonymous slots read `arg.tile_id`'s declared output
/// type — an anonymous arg's `tile_id` names a type-marker tile (e.g.
/// `AnonNumber`/`AnonString`) rather than an input tile to match against,
/// purely to carry the slot's expected type. Modifier slots have no value
/// to check, so they're not called with this function.
fn expected_type_for_arg(ctx: &Ctx<'_>, arg: &crate::registry::ArgNode) -> Option<TypeId> {
    match &arg.kind {
        crate::registry::ArgKind::Parameter { tile_id } => {
            ctx.tiles.get(*tile_id).and_then(|def| match &def.kind {
                crate::tile::TileKind::Parameter { data_type, .. } => Some(*data_type),
                _ => None,
            })
        }
        crate::registry::ArgKind::Anonymous => ctx.tiles.get(arg.tile_id).and_then(crate::tile::TileDef::output_type),
        crate::registry::ArgKind::Modifier { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::bitset::BitSet;
    use crate::diag::Span;
    use crate::ids::{OpId, TileId, TYPE_VOID};
    use crate::registry::{
        CallDef, CallSpec, FunctionEntry, InMemoryConversionRegistry, InMemoryFunctionRegistry, InMemoryOperatorTable,
        InMemoryTileCatalog, InMemoryTypeRegistry, OpOverload, RegisteredOperator,
    };
    use crate::tile::{TileDef, TileKind, Value};

    const NUMBER: TypeId = TypeId(2);
    const STRING: TypeId = TypeId(3);

    fn build_ctx() -> (InMemoryTileCatalog, InMemoryTypeRegistry, InMemoryOperatorTable, InMemoryConversionRegistry, InMemoryFunctionRegistry) {
        let mut types = InMemoryTypeRegistry::new();
        types.register(crate::registry::TypeDef::primitive(NUMBER, "Number", crate::registry::CoreType::Number));
        types.register(crate::registry::TypeDef::primitive(STRING, "String", crate::registry::CoreType::String));

        let mut conversions = InMemoryConversionRegistry::new();
        conversions.register(NUMBER, STRING, 1);

        let mut tiles = InMemoryTileCatalog::new();
        tiles.register(TileDef::new(
            TileId(1),
            TileKind::Literal {
                value_type: NUMBER,
                value: Value::Number(42.0),
                value_label: "42".into(),
            },
        ));

        let call_def = CallDef::new(CallSpec::Arg(
            crate::registry::ArgNode::new(TileId(1), crate::registry::ArgKind::Anonymous),
        ));
        let mut functions = InMemoryFunctionRegistry::new();
        functions.register(FunctionEntry {
            fn_id: crate::ids::FnId(1),
            call_def,
        });
        tiles.register(
            TileDef::new(
                TileId(2),
                TileKind::Actuator {
                    actuator_id: "switch-page".into(),
                    function_entry: crate::ids::FnId(1),
                },
            )
            .with_placement(BitSet::new(0)),
        );

        (tiles, types, InMemoryOperatorTable::new(), conversions, functions)
    }

    #[test]
    fn anon_arg_matching_its_marker_tile_type_emits_no_diagnostic() {
        let (tiles, types, ops, conversions, functions) = build_ctx();
        let ctx = Ctx::new(&tiles, &types, &ops, &conversions, &functions);

        let literal = Expr {
            node_id: NodeId(0),
            kind: ExprKind::Literal { tile: TileId(1) },
            span: Some(Span::new(1, 2)),
        };
        let actuator = Expr {
            node_id: NodeId(1),
            kind: ExprKind::Actuator {
                tile: TileId(2),
                anons: smallvec::smallvec![crate::ast::SlotExpr {
                    slot_id: 0,
                    expr: Box::new(literal),
                }],
                parameters: smallvec::smallvec![],
                modifiers: smallvec::smallvec![],
            },
            span: Some(Span::new(0, 2)),
        };

        // The anon slot's marker tile (TileId(1)) is itself Number-typed, so
        // its expected type equals the literal's own type exactly — no
        // conversion or mismatch, just a clean direct match. Real widening
        // coverage lives in the end-to-end `switch_page_widens_number_literal_to_string` test,
        // whose slot's marker tile is typed String.
        let mut env = TypeEnv::new();
        let diags = compute_inferred_types(&actuator, &ctx, &mut env);
        assert!(diags.iter().all(|d| d.code != TypeDiagCode::DataTypeMismatch));
        assert!(diags.iter().all(|d| d.code != TypeDiagCode::DataTypeConverted));
        assert_eq!(env.get(NodeId(1)).unwrap().inferred, TYPE_VOID);
    }

    #[test]
    fn binary_op_prefers_exact_overload_over_conversion() {
        let mut ops = InMemoryOperatorTable::new();
        ops.register(RegisteredOperator {
            op_id: OpId(1),
            symbol: "+".into(),
            overloads: vec![OpOverload {
                arg_types: vec![NUMBER, NUMBER],
                result_type: NUMBER,
            }],
        });
        let mut types = InMemoryTypeRegistry::new();
        types.register(crate::registry::TypeDef::primitive(NUMBER, "Number", crate::registry::CoreType::Number));
        let tiles = InMemoryTileCatalog::new();
        let conversions = InMemoryConversionRegistry::new();
        let functions = InMemoryFunctionRegistry::new();
        let ctx = Ctx::new(&tiles, &types, &ops, &conversions, &functions);

        let left = Expr {
            node_id: NodeId(0),
            kind: ExprKind::Empty,
            span: None,
        };
        let right = Expr {
            node_id: NodeId(1),
            kind: ExprKind::Empty,
            span: None,
        };
        let mut env = TypeEnv::new();
        env.entry_mut(NodeId(0)).inferred = NUMBER;
        env.entry_mut(NodeId(1)).inferred = NUMBER;
        let mut diags = Vec::new();
        visit_binary_op(NodeId(2), OpId(1), left.node_id, right.node_id, &ctx, &mut env, &mut diags);
        assert!(diags.is_empty());
        assert!(env.get(left.node_id).unwrap().conversion.is_none());
        assert!(env.get(right.node_id).unwrap().conversion.is_none());
        assert_eq!(env.get(NodeId(2)).unwrap().inferred, NUMBER);
    }
}
