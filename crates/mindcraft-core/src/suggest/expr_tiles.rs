//! Expression-tile suggestion, type compatibility, and infix/accessor
//! filtering.

use crate::ast::Expr;
use crate::ids::TypeId;
use crate::registry::Ctx;
use crate::tile::{Fixity, TileDef, TileKind};

use super::{passes_requirements, Compatibility, InsertionContext, TileSuggestionResult};

/// Every non-hidden tile across the catalog that could legally start (or,
/// in value-only mode, continue) an expression at `ctx.expected_type`.
pub(crate) fn suggest_expression_tiles(
    insertion: &InsertionContext<'_>,
    ctx: &Ctx<'_>,
    value_only: bool,
    allow_non_inline_sensors: bool,
) -> TileSuggestionResult {
    let mut result = TileSuggestionResult::default();
    let inside_parens = insertion.unclosed_paren_depth > 0;

    for def in ctx.tiles.get_all() {
        if def.hidden {
            continue;
        }
        if !can_begin_expression_tile(&def.kind) {
            continue;
        }
        if matches!(&def.kind, TileKind::Operator { fixity: Fixity::Infix, .. }) {
            continue;
        }
        if (value_only && !allow_non_inline_sensors || inside_parens) && is_non_inline_sensor(def) {
            continue;
        }
        if (value_only || inside_parens) && matches!(&def.kind, TileKind::Actuator { .. }) {
            continue;
        }
        if !insertion.rule_side.allows(def.placement) {
            continue;
        }
        if !passes_requirements(def, insertion.available_capabilities) {
            continue;
        }

        if let TileKind::Operator { fixity: Fixity::Prefix, .. } = &def.kind {
            if let Some(expected) = insertion.expected_type {
                let matches_result = def
                    .kind
                    .op_ref(ctx)
                    .is_some_and(|op| op.has_overload_with_result(expected));
                if !matches_result {
                    continue;
                }
            }
            result.push(def.clone(), Compatibility::Unchecked, 0);
            continue;
        }

        classify_and_push(def, insertion.expected_type, ctx, &mut result);
    }

    result
}

fn can_begin_expression_tile(kind: &TileKind) -> bool {
    match kind {
        TileKind::Modifier { .. } | TileKind::Parameter { .. } | TileKind::Accessor { .. } => false,
        TileKind::ControlFlow { cf_id } => *cf_id == crate::tile::ControlFlowId::OpenParen,
        TileKind::Missing => false,
        _ => true,
    }
}

fn is_non_inline_sensor(def: &TileDef) -> bool {
    matches!(&def.kind, TileKind::Sensor { .. })
        && !def.placement.is_some_and(|p| p.contains(crate::bitset::placement::INLINE))
}

/// Type-compatibility classification.
fn classify_type_compatibility(output: Option<TypeId>, expected: Option<TypeId>, ctx: &Ctx<'_>) -> Option<(Compatibility, u32)> {
    let Some(expected) = expected else {
        return Some((Compatibility::Unchecked, 0));
    };
    let Some(output) = output else {
        return Some((Compatibility::Unchecked, 0));
    };
    if output == crate::ids::TYPE_UNKNOWN {
        return Some((Compatibility::Unchecked, 0));
    }
    if output == expected {
        return Some((Compatibility::Exact, 0));
    }
    if let Some(path) = ctx.conversions.find_best_path(output, expected, None) {
        let cost = path.iter().map(|c| c.cost).sum();
        return Some((Compatibility::Conversion, cost));
    }
    // Struct drill-down: any field directly or convertibly reaches the
    // expected type.
    if let Some(type_def) = ctx.types.get(output) {
        let mut best: Option<u32> = None;
        for &(_, field_type) in &type_def.fields {
            if field_type == expected {
                best = Some(best.map_or(1, |b| b.min(1)));
                continue;
            }
            if let Some(path) = ctx.conversions.find_best_path(field_type, expected, None) {
                let cost: u32 = 1 + path.iter().map(|c| c.cost).sum::<u32>();
                best = Some(best.map_or(cost, |b| b.min(cost)));
            }
        }
        if let Some(cost) = best {
            return Some((Compatibility::Conversion, cost));
        }
    }
    None
}

fn classify_and_push(def: &TileDef, expected: Option<TypeId>, ctx: &Ctx<'_>, result: &mut TileSuggestionResult) {
    let output = def.output_type();
    if let Some((compat, cost)) = classify_type_compatibility(output, expected, ctx) {
        result.push(def.clone(), compat, cost);
    }
}

/// Keep an infix operator iff some overload's first arg type equals `L`
/// exactly — no conversion matching. A `None` LHS type keeps every infix
/// operator as `Unchecked`.
pub(crate) fn suggest_infix_operators(left_expr: &Expr, ctx: &Ctx<'_>, result: &mut TileSuggestionResult) {
    let lhs_type = crate::ast::get_expr_output_type(left_expr, &|t| ctx.tiles.get(t).cloned(), None, None);

    for def in ctx.tiles.get_all() {
        if def.hidden {
            continue;
        }
        let TileKind::Operator { op_id, fixity: Fixity::Infix, is_assignment, .. } = &def.kind else {
            continue;
        };
        if *is_assignment && !is_assignable_target(left_expr, ctx) {
            continue;
        }
        match lhs_type {
            None => result.push(def.clone(), Compatibility::Unchecked, 0),
            Some(l) => {
                let keeps = ctx.ops.get(*op_id).is_some_and(|op| op.has_overload_with_first_arg(l));
                if keeps {
                    result.push(def.clone(), Compatibility::Unchecked, 0);
                }
            }
        }
    }
}

fn is_assignable_target(expr: &Expr, ctx: &Ctx<'_>) -> bool {
    use crate::ast::ExprKind;
    match &expr.kind {
        ExprKind::Variable { .. } => true,
        ExprKind::FieldAccess { accessor, .. } => ctx
            .tiles
            .get(*accessor)
            .is_some_and(|def| !matches!(&def.kind, TileKind::Accessor { read_only: true, .. })),
        _ => false,
    }
}

/// Accessor tiles are only offered when the trailing primary of the current
/// expression is struct-typed, further filtered by `accepted_field_types`.
pub(crate) fn suggest_accessors(struct_type_id: TypeId, accepted_field_types: &[TypeId], ctx: &Ctx<'_>, result: &mut TileSuggestionResult) {
    for def in ctx.tiles.get_all() {
        if def.hidden {
            continue;
        }
        let TileKind::Accessor { struct_type_id: accessor_struct, field_type_id, .. } = &def.kind else {
            continue;
        };
        if *accessor_struct != struct_type_id {
            continue;
        }
        if accepted_field_types.is_empty() {
            result.push(def.clone(), Compatibility::Unchecked, 0);
            continue;
        }
        let mut best: Option<(Compatibility, u32)> = None;
        for &accepted in accepted_field_types {
            if let Some(classified) = classify_type_compatibility(Some(*field_type_id), Some(accepted), ctx) {
                best = Some(match best {
                    None => classified,
                    Some(current) => {
                        if rank(classified.0) > rank(current.0) || (classified.0 == current.0 && classified.1 < current.1) {
                            classified
                        } else {
                            current
                        }
                    }
                });
            }
        }
        if let Some((compat, cost)) = best {
            result.push(def.clone(), compat, cost);
        }
    }
}

fn rank(c: Compatibility) -> u8 {
    match c {
        Compatibility::Exact => 2,
        Compatibility::Conversion => 1,
        Compatibility::Unchecked => 0,
    }
}

impl TileKind {
    /// Looks up the `RegisteredOperator` behind an `Operator` tile kind, if
    /// any — used to filter prefix operators by declared result type.
    fn op_ref<'c>(&self, ctx: &'c Ctx<'_>) -> Option<&'c crate::registry::RegisteredOperator> {
        match self {
            TileKind::Operator { op_id, .. } => ctx.ops.get(*op_id),
            _ => None,
        }
    }
}
