//! Call-spec grammar walk and value-pending suppression.

use crate::ast::{Expr, ExprKind, SlotExpr};
use crate::registry::{ArgKind, CallSpec, Ctx};

use super::{Compatibility, InsertionContext, TileSuggestionResult};

/// Recursively emits the slot ids that would still accept a fill,
/// honouring choice exclusion, repeat bounds, and conditional branches.
/// `repeat_max = None` at the root means "one fill"; a `repeat` node
/// overrides it for its subtree with its own declared `max`.
pub(crate) fn collect_available_arg_slots(
    spec: &CallSpec,
    filled_slot_ids: &[u32],
    out: &mut Vec<u32>,
    repeat_max: Option<u32>,
    root_spec: &CallSpec,
) {
    match spec {
        CallSpec::Arg(arg) => {
            let max = repeat_max.unwrap_or(1);
            let count = filled_slot_ids.iter().filter(|&&id| id == arg.slot_id).count() as u32;
            if count < max {
                out.push(arg.slot_id);
            }
        }
        CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => {
            for item in items {
                collect_available_arg_slots(item, filled_slot_ids, out, repeat_max, root_spec);
            }
        }
        CallSpec::Choice { options, .. } => {
            if let Some(matched) = options.iter().find(|o| o.has_any_fill(filled_slot_ids)) {
                collect_available_arg_slots(matched, filled_slot_ids, out, repeat_max, root_spec);
            } else {
                for option in options {
                    collect_available_arg_slots(option, filled_slot_ids, out, repeat_max, root_spec);
                }
            }
        }
        CallSpec::Optional { item, .. } => {
            collect_available_arg_slots(item, filled_slot_ids, out, repeat_max, root_spec);
        }
        CallSpec::Repeat { item, max, .. } => {
            collect_available_arg_slots(item, filled_slot_ids, out, *max, root_spec);
        }
        CallSpec::Conditional {
            condition,
            then_branch,
            else_branch,
            ..
        } => {
            let visible = root_spec.find_named(condition).is_some_and(|s| s.has_any_fill(filled_slot_ids));
            if visible {
                collect_available_arg_slots(then_branch, filled_slot_ids, out, repeat_max, root_spec);
            } else if let Some(else_branch) = else_branch {
                collect_available_arg_slots(else_branch, filled_slot_ids, out, repeat_max, root_spec);
            }
        }
    }
}

/// `true` iff the action call needs more slots filled: an available arg
/// slot exists, a placed parameter is missing its value, or a placed
/// anonymous slot holds an incomplete value expression.
pub(crate) fn needs_slots(available: &[u32], anons: &[SlotExpr], parameters: &[SlotExpr]) -> bool {
    !available.is_empty()
        || parameters.iter().any(|s| crate::ast::is_parameter_value_missing(&s.expr))
        || anons.iter().any(|s| !crate::ast::is_complete_value_expr(&s.expr))
}

/// The expected type a pending (incomplete) anon/parameter slot is still
/// waiting on, derived from its arg-slot's declared type.
fn pending_expected_types(
    action_expr: &Expr,
    anons: &[SlotExpr],
    parameters: &[SlotExpr],
    ctx: &Ctx<'_>,
) -> Vec<crate::ids::TypeId> {
    let Some(call_def) = call_def_for(action_expr, ctx) else {
        return Vec::new();
    };
    let mut pending = Vec::new();
    for slot in parameters {
        if crate::ast::is_parameter_value_missing(&slot.expr) {
            if let Some(t) = call_def.slot(slot.slot_id).and_then(|s| expected_type(ctx, &s.arg.kind, s.arg.tile_id)) {
                pending.push(t);
            }
        }
    }
    for slot in anons {
        let complete = crate::ast::is_complete_value_expr(&slot.expr);
        let Some(arg_slot) = call_def.slot(slot.slot_id) else { continue };
        let Some(expected) = expected_type(ctx, &arg_slot.arg.kind, arg_slot.arg.tile_id) else {
            continue;
        };
        if !complete {
            pending.push(expected);
            continue;
        }
        // A complete value whose type doesn't match needs an accessor, not a
        // replacement value — still "pending".
        let value_type = crate::ast::get_expr_output_type(&slot.expr, &|t| ctx.tiles.get(t).cloned(), None, None);
        if value_type.is_some_and(|vt| vt != expected) {
            pending.push(expected);
        }
    }
    pending
}

fn expected_type(ctx: &Ctx<'_>, kind: &ArgKind, tile_id: crate::ids::TileId) -> Option<crate::ids::TypeId> {
    match kind {
        ArgKind::Parameter { tile_id } => ctx.tiles.get(*tile_id).and_then(|def| match &def.kind {
            crate::tile::TileKind::Parameter { data_type, .. } => Some(*data_type),
            _ => None,
        }),
        ArgKind::Anonymous => ctx.tiles.get(tile_id).and_then(crate::tile::TileDef::output_type),
        ArgKind::Modifier { .. } => None,
    }
}

fn call_def_for<'c>(action_expr: &Expr, ctx: &'c Ctx<'_>) -> Option<&'c crate::registry::CallDef> {
    let tile = match &action_expr.kind {
        ExprKind::Actuator { tile, .. } | ExprKind::Sensor { tile, .. } => *tile,
        _ => return None,
    };
    let fn_id = ctx.tiles.get(tile)?.kind.function_entry()?;
    Some(&ctx.functions.get(fn_id)?.call_def)
}

/// Suggests tiles for an action call's still-open slots (the
/// replacement-mode `ActionCallArg` role): either the pending-value tiles
/// (value-pending suppression) or the next modifier/parameter tile for
/// each open slot plus anonymous-slot value tiles.
pub(crate) fn suggest_call_spec_tiles(
    action_expr: &Expr,
    exclude_slot_id: u32,
    insertion: &InsertionContext<'_>,
    ctx: &Ctx<'_>,
) -> TileSuggestionResult {
    let (anons, parameters, modifiers) = match &action_expr.kind {
        ExprKind::Actuator { anons, parameters, modifiers, .. } | ExprKind::Sensor { anons, parameters, modifiers, .. } => {
            (anons, parameters, modifiers)
        }
        _ => return TileSuggestionResult::default(),
    };

    let pending = pending_expected_types(action_expr, anons, parameters, ctx);
    if !pending.is_empty() {
        let mut result = TileSuggestionResult::default();
        for expected in pending {
            let scoped = InsertionContext {
                rule_side: insertion.rule_side,
                expected_type: Some(expected),
                expr: insertion.expr,
                replace_tile_index: insertion.replace_tile_index,
                available_capabilities: insertion.available_capabilities,
                unclosed_paren_depth: insertion.unclosed_paren_depth,
            };
            let partial = super::expr_tiles::suggest_expression_tiles(&scoped, ctx, true, false);
            result.exact.extend(partial.exact);
            result.with_conversion.extend(partial.with_conversion);
        }
        return result;
    }

    // Exclude exactly one instance of `exclude_slot_id` (important for
    // repeated modifiers): the tile being replaced shouldn't count against
    // its own slot's repeat bound while we're deciding what else is legal
    // there.
    let mut filled: Vec<u32> = anons.iter().chain(parameters).chain(modifiers).map(|s| s.slot_id).collect();
    if let Some(pos) = filled.iter().position(|&id| id == exclude_slot_id) {
        filled.remove(pos);
    }

    let mut result = TileSuggestionResult::default();
    let Some(call_def) = call_def_for(action_expr, ctx) else {
        return result;
    };
    let mut available = Vec::new();
    collect_available_arg_slots(&call_def.call_spec_root, &filled, &mut available, None, &call_def.call_spec_root);

    for slot_id in available {
        let Some(arg_slot) = call_def.slot(slot_id) else { continue };
        match &arg_slot.arg.kind {
            ArgKind::Modifier { tile_id } | ArgKind::Parameter { tile_id } => {
                if let Some(def) = ctx.tiles.get(*tile_id) {
                    if !def.hidden
                        && insertion.rule_side.allows(def.placement)
                        && super::passes_requirements(def, insertion.available_capabilities)
                    {
                        result.push(def.clone(), Compatibility::Unchecked, 0);
                    }
                }
            }
            ArgKind::Anonymous => {
                let expected = ctx.tiles.get(arg_slot.arg.tile_id).and_then(crate::tile::TileDef::output_type);
                let scoped = InsertionContext {
                    rule_side: insertion.rule_side,
                    expected_type: expected,
                    expr: insertion.expr,
                    replace_tile_index: insertion.replace_tile_index,
                    available_capabilities: insertion.available_capabilities,
                    unclosed_paren_depth: insertion.unclosed_paren_depth,
                };
                let partial = super::expr_tiles::suggest_expression_tiles(&scoped, ctx, true, false);
                result.exact.extend(partial.exact);
                result.with_conversion.extend(partial.with_conversion);
            }
        }
    }
    result
}
