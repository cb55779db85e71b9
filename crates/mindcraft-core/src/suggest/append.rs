//! Append-mode dispatch on `expr.kind`.

use crate::ast::{is_complete_value_expr, trailing_primary_expr, Expr, ExprKind};
use crate::registry::Ctx;
use crate::tile::TileKind;

use super::{call_spec, expr_tiles, InsertionContext, TileSuggestionResult};

pub(crate) fn suggest_append(expr: &Expr, insertion: &InsertionContext<'_>, ctx: &Ctx<'_>) -> TileSuggestionResult {
    match &expr.kind {
        ExprKind::Empty | ExprKind::Error { .. } => expr_tiles::suggest_expression_tiles(insertion, ctx, false, false),

        ExprKind::Actuator { anons, parameters, modifiers, .. } | ExprKind::Sensor { anons, parameters, modifiers, .. } => {
            suggest_action_call_append(expr, anons, parameters, modifiers, insertion, ctx)
        }

        ExprKind::UnaryOp { operand, .. } => suggest_unary_op_append(operand, insertion, ctx),

        ExprKind::Literal { .. } | ExprKind::Variable { .. } | ExprKind::BinaryOp { .. } | ExprKind::Assignment { .. } | ExprKind::FieldAccess { .. } => {
            suggest_complete_or_value(expr, insertion, ctx)
        }

        ExprKind::Parameter { .. } | ExprKind::Modifier { .. } => TileSuggestionResult::default(),
    }
}

fn suggest_action_call_append(
    action_expr: &Expr,
    anons: &[crate::ast::SlotExpr],
    parameters: &[crate::ast::SlotExpr],
    modifiers: &[crate::ast::SlotExpr],
    insertion: &InsertionContext<'_>,
    ctx: &Ctx<'_>,
) -> TileSuggestionResult {
    let mut result = TileSuggestionResult::default();

    let Some(fn_id) = action_tile(action_expr).and_then(|t| ctx.tiles.get(t)).and_then(|d| d.kind.function_entry()) else {
        return result;
    };
    let Some(entry) = ctx.functions.get(fn_id) else {
        return result;
    };

    let filled: Vec<u32> = anons.iter().chain(parameters).chain(modifiers).map(|s| s.slot_id).collect();
    let mut available = Vec::new();
    call_spec::collect_available_arg_slots(&entry.call_def.call_spec_root, &filled, &mut available, None, &entry.call_def.call_spec_root);

    if call_spec::needs_slots(&available, anons, parameters) {
        // Value-pending suppression is handled inside `suggest_call_spec_tiles`
        // itself (it checks the same pending conditions); reuse it here by
        // picking any still-open slot id, or the id of a still-pending slot
        // if none are open (pure parameter/anon completion case).
        let probe_slot_id = available
            .first()
            .copied()
            .or_else(|| parameters.iter().find(|s| crate::ast::is_parameter_value_missing(&s.expr)).map(|s| s.slot_id))
            .or_else(|| anons.iter().find(|s| !is_complete_value_expr(&s.expr)).map(|s| s.slot_id));
        if let Some(slot_id) = probe_slot_id {
            let partial = call_spec::suggest_call_spec_tiles(action_expr, slot_id, insertion, ctx);
            result.exact.extend(partial.exact);
            result.with_conversion.extend(partial.with_conversion);
        }
    }

    let zero_slot_sensor = matches!(&action_expr.kind, ExprKind::Sensor { .. }) && entry.call_def.arg_slots.is_empty();
    let trailing = trailing_value_expr(anons, parameters, modifiers);
    if trailing.is_some() || zero_slot_sensor {
        offer_infix_close_paren_accessors(action_expr, trailing, insertion, ctx, &mut result);
    }

    result
}

fn action_tile(expr: &Expr) -> Option<crate::ids::TileId> {
    match &expr.kind {
        ExprKind::Actuator { tile, .. } | ExprKind::Sensor { tile, .. } => Some(*tile),
        _ => None,
    }
}

/// The last filled slot-expr's value, if it's a complete value expression —
/// the call's trailing value expression.
fn trailing_value_expr<'e>(
    anons: &'e [crate::ast::SlotExpr],
    parameters: &'e [crate::ast::SlotExpr],
    modifiers: &'e [crate::ast::SlotExpr],
) -> Option<&'e Expr> {
    let mut last: Option<&Expr> = None;
    for slot in anons.iter().chain(parameters).chain(modifiers) {
        if is_complete_value_expr(&slot.expr) {
            last = Some(&slot.expr);
        }
    }
    last
}

fn suggest_unary_op_append(operand: &Expr, insertion: &InsertionContext<'_>, ctx: &Ctx<'_>) -> TileSuggestionResult {
    let is_non_inline_action = matches!(&operand.kind, ExprKind::Actuator { .. })
        || matches!(&operand.kind, ExprKind::Sensor { tile, .. } if !ctx.tiles.get(*tile).is_some_and(is_inline_sensor));

    if is_non_inline_action {
        return suggest_append(operand, insertion, ctx);
    }

    if is_complete_value_expr(operand) {
        suggest_complete_or_value(operand, insertion, ctx)
    } else {
        expr_tiles::suggest_expression_tiles(&super::clone_ctx(insertion), ctx, true, true)
    }
}

fn is_inline_sensor(def: &crate::tile::TileDef) -> bool {
    matches!(&def.kind, TileKind::Sensor { .. }) && def.placement.is_some_and(|p| p.contains(crate::bitset::placement::INLINE))
}

fn suggest_complete_or_value(expr: &Expr, insertion: &InsertionContext<'_>, ctx: &Ctx<'_>) -> TileSuggestionResult {
    let mut result = TileSuggestionResult::default();
    if is_complete_value_expr(expr) {
        offer_infix_close_paren_accessors(expr, Some(expr), insertion, ctx, &mut result);
    } else {
        result = expr_tiles::suggest_expression_tiles(&super::clone_ctx(insertion), ctx, true, false);
    }
    result
}

fn offer_infix_close_paren_accessors(
    root_expr: &Expr,
    trailing: Option<&Expr>,
    insertion: &InsertionContext<'_>,
    ctx: &Ctx<'_>,
    result: &mut TileSuggestionResult,
) {
    let Some(trailing) = trailing else { return };

    expr_tiles::suggest_infix_operators(root_expr, ctx, result);

    if insertion.unclosed_paren_depth > 0 {
        if let Some(def) = ctx
            .tiles
            .get_all()
            .iter()
            .find(|d| matches!(&d.kind, TileKind::ControlFlow { cf_id } if *cf_id == crate::tile::ControlFlowId::CloseParen))
        {
            result.push(def.clone(), super::Compatibility::Unchecked, 0);
        }
    }

    let primary = trailing_primary_expr(trailing);
    if let Some(struct_type_id) = crate::ast::get_expr_output_type(primary, &|t| ctx.tiles.get(t).cloned(), None, None) {
        let accepted: Vec<_> = insertion.expected_type.into_iter().collect();
        expr_tiles::suggest_accessors(struct_type_id, &accepted, ctx, result);
    }
}
