//! The tile suggestion language service — the hardest subsystem, grounded
//! throughout in the parser's own call-spec walk (`action_call.rs`)
//! and the type engine's slot validation (`typeck.rs`), since both already
//! know how to walk a call spec and classify a value's type against an
//! expected one; this module reuses those shapes rather than reinventing
//! them.

mod append;
mod call_spec;
mod expr_tiles;
mod parens;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, ExprKind};
use crate::bitset::{BitSet, RuleSide};
use crate::registry::Ctx;
use crate::tile::TileDef;

pub(crate) use call_spec::collect_available_arg_slots;
pub use parens::count_unclosed_parens;

/// `InsertionContext`: everything needed to decide what's legal at one
/// cursor position.
pub struct InsertionContext<'a> {
    pub rule_side: RuleSide,
    pub expected_type: Option<crate::ids::TypeId>,
    pub expr: Option<&'a Expr>,
    pub replace_tile_index: Option<usize>,
    pub available_capabilities: Option<BitSet>,
    pub unclosed_paren_depth: u32,
}

/// How well a tile's declared output type matches the constraint in play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compatibility {
    Unchecked,
    Exact,
    Conversion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub tile_def: TileDef,
    pub compatibility: Compatibility,
    pub conversion_cost: u32,
}

/// `TileSuggestionResult`: two ranked lists, exact-type first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileSuggestionResult {
    pub exact: Vec<Suggestion>,
    pub with_conversion: Vec<Suggestion>,
}

impl TileSuggestionResult {
    fn push(&mut self, tile_def: TileDef, compatibility: Compatibility, conversion_cost: u32) {
        let suggestion = Suggestion {
            tile_def,
            compatibility,
            conversion_cost,
        };
        match compatibility {
            Compatibility::Conversion => self.with_conversion.push(suggestion),
            Compatibility::Exact | Compatibility::Unchecked => self.exact.push(suggestion),
        }
    }

    /// Dedup by `tile_id` within each list, keeping first occurrence, then
    /// stable-sort `with_conversion` by ascending cost.
    fn finish(mut self) -> Self {
        dedup_by_tile_id(&mut self.exact);
        dedup_by_tile_id(&mut self.with_conversion);
        self.with_conversion.sort_by_key(|s| s.conversion_cost);
        self
    }
}

/// `true` iff `def.requirements ⊆ available_capabilities`. A `None`
/// capability set is unconstrained; a tile with no declared requirements
/// always passes.
pub(crate) fn passes_requirements(def: &TileDef, available_capabilities: Option<BitSet>) -> bool {
    match (def.requirements, available_capabilities) {
        (Some(req), Some(available)) => req.is_subset_of(available),
        _ => true,
    }
}

fn dedup_by_tile_id(suggestions: &mut Vec<Suggestion>) {
    let mut seen = std::collections::HashSet::new();
    suggestions.retain(|s| seen.insert(s.tile_def.tile_id));
}

/// Where, in replacement mode, the replaced tile sits relative to the
/// parsed expression.
pub(crate) enum ReplacementRole<'e> {
    ExpressionPosition,
    Value {
        expected_type: Option<crate::ids::TypeId>,
    },
    InfixOperator {
        left_expr: &'e Expr,
    },
    PrefixOperator,
    ActionCallArg {
        action_expr: &'e Expr,
        exclude_slot_id: u32,
    },
    AccessorPosition {
        struct_type_id: crate::ids::TypeId,
    },
}

/// `suggest_tiles(context, catalogs)`: pure, never fails. Replacement mode
/// fires iff `replace_tile_index` names a tile inside a non-empty
/// expression's span; otherwise append mode.
#[must_use]
pub fn suggest_tiles(ctx_insertion: &InsertionContext<'_>, ctx: &Ctx<'_>) -> TileSuggestionResult {
    let result = match (ctx_insertion.expr, ctx_insertion.replace_tile_index) {
        (Some(expr), Some(idx)) if !expr.is_empty() && span_contains(expr, idx) => {
            suggest_replacement(expr, idx, ctx_insertion, ctx)
        }
        (Some(expr), _) => append::suggest_append(expr, ctx_insertion, ctx),
        (None, _) => TileSuggestionResult::default(),
    };
    result.finish()
}

fn span_contains(expr: &Expr, idx: usize) -> bool {
    expr.span.is_some_and(|s| span_contains_idx(s, idx))
}

fn span_contains_idx(span: crate::diag::Span, idx: usize) -> bool {
    idx >= span.from && idx < span.to
}

fn suggest_replacement(
    root: &Expr,
    idx: usize,
    insertion: &InsertionContext<'_>,
    ctx: &Ctx<'_>,
) -> TileSuggestionResult {
    match derive_replacement_role(root, idx, ctx) {
        Some(ReplacementRole::ExpressionPosition) => {
            expr_tiles::suggest_expression_tiles(insertion, ctx, false, false)
        }
        Some(ReplacementRole::Value { expected_type }) => {
            let scoped = InsertionContext {
                expected_type,
                ..clone_ctx(insertion)
            };
            expr_tiles::suggest_expression_tiles(&scoped, ctx, true, false)
        }
        Some(ReplacementRole::InfixOperator { left_expr }) => {
            let mut result = TileSuggestionResult::default();
            expr_tiles::suggest_infix_operators(left_expr, ctx, &mut result);
            result
        }
        Some(ReplacementRole::PrefixOperator) => expr_tiles::suggest_expression_tiles(insertion, ctx, true, false),
        Some(ReplacementRole::ActionCallArg {
            action_expr,
            exclude_slot_id,
        }) => call_spec::suggest_call_spec_tiles(action_expr, exclude_slot_id, insertion, ctx),
        Some(ReplacementRole::AccessorPosition { struct_type_id }) => {
            let mut result = TileSuggestionResult::default();
            expr_tiles::suggest_accessors(struct_type_id, &[insertion.expected_type].into_iter().flatten().collect::<Vec<_>>(), ctx, &mut result);
            result
        }
        None => TileSuggestionResult::default(),
    }
}

/// Cheap partial clone — `InsertionContext` borrows `expr`, so a plain
/// struct-update is all that's needed to override one field at a time.
fn clone_ctx<'a>(insertion: &InsertionContext<'a>) -> InsertionContext<'a> {
    InsertionContext {
        rule_side: insertion.rule_side,
        expected_type: insertion.expected_type,
        expr: insertion.expr,
        replace_tile_index: insertion.replace_tile_index,
        available_capabilities: insertion.available_capabilities,
        unclosed_paren_depth: insertion.unclosed_paren_depth,
    }
}

/// Walks the AST looking for the node whose span most tightly contains
/// `idx`, and derives the replacement role from how that node's parent uses
/// it. Each arm mirrors the corresponding append-mode dispatch in
/// `append.rs` but for a tile already present rather than a fresh insertion.
fn derive_replacement_role<'e>(expr: &'e Expr, idx: usize, ctx: &Ctx<'_>) -> Option<ReplacementRole<'e>> {
    match &expr.kind {
        ExprKind::Actuator { anons, parameters, modifiers, .. } | ExprKind::Sensor { anons, parameters, modifiers, .. } => {
            find_action_call_tile_role(expr, anons, parameters, modifiers, idx)
        }
        ExprKind::BinaryOp { left, right, .. } => {
            // The operator tile is exactly one token, sitting right after
            // `left`'s span (the AST carries no per-token index of its own).
            if left.span.is_some_and(|s| s.to == idx) {
                return Some(ReplacementRole::InfixOperator { left_expr: left });
            }
            derive_replacement_role(left, idx, ctx).or_else(|| derive_replacement_role(right, idx, ctx))
        }
        ExprKind::UnaryOp { operand, .. } => {
            if expr.span.is_some_and(|s| s.from == idx) {
                return Some(ReplacementRole::PrefixOperator);
            }
            derive_replacement_role(operand, idx, ctx)
        }
        ExprKind::Assignment { target, value } => {
            derive_replacement_role(target, idx, ctx).or_else(|| {
                let expected = crate::ast::get_expr_output_type(target, &|t| ctx.tiles.get(t).cloned(), None, None);
                if span_contains(value, idx) {
                    derive_replacement_role(value, idx, ctx)
                        .or(Some(ReplacementRole::Value { expected_type: expected }))
                } else {
                    None
                }
            })
        }
        ExprKind::FieldAccess { object, accessor } => {
            let _ = accessor;
            // The accessor is exactly one token, the last one in this
            // node's span (object's span ends right before it).
            if expr.span.is_some_and(|s| s.to == idx + 1) && !object.span.is_some_and(|s| span_contains_idx(s, idx)) {
                let struct_type_id = crate::ast::get_expr_output_type(object, &|t| ctx.tiles.get(t).cloned(), None, None)?;
                return Some(ReplacementRole::AccessorPosition { struct_type_id });
            }
            derive_replacement_role(object, idx, ctx)
        }
        ExprKind::Parameter { value, .. } => derive_replacement_role(value, idx, ctx),
        ExprKind::Error { partial_expr, .. } => partial_expr.as_deref().and_then(|e| derive_replacement_role(e, idx, ctx)),
        _ => Some(ReplacementRole::ExpressionPosition),
    }
}

fn find_action_call_tile_role<'e>(
    action_expr: &'e Expr,
    anons: &'e [crate::ast::SlotExpr],
    parameters: &'e [crate::ast::SlotExpr],
    modifiers: &'e [crate::ast::SlotExpr],
    idx: usize,
) -> Option<ReplacementRole<'e>> {
    if action_expr.span.is_some_and(|s| s.from == idx) {
        return Some(ReplacementRole::ExpressionPosition);
    }
    for slot in modifiers {
        if slot.expr.span.is_some_and(|s| s.from <= idx && idx < s.to) {
            return Some(ReplacementRole::ActionCallArg {
                action_expr,
                exclude_slot_id: slot.slot_id,
            });
        }
    }
    for slot in parameters {
        if slot.expr.span.is_some_and(|s| s.from <= idx && idx < s.to) {
            if let ExprKind::Parameter { value, .. } = &slot.expr.kind {
                if span_contains(value, idx) {
                    return Some(ReplacementRole::Value { expected_type: None });
                }
            }
            return Some(ReplacementRole::ActionCallArg {
                action_expr,
                exclude_slot_id: slot.slot_id,
            });
        }
    }
    for slot in anons {
        if slot.expr.span.is_some_and(|s| s.from <= idx && idx < s.to) {
            return Some(ReplacementRole::Value { expected_type: None });
        }
    }
    None
}
