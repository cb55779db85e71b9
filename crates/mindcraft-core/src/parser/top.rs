//! `parse_top` and the external parse entry points.

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, ExprKind};
use crate::diag::{CoreError, ParseDiag, ParseDiagCode, Span};
use crate::ids::TileId;
use crate::registry::Ctx;

use super::{ExprOpts, ParserState};

/// The parser's output: one expression per top-level item parsed, plus
/// every diagnostic recorded along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub exprs: Vec<Expr>,
    pub diags: Vec<ParseDiag>,
}

impl<'a> ParserState<'a> {
    /// Greedy loop: the first expression is always accepted;
    /// subsequent ones are recorded as `error { partial = expr }` with a
    /// diagnostic, preserving recovery context. Empty input yields `empty`
    /// plus `ExpectedExpressionFoundEOF`.
    pub(crate) fn parse_top(&mut self) -> Vec<Expr> {
        if self.at_end() {
            let span = Span::point(self.cursor());
            self.emit(
                ParseDiagCode::ExpectedExpressionFoundEOF,
                "expected an expression, found end of input",
                span,
            );
            return vec![self.empty_node()];
        }

        let mut exprs = Vec::new();
        while !self.at_end() {
            let expr = self.parse_expression(ExprOpts::top_level());
            if exprs.is_empty() {
                exprs.push(expr);
                continue;
            }

            let is_action_call = matches!(expr.kind, ExprKind::Actuator { .. } | ExprKind::Sensor { .. });
            let code = if is_action_call {
                ParseDiagCode::UnexpectedActionCallAfterExpression
            } else {
                ParseDiagCode::UnexpectedExpressionAfterExpression
            };
            let span = expr.span.unwrap_or_else(|| Span::point(self.cursor()));
            self.emit(code, "unexpected expression or action after a completed expression", span);
            exprs.push(self.error_node("unexpected expression or action after expression", span, Some(expr)));
        }
        exprs
    }
}

/// `parse_brain_tiles(tiles, from?, to?)`: the single bounded entry point
/// used by tests and the suggestion engine.
///
/// # Errors
/// Returns [`CoreError::InvalidRange`] iff `from > to` or `to > tiles.len()`
/// — a caller bug, not a diagnostic-worthy condition.
pub fn parse_brain_tiles(
    tiles: &[TileId],
    ctx: &Ctx<'_>,
    from: Option<usize>,
    to: Option<usize>,
) -> Result<ParseResult, CoreError> {
    let len = tiles.len();
    let from = from.unwrap_or(0);
    let to = to.unwrap_or(len);
    if from > to || to > len {
        return Err(CoreError::InvalidRange { from, to, len });
    }

    let mut state = ParserState::new(tiles, ctx, from, to);
    let exprs = state.parse_top();
    Ok(ParseResult {
        exprs,
        diags: state.into_diags(),
    })
}

/// `parse_rule(when_tiles, do_tiles, catalogs)`: composes two bounded
/// `parse_brain_tiles` calls, one per rule side, concatenating their
/// expressions and diagnostics.
///
/// Node ids are scoped to each bounded call (the counter is owned
/// exclusively by one parser invocation), so `when` and `do` sides may
/// reuse the same numeric node ids — callers needing rule-wide uniqueness
/// must offset one side themselves.
///
/// # Errors
/// Propagates [`CoreError::InvalidRange`] from either bounded call.
pub fn parse_rule(when_tiles: &[TileId], do_tiles: &[TileId], ctx: &Ctx<'_>) -> Result<ParseResult, CoreError> {
    let when_result = parse_brain_tiles(when_tiles, ctx, None, None)?;
    let do_result = parse_brain_tiles(do_tiles, ctx, None, None)?;

    let mut exprs = when_result.exprs;
    exprs.extend(do_result.exprs);
    let mut diags = when_result.diags;
    diags.extend(do_result.diags);

    Ok(ParseResult { exprs, diags })
}
