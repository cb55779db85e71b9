//! The parser: a recursive-descent core whose expression layer is Pratt
//! (`pratt.rs`), composed with a grammar-combinator interpreter for
//! action-call argument lists (`action_call.rs`), chained by a greedy
//! top-level loop (`top.rs`).
//!
//! Parser state is a struct with `&mut self` methods rather than a parser
//! object with internal mutation hidden behind methods on a class —
//! ownership of the diagnostic accumulator and node counter is exclusive
//! to one [`ParserState`], never shared.

mod action_call;
mod pratt;
mod top;

use crate::ast::Expr;
use crate::diag::{ParseDiag, ParseDiagCode, Span};
use crate::ids::{NodeIdAllocator, TileId};
use crate::registry::Ctx;
use crate::tile::{ControlFlowId, TileKind};

pub use top::{parse_brain_tiles, parse_rule, ParseResult};

/// Options threaded through a single `parse_expression` call.
/// `stop_at_primary` and `stop_at_close_paren` are the two concrete early-
/// stop conditions — every call site in this parser needs exactly one of
/// them (or neither, at the top level).
#[derive(Debug, Clone, Copy)]
pub(crate) struct ExprOpts {
    pub min_operator_precedence: u32,
    pub stop_at_primary: bool,
    pub stop_at_close_paren: bool,
}

impl ExprOpts {
    pub(crate) fn top_level() -> Self {
        Self {
            min_operator_precedence: 0,
            stop_at_primary: false,
            stop_at_close_paren: false,
        }
    }

    pub(crate) fn paren_body() -> Self {
        Self {
            min_operator_precedence: 0,
            stop_at_primary: false,
            stop_at_close_paren: true,
        }
    }

    /// Used for anonymous/parameter slot values inside an action call:
    /// stops as soon as the next primary would begin.
    pub(crate) fn slot_value() -> Self {
        Self {
            min_operator_precedence: 0,
            stop_at_primary: true,
            stop_at_close_paren: false,
        }
    }

    pub(crate) fn with_min_precedence(self, min_operator_precedence: u32) -> Self {
        Self {
            min_operator_precedence,
            ..self
        }
    }
}

/// Owns everything exclusive to one parser invocation: the cursor, its
/// bounds, the node-id counter, and the diagnostic accumulator.
pub(crate) struct ParserState<'a> {
    ctx: &'a Ctx<'a>,
    tiles: &'a [TileId],
    from: usize,
    to: usize,
    i: usize,
    ids: NodeIdAllocator,
    diags: Vec<ParseDiag>,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(tiles: &'a [TileId], ctx: &'a Ctx<'a>, from: usize, to: usize) -> Self {
        Self {
            ctx,
            tiles,
            from,
            to,
            i: from,
            ids: NodeIdAllocator::new(),
            diags: Vec::new(),
        }
    }

    pub(crate) fn into_diags(self) -> Vec<ParseDiag> {
        self.diags
    }

    pub(crate) fn at_end(&self) -> bool {
        self.i >= self.to
    }

    pub(crate) fn peek(&self) -> Option<TileId> {
        if self.i < self.to {
            self.tiles.get(self.i).copied()
        } else {
            None
        }
    }

    /// Consumes the current tile, returning its span. Panics if at end —
    /// every call site checks `peek()` first.
    pub(crate) fn advance_span(&mut self) -> Span {
        debug_assert!(!self.at_end());
        let span = Span::point(self.i);
        self.i += 1;
        Span::new(span.from, self.i)
    }

    pub(crate) fn advance(&mut self) -> Option<TileId> {
        let tile = self.peek()?;
        self.i += 1;
        Some(tile)
    }

    pub(crate) fn alloc_node(&mut self) -> crate::ids::NodeId {
        self.ids.alloc()
    }

    pub(crate) fn emit(&mut self, code: ParseDiagCode, message: impl Into<String>, span: Span) {
        self.diags.push(ParseDiag::new(code, message, span));
    }

    /// `true` iff `tile_id` begins a primary: modifier, parameter,
    /// open-paren, actuator, or a non-inline sensor.
    pub(crate) fn is_primary_start(&self, tile_id: TileId) -> bool {
        let Some(def) = self.ctx.tiles.get(tile_id) else {
            return false;
        };
        match &def.kind {
            TileKind::Modifier { .. } | TileKind::Parameter { .. } => true,
            TileKind::ControlFlow {
                cf_id: ControlFlowId::OpenParen,
            } => true,
            TileKind::Actuator { .. } => true,
            TileKind::Sensor { .. } => !def
                .placement
                .is_some_and(|p| p.contains(crate::bitset::placement::INLINE)),
            _ => false,
        }
    }

    pub(crate) fn peek_is_primary_start(&self) -> bool {
        self.peek().is_some_and(|t| self.is_primary_start(t))
    }

    pub(crate) fn peek_is_close_paren(&self) -> bool {
        self.peek().is_some_and(|t| {
            self.ctx
                .tiles
                .get(t)
                .is_some_and(|def| def.kind.is_control_flow(ControlFlowId::CloseParen))
        })
    }

    /// `true` iff `tile_id` can start a value expression: every NUD-table
    /// row except the accessor/close-paren/modifier/parameter/infix-operator
    /// ones, which never begin an expression.
    pub(crate) fn can_begin_expression(&self, tile_id: TileId) -> bool {
        let Some(def) = self.ctx.tiles.get(tile_id) else {
            return false;
        };
        match &def.kind {
            TileKind::Literal { .. }
            | TileKind::Page { .. }
            | TileKind::Variable { .. }
            | TileKind::Sensor { .. }
            | TileKind::Actuator { .. } => true,
            TileKind::Operator { fixity, .. } => *fixity == crate::tile::Fixity::Prefix,
            TileKind::ControlFlow { cf_id: ControlFlowId::OpenParen } => true,
            _ => false,
        }
    }

    pub(crate) fn peek_can_begin_expression(&self) -> bool {
        self.peek().is_some_and(|t| self.can_begin_expression(t))
    }

    /// Builds a synthetic `error` node without consuming input, for
    /// recovery at a point where no token is available at all.
    pub(crate) fn empty_node(&mut self) -> Expr {
        let node_id = self.alloc_node();
        Expr {
            node_id,
            kind: crate::ast::ExprKind::Empty,
            span: None,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.i
    }

    /// Restores the cursor after a failed backtracking attempt. Never
    /// rewinds past `from`; free to rewind anywhere within `[from, to)`.
    pub(crate) fn rewind_to(&mut self, idx: usize) {
        debug_assert!(idx >= self.from);
        self.i = idx;
    }

    pub(crate) fn error_node(&mut self, message: impl Into<String>, span: Span, partial: Option<Expr>) -> Expr {
        let node_id = self.alloc_node();
        Expr {
            node_id,
            kind: crate::ast::ExprKind::Error {
                message: message.into(),
                partial_expr: partial.map(Box::new),
            },
            span: Some(span),
        }
    }
}
