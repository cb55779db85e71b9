//! The Pratt expression layer: NUD table for prefix tokens, an inline LED
//! loop for infix operators and accessors.

use crate::ast::{Expr, ExprKind};
use crate::diag::{ParseDiagCode, Span};
use crate::ids::TileId;
use crate::tile::{ControlFlowId, Fixity, TileKind};

use super::{ExprOpts, ParserState};

impl<'a> ParserState<'a> {
    /// `parse_expression(opts)`: NUD, then a LED loop of accessors/infix
    /// operators until a stop condition fires.
    pub(crate) fn parse_expression(&mut self, opts: ExprOpts) -> Expr {
        let mut left = self.parse_nud(opts);

        loop {
            if self.at_end() {
                break;
            }
            if opts.stop_at_close_paren && self.peek_is_close_paren() {
                break;
            }
            if opts.stop_at_primary && self.peek_is_primary_start() {
                break;
            }
            let Some(tile_id) = self.peek() else { break };
            let Some(def) = self.ctx.tiles.get(tile_id) else { break };

            match def.kind.clone() {
                TileKind::Accessor { .. } => {
                    self.advance();
                    left = self.wrap_field_access(left, tile_id);
                }
                TileKind::Operator {
                    op_id,
                    fixity: Fixity::Infix,
                    precedence,
                    is_assignment,
                } => {
                    if precedence < opts.min_operator_precedence {
                        break;
                    }
                    let op_span_start = self.cursor();
                    self.advance();
                    let next_min = if is_assignment { precedence } else { precedence + 1 };
                    let right = self.parse_expression(opts.with_min_precedence(next_min));

                    left = if is_assignment {
                        self.build_assignment(left, right, tile_id, op_span_start)
                    } else {
                        self.build_binary_op(left, right, tile_id, op_id, op_span_start)
                    };
                }
                _ => break,
            }
        }

        left
    }

    fn parse_nud(&mut self, opts: ExprOpts) -> Expr {
        let Some(tile_id) = self.peek() else {
            let span = Span::point(self.cursor());
            self.emit(ParseDiagCode::ExpectedExpressionFoundEOF, "expected an expression, found end of input", span);
            return self.empty_node();
        };
        let Some(def) = self.ctx.tiles.get(tile_id).cloned() else {
            self.advance();
            let span = Span::point(self.cursor());
            self.emit(
                ParseDiagCode::UnexpectedTokenKindInExpression,
                format!("tile {tile_id} is not registered in the catalog"),
                span,
            );
            return self.error_node("unresolved tile", span, None);
        };

        match def.kind {
            TileKind::Literal { .. } | TileKind::Page { .. } => {
                let span = self.advance_span();
                let node_id = self.alloc_node();
                Expr {
                    node_id,
                    kind: ExprKind::Literal { tile: tile_id },
                    span: Some(span),
                }
            }
            TileKind::Variable { .. } => {
                let span = self.advance_span();
                let node_id = self.alloc_node();
                Expr {
                    node_id,
                    kind: ExprKind::Variable { tile: tile_id },
                    span: Some(span),
                }
            }
            TileKind::Operator {
                op_id,
                fixity: Fixity::Prefix,
                precedence,
                ..
            } => {
                let start = self.cursor();
                self.advance();
                let operand = self.parse_expression(opts.with_min_precedence(precedence));
                self.build_unary_op(operand, tile_id, op_id, start)
            }
            TileKind::Operator {
                fixity: Fixity::Infix,
                ..
            } => {
                let span = self.advance_span();
                self.emit(
                    ParseDiagCode::UnexpectedOperatorInExpression,
                    "an infix operator cannot begin an expression",
                    span,
                );
                self.error_node("infix operator in prefix position", span, None)
            }
            TileKind::ControlFlow {
                cf_id: ControlFlowId::OpenParen,
            } => {
                let start = self.cursor();
                self.advance();
                let inner = self.parse_expression(ExprOpts::paren_body());
                let mut span = inner.span.unwrap_or_else(|| Span::point(start));
                if self.peek_is_close_paren() {
                    let close_span = self.advance_span();
                    span = span.join(close_span);
                } else {
                    let at = Span::point(self.cursor());
                    self.emit(ParseDiagCode::ExpectedClosingParen, "expected a closing paren", at);
                }
                // Parens are neutral: return the same inner node, span widened.
                Expr { span: Some(span), ..inner }
            }
            TileKind::ControlFlow {
                cf_id: ControlFlowId::CloseParen,
            } => {
                let span = self.advance_span();
                let code = if opts.stop_at_close_paren {
                    ParseDiagCode::ExpectedExpressionInSubExpr
                } else {
                    ParseDiagCode::UnexpectedControlFlowInExpression
                };
                self.emit(code, "unexpected closing paren", span);
                self.error_node("unexpected closing paren", span, None)
            }
            TileKind::Sensor { .. } if def.placement.is_some_and(|p| p.contains(crate::bitset::placement::INLINE)) => {
                let span = self.advance_span();
                let node_id = self.alloc_node();
                Expr {
                    node_id,
                    kind: ExprKind::Sensor {
                        tile: tile_id,
                        anons: smallvec::SmallVec::new(),
                        parameters: smallvec::SmallVec::new(),
                        modifiers: smallvec::SmallVec::new(),
                    },
                    span: Some(span),
                }
            }
            TileKind::Sensor { .. } | TileKind::Actuator { .. } => self.parse_action_call(tile_id, &def),
            _ => {
                let span = self.advance_span();
                self.emit(
                    ParseDiagCode::UnexpectedTokenKindInExpression,
                    "this tile kind cannot begin an expression",
                    span,
                );
                self.error_node("unexpected token kind", span, None)
            }
        }
    }

    fn wrap_field_access(&mut self, object: Expr, accessor_tile: TileId) -> Expr {
        let node_id = self.alloc_node();
        let object_span = object.span;
        let accessor_span = Span::point(self.cursor().saturating_sub(1));
        let span = object_span.map(|s| s.join(accessor_span)).or(Some(accessor_span));
        Expr {
            node_id,
            kind: ExprKind::FieldAccess {
                object: Box::new(object),
                accessor: accessor_tile,
            },
            span,
        }
    }

    fn build_unary_op(&mut self, operand: Expr, op_tile: TileId, op_id: crate::ids::OpId, start: usize) -> Expr {
        if self.ctx.ops.get(op_id).is_none() {
            let span = Span::new(start, self.cursor());
            self.emit(ParseDiagCode::UnknownOperator, format!("operator {op_id} is not registered"), span);
            return self.error_node("unknown operator", span, Some(operand));
        }
        let node_id = self.alloc_node();
        let span = Span::new(start, self.cursor()).join(operand.span.unwrap_or_else(|| Span::point(self.cursor())));
        Expr {
            node_id,
            kind: ExprKind::UnaryOp {
                op_tile,
                op_id,
                operand: Box::new(operand),
            },
            span: Some(span),
        }
    }

    fn build_binary_op(
        &mut self,
        left: Expr,
        right: Expr,
        op_tile: TileId,
        op_id: crate::ids::OpId,
        op_start: usize,
    ) -> Expr {
        if self.ctx.ops.get(op_id).is_none() {
            let span = Span::new(op_start, self.cursor());
            self.emit(ParseDiagCode::UnknownOperator, format!("operator {op_id} is not registered"), span);
            return self.error_node("unknown operator", span, Some(left));
        }
        let node_id = self.alloc_node();
        let span = left
            .span
            .unwrap_or_else(|| Span::point(op_start))
            .join(right.span.unwrap_or_else(|| Span::point(self.cursor())));
        Expr {
            node_id,
            kind: ExprKind::BinaryOp {
                op_tile,
                op_id,
                left: Box::new(left),
                right: Box::new(right),
            },
            span: Some(span),
        }
    }

    fn build_assignment(&mut self, left: Expr, right: Expr, op_tile: TileId, op_start: usize) -> Expr {
        let _ = op_tile;
        let span = left
            .span
            .unwrap_or_else(|| Span::point(op_start))
            .join(right.span.unwrap_or_else(|| Span::point(self.cursor())));

        if !is_valid_assignment_target(&left) {
            self.emit(
                ParseDiagCode::InvalidAssignmentTarget,
                "only variables and writable field accesses can be assigned to",
                span,
            );
            return self.error_node("invalid assignment target", span, Some(left));
        }
        if is_read_only_field_access(&left, self.ctx) {
            self.emit(
                ParseDiagCode::ReadOnlyFieldAssignment,
                "this field is read-only and cannot be assigned to",
                span,
            );
            return self.error_node("read-only field assignment", span, Some(left));
        }

        let node_id = self.alloc_node();
        Expr {
            node_id,
            kind: ExprKind::Assignment {
                target: Box::new(left),
                value: Box::new(right),
            },
            span: Some(span),
        }
    }
}

/// An assignment target is valid iff it's a `variable` or a `field_access`.
fn is_valid_assignment_target(expr: &Expr) -> bool {
    matches!(expr.kind, ExprKind::Variable { .. } | ExprKind::FieldAccess { .. })
}

fn is_read_only_field_access(expr: &Expr, ctx: &crate::registry::Ctx<'_>) -> bool {
    match &expr.kind {
        ExprKind::FieldAccess { accessor, .. } => ctx
            .tiles
            .get(*accessor)
            .is_some_and(|def| matches!(&def.kind, TileKind::Accessor { read_only: true, .. })),
        _ => false,
    }
}
