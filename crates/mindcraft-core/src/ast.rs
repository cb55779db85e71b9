//! The parsed, type-annotated tree: produced by the parser, mutated in
//! place by the type engine. One tagged `Expr` enum plus a match-based
//! walker rather than a class hierarchy with virtual dispatch.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ids::{NodeId, OpId, TileId};
use crate::registry::OpOverload;
use crate::registry::conversions::Conversion;
use crate::tile::TileDef;

/// One `{ slot_id, expr }` pair inside an actuator/sensor's `anons`,
/// `parameters`, or `modifiers` lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotExpr {
    pub slot_id: u32,
    pub expr: Box<Expr>,
}

/// The AST node variants. Every variant except `Empty` carries a
/// `node_id` and a half-open tile-index span; both live on the enclosing
/// `ExprNode` wrapper rather than duplicated per-variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Empty,
    Literal {
        tile: TileId,
    },
    Variable {
        tile: TileId,
    },
    FieldAccess {
        object: Box<Expr>,
        accessor: TileId,
    },
    BinaryOp {
        op_tile: TileId,
        op_id: OpId,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op_tile: TileId,
        op_id: OpId,
        operand: Box<Expr>,
    },
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Only valid as a slot-expr inside an action call.
    Parameter {
        tile: TileId,
        value: Box<Expr>,
    },
    /// Only valid as a slot-expr inside an action call.
    Modifier {
        tile: TileId,
    },
    Actuator {
        tile: TileId,
        anons: SmallVec<[SlotExpr; 4]>,
        parameters: SmallVec<[SlotExpr; 4]>,
        modifiers: SmallVec<[SlotExpr; 4]>,
    },
    Sensor {
        tile: TileId,
        anons: SmallVec<[SlotExpr; 4]>,
        parameters: SmallVec<[SlotExpr; 4]>,
        modifiers: SmallVec<[SlotExpr; 4]>,
    },
    Error {
        message: String,
        partial_expr: Option<Box<Expr>>,
    },
}

/// An AST node: a `node_id`, its kind, and (except for `Empty`) its span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub node_id: NodeId,
    pub kind: ExprKind,
    /// `None` only for the synthetic empty node produced for empty input.
    pub span: Option<crate::diag::Span>,
}

impl Expr {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ExprKind::Empty)
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error { .. })
    }

    #[must_use]
    pub fn anons(&self) -> &[SlotExpr] {
        match &self.kind {
            ExprKind::Actuator { anons, .. } | ExprKind::Sensor { anons, .. } => anons,
            _ => &[],
        }
    }

    #[must_use]
    pub fn parameters(&self) -> &[SlotExpr] {
        match &self.kind {
            ExprKind::Actuator { parameters, .. } | ExprKind::Sensor { parameters, .. } => parameters,
            _ => &[],
        }
    }

    #[must_use]
    pub fn modifiers(&self) -> &[SlotExpr] {
        match &self.kind {
            ExprKind::Actuator { modifiers, .. } | ExprKind::Sensor { modifiers, .. } => modifiers,
            _ => &[],
        }
    }

    /// All filled slot ids across anons/parameters/modifiers, for the
    /// suggestion engine's call-spec walk.
    #[must_use]
    pub fn filled_slot_ids(&self) -> Vec<u32> {
        self.anons()
            .iter()
            .chain(self.parameters())
            .chain(self.modifiers())
            .map(|s| s.slot_id)
            .collect()
    }
}

/// A generic visitor over `Expr` variants, returning `T`. The explicit
/// trait form of the "match-based walker" design note — implement this
/// when the walk needs per-kind state beyond what a bare `match` carries
/// conveniently (the type engine does; simple predicates below use a bare
/// `match` instead).
pub trait Visitor<T> {
    fn visit_empty(&mut self, expr: &Expr) -> T;
    fn visit_literal(&mut self, expr: &Expr, tile: TileId) -> T;
    fn visit_variable(&mut self, expr: &Expr, tile: TileId) -> T;
    fn visit_field_access(&mut self, expr: &Expr, object: &Expr, accessor: TileId) -> T;
    fn visit_binary_op(&mut self, expr: &Expr, op_tile: TileId, op_id: OpId, left: &Expr, right: &Expr) -> T;
    fn visit_unary_op(&mut self, expr: &Expr, op_tile: TileId, op_id: OpId, operand: &Expr) -> T;
    fn visit_assignment(&mut self, expr: &Expr, target: &Expr, value: &Expr) -> T;
    fn visit_parameter(&mut self, expr: &Expr, tile: TileId, value: &Expr) -> T;
    fn visit_modifier(&mut self, expr: &Expr, tile: TileId) -> T;
    fn visit_actuator(&mut self, expr: &Expr, tile: TileId, anons: &[SlotExpr], parameters: &[SlotExpr], modifiers: &[SlotExpr]) -> T;
    fn visit_sensor(&mut self, expr: &Expr, tile: TileId, anons: &[SlotExpr], parameters: &[SlotExpr], modifiers: &[SlotExpr]) -> T;
    fn visit_error(&mut self, expr: &Expr, message: &str, partial_expr: Option<&Expr>) -> T;

    fn visit(&mut self, expr: &Expr) -> T {
        match &expr.kind {
            ExprKind::Empty => self.visit_empty(expr),
            ExprKind::Literal { tile } => self.visit_literal(expr, *tile),
            ExprKind::Variable { tile } => self.visit_variable(expr, *tile),
            ExprKind::FieldAccess { object, accessor } => self.visit_field_access(expr, object, *accessor),
            ExprKind::BinaryOp {
                op_tile,
                op_id,
                left,
                right,
            } => self.visit_binary_op(expr, *op_tile, *op_id, left, right),
            ExprKind::UnaryOp { op_tile, op_id, operand } => self.visit_unary_op(expr, *op_tile, *op_id, operand),
            ExprKind::Assignment { target, value } => self.visit_assignment(expr, target, value),
            ExprKind::Parameter { tile, value } => self.visit_parameter(expr, *tile, value),
            ExprKind::Modifier { tile } => self.visit_modifier(expr, *tile),
            ExprKind::Actuator {
                tile,
                anons,
                parameters,
                modifiers,
            } => self.visit_actuator(expr, *tile, anons, parameters, modifiers),
            ExprKind::Sensor {
                tile,
                anons,
                parameters,
                modifiers,
            } => self.visit_sensor(expr, *tile, anons, parameters, modifiers),
            ExprKind::Error { message, partial_expr } => {
                self.visit_error(expr, message, partial_expr.as_deref())
            }
        }
    }
}

/// `true` iff `e` is a syntactically complete value expression (not
/// `empty`, not an `error` with no usable partial, not a bare modifier or
/// parameter tile in value position).
#[must_use]
pub fn is_complete_value_expr(e: &Expr) -> bool {
    match &e.kind {
        ExprKind::Empty => false,
        ExprKind::Error { partial_expr, .. } => partial_expr.as_deref().is_some_and(is_complete_value_expr),
        ExprKind::Modifier { .. } | ExprKind::Parameter { .. } => false,
        _ => true,
    }
}

/// `true` iff `e` is a `parameter` slot-expr whose value is missing/empty.
#[must_use]
pub fn is_parameter_value_missing(e: &Expr) -> bool {
    matches!(&e.kind, ExprKind::Parameter { value, .. } if value.is_empty())
}

/// The rightmost leaf reached by following right/operand/value edges —
/// the expression's "trailing primary". Used for accessor-tile type keying
/// because accessors bind tighter than any operator.
#[must_use]
pub fn trailing_primary_expr(e: &Expr) -> &Expr {
    match &e.kind {
        ExprKind::BinaryOp { right, .. } => trailing_primary_expr(right),
        ExprKind::UnaryOp { operand, .. } => trailing_primary_expr(operand),
        ExprKind::Assignment { value, .. } => trailing_primary_expr(value),
        ExprKind::Parameter { value, .. } => trailing_primary_expr(value),
        _ => e,
    }
}

/// Pure (no mutation) best-effort output type for an expression, usable
/// before or independent of a full `TypeEnv` pass. Falls back through
/// overload/conversion tables when given, else inspects tile output types
/// directly; returns `None` when nothing can be determined.
#[must_use]
pub fn get_expr_output_type(
    e: &Expr,
    tile_of: &dyn Fn(TileId) -> Option<TileDef>,
    overload_of: Option<&dyn Fn(&Expr) -> Option<OpOverload>>,
    conversion_of: Option<&dyn Fn(&Expr) -> Option<Conversion>>,
) -> Option<crate::ids::TypeId> {
    let base = match &e.kind {
        ExprKind::Empty | ExprKind::Error { .. } => None,
        ExprKind::Literal { tile } | ExprKind::Variable { tile } => tile_of(*tile).and_then(|t| t.output_type()),
        ExprKind::FieldAccess { accessor, .. } => tile_of(*accessor).and_then(|t| t.output_type()),
        ExprKind::BinaryOp { .. } | ExprKind::UnaryOp { .. } => {
            overload_of.and_then(|f| f(e)).map(|ov| ov.result_type)
        }
        ExprKind::Assignment { value, .. } => {
            return get_expr_output_type(value, tile_of, overload_of, conversion_of);
        }
        ExprKind::Parameter { value, .. } => {
            return get_expr_output_type(value, tile_of, overload_of, conversion_of);
        }
        ExprKind::Modifier { .. } => Some(crate::ids::TYPE_VOID),
        ExprKind::Actuator { .. } => Some(crate::ids::TYPE_VOID),
        ExprKind::Sensor { tile, .. } => tile_of(*tile).and_then(|t| t.output_type()),
    };
    if let Some(conv) = conversion_of.and_then(|f| f(e)) {
        return Some(conv.to);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Span;

    fn leaf(kind: ExprKind, id: u32) -> Expr {
        Expr {
            node_id: NodeId(id),
            kind,
            span: Some(Span::new(0, 1)),
        }
    }

    #[test]
    fn trailing_primary_follows_right_edges() {
        let a = leaf(ExprKind::Literal { tile: TileId(1) }, 0);
        let b = leaf(ExprKind::Literal { tile: TileId(2) }, 1);
        let bin = leaf(
            ExprKind::BinaryOp {
                op_tile: TileId(3),
                op_id: OpId(0),
                left: Box::new(a),
                right: Box::new(b.clone()),
            },
            2,
        );
        assert_eq!(trailing_primary_expr(&bin), &b);
    }

    #[test]
    fn complete_value_expr_excludes_modifiers_and_bare_parameters() {
        let modifier = leaf(ExprKind::Modifier { tile: TileId(1) }, 0);
        assert!(!is_complete_value_expr(&modifier));
        let lit = leaf(ExprKind::Literal { tile: TileId(1) }, 1);
        assert!(is_complete_value_expr(&lit));
    }
}
