//! The two disjoint diagnostic taxonomies: parse-time and type-time.
//!
//! Each is a flat `strum`-derived enum with a stable string form, paired
//! with a small carrier struct that attaches the fixed-format message and a
//! location. Diagnostics never halt either subsystem — they're
//! accumulated, never propagated as `Err`.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Half-open span over *tile indices*, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    #[must_use]
    pub fn new(from: usize, to: usize) -> Self {
        debug_assert!(to >= from);
        Self { from, to }
    }

    #[must_use]
    pub fn point(at: usize) -> Self {
        Self { from: at, to: at }
    }

    #[must_use]
    pub fn join(self, other: Span) -> Span {
        Span {
            from: self.from.min(other.from),
            to: self.to.max(other.to),
        }
    }
}

/// Parse-time diagnostic codes. Each variant is a stable, published error
/// code; do not add, rename, or drop variants without a corresponding
/// change to every host consuming the numeric mapping below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ParseDiagCode {
    UnexpectedTokenAfterExpression,
    ExpectedExpressionFoundEOF,
    UnexpectedActionCallAfterExpression,
    UnexpectedExpressionAfterExpression,
    ExpectedSensorOrActuator,
    ActionCallParseFailure,
    UnexpectedActionCallKind,
    ExpectedExpressionInSubExpr,
    UnexpectedTokenKindInExpression,
    UnexpectedOperatorInExpression,
    ExpectedClosingParen,
    UnexpectedControlFlowInExpression,
    UnknownOperator,
    InvalidAssignmentTarget,
    ReadOnlyFieldAssignment,
}

impl ParseDiagCode {
    /// Stable numeric code. Only `ReadOnlyFieldAssignment` (`1014`) is
    /// a published, externally-pinned value; the rest are a stable but
    /// otherwise arbitrary sequence scoped to this taxonomy.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            ParseDiagCode::UnexpectedTokenAfterExpression => 1001,
            ParseDiagCode::ExpectedExpressionFoundEOF => 1002,
            ParseDiagCode::UnexpectedActionCallAfterExpression => 1003,
            ParseDiagCode::UnexpectedExpressionAfterExpression => 1004,
            ParseDiagCode::ExpectedSensorOrActuator => 1005,
            ParseDiagCode::ActionCallParseFailure => 1006,
            ParseDiagCode::UnexpectedActionCallKind => 1007,
            ParseDiagCode::ExpectedExpressionInSubExpr => 1008,
            ParseDiagCode::UnexpectedTokenKindInExpression => 1009,
            ParseDiagCode::UnexpectedOperatorInExpression => 1010,
            ParseDiagCode::ExpectedClosingParen => 1011,
            ParseDiagCode::UnexpectedControlFlowInExpression => 1012,
            ParseDiagCode::UnknownOperator => 1013,
            ParseDiagCode::InvalidAssignmentTarget => 1015,
            ParseDiagCode::ReadOnlyFieldAssignment => 1014,
        }
    }
}

/// A single parse diagnostic: a code, a human message, and the tile-index
/// span it applies to. `span.from` is always within `[0, tiles.len]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseDiag {
    pub code: ParseDiagCode,
    pub message: String,
    pub span: Span,
}

impl ParseDiag {
    #[must_use]
    pub fn new(code: ParseDiagCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseDiag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} @ {}..{}] {}",
            self.code, self.span.from, self.span.to, self.message
        )
    }
}

/// Type-time diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum TypeDiagCode {
    NoOverloadForBinaryOp,
    NoOverloadForUnaryOp,
    DataTypeMismatch,
    TileTypeMismatch,
    TileNotFound,
    DataTypeConverted,
}

/// A single type diagnostic: a code, a human message, and the `node_id` it
/// applies to (type diagnostics key on nodes, not tile spans).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeInfoDiag {
    pub code: TypeDiagCode,
    pub message: String,
    pub node_id: crate::ids::NodeId,
}

impl TypeInfoDiag {
    #[must_use]
    pub fn new(code: TypeDiagCode, message: impl Into<String>, node_id: crate::ids::NodeId) -> Self {
        Self {
            code,
            message: message.into(),
            node_id,
        }
    }
}

impl fmt::Display for TypeInfoDiag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} @ {}] {}", self.code, self.node_id, self.message)
    }
}

/// Programmer-error type: out-of-range bounds, null/misconfigured
/// registries passed by the caller. This is the one place the core fails
/// fast with an `Err` rather than recording a diagnostic, because it
/// signals a caller bug rather than bad user input.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    InvalidRange { from: usize, to: usize, len: usize },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidRange { from, to, len } => {
                write!(f, "invalid tile range [{from}, {to}) for input of length {len}")
            }
        }
    }
}

impl std::error::Error for CoreError {}
