//! Operator table and overload resolution.

use serde::{Deserialize, Serialize};

use crate::ids::{OpId, TypeId};

/// One overload of a registered operator: the argument types it matches
/// and the type it produces. For unary operators, `arg_types` has length 1;
/// for binary operators, length 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpOverload {
    pub arg_types: Vec<TypeId>,
    pub result_type: TypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredOperator {
    pub op_id: OpId,
    pub symbol: String,
    pub overloads: Vec<OpOverload>,
}

impl RegisteredOperator {
    /// Exact-match lookup by argument types, used for direct overload
    /// resolution and suggestion-side LHS filtering (no conversion
    /// matching for operators).
    #[must_use]
    pub fn get(&self, arg_types: &[TypeId]) -> Option<&OpOverload> {
        self.overloads.iter().find(|ov| ov.arg_types == arg_types)
    }

    #[must_use]
    pub fn overloads(&self) -> &[OpOverload] {
        &self.overloads
    }

    /// `true` iff any overload's first argument type equals `lhs` exactly,
    /// used to filter which infix operators a given left-hand type admits.
    #[must_use]
    pub fn has_overload_with_first_arg(&self, lhs: TypeId) -> bool {
        self.overloads.iter().any(|ov| ov.arg_types.first() == Some(&lhs))
    }

    /// `true` iff any overload's result type equals `result` exactly: a
    /// prefix operator is only kept when some overload's result exactly
    /// matches a constrained expected type.
    #[must_use]
    pub fn has_overload_with_result(&self, result: TypeId) -> bool {
        self.overloads.iter().any(|ov| ov.result_type == result)
    }
}

pub trait OperatorTable {
    fn get(&self, op_id: OpId) -> Option<&RegisteredOperator>;
    fn get_all(&self) -> &[RegisteredOperator];
}

#[derive(Debug, Default)]
pub struct InMemoryOperatorTable {
    ops: Vec<RegisteredOperator>,
}

impl InMemoryOperatorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: RegisteredOperator) {
        self.ops.push(op);
    }
}

impl OperatorTable for InMemoryOperatorTable {
    fn get(&self, op_id: OpId) -> Option<&RegisteredOperator> {
        self.ops.iter().find(|o| o.op_id == op_id)
    }

    fn get_all(&self) -> &[RegisteredOperator] {
        &self.ops
    }
}
