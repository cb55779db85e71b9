//! Function-entry (call-spec) registry.
//!
//! A call spec is structural, not identity-bearing: it's a nested tagged
//! enum with an optional `name` on every node, describing an argument
//! grammar before any binding happens.
//!
//! Slot ids are assigned once, depth-first, directly onto each `ArgNode` by
//! [`CallDef::new`] — the parser and the suggestion engine's call-spec walk
//! both read `arg.slot_id` straight off the tree instead of re-deriving
//! position via a parallel counter, so a `repeat`/`bag` item visited more
//! than once always reports the same slot id.

use crate::ids::{FnId, TileId};

/// One leaf position in a call spec's argument grammar, the `arg` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// Matches one anonymous value expression.
    Anonymous,
    /// Matches one named parameter tile (`tile_id`) followed by a value.
    Parameter { tile_id: TileId },
    /// Matches one modifier tile (`tile_id`), no value follows.
    Modifier { tile_id: TileId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgNode {
    /// Assigned depth-first by [`CallDef::new`]; `0` until then.
    pub slot_id: u32,
    pub tile_id: TileId,
    pub kind: ArgKind,
    pub required: bool,
    pub name: Option<String>,
    /// Slots sharing a `choice_group` value satisfy each other for the
    /// "slot choice group" validation rule: at most one per group needs
    /// to be filled.
    pub choice_group: Option<u32>,
}

impl ArgNode {
    #[must_use]
    pub fn new(tile_id: TileId, kind: ArgKind) -> Self {
        Self {
            slot_id: 0,
            tile_id,
            kind,
            required: true,
            name: None,
            choice_group: None,
        }
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn in_choice_group(mut self, group: u32) -> Self {
        self.choice_group = Some(group);
        self
    }
}

/// The call-spec grammar tree: a nested tagged enum with a
/// `name: Option<String>` on every node, used by `conditional` nodes
/// elsewhere in the tree to name what they're conditioning on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSpec {
    Arg(ArgNode),
    Seq {
        name: Option<String>,
        items: Vec<CallSpec>,
    },
    Bag {
        name: Option<String>,
        items: Vec<CallSpec>,
    },
    Choice {
        name: Option<String>,
        options: Vec<CallSpec>,
    },
    Optional {
        name: Option<String>,
        item: Box<CallSpec>,
    },
    Repeat {
        name: Option<String>,
        item: Box<CallSpec>,
        min: u32,
        max: Option<u32>,
    },
    Conditional {
        name: Option<String>,
        condition: String,
        then_branch: Box<CallSpec>,
        else_branch: Option<Box<CallSpec>>,
    },
}

impl CallSpec {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            CallSpec::Arg(arg) => arg.name.as_deref(),
            CallSpec::Seq { name, .. }
            | CallSpec::Bag { name, .. }
            | CallSpec::Choice { name, .. }
            | CallSpec::Optional { name, .. }
            | CallSpec::Repeat { name, .. }
            | CallSpec::Conditional { name, .. } => name.as_deref(),
        }
    }

    /// An item is optional when its type is `optional`, is a `conditional`,
    /// or is an `arg` with `required=false`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        match self {
            CallSpec::Arg(arg) => !arg.required,
            CallSpec::Optional { .. } | CallSpec::Conditional { .. } => true,
            _ => false,
        }
    }

    /// `true` iff this node's subtree contains a `repeat` descendant:
    /// such items may be attempted more than once per bag pass.
    #[must_use]
    pub fn contains_repeat(&self) -> bool {
        match self {
            CallSpec::Repeat { .. } => true,
            CallSpec::Arg(_) => false,
            CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => items.iter().any(CallSpec::contains_repeat),
            CallSpec::Choice { options, .. } => options.iter().any(CallSpec::contains_repeat),
            CallSpec::Optional { item, .. } => item.contains_repeat(),
            CallSpec::Conditional {
                then_branch,
                else_branch,
                ..
            } => then_branch.contains_repeat() || else_branch.as_deref().is_some_and(CallSpec::contains_repeat),
        }
    }

    /// Finds the named sub-spec anywhere in this tree (used for resolving
    /// `conditional` conditions).
    #[must_use]
    pub fn find_named(&self, target: &str) -> Option<&CallSpec> {
        if self.name() == Some(target) {
            return Some(self);
        }
        match self {
            CallSpec::Arg(_) => None,
            CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => {
                items.iter().find_map(|i| i.find_named(target))
            }
            CallSpec::Choice { options, .. } => options.iter().find_map(|o| o.find_named(target)),
            CallSpec::Optional { item, .. } => item.find_named(target),
            CallSpec::Repeat { item, .. } => item.find_named(target),
            CallSpec::Conditional {
                then_branch,
                else_branch,
                ..
            } => then_branch
                .find_named(target)
                .or_else(|| else_branch.as_deref().and_then(|e| e.find_named(target))),
        }
    }

    /// `true` iff this subtree has already matched at least once, i.e. any
    /// of `filled_slot_ids` covers one of its `arg` leaves. Used for
    /// conditional resolution and suggestion-side fill tracking.
    #[must_use]
    pub fn has_any_fill(&self, filled_slot_ids: &[u32]) -> bool {
        match self {
            CallSpec::Arg(arg) => filled_slot_ids.contains(&arg.slot_id),
            CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => {
                items.iter().any(|i| i.has_any_fill(filled_slot_ids))
            }
            CallSpec::Choice { options, .. } => options.iter().any(|o| o.has_any_fill(filled_slot_ids)),
            CallSpec::Optional { item, .. } | CallSpec::Repeat { item, .. } => item.has_any_fill(filled_slot_ids),
            CallSpec::Conditional {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.has_any_fill(filled_slot_ids)
                    || else_branch.as_deref().is_some_and(|e| e.has_any_fill(filled_slot_ids))
            }
        }
    }
}

/// A flattened argument position, read directly off the tree after
/// [`assign_slot_ids`] has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSlot {
    pub slot_id: u32,
    pub arg: ArgNode,
}

/// Assigns sequential slot ids to every `arg` node, depth-first. Idempotent
/// only if called once per tree — call exactly once, from [`CallDef::new`].
pub fn assign_slot_ids(spec: &mut CallSpec) {
    let mut next_id = 0u32;
    assign_into(spec, &mut next_id);
}

fn assign_into(spec: &mut CallSpec, next_id: &mut u32) {
    match spec {
        CallSpec::Arg(arg) => {
            arg.slot_id = *next_id;
            *next_id += 1;
        }
        CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => {
            for item in items {
                assign_into(item, next_id);
            }
        }
        CallSpec::Choice { options, .. } => {
            for option in options {
                assign_into(option, next_id);
            }
        }
        CallSpec::Optional { item, .. } | CallSpec::Repeat { item, .. } => {
            assign_into(item, next_id);
        }
        CallSpec::Conditional {
            then_branch,
            else_branch,
            ..
        } => {
            assign_into(then_branch, next_id);
            if let Some(else_branch) = else_branch {
                assign_into(else_branch, next_id);
            }
        }
    }
}

/// Collects every `arg` node into a flat, slot-id-ordered list. Read-only;
/// assumes `assign_slot_ids` has already run.
#[must_use]
pub fn flatten_arg_slots(spec: &CallSpec) -> Vec<ArgSlot> {
    let mut out = Vec::new();
    collect_into(spec, &mut out);
    out.sort_by_key(|s| s.slot_id);
    out
}

fn collect_into(spec: &CallSpec, out: &mut Vec<ArgSlot>) {
    match spec {
        CallSpec::Arg(arg) => out.push(ArgSlot {
            slot_id: arg.slot_id,
            arg: arg.clone(),
        }),
        CallSpec::Seq { items, .. } | CallSpec::Bag { items, .. } => {
            for item in items {
                collect_into(item, out);
            }
        }
        CallSpec::Choice { options, .. } => {
            for option in options {
                collect_into(option, out);
            }
        }
        CallSpec::Optional { item, .. } | CallSpec::Repeat { item, .. } => {
            collect_into(item, out);
        }
        CallSpec::Conditional {
            then_branch,
            else_branch,
            ..
        } => {
            collect_into(then_branch, out);
            if let Some(else_branch) = else_branch {
                collect_into(else_branch, out);
            }
        }
    }
}

/// The call-spec metadata exposed for one sensor or actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDef {
    pub call_spec_root: CallSpec,
    pub arg_slots: Vec<ArgSlot>,
}

impl CallDef {
    #[must_use]
    pub fn new(mut call_spec_root: CallSpec) -> Self {
        assign_slot_ids(&mut call_spec_root);
        let arg_slots = flatten_arg_slots(&call_spec_root);
        Self {
            call_spec_root,
            arg_slots,
        }
    }

    #[must_use]
    pub fn slot(&self, slot_id: u32) -> Option<&ArgSlot> {
        self.arg_slots.iter().find(|s| s.slot_id == slot_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub fn_id: FnId,
    pub call_def: CallDef,
}

pub trait FunctionRegistry {
    fn get(&self, fn_id: FnId) -> Option<&FunctionEntry>;
}

#[derive(Debug, Default)]
pub struct InMemoryFunctionRegistry {
    entries: std::collections::HashMap<FnId, FunctionEntry>,
}

impl InMemoryFunctionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: FunctionEntry) {
        self.entries.insert(entry.fn_id, entry);
    }
}

impl FunctionRegistry for InMemoryFunctionRegistry {
    fn get(&self, fn_id: FnId) -> Option<&FunctionEntry> {
        self.entries.get(&fn_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_depth_first_in_order() {
        let spec = CallSpec::Bag {
            name: None,
            items: vec![
                CallSpec::Optional {
                    name: None,
                    item: Box::new(CallSpec::Choice {
                        name: None,
                        options: vec![
                            CallSpec::Repeat {
                                name: Some("slowly".into()),
                                item: Box::new(CallSpec::Arg(ArgNode::new(
                                    TileId(1),
                                    ArgKind::Modifier { tile_id: TileId(1) },
                                ))),
                                min: 0,
                                max: Some(3),
                            },
                            CallSpec::Repeat {
                                name: Some("quickly".into()),
                                item: Box::new(CallSpec::Arg(ArgNode::new(
                                    TileId(2),
                                    ArgKind::Modifier { tile_id: TileId(2) },
                                ))),
                                min: 0,
                                max: Some(3),
                            },
                        ],
                    }),
                },
                CallSpec::Optional {
                    name: None,
                    item: Box::new(CallSpec::Arg(
                        ArgNode::new(TileId(3), ArgKind::Parameter { tile_id: TileId(3) })
                            .optional()
                            .named("priority"),
                    )),
                },
            ],
        };
        let call_def = CallDef::new(spec);
        let ids: Vec<u32> = call_def.arg_slots.iter().map(|s| s.slot_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
