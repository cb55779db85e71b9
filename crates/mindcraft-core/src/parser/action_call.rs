//! The action-call layer: drives a sensor/actuator's call-spec grammar
//! (`arg`/`seq`/`bag`/`choice`/`optional`/`repeat`/`conditional`).
//!
//! The call-spec tree has no identity of its own, so naming visibility for
//! `conditional` nodes is modeled as a read-only ancestor chain
//! (`NameScope`) built fresh at each recursive descent, rather than
//! mutable bookkeeping written into both a node's own context and its
//! parent's — behaviourally equivalent, simpler to hold in the borrow
//! checker than two live `&mut` paths into the same tree at once.

use indexmap::IndexSet;
use smallvec::SmallVec;

use crate::ast::{Expr, ExprKind, SlotExpr};
use crate::diag::{ParseDiagCode, Span};
use crate::ids::TileId;
use crate::registry::{ArgKind, ArgNode, CallSpec};
use crate::tile::TileDef;

use super::{ExprOpts, ParserState};

#[derive(Debug, Default)]
struct CallCtx {
    anons: SmallVec<[SlotExpr; 4]>,
    parameters: SmallVec<[SlotExpr; 4]>,
    modifiers: SmallVec<[SlotExpr; 4]>,
    matched_names: IndexSet<String>,
}

impl CallCtx {
    fn merge_from(&mut self, other: CallCtx) {
        self.anons.extend(other.anons);
        self.parameters.extend(other.parameters);
        self.modifiers.extend(other.modifiers);
        self.matched_names.extend(other.matched_names);
    }
}

/// Read-only chain of ancestor `matched_names` sets, used to resolve
/// `conditional` conditions against names visible to the enclosing scope
/// without needing simultaneous `&mut` access to every ancestor.
struct NameScope<'s> {
    names: &'s IndexSet<String>,
    parent: Option<&'s NameScope<'s>>,
}

impl<'s> NameScope<'s> {
    fn contains(&self, name: &str) -> bool {
        self.names.contains(name) || self.parent.is_some_and(|p| p.contains(name))
    }
}

impl<'a> ParserState<'a> {
    /// Consumes exactly one sensor/actuator tile, then drives its call
    /// spec.
    pub(crate) fn parse_action_call(&mut self, tile_id: TileId, def: &TileDef) -> Expr {
        let start = self.cursor();
        self.advance();

        let Some(fn_id) = def.kind.function_entry() else {
            let span = Span::new(start, self.cursor());
            self.emit(ParseDiagCode::ExpectedSensorOrActuator, "tile has no call spec", span);
            return self.error_node("tile has no call spec", span, None);
        };
        let Some(entry) = self.ctx.functions.get(fn_id) else {
            let span = Span::new(start, self.cursor());
            self.emit(ParseDiagCode::ActionCallParseFailure, format!("{fn_id} is not registered"), span);
            return self.error_node("unregistered function entry", span, None);
        };

        let mut ctx = CallCtx::default();
        let empty_names = IndexSet::new();
        let root_scope = NameScope {
            names: &empty_names,
            parent: None,
        };
        let ok = self.parse_call_spec(&entry.call_def.call_spec_root, ExprOpts::slot_value(), &mut ctx, &root_scope);

        let span = Span::new(start, self.cursor());
        if !ok {
            self.emit(
                ParseDiagCode::ActionCallParseFailure,
                "required arguments for this action call were not satisfied",
                span,
            );
        }

        let node_id = self.alloc_node();
        let kind = match &def.kind {
            crate::tile::TileKind::Actuator { .. } => ExprKind::Actuator {
                tile: tile_id,
                anons: ctx.anons,
                parameters: ctx.parameters,
                modifiers: ctx.modifiers,
            },
            _ => ExprKind::Sensor {
                tile: tile_id,
                anons: ctx.anons,
                parameters: ctx.parameters,
                modifiers: ctx.modifiers,
            },
        };
        Expr {
            node_id,
            kind,
            span: Some(span),
        }
    }

    fn parse_call_spec(&mut self, spec: &CallSpec, opts: ExprOpts, ctx: &mut CallCtx, scope: &NameScope<'_>) -> bool {
        let ok = match spec {
            CallSpec::Arg(arg) => self.parse_arg(arg, opts, ctx),
            CallSpec::Seq { items, .. } => {
                let mut ok = true;
                for item in items {
                    if !self.parse_call_spec(item, opts, ctx, scope) {
                        ok = false;
                        break;
                    }
                }
                ok
            }
            CallSpec::Bag { items, .. } => self.parse_bag(items, opts, ctx, scope),
            CallSpec::Choice { options, .. } => self.parse_choice(options, opts, ctx, scope),
            CallSpec::Optional { item, .. } => {
                self.try_parse_with_backtrack(item, opts, ctx, scope);
                true
            }
            CallSpec::Repeat { item, min, max, .. } => self.parse_repeat(item, *min, *max, opts, ctx, scope),
            CallSpec::Conditional {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                let visible = ctx.matched_names.contains(condition.as_str()) || scope.contains(condition);
                if visible {
                    self.parse_call_spec(then_branch, opts, ctx, scope)
                } else if let Some(else_branch) = else_branch {
                    self.parse_call_spec(else_branch, opts, ctx, scope)
                } else {
                    true
                }
            }
        };
        if ok {
            if let Some(name) = spec.name() {
                ctx.matched_names.insert(name.to_string());
            }
        }
        ok
    }

    /// Saves the index, parses into a fresh temp context, and only merges
    /// it into `ctx` if the attempt consumed at least one token — a
    /// zero-consume success is treated as failure.
    fn try_parse_with_backtrack(&mut self, spec: &CallSpec, opts: ExprOpts, ctx: &mut CallCtx, scope: &NameScope<'_>) -> bool {
        let saved = self.cursor();
        let mut temp = CallCtx::default();
        let attempt_scope = NameScope {
            names: &ctx.matched_names,
            parent: Some(scope),
        };
        let ok = self.parse_call_spec(spec, opts, &mut temp, &attempt_scope);
        if ok && self.cursor() > saved {
            ctx.merge_from(temp);
            true
        } else {
            self.rewind_to(saved);
            false
        }
    }

    fn parse_arg(&mut self, arg: &ArgNode, opts: ExprOpts, ctx: &mut CallCtx) -> bool {
        match &arg.kind {
            ArgKind::Anonymous => {
                if !self.peek_can_begin_expression() {
                    return !arg.required;
                }
                let expr = self.parse_expression(opts);
                ctx.anons.push(SlotExpr {
                    slot_id: arg.slot_id,
                    expr: Box::new(expr),
                });
                true
            }
            ArgKind::Modifier { tile_id } => {
                if self.peek() != Some(*tile_id) {
                    return !arg.required;
                }
                let span = self.advance_span();
                let node_id = self.alloc_node();
                ctx.modifiers.push(SlotExpr {
                    slot_id: arg.slot_id,
                    expr: Box::new(Expr {
                        node_id,
                        kind: ExprKind::Modifier { tile: *tile_id },
                        span: Some(span),
                    }),
                });
                true
            }
            ArgKind::Parameter { tile_id } => {
                if self.peek() != Some(*tile_id) {
                    return !arg.required;
                }
                let tile_span = self.advance_span();
                let value = self.parse_expression(opts);
                let node_id = self.alloc_node();
                let span = tile_span.join(value.span.unwrap_or(tile_span));
                ctx.parameters.push(SlotExpr {
                    slot_id: arg.slot_id,
                    expr: Box::new(Expr {
                        node_id,
                        kind: ExprKind::Parameter {
                            tile: *tile_id,
                            value: Box::new(value),
                        },
                        span: Some(span),
                    }),
                });
                true
            }
        }
    }

    /// Matches its items in any order; `retriable` items (subtree contains
    /// a `repeat`) may match more than once per pass.
    fn parse_bag(&mut self, items: &[CallSpec], opts: ExprOpts, ctx: &mut CallCtx, scope: &NameScope<'_>) -> bool {
        let retriable: Vec<bool> = items.iter().map(CallSpec::contains_repeat).collect();
        let mut matched = vec![false; items.len()];

        loop {
            let mut progressed = false;
            for (idx, item) in items.iter().enumerate() {
                if matched[idx] && !retriable[idx] {
                    continue;
                }
                if self.try_parse_with_backtrack(item, opts, ctx, scope) {
                    matched[idx] = true;
                    progressed = true;
                    break;
                }
            }
            if !progressed {
                break;
            }
        }

        items
            .iter()
            .enumerate()
            .all(|(idx, item)| matched[idx] || item.is_optional())
    }

    fn parse_choice(&mut self, options: &[CallSpec], opts: ExprOpts, ctx: &mut CallCtx, scope: &NameScope<'_>) -> bool {
        options.iter().any(|opt| self.try_parse_with_backtrack(opt, opts, ctx, scope))
    }

    fn parse_repeat(
        &mut self,
        item: &CallSpec,
        min: u32,
        max: Option<u32>,
        opts: ExprOpts,
        ctx: &mut CallCtx,
        scope: &NameScope<'_>,
    ) -> bool {
        let mut count = 0u32;
        loop {
            if max.is_some_and(|max| count >= max) {
                break;
            }
            if self.try_parse_with_backtrack(item, opts, ctx, scope) {
                count += 1;
            } else {
                break;
            }
        }
        count >= min
    }
}
