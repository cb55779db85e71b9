//! Mindcraft core: parser, type engine, and tile-suggestion engine for the
//! Mindcraft visual programming language (see `README`/workspace `spec.md`
//! for the language description this crate implements).
//!
//! Split along the same C1..C5 component boundary the design is organized
//! around:
//! - [`registry`] (C1) — read-only-during-parse tile/type/operator/
//!   conversion/function registries, threaded everywhere as [`registry::Ctx`].
//! - [`tile`] (C1) — the atomic input symbol model.
//! - [`ast`] (C3 output / C4 input) — the parsed, type-annotated tree.
//! - [`parser`] (C3) — the recursive-descent + Pratt parser.
//! - [`typeck`] (C4) — post-order type inference over a parsed tree.
//! - [`suggest`] (C5) — the tile suggestion language service.
//! - [`diag`] — the two diagnostic taxonomies plus the one programmer-error
//!   type.
//! - [`ids`] / [`bitset`] — small `Copy` handles and bitmask newtypes used
//!   throughout.

pub mod ast;
pub mod bitset;
pub mod diag;
pub mod ids;
pub mod parser;
pub mod registry;
pub mod suggest;
pub mod tile;
pub mod typeck;

use ids::TileId;
use registry::Ctx;

pub use diag::CoreError;
pub use parser::{parse_brain_tiles, parse_rule as parse_rule_tiles, ParseResult};
pub use tile::get_tile_output_type;
pub use typeck::{compute_inferred_types, TypeEnv, TypeInfo};

/// One [`TypeEnv`] per rule side: node ids are scoped to a single bounded
/// parse, so `when` and `do` node ids may collide — a single merged
/// environment would silently overwrite entries from one side with the
/// other's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnvBundle {
    pub when: TypeEnv,
    pub r#do: TypeEnv,
}

/// The bundled result of [`parse_rule`]: the raw parse plus the type
/// environment and diagnostics computed for every top-level expression on
/// each side.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleParseResult {
    pub parse_result: ParseResult,
    pub type_info: TypeEnvBundle,
    pub type_diags: Vec<diag::TypeInfoDiag>,
}

/// `parse_rule(when_tiles, do_tiles, catalogs)`: parses both rule
/// sides, then runs the type engine over every resulting top-level
/// expression, one side at a time so node ids never cross-contaminate a
/// shared [`TypeEnv`].
///
/// # Errors
/// Propagates [`CoreError::InvalidRange`] from the underlying
/// `parse_brain_tiles` calls.
pub fn parse_rule(when_tiles: &[TileId], do_tiles: &[TileId], ctx: &Ctx<'_>) -> Result<RuleParseResult, CoreError> {
    let when_result = parse_brain_tiles(when_tiles, ctx, None, None)?;
    let do_result = parse_brain_tiles(do_tiles, ctx, None, None)?;

    let mut type_diags = Vec::new();
    let mut when_env = TypeEnv::new();
    for expr in &when_result.exprs {
        type_diags.extend(compute_inferred_types(expr, ctx, &mut when_env));
    }
    let mut do_env = TypeEnv::new();
    for expr in &do_result.exprs {
        type_diags.extend(compute_inferred_types(expr, ctx, &mut do_env));
    }

    let mut exprs = when_result.exprs;
    exprs.extend(do_result.exprs);
    let mut diags = when_result.diags;
    diags.extend(do_result.diags);

    Ok(RuleParseResult {
        parse_result: ParseResult { exprs, diags },
        type_info: TypeEnvBundle { when: when_env, r#do: do_env },
        type_diags,
    })
}

/// `parse_tiles_for_suggestions(tiles)`: parses one unbounded tile
/// run down to the single [`ast::Expr`] the suggestion engine needs as its
/// `InsertionContext::expr`. Multiple top-level items collapse to the
/// first one — suggestions operate on one expression at a time, same as
/// `parse_brain_tiles` itself when called unbounded at the top level.
#[must_use]
pub fn parse_tiles_for_suggestions(tiles: &[TileId], ctx: &Ctx<'_>) -> ast::Expr {
    match parse_brain_tiles(tiles, ctx, None, None) {
        Ok(result) => result
            .exprs
            .into_iter()
            .next()
            .unwrap_or(ast::Expr {
                node_id: ids::NodeId(0),
                kind: ast::ExprKind::Empty,
                span: None,
            }),
        Err(_) => ast::Expr {
            node_id: ids::NodeId(0),
            kind: ast::ExprKind::Empty,
            span: None,
        },
    }
}
