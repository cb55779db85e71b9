//! Unclosed-paren depth tracking: a linear stack count over
//! `OpenParen`/`CloseParen` control-flow tiles, clamped at zero.

use crate::ids::TileId;
use crate::registry::Ctx;
use crate::tile::{ControlFlowId, TileKind};

/// Scans `tiles` left to right, incrementing on `OpenParen` and
/// decrementing (never below zero) on `CloseParen`. `exclude_index` skips
/// one tile position entirely — used when re-deriving the depth around the
/// tile currently being replaced.
#[must_use]
pub fn count_unclosed_parens(tiles: &[TileId], ctx: &Ctx<'_>, exclude_index: Option<usize>) -> u32 {
    let mut depth: i64 = 0;
    for (idx, &tile_id) in tiles.iter().enumerate() {
        if exclude_index == Some(idx) {
            continue;
        }
        let Some(def) = ctx.tiles.get(tile_id) else {
            continue;
        };
        match &def.kind {
            TileKind::ControlFlow { cf_id: ControlFlowId::OpenParen } => depth += 1,
            TileKind::ControlFlow { cf_id: ControlFlowId::CloseParen } => depth = (depth - 1).max(0),
            _ => {}
        }
    }
    depth.max(0) as u32
}
