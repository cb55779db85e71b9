//! Tile catalog: the read-only store of tile definitions.

use indexmap::IndexMap;

use crate::ids::TileId;
use crate::tile::TileDef;

pub trait TileCatalog {
    fn get(&self, tile_id: TileId) -> Option<&TileDef>;
    fn get_all(&self) -> &[TileDef];
}

#[derive(Debug, Default)]
pub struct InMemoryTileCatalog {
    by_id: IndexMap<TileId, usize>,
    all: Vec<TileDef>,
}

impl InMemoryTileCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: TileDef) {
        let idx = self.all.len();
        self.by_id.insert(def.tile_id, idx);
        self.all.push(def);
    }
}

impl TileCatalog for InMemoryTileCatalog {
    fn get(&self, tile_id: TileId) -> Option<&TileDef> {
        self.by_id.get(&tile_id).map(|&idx| &self.all[idx])
    }

    fn get_all(&self) -> &[TileDef] {
        &self.all
    }
}
