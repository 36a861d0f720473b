mod battlefield;
mod terrain;
mod tile;
mod unit;

pub use battlefield::{Battlefield, BattlefieldError};
pub use terrain::{
    MoveCosts, SpriteRef, TerrainFlags, TerrainObject, TerrainObjectId, TerrainTable,
    TERRAIN_ANIMATION_FRAMES,
};
pub use tile::{LayerSlot, Tile, TileFlags, LAYER_COUNT};
pub use unit::{Unit, UnitId, UnitStatus, WALK_HANDOVER_PHASE, WALK_PHASES};

#[cfg(test)]
pub(crate) use battlefield::test_support;
