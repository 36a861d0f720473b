use serde::{Deserialize, Serialize};

use super::terrain::{TerrainObjectId, TerrainTable};

pub const LAYER_COUNT: usize = 4;

/// The four terrain slots of a tile, in draw order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSlot {
    Floor,
    WestWall,
    NorthWall,
    Object,
}

impl LayerSlot {
    pub const ALL: [LayerSlot; LAYER_COUNT] = [
        LayerSlot::Floor,
        LayerSlot::WestWall,
        LayerSlot::NorthWall,
        LayerSlot::Object,
    ];

    pub const fn index(self) -> usize {
        match self {
            LayerSlot::Floor => 0,
            LayerSlot::WestWall => 1,
            LayerSlot::NorthWall => 2,
            LayerSlot::Object => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<LayerSlot> {
        LayerSlot::ALL.get(index).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileFlags {
    pub has_no_floor: bool,
    pub blocks_sight: bool,
    pub blocks_smoke: bool,
}

impl Default for TileFlags {
    fn default() -> Self {
        Self {
            has_no_floor: true,
            blocks_sight: false,
            blocks_smoke: false,
        }
    }
}

/// One grid cell. Layers refer into the shared [`TerrainTable`]; the flags
/// are recomputed whenever a layer changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tile {
    layers: [Option<TerrainObjectId>; LAYER_COUNT],
    flags: TileFlags,
    door_frame: u8,
}

impl Tile {
    pub fn layer(&self, slot: LayerSlot) -> Option<TerrainObjectId> {
        self.layers[slot.index()]
    }

    pub fn layers(&self) -> &[Option<TerrainObjectId>; LAYER_COUNT] {
        &self.layers
    }

    pub fn flags(&self) -> TileFlags {
        self.flags
    }

    pub fn has_no_floor(&self) -> bool {
        self.flags.has_no_floor
    }

    pub fn door_frame(&self) -> u8 {
        self.door_frame
    }

    pub fn set_door_frame(&mut self, frame: u8) {
        self.door_frame = frame;
    }

    pub(crate) fn set_layer(
        &mut self,
        slot: LayerSlot,
        object: Option<TerrainObjectId>,
        terrain: &TerrainTable,
    ) {
        self.layers[slot.index()] = object;
        self.refresh_flags(terrain);
    }

    fn refresh_flags(&mut self, terrain: &TerrainTable) {
        let floor = self.layer(LayerSlot::Floor).and_then(|id| terrain.get(id));
        let mut flags = TileFlags {
            has_no_floor: floor.map_or(true, |object| object.flags.no_floor),
            blocks_sight: false,
            blocks_smoke: false,
        };
        for object in self.layers.iter().flatten().filter_map(|id| terrain.get(*id)) {
            flags.blocks_sight |= object.flags.stop_los;
            flags.blocks_smoke |= object.flags.block_smoke;
        }
        self.flags = flags;
    }
}
