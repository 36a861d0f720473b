use std::collections::VecDeque;
use std::sync::Arc;

use thiserror::Error;

use crate::map::{Direction, GridPosition, MapDimensions};

use super::terrain::{TerrainObject, TerrainObjectId, TerrainTable};
use super::tile::{LayerSlot, Tile};
use super::unit::{Unit, UnitId, UnitStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattlefieldError {
    #[error("map dimensions must be positive, got {width}x{length}x{height}")]
    InvalidDimensions { width: i32, length: i32, height: i32 },
    #[error("cell ({}, {}, {}) is outside the map", .0.x, .0.y, .0.z)]
    OutOfBounds(GridPosition),
    #[error("terrain object id {0} is not in the terrain table")]
    UnknownTerrainObject(u32),
    #[error("unit {0} does not exist")]
    UnknownUnit(u32),
    #[error("unit {0} is mid-walk and keeps the selection until it stands")]
    SelectionLocked(u32),
}

/// The battle volume: a dense tile grid, the units standing in it and the
/// queued path of the selected unit.
#[derive(Debug, Clone)]
pub struct Battlefield {
    dimensions: MapDimensions,
    terrain: Arc<TerrainTable>,
    tiles: Vec<Tile>,
    units: Vec<Unit>,
    next_unit_id: u32,
    selected_unit: Option<UnitId>,
    path: VecDeque<Direction>,
}

impl Battlefield {
    pub fn new(
        dimensions: MapDimensions,
        terrain: Arc<TerrainTable>,
    ) -> Result<Self, BattlefieldError> {
        if dimensions.width <= 0 || dimensions.length <= 0 || dimensions.height <= 0 {
            return Err(BattlefieldError::InvalidDimensions {
                width: dimensions.width,
                length: dimensions.length,
                height: dimensions.height,
            });
        }
        Ok(Self {
            dimensions,
            terrain,
            tiles: vec![Tile::default(); dimensions.cell_count()],
            units: Vec::new(),
            next_unit_id: 1,
            selected_unit: None,
            path: VecDeque::new(),
        })
    }

    pub fn dimensions(&self) -> MapDimensions {
        self.dimensions
    }

    pub fn terrain(&self) -> &TerrainTable {
        &self.terrain
    }

    fn index_of(&self, pos: GridPosition) -> Option<usize> {
        if !self.dimensions.contains(pos) {
            return None;
        }
        let width = self.dimensions.width as usize;
        let length = self.dimensions.length as usize;
        Some(pos.z as usize * width * length + pos.y as usize * width + pos.x as usize)
    }

    pub fn tile(&self, pos: GridPosition) -> Option<&Tile> {
        self.index_of(pos).and_then(|index| self.tiles.get(index))
    }

    pub fn layer_object(&self, pos: GridPosition, slot: LayerSlot) -> Option<&TerrainObject> {
        let id = self.tile(pos)?.layer(slot)?;
        self.terrain.get(id)
    }

    pub fn set_layer(
        &mut self,
        pos: GridPosition,
        slot: LayerSlot,
        object: Option<TerrainObjectId>,
    ) -> Result<(), BattlefieldError> {
        if let Some(id) = object {
            if self.terrain.get(id).is_none() {
                return Err(BattlefieldError::UnknownTerrainObject(id.0));
            }
        }
        let index = self
            .index_of(pos)
            .ok_or(BattlefieldError::OutOfBounds(pos))?;
        self.tiles[index].set_layer(slot, object, &self.terrain);
        Ok(())
    }

    pub fn set_door_frame(&mut self, pos: GridPosition, frame: u8) -> Result<(), BattlefieldError> {
        let index = self
            .index_of(pos)
            .ok_or(BattlefieldError::OutOfBounds(pos))?;
        self.tiles[index].set_door_frame(frame);
        Ok(())
    }

    /// Height a unit standing on `pos` is lifted by: floor plus object
    /// terrain level. Missing tiles contribute nothing.
    pub fn terrain_level(&self, pos: GridPosition) -> i32 {
        [LayerSlot::Floor, LayerSlot::Object]
            .into_iter()
            .filter_map(|slot| self.layer_object(pos, slot))
            .map(|object| object.terrain_level)
            .sum()
    }

    pub fn spawn_unit(
        &mut self,
        name: impl Into<String>,
        position: GridPosition,
        direction: Direction,
    ) -> Result<UnitId, BattlefieldError> {
        if !self.dimensions.contains(position) {
            return Err(BattlefieldError::OutOfBounds(position));
        }
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        self.units.push(Unit::new(id, name, position, direction));
        Ok(id)
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id() == id)
    }

    /// The occupant drawn in `pos`, if any.
    pub fn select_unit(&self, pos: GridPosition) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.position() == pos)
    }

    pub fn selected_unit_id(&self) -> Option<UnitId> {
        self.selected_unit
    }

    pub fn selected_unit(&self) -> Option<&Unit> {
        self.selected_unit.and_then(|id| self.unit(id))
    }

    /// Walk steps only advance the selected unit, so a walking unit must
    /// finish its step before the selection can move elsewhere.
    pub fn selection_locked(&self) -> bool {
        self.selected_unit()
            .is_some_and(|unit| unit.status() == UnitStatus::Walking)
    }

    pub fn set_selected_unit(&mut self, id: Option<UnitId>) -> Result<(), BattlefieldError> {
        if let Some(id) = id {
            if self.unit(id).is_none() {
                return Err(BattlefieldError::UnknownUnit(id.0));
            }
        }
        if self.selected_unit != id && self.selection_locked() {
            if let Some(current) = self.selected_unit {
                return Err(BattlefieldError::SelectionLocked(current.0));
            }
        }
        if self.selected_unit != id {
            self.path.clear();
        }
        self.selected_unit = id;
        Ok(())
    }

    pub fn queue_path(&mut self, steps: impl IntoIterator<Item = Direction>) {
        self.path.extend(steps);
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
    }

    pub fn pending_path_len(&self) -> usize {
        self.path.len()
    }

    pub fn dequeue_next_direction(&mut self) -> Option<Direction> {
        self.path.pop_front()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn dir(raw: u8) -> Direction {
        Direction::new(raw).expect("direction")
    }

    #[test]
    fn rejects_non_positive_dimensions() {
        let error = Battlefield::new(dims(0, 4, 1), terrain()).expect_err("invalid");
        assert!(matches!(error, BattlefieldError::InvalidDimensions { .. }));
    }

    #[test]
    fn out_of_bounds_tiles_are_absent() {
        let field = floored(4, 3, 2);
        assert!(field.tile(GridPosition::new(3, 2, 1)).is_some());
        assert!(field.tile(GridPosition::new(4, 0, 0)).is_none());
        assert!(field.tile(GridPosition::new(-1, 0, 0)).is_none());
        assert!(field.tile(GridPosition::new(0, 0, 2)).is_none());
    }

    #[test]
    fn set_layer_validates_cell_and_object() {
        let mut field = floored(2, 2, 1);
        let error = field
            .set_layer(GridPosition::new(5, 0, 0), LayerSlot::Floor, None)
            .expect_err("oob");
        assert_eq!(error, BattlefieldError::OutOfBounds(GridPosition::new(5, 0, 0)));
        let error = field
            .set_layer(
                GridPosition::new(0, 0, 0),
                LayerSlot::Floor,
                Some(TerrainObjectId(99)),
            )
            .expect_err("unknown");
        assert_eq!(error, BattlefieldError::UnknownTerrainObject(99));
    }

    #[test]
    fn terrain_level_sums_floor_and_object() {
        let mut field = floored(2, 2, 1);
        let pos = GridPosition::new(1, 1, 0);
        let raised = field.terrain().id_by_name("raised");
        let crate_id = field.terrain().id_by_name("crate");
        let wall = field.terrain().id_by_name("wall");
        field.set_layer(pos, LayerSlot::Floor, raised).expect("floor");
        field.set_layer(pos, LayerSlot::Object, crate_id).expect("object");
        field.set_layer(pos, LayerSlot::WestWall, wall).expect("wall");
        assert_eq!(field.terrain_level(pos), -12);
        assert_eq!(field.terrain_level(GridPosition::new(9, 9, 0)), 0);
    }

    #[test]
    fn select_unit_finds_occupant_by_cell() {
        let mut field = floored(4, 4, 1);
        let id = field
            .spawn_unit("Rookie", GridPosition::new(1, 2, 0), dir(0))
            .expect("spawn");
        assert_eq!(
            field.select_unit(GridPosition::new(1, 2, 0)).map(Unit::id),
            Some(id)
        );
        assert!(field.select_unit(GridPosition::new(2, 2, 0)).is_none());
    }

    #[test]
    fn spawning_outside_the_map_fails() {
        let mut field = floored(4, 4, 1);
        assert!(field
            .spawn_unit("Lost", GridPosition::new(4, 0, 0), dir(0))
            .is_err());
    }

    #[test]
    fn path_queue_is_fifo_and_cleared_on_reselection() {
        let mut field = floored(4, 4, 1);
        let a = field
            .spawn_unit("A", GridPosition::new(0, 0, 0), dir(0))
            .expect("a");
        let b = field
            .spawn_unit("B", GridPosition::new(3, 3, 0), dir(0))
            .expect("b");
        field.set_selected_unit(Some(a)).expect("select");
        field.queue_path([dir(2), dir(1)]);
        assert_eq!(field.pending_path_len(), 2);
        assert_eq!(field.dequeue_next_direction(), Some(dir(2)));

        field.set_selected_unit(Some(b)).expect("select");
        assert_eq!(field.pending_path_len(), 0);
        assert_eq!(field.dequeue_next_direction(), None);
        assert_eq!(
            field.set_selected_unit(Some(UnitId(77))),
            Err(BattlefieldError::UnknownUnit(77))
        );
    }

    #[test]
    fn walking_unit_keeps_the_selection_until_it_stands() {
        let mut field = floored(4, 4, 1);
        let a = field
            .spawn_unit("A", GridPosition::new(0, 0, 0), dir(0))
            .expect("a");
        let b = field
            .spawn_unit("B", GridPosition::new(3, 3, 0), dir(0))
            .expect("b");
        field.set_selected_unit(Some(a)).expect("select");
        field.queue_path([dir(1)]);
        field.unit_mut(a).expect("a").start_walking(dir(2));

        assert!(field.selection_locked());
        assert_eq!(
            field.set_selected_unit(Some(b)),
            Err(BattlefieldError::SelectionLocked(a.0))
        );
        assert_eq!(field.set_selected_unit(None), Err(BattlefieldError::SelectionLocked(a.0)));
        assert_eq!(field.selected_unit_id(), Some(a));
        assert_eq!(field.pending_path_len(), 1);
        field.set_selected_unit(Some(a)).expect("reselecting the walker is a no-op");

        for _ in 0..8 {
            field.unit_mut(a).expect("a").keep_walking();
        }
        assert!(!field.selection_locked());
        field.set_selected_unit(Some(b)).expect("select");
        assert_eq!(field.selected_unit_id(), Some(b));
    }
}
