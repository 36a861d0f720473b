use std::collections::HashSet;

use tracing::warn;

use crate::app::rendering::{CursorFrame, Sprite, SpriteBank, Surface};
use crate::world::{Battlefield, LayerSlot, Tile, Unit};

use super::coords::ScreenPosition;
use super::culler::VisibleCell;
use super::selection::SelectionState;
use super::walk::unit_walk_offset;

/// Read-only inputs of one draw pass. Borrowed for the pass only.
#[derive(Clone, Copy)]
pub struct MapFrame<'a> {
    pub battlefield: &'a Battlefield,
    pub sprites: &'a SpriteBank,
    pub cells: &'a [VisibleCell],
    pub selection: SelectionState,
    pub active_level: i32,
    pub animation_frame: u8,
    pub cursor_hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorPass {
    Back,
    Front,
}

/// Cursor frame for a selected cell at level `z`, or `None` for levels above
/// the active one.
fn cursor_frame(pass: CursorPass, z: i32, active_level: i32, occupied: bool) -> Option<CursorFrame> {
    let frame = if z == active_level {
        match (pass, occupied) {
            (CursorPass::Back, false) => CursorFrame::BackEmpty,
            (CursorPass::Back, true) => CursorFrame::BackOccupied,
            (CursorPass::Front, false) => CursorFrame::FrontEmpty,
            (CursorPass::Front, true) => CursorFrame::FrontOccupied,
        }
    } else if active_level > z {
        match pass {
            CursorPass::Back => CursorFrame::BackBelow,
            CursorPass::Front => CursorFrame::FrontBelow,
        }
    } else {
        return None;
    };
    Some(frame)
}

/// Paints visible cells back to front. Keeps no state between passes apart
/// from which missing sprites were already reported.
#[derive(Debug, Default)]
pub struct Compositor {
    warned_missing: HashSet<String>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: &MapFrame<'_>) {
        surface.clear();
        for cell in frame.cells {
            self.draw_cell(surface, frame, cell);
        }
    }

    fn draw_cell<S: Surface + ?Sized>(&mut self, surface: &mut S, frame: &MapFrame<'_>, cell: &VisibleCell) {
        let battlefield = frame.battlefield;
        let unit = battlefield.select_unit(cell.grid);
        let tile = battlefield.tile(cell.grid);
        let cursor_here = !frame.cursor_hidden && frame.selection.matches(cell.grid);

        if let Some(tile) = tile {
            self.draw_layer(surface, frame, tile, LayerSlot::Floor, cell.screen);
        }

        if cursor_here {
            self.draw_cursor(surface, frame, CursorPass::Back, cell, unit.is_some());
        }

        if let Some(tile) = tile {
            for slot in [LayerSlot::WestWall, LayerSlot::NorthWall, LayerSlot::Object] {
                self.draw_layer(surface, frame, tile, slot, cell.screen);
            }
        }

        if let Some(unit) = unit {
            self.draw_unit(surface, frame, unit, cell);
        }

        if cursor_here {
            self.draw_cursor(surface, frame, CursorPass::Front, cell, unit.is_some());
        }
    }

    fn draw_layer<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &MapFrame<'_>,
        tile: &Tile,
        slot: LayerSlot,
        screen: ScreenPosition,
    ) {
        let Some(object) = tile
            .layer(slot)
            .and_then(|id| frame.battlefield.terrain().get(id))
        else {
            return;
        };
        let sprite_ref = object.sprite_for(frame.animation_frame, tile.door_frame());
        match frame.sprites.terrain(sprite_ref) {
            Some(sprite) => surface.blit(sprite, screen.x, screen.y - object.y_offset),
            None => self.warn_missing(sprite_ref.sheet, sprite_ref.index),
        }
    }

    fn draw_cursor<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &MapFrame<'_>,
        pass: CursorPass,
        cell: &VisibleCell,
        occupied: bool,
    ) {
        let Some(cursor) = cursor_frame(pass, cell.grid.z, frame.active_level, occupied) else {
            return;
        };
        match frame.sprites.cursor(cursor) {
            Some(sprite) => surface.blit(sprite, cell.screen.x, cell.screen.y),
            None => self.warn_missing("cursor", cursor.index()),
        }
    }

    fn draw_unit<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &MapFrame<'_>,
        unit: &Unit,
        cell: &VisibleCell,
    ) {
        let position = cell.screen + unit_walk_offset(frame.battlefield, unit, cell.grid);
        match frame.sprites.unit(unit) {
            Some(sprite) => surface.blit(sprite, position.x, position.y),
            None => self.warn_missing("units", unit.direction().index()),
        }

        let is_selected = frame.battlefield.selected_unit_id() == Some(unit.id());
        if is_selected && !frame.cursor_hidden {
            draw_arrow(surface, frame, frame.sprites.arrow(), position);
        }
    }

    fn warn_missing(&mut self, sheet: &str, index: usize) {
        let key = format!("{sheet}#{index}");
        if self.warned_missing.insert(key) {
            warn!(sheet, index, "map_sprite_missing_skipped");
        }
    }
}

fn draw_arrow<S: Surface + ?Sized>(
    surface: &mut S,
    frame: &MapFrame<'_>,
    arrow: &Sprite,
    unit_position: ScreenPosition,
) {
    let metrics = frame.sprites.metrics();
    let x = unit_position.x + metrics.half_width() - arrow.width() as i32 / 2;
    let y = unit_position.y - arrow.height() as i32 + i32::from(frame.animation_frame);
    surface.blit(arrow, x, y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::sprites::test_support::{
        bank, frame_color, TAG_CURSOR, TAG_TERRAIN, TAG_UNITS, TAG_WALLS,
    };
    use crate::app::rendering::FrameSurface;
    use crate::map::{to_screen, Direction, GridPosition, ViewportCuller, Viewport};
    use crate::world::test_support::floored;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Drawn {
        Clear,
        Terrain(usize, i32, i32),
        Wall(usize, i32, i32),
        Cursor(usize, i32, i32),
        Unit(usize, i32, i32),
        Arrow(i32, i32),
        Other,
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Drawn>,
    }

    impl Surface for RecordingSurface {
        fn clear(&mut self) {
            self.calls.push(Drawn::Clear);
        }

        fn blit(&mut self, sprite: &Sprite, x: i32, y: i32) {
            if sprite.width() == 9 && sprite.height() == 9 {
                self.calls.push(Drawn::Arrow(x, y));
                return;
            }
            let [tag, index, _, _] = sprite.pixel(0, 0).unwrap_or([0; 4]);
            let index = index as usize;
            let drawn = match tag {
                TAG_TERRAIN => Drawn::Terrain(index, x, y),
                TAG_WALLS => Drawn::Wall(index, x, y),
                TAG_CURSOR => Drawn::Cursor(index, x, y),
                TAG_UNITS => Drawn::Unit(index, x, y),
                _ => Drawn::Other,
            };
            self.calls.push(drawn);
        }
    }

    fn dir(raw: u8) -> Direction {
        Direction::new(raw).expect("direction")
    }

    fn cell(grid: GridPosition, offset: ScreenPosition) -> VisibleCell {
        VisibleCell {
            grid,
            screen: to_screen(grid, bank().metrics()) + offset,
        }
    }

    fn frame<'a>(
        battlefield: &'a Battlefield,
        sprites: &'a SpriteBank,
        cells: &'a [VisibleCell],
        active_level: i32,
        animation_frame: u8,
    ) -> MapFrame<'a> {
        MapFrame {
            battlefield,
            sprites,
            cells,
            selection: SelectionState {
                grid_x: 0,
                grid_y: 0,
            },
            active_level,
            animation_frame,
            cursor_hidden: false,
        }
    }

    #[test]
    fn single_cell_layers_follow_the_fixed_order() {
        let mut field = floored(1, 1, 1);
        let pos = GridPosition::new(0, 0, 0);
        let wall = field.terrain().id_by_name("wall");
        let crate_id = field.terrain().id_by_name("crate");
        field.set_layer(pos, LayerSlot::WestWall, wall).expect("wall");
        field.set_layer(pos, LayerSlot::Object, crate_id).expect("crate");
        let id = field.spawn_unit("Rookie", pos, dir(5)).expect("spawn");
        field.set_selected_unit(Some(id)).expect("select");

        let sprites = bank();
        let cells = [cell(pos, ScreenPosition::new(100, 100))];
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &frame(&field, &sprites, &cells, 0, 3));

        // Crate lifts the standing unit by its terrain level (-4).
        assert_eq!(
            surface.calls,
            vec![
                Drawn::Clear,
                Drawn::Terrain(3, 100, 100),
                Drawn::Cursor(1, 100, 100),
                Drawn::Wall(3, 100, 96),
                Drawn::Terrain(3, 100, 100),
                Drawn::Unit(5, 100, 96),
                Drawn::Arrow(100 + 16 - 4, 96 - 9 + 3),
                Drawn::Cursor(4, 100, 100),
            ]
        );
    }

    #[test]
    fn empty_selected_cell_uses_the_empty_cursor_frames() {
        let field = floored(1, 1, 1);
        let sprites = bank();
        let cells = [cell(GridPosition::new(0, 0, 0), ScreenPosition::new(0, 0))];
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &frame(&field, &sprites, &cells, 0, 0));
        assert_eq!(
            surface.calls,
            vec![
                Drawn::Clear,
                Drawn::Terrain(0, 0, 0),
                Drawn::Cursor(0, 0, 0),
                Drawn::Cursor(3, 0, 0),
            ]
        );
    }

    #[test]
    fn levels_below_the_active_one_get_the_below_frames() {
        let field = floored(1, 1, 2);
        let sprites = bank();
        let cells = [
            cell(GridPosition::new(0, 0, 0), ScreenPosition::new(0, 100)),
            cell(GridPosition::new(0, 0, 1), ScreenPosition::new(0, 100)),
        ];
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &frame(&field, &sprites, &cells, 1, 0));
        let cursors: Vec<Drawn> = surface
            .calls
            .iter()
            .copied()
            .filter(|call| matches!(call, Drawn::Cursor(..)))
            .collect();
        assert_eq!(
            cursors,
            vec![
                Drawn::Cursor(2, 0, 100),
                Drawn::Cursor(5, 0, 100),
                Drawn::Cursor(0, 0, 76),
                Drawn::Cursor(3, 0, 76),
            ]
        );
    }

    #[test]
    fn cursor_frame_table() {
        use CursorPass::{Back, Front};
        assert_eq!(cursor_frame(Back, 1, 1, false), Some(CursorFrame::BackEmpty));
        assert_eq!(cursor_frame(Back, 1, 1, true), Some(CursorFrame::BackOccupied));
        assert_eq!(cursor_frame(Back, 0, 1, true), Some(CursorFrame::BackBelow));
        assert_eq!(cursor_frame(Front, 1, 1, false), Some(CursorFrame::FrontEmpty));
        assert_eq!(cursor_frame(Front, 1, 1, true), Some(CursorFrame::FrontOccupied));
        assert_eq!(cursor_frame(Front, 0, 1, false), Some(CursorFrame::FrontBelow));
        assert_eq!(cursor_frame(Front, 2, 1, false), None);
    }

    #[test]
    fn hidden_cursor_skips_cursor_and_arrow() {
        let mut field = floored(1, 1, 1);
        let pos = GridPosition::new(0, 0, 0);
        let id = field.spawn_unit("Rookie", pos, dir(0)).expect("spawn");
        field.set_selected_unit(Some(id)).expect("select");
        let sprites = bank();
        let cells = [cell(pos, ScreenPosition::new(0, 0))];
        let mut map_frame = frame(&field, &sprites, &cells, 0, 0);
        map_frame.cursor_hidden = true;
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &map_frame);
        assert_eq!(
            surface.calls,
            vec![Drawn::Clear, Drawn::Terrain(0, 0, 0), Drawn::Unit(0, 0, 0)]
        );
    }

    #[test]
    fn only_the_selected_unit_gets_an_arrow() {
        let mut field = floored(2, 1, 1);
        let a = field
            .spawn_unit("A", GridPosition::new(0, 0, 0), dir(0))
            .expect("a");
        field
            .spawn_unit("B", GridPosition::new(1, 0, 0), dir(0))
            .expect("b");
        field.set_selected_unit(Some(a)).expect("select");
        let sprites = bank();
        let cells = [
            cell(GridPosition::new(0, 0, 0), ScreenPosition::new(0, 50)),
            cell(GridPosition::new(1, 0, 0), ScreenPosition::new(0, 50)),
        ];
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &frame(&field, &sprites, &cells, 0, 0));
        let arrows = surface
            .calls
            .iter()
            .filter(|call| matches!(call, Drawn::Arrow(..)))
            .count();
        assert_eq!(arrows, 1);
    }

    #[test]
    fn walking_unit_is_drawn_at_its_walk_offset() {
        let mut field = floored(3, 3, 1);
        let pos = GridPosition::new(1, 1, 0);
        let id = field.spawn_unit("Rookie", pos, dir(0)).expect("spawn");
        let unit = field.unit_mut(id).expect("unit");
        unit.start_walking(dir(0));
        unit.keep_walking();
        unit.keep_walking();
        let sprites = bank();
        let cells = [cell(pos, ScreenPosition::new(0, 0))];
        let mut map_frame = frame(&field, &sprites, &cells, 0, 0);
        map_frame.selection = SelectionState {
            grid_x: 2,
            grid_y: 2,
        };
        let mut surface = RecordingSurface::default();
        Compositor::new().draw(&mut surface, &map_frame);
        let screen = to_screen(pos, sprites.metrics());
        assert!(surface
            .calls
            .contains(&Drawn::Unit(0, screen.x + 4, screen.y - 2)));
    }

    fn field_with_extra_object(
        edit: impl FnOnce(&mut Vec<crate::world::TerrainObject>),
    ) -> Battlefield {
        let mut objects = crate::world::test_support::terrain().objects().to_vec();
        edit(&mut objects);
        let terrain = std::sync::Arc::new(crate::world::TerrainTable::from_objects(objects));
        Battlefield::new(crate::world::test_support::dims(1, 1, 1), terrain).expect("field")
    }

    #[test]
    fn doors_draw_the_tile_door_frame() {
        let pos = GridPosition::new(0, 0, 0);
        let mut field = field_with_extra_object(|objects| {
            let mut door = objects[0].clone();
            door.name = "door".to_string();
            door.flags.ufo_door = true;
            objects.push(door);
        });
        let door_id = field.terrain().id_by_name("door");
        field
            .set_layer(pos, LayerSlot::NorthWall, door_id)
            .expect("door");

        let sprites = bank();
        let cells = [cell(pos, ScreenPosition::new(0, 0))];
        let mut surface = RecordingSurface::default();
        let mut map_frame = frame(&field, &sprites, &cells, 0, 6);
        map_frame.cursor_hidden = true;
        Compositor::new().draw(&mut surface, &map_frame);
        assert_eq!(surface.calls, vec![Drawn::Clear, Drawn::Terrain(0, 0, 0)]);

        field.set_door_frame(pos, 2).expect("door frame");
        let mut surface = RecordingSurface::default();
        let mut map_frame = frame(&field, &sprites, &cells, 0, 6);
        map_frame.cursor_hidden = true;
        Compositor::new().draw(&mut surface, &map_frame);
        assert_eq!(surface.calls, vec![Drawn::Clear, Drawn::Terrain(2, 0, 0)]);
    }

    #[test]
    fn missing_sprites_are_skipped_and_reported_once() {
        let pos = GridPosition::new(0, 0, 0);
        let mut field = field_with_extra_object(|objects| {
            objects[0].sprite_sheet = "nowhere".to_string();
        });
        let floor = field.terrain().id_by_name("floor");
        field.set_layer(pos, LayerSlot::Floor, floor).expect("floor");

        let sprites = bank();
        let cells = [cell(pos, ScreenPosition::new(0, 0))];
        let mut compositor = Compositor::new();
        let mut surface = RecordingSurface::default();
        compositor.draw(&mut surface, &frame(&field, &sprites, &cells, 0, 0));
        compositor.draw(&mut surface, &frame(&field, &sprites, &cells, 0, 0));
        assert!(!surface
            .calls
            .iter()
            .any(|call| matches!(call, Drawn::Terrain(..))));
        assert_eq!(compositor.warned_missing.len(), 1);
    }

    #[test]
    fn drawing_twice_produces_identical_pixels() {
        let mut field = floored(6, 6, 2);
        let wall = field.terrain().id_by_name("wall");
        field
            .set_layer(GridPosition::new(2, 3, 0), LayerSlot::NorthWall, wall)
            .expect("wall");
        let id = field
            .spawn_unit("Rookie", GridPosition::new(3, 3, 0), dir(2))
            .expect("spawn");
        field.set_selected_unit(Some(id)).expect("select");
        let sprites = bank();
        let mut culler = ViewportCuller::new();
        let cells = culler
            .cull(
                field.dimensions(),
                1,
                ScreenPosition::new(0, 80),
                Viewport::new(160, 120),
                sprites.metrics(),
            )
            .to_vec();
        let mut map_frame = frame(&field, &sprites, &cells, 1, 5);
        map_frame.selection = SelectionState {
            grid_x: 0,
            grid_y: 5,
        };

        let mut compositor = Compositor::new();
        let mut first = vec![0u8; 160 * 120 * 4];
        let mut second = vec![255u8; 160 * 120 * 4];
        compositor.draw(
            &mut FrameSurface::new(&mut first, 160, 120).expect("surface"),
            &map_frame,
        );
        compositor.draw(
            &mut FrameSurface::new(&mut second, 160, 120).expect("surface"),
            &map_frame,
        );
        assert_eq!(first, second);
        assert!(first.chunks_exact(4).any(|px| px[0] == TAG_UNITS));
        assert!(first
            .chunks_exact(4)
            .any(|px| px == frame_color(TAG_WALLS, 5)));
    }
}
