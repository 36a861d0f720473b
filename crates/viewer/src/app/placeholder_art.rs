use std::collections::HashMap;

use battlescape::app::{
    Sprite, SpriteBank, SpriteBankError, SpriteSheet, BASE_SHEET, CURSOR_SHEET, UNIT_SHEET,
};
use battlescape::map::{Direction, GridPosition};
use battlescape::world::{Battlefield, LayerSlot, TerrainObject, TerrainObjectId};
use tracing::info;

const FRAME_WIDTH: u32 = 32;
const FRAME_HEIGHT: u32 = 40;
/// Row of the ground diamond's centre inside a frame.
const GROUND_CENTRE_Y: i32 = 32;
const WALL_HEIGHT: i32 = 24;
const CURSOR_COLORS: [[u8; 4]; 3] = [
    [250, 220, 60, 255],
    [230, 60, 50, 255],
    [70, 130, 240, 255],
];
const PALETTE: [[u8; 3]; 8] = [
    [92, 130, 64],
    [128, 104, 76],
    [118, 118, 126],
    [150, 88, 64],
    [84, 108, 140],
    [140, 132, 84],
    [96, 140, 128],
    [132, 92, 132],
];
/// Screen-space facing per direction, matching the walk offset tables.
const FACING_X: [i32; 8] = [1, 2, 1, 0, -1, -2, -1, 0];
const FACING_Y: [i32; 8] = [1, 0, -1, -2, -1, 0, 1, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Floor,
    WestWall,
    NorthWall,
    Block,
    Empty,
}

/// Draws flat-shaded stand-in sprites for every sheet the battlefield's
/// terrain refers to, plus cursor and unit sheets. Used when no sprite
/// manifest is installed.
pub(crate) fn placeholder_bank(battlefield: &Battlefield) -> Result<SpriteBank, SpriteBankError> {
    let slots = slot_usage(battlefield);
    let terrain = battlefield.terrain();

    let mut frames_by_sheet: HashMap<String, Vec<Option<Canvas>>> = HashMap::new();
    for object in terrain.objects() {
        let shape = shape_for(object, slots.get(&object.id).copied());
        let frames = frames_by_sheet.entry(object.sprite_sheet.clone()).or_default();
        let animated = object.sprite_frames.iter().any(|idx| *idx != object.sprite_frames[0]);
        for (anim_frame, index) in object.sprite_frames.iter().enumerate() {
            let index = *index as usize;
            if frames.len() <= index {
                frames.resize_with(index + 1, || None);
            }
            let shade = if animated { anim_frame as i32 * 10 } else { 0 };
            frames[index] = Some(paint_terrain(shape, object, shade));
        }
    }

    let mut sheets = HashMap::new();
    for (key, frames) in frames_by_sheet {
        let sprites = frames
            .into_iter()
            .map(|canvas| canvas.unwrap_or_default().into_sprite())
            .collect::<Result<Vec<_>, _>>()?;
        sheets.insert(key, SpriteSheet::new(sprites));
    }
    sheets.insert(
        BASE_SHEET.to_string(),
        SpriteSheet::new(vec![Canvas::default().into_sprite()?]),
    );
    sheets.insert(CURSOR_SHEET.to_string(), SpriteSheet::new(cursor_frames()?));
    sheets.insert(UNIT_SHEET.to_string(), SpriteSheet::new(unit_frames()?));

    let sheet_count = sheets.len();
    let bank = SpriteBank::new(sheets)?;
    info!(sheets = sheet_count, "placeholder_sprites_generated");
    Ok(bank)
}

/// First slot each terrain object is placed in.
fn slot_usage(battlefield: &Battlefield) -> HashMap<TerrainObjectId, LayerSlot> {
    let dims = battlefield.dimensions();
    let mut slots = HashMap::new();
    for z in 0..dims.height {
        for y in 0..dims.length {
            for x in 0..dims.width {
                let Some(tile) = battlefield.tile(GridPosition::new(x, y, z)) else {
                    continue;
                };
                for slot in LayerSlot::ALL {
                    if let Some(id) = tile.layer(slot) {
                        slots.entry(id).or_insert(slot);
                    }
                }
            }
        }
    }
    slots
}

fn shape_for(object: &TerrainObject, slot: Option<LayerSlot>) -> Shape {
    if object.flags.no_floor {
        return Shape::Empty;
    }
    match slot {
        Some(LayerSlot::Floor) => Shape::Floor,
        Some(LayerSlot::WestWall) => Shape::WestWall,
        Some(LayerSlot::NorthWall) => Shape::NorthWall,
        Some(LayerSlot::Object) | None => Shape::Block,
    }
}

fn base_color(name: &str) -> [u8; 3] {
    let hash = name
        .bytes()
        .fold(0u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)));
    PALETTE[hash as usize % PALETTE.len()]
}

fn shaded(rgb: [u8; 3], delta: i32) -> [u8; 4] {
    let channel = |value: u8| (i32::from(value) + delta).clamp(0, 255) as u8;
    [channel(rgb[0]), channel(rgb[1]), channel(rgb[2]), 255]
}

fn paint_terrain(shape: Shape, object: &TerrainObject, shade: i32) -> Canvas {
    let rgb = base_color(&object.name);
    let mut canvas = Canvas::default();
    match shape {
        Shape::Empty => {}
        Shape::Floor => {
            canvas.fill_diamond(GROUND_CENTRE_Y, 16, 8, shaded(rgb, shade));
            canvas.outline_diamond(GROUND_CENTRE_Y, 16, 8, shaded(rgb, shade - 40), |_| true);
        }
        Shape::WestWall => {
            // Upper-left edge of the ground diamond, raised.
            let door_gap = if object.flags.ufo_door { shade / 10 } else { 0 };
            for x in 0..16 {
                if door_gap > 0 && (8 - door_gap..8 + door_gap).contains(&x) {
                    continue;
                }
                let base = GROUND_CENTRE_Y - x / 2;
                canvas.fill_column(x, base - WALL_HEIGHT, base, shaded(rgb, shade - 10));
            }
        }
        Shape::NorthWall => {
            // Upper-right edge of the ground diamond, raised.
            for x in 16..32 {
                let base = GROUND_CENTRE_Y - 8 + (x - 16) / 2;
                canvas.fill_column(x, base - WALL_HEIGHT, base, shaded(rgb, shade + 10));
            }
        }
        Shape::Block => {
            let height = (-object.terrain_level).clamp(6, WALL_HEIGHT);
            let top = GROUND_CENTRE_Y - height;
            for x in 8..24 {
                let side = if x < 16 { -20 } else { 0 };
                canvas.fill_column(x, top, GROUND_CENTRE_Y, shaded(rgb, shade + side));
            }
            canvas.fill_diamond(top, 8, 4, shaded(rgb, shade + 30));
        }
    }
    canvas
}

/// Back frames draw the far half of a diamond outline, front frames the
/// near half, in empty / occupied / below colours.
fn cursor_frames() -> Result<Vec<Sprite>, SpriteBankError> {
    let back = CURSOR_COLORS.iter().map(|color| {
        let mut canvas = Canvas::default();
        canvas.outline_diamond(GROUND_CENTRE_Y, 16, 8, *color, |y| y < GROUND_CENTRE_Y);
        canvas
    });
    let front = CURSOR_COLORS.iter().map(|color| {
        let mut canvas = Canvas::default();
        canvas.outline_diamond(GROUND_CENTRE_Y, 16, 8, *color, |y| y >= GROUND_CENTRE_Y);
        canvas
    });
    back.chain(front).map(Canvas::into_sprite).collect()
}

fn unit_frames() -> Result<Vec<Sprite>, SpriteBankError> {
    Direction::all()
        .map(|direction| {
            let mut canvas = Canvas::default();
            let body = [86, 110, 60, 255];
            let head = [224, 184, 150, 255];
            for x in 12..20 {
                canvas.fill_column(x, 14, 32, body);
            }
            for x in 13..19 {
                canvas.fill_column(x, 7, 13, head);
            }
            let mark_x = 16 + FACING_X[direction.index()] * 3;
            let mark_y = 22 - FACING_Y[direction.index()] * 3;
            for dx in -1..=1 {
                canvas.fill_column(mark_x + dx, mark_y - 1, mark_y + 1, [20, 20, 20, 255]);
            }
            canvas.into_sprite()
        })
        .collect()
}

struct Canvas {
    rgba: Vec<u8>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            rgba: vec![0; (FRAME_WIDTH * FRAME_HEIGHT * 4) as usize],
        }
    }
}

impl Canvas {
    fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= FRAME_WIDTH as i32 || y >= FRAME_HEIGHT as i32 {
            return;
        }
        let offset = (y as usize * FRAME_WIDTH as usize + x as usize) * 4;
        self.rgba[offset..offset + 4].copy_from_slice(&color);
    }

    /// Inclusive vertical run.
    fn fill_column(&mut self, x: i32, top: i32, bottom: i32, color: [u8; 4]) {
        for y in top..=bottom {
            self.put(x, y, color);
        }
    }

    /// Distance of the pixel centre from a diamond centred on column 16,
    /// scaled so the edge is at `2 * half_width`.
    fn diamond_distance(x: i32, y: i32, centre_y: i32, half_width: i32, half_height: i32) -> i32 {
        let dx = (2 * x + 1 - 32).abs();
        let dy = (2 * y + 1 - 2 * centre_y).abs();
        dx + dy * half_width / half_height
    }

    fn fill_diamond(&mut self, centre_y: i32, half_width: i32, half_height: i32, color: [u8; 4]) {
        for y in centre_y - half_height..centre_y + half_height {
            for x in 16 - half_width..16 + half_width {
                if Self::diamond_distance(x, y, centre_y, half_width, half_height) <= 2 * half_width {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn outline_diamond(
        &mut self,
        centre_y: i32,
        half_width: i32,
        half_height: i32,
        color: [u8; 4],
        keep_row: impl Fn(i32) -> bool,
    ) {
        for y in centre_y - half_height..centre_y + half_height {
            if !keep_row(y) {
                continue;
            }
            for x in 16 - half_width..16 + half_width {
                let distance = Self::diamond_distance(x, y, centre_y, half_width, half_height);
                if (2 * half_width - 4..=2 * half_width).contains(&distance) {
                    self.put(x, y, color);
                }
            }
        }
    }

    fn into_sprite(self) -> Result<Sprite, SpriteBankError> {
        Sprite::from_rgba(FRAME_WIDTH, FRAME_HEIGHT, self.rgba)
    }
}
