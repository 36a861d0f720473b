mod renderer;
pub(crate) mod sprites;
mod surface;

pub use renderer::Renderer;
pub use sprites::{
    selection_arrow, CursorFrame, Sprite, SpriteBank, SpriteBankError, SpriteSheet, BASE_SHEET,
    CURSOR_SHEET, SPRITE_MANIFEST_FILE, UNIT_SHEET,
};
pub use surface::{FrameSurface, Surface, CLEAR_COLOR};
