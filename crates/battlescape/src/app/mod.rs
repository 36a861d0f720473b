mod input;
mod loop_runner;
mod metrics;
pub mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use rendering::{
    selection_arrow, CursorFrame, FrameSurface, Renderer, Sprite, SpriteBank, SpriteBankError,
    SpriteSheet, Surface, BASE_SHEET, CLEAR_COLOR, CURSOR_SHEET, SPRITE_MANIFEST_FILE, UNIT_SHEET,
};
pub use scene::{apply_view_actions, InputSnapshot, Scene, SceneCommand};
