mod camera;
mod clock;
mod compositor;
mod coords;
mod culler;
mod selection;
mod transform;
mod view;
mod walk;

pub use camera::{
    CameraBounds, CameraState, PointerButtons, PointerEvent, ScrollController, ScrollState,
    INITIAL_OFFSET, SCROLL_AMOUNT, SCROLL_BORDER,
};
pub use clock::{AnimationClock, MapTimings, Trigger, TriggerKind};
pub use compositor::{Compositor, MapFrame};
pub use coords::{Direction, GridPosition, MapDimensions, ScreenPosition, DIRECTION_COUNT};
pub use culler::{is_visible, Viewport, ViewportCuller, VisibleCell};
pub use selection::{pointer_to_cell, scale_pointer, SelectionState};
pub use transform::{to_screen, TileMetrics, TileMetricsError};
pub use view::MapView;
pub use walk::{unit_walk_offset, walk_offset};
