use super::coords::{GridPosition, MapDimensions, ScreenPosition};
use super::transform::{to_screen, TileMetrics};

/// Size of the map viewport in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// A cell that survived culling, with its camera-adjusted screen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleCell {
    pub grid: GridPosition,
    pub screen: ScreenPosition,
}

/// Whether a sprite anchored at `screen` can touch the viewport. The
/// viewport is grown by one sprite on every side so sprites crossing the
/// edge don't pop.
pub fn is_visible(screen: ScreenPosition, viewport: Viewport, metrics: TileMetrics) -> bool {
    let w = metrics.tile_width();
    let h = metrics.tile_height();
    screen.x > -w && screen.x < viewport.width + w && screen.y > -h && screen.y < viewport.height + h
}

/// Collects visible cells in painter's order: z ascending, x ascending,
/// y descending. The buffer is reused across frames.
#[derive(Debug, Default)]
pub struct ViewportCuller {
    cells: Vec<VisibleCell>,
}

impl ViewportCuller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cull(
        &mut self,
        dimensions: MapDimensions,
        active_level: i32,
        camera_offset: ScreenPosition,
        viewport: Viewport,
        metrics: TileMetrics,
    ) -> &[VisibleCell] {
        self.cells.clear();
        let top_level = active_level.min(dimensions.height - 1);
        for z in 0..=top_level {
            for x in 0..dimensions.width {
                for y in (0..dimensions.length).rev() {
                    let grid = GridPosition::new(x, y, z);
                    let screen = to_screen(grid, metrics) + camera_offset;
                    if is_visible(screen, viewport, metrics) {
                        self.cells.push(VisibleCell { grid, screen });
                    }
                }
            }
        }
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> TileMetrics {
        TileMetrics::new(32, 40).expect("metrics")
    }

    fn dims(width: i32, length: i32, height: i32) -> MapDimensions {
        MapDimensions {
            width,
            length,
            height,
        }
    }

    #[test]
    fn visibility_bounds_are_strict() {
        let viewport = Viewport::new(320, 200);
        let metrics = metrics();
        assert!(is_visible(ScreenPosition::new(-31, -39), viewport, metrics));
        assert!(!is_visible(ScreenPosition::new(-32, 0), viewport, metrics));
        assert!(!is_visible(ScreenPosition::new(0, -40), viewport, metrics));
        assert!(is_visible(ScreenPosition::new(351, 239), viewport, metrics));
        assert!(!is_visible(ScreenPosition::new(352, 0), viewport, metrics));
        assert!(!is_visible(ScreenPosition::new(0, 240), viewport, metrics));
    }

    #[test]
    fn iteration_is_z_then_x_ascending_then_y_descending() {
        let mut culler = ViewportCuller::new();
        let cells = culler.cull(
            dims(2, 3, 2),
            1,
            ScreenPosition::new(0, 100),
            Viewport::new(1000, 1000),
            metrics(),
        );
        let order: Vec<(i32, i32, i32)> = cells
            .iter()
            .map(|cell| (cell.grid.z, cell.grid.x, cell.grid.y))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, 0, 2),
                (0, 0, 1),
                (0, 0, 0),
                (0, 1, 2),
                (0, 1, 1),
                (0, 1, 0),
                (1, 0, 2),
                (1, 0, 1),
                (1, 0, 0),
                (1, 1, 2),
                (1, 1, 1),
                (1, 1, 0),
            ]
        );
    }

    #[test]
    fn levels_above_the_active_level_are_skipped() {
        let mut culler = ViewportCuller::new();
        let cells = culler.cull(
            dims(3, 3, 4),
            1,
            ScreenPosition::new(0, 100),
            Viewport::new(1000, 1000),
            metrics(),
        );
        assert!(cells.iter().all(|cell| cell.grid.z <= 1));
        assert_eq!(cells.len(), 18);
    }

    #[test]
    fn cells_outside_the_viewport_are_dropped() {
        let mut culler = ViewportCuller::new();
        let cells = culler.cull(
            dims(40, 40, 1),
            0,
            ScreenPosition::new(0, 0),
            Viewport::new(320, 200),
            metrics(),
        );
        assert!(!cells.is_empty());
        assert!(cells.len() < 1600);
        for cell in cells {
            let expected = to_screen(cell.grid, metrics());
            assert_eq!(cell.screen, expected);
            assert!(is_visible(cell.screen, Viewport::new(320, 200), metrics()));
        }
    }

    #[test]
    fn painter_order_puts_nearer_overlapping_cells_later() {
        let mut culler = ViewportCuller::new();
        let cells = culler
            .cull(
                dims(4, 4, 2),
                1,
                ScreenPosition::new(0, 100),
                Viewport::new(1000, 1000),
                metrics(),
            )
            .to_vec();
        let index_of = |pos: GridPosition| {
            cells
                .iter()
                .position(|cell| cell.grid == pos)
                .expect("visible")
        };
        // A cell's lower-right (x+1) and lower-left (y-1) neighbours overlap it
        // from the front, as does anything stacked above.
        assert!(index_of(GridPosition::new(1, 1, 0)) < index_of(GridPosition::new(2, 1, 0)));
        assert!(index_of(GridPosition::new(1, 1, 0)) < index_of(GridPosition::new(1, 0, 0)));
        assert!(index_of(GridPosition::new(3, 3, 0)) < index_of(GridPosition::new(0, 0, 1)));
    }
}
