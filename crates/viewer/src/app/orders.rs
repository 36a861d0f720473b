use battlescape::map::{Direction, GridPosition};

/// Straight-line steps from `from` to `to` on one level: diagonal while both
/// axes differ, then straight. Terrain is not consulted.
pub(crate) fn straight_path(from: GridPosition, to: GridPosition) -> Vec<Direction> {
    let mut steps = Vec::new();
    let mut current = from;
    while let Some(direction) = Direction::from_step(to.x - current.x, to.y - current.y) {
        steps.push(direction);
        let vector = direction.vector();
        current.x += vector.x;
        current.y += vector.y;
    }
    steps
}
