use serde::{Deserialize, Serialize};

use crate::map::{Direction, GridPosition};

/// Phase at which a walking unit is considered to stand on its destination.
pub const WALK_HANDOVER_PHASE: u8 = 4;
pub const WALK_PHASES: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Standing,
    Walking,
}

/// A battlefield occupant. `walk_phase` is 0 while standing and runs 1..=7
/// while crossing into the next cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    id: UnitId,
    name: String,
    position: GridPosition,
    destination: GridPosition,
    direction: Direction,
    walk_phase: u8,
    status: UnitStatus,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, position: GridPosition, direction: Direction) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            destination: position,
            direction,
            walk_phase: 0,
            status: UnitStatus::Standing,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn destination(&self) -> GridPosition {
        self.destination
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn walk_phase(&self) -> u8 {
        self.walk_phase
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub(crate) fn set_position(&mut self, position: GridPosition) {
        self.position = position;
        self.destination = position;
    }

    pub(crate) fn start_walking(&mut self, direction: Direction) {
        self.direction = direction;
        self.destination = self.position + direction.vector();
        self.walk_phase = 0;
        self.status = UnitStatus::Walking;
    }

    /// Advances one walk phase. The unit moves onto its destination at the
    /// handover phase and stands again when the cycle completes.
    pub(crate) fn keep_walking(&mut self) {
        if self.status != UnitStatus::Walking {
            return;
        }
        self.walk_phase += 1;
        if self.walk_phase == WALK_HANDOVER_PHASE {
            self.position = self.destination;
        }
        if self.walk_phase >= WALK_PHASES {
            self.walk_phase = 0;
            self.status = UnitStatus::Standing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(raw: u8) -> Direction {
        Direction::new(raw).expect("direction")
    }

    #[test]
    fn new_unit_is_standing_at_phase_zero() {
        let unit = Unit::new(UnitId(1), "Rookie", GridPosition::new(2, 2, 0), dir(3));
        assert_eq!(unit.status(), UnitStatus::Standing);
        assert_eq!(unit.walk_phase(), 0);
        assert_eq!(unit.destination(), unit.position());
    }

    #[test]
    fn walk_cycle_hands_over_position_at_phase_four() {
        let mut unit = Unit::new(UnitId(1), "Rookie", GridPosition::new(5, 5, 0), dir(0));
        unit.start_walking(dir(2));
        assert_eq!(unit.destination(), GridPosition::new(6, 5, 0));

        for expected_phase in 1..4 {
            unit.keep_walking();
            assert_eq!(unit.walk_phase(), expected_phase);
            assert_eq!(unit.position(), GridPosition::new(5, 5, 0));
        }
        unit.keep_walking();
        assert_eq!(unit.walk_phase(), 4);
        assert_eq!(unit.position(), GridPosition::new(6, 5, 0));

        for _ in 5..8 {
            unit.keep_walking();
        }
        assert_eq!(unit.walk_phase(), 7);
        assert_eq!(unit.status(), UnitStatus::Walking);
        unit.keep_walking();
        assert_eq!(unit.walk_phase(), 0);
        assert_eq!(unit.status(), UnitStatus::Standing);
    }

    #[test]
    fn keep_walking_is_ignored_while_standing() {
        let mut unit = Unit::new(UnitId(1), "Rookie", GridPosition::new(0, 0, 0), dir(0));
        unit.keep_walking();
        assert_eq!(unit.walk_phase(), 0);
        assert_eq!(unit.status(), UnitStatus::Standing);
    }
}
