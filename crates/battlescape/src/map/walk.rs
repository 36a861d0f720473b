use crate::world::{Battlefield, Unit, WALK_HANDOVER_PHASE, WALK_PHASES};

use super::coords::{Direction, GridPosition, ScreenPosition};

const WALK_OFFSET_X: [i32; 8] = [1, 2, 1, 0, -1, -2, -1, 0];
const WALK_OFFSET_Y: [i32; 8] = [1, 0, -1, -2, -1, 0, 1, 2];

/// Screen offset of a unit walking in `direction` at `phase`.
///
/// `from_level` is the terrain level of the cell the unit currently stands
/// on and `to_level` that of the cell it is blending with: the destination
/// while `phase < 4`, the cell it came from afterwards. The level blend uses
/// one truncating division over the weighted sum.
pub fn walk_offset(direction: Direction, phase: u8, from_level: i32, to_level: i32) -> ScreenPosition {
    let phase = i32::from(phase % WALK_PHASES);
    if phase == 0 {
        return ScreenPosition::new(0, from_level);
    }

    let dx = WALK_OFFSET_X[direction.index()];
    let dy = WALK_OFFSET_Y[direction.index()];
    let steps = if phase < i32::from(WALK_HANDOVER_PHASE) {
        phase
    } else {
        phase - i32::from(WALK_PHASES)
    };
    let lift = if phase < i32::from(WALK_HANDOVER_PHASE) {
        (from_level * (8 - phase) + to_level * phase) / 8
    } else {
        (to_level * (8 - phase) + from_level * phase) / 8
    };
    ScreenPosition::new(steps * 2 * dx, -steps * dy + lift)
}

/// Walk offset of `unit` drawn in cell `position`, reading terrain levels
/// from the battlefield. Missing tiles count as level 0.
pub fn unit_walk_offset(battlefield: &Battlefield, unit: &Unit, position: GridPosition) -> ScreenPosition {
    let phase = unit.walk_phase() % WALK_PHASES;
    let from_level = battlefield.terrain_level(position);
    if phase == 0 {
        return walk_offset(unit.direction(), phase, from_level, from_level);
    }
    let vector = if phase >= WALK_HANDOVER_PHASE {
        -unit.direction().vector()
    } else {
        unit.direction().vector()
    };
    let to_level = battlefield.terrain_level(position + vector);
    walk_offset(unit.direction(), phase, from_level, to_level)
}
