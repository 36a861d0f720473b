use std::ops::{Add, Neg};

use serde::{Deserialize, Serialize};

/// Map axes:
/// - x grows toward the lower-right of the screen (map width)
/// - y grows toward the upper-right of the screen (map length)
/// - z grows upward (map height, one level per floor)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridPosition {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl Add for GridPosition {
    type Output = GridPosition;

    fn add(self, rhs: GridPosition) -> GridPosition {
        GridPosition {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl Neg for GridPosition {
    type Output = GridPosition;

    fn neg(self) -> GridPosition {
        GridPosition {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

/// Pixel offset inside the map viewport, origin top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenPosition {
    pub x: i32,
    pub y: i32,
}

impl ScreenPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for ScreenPosition {
    type Output = ScreenPosition;

    fn add(self, rhs: ScreenPosition) -> ScreenPosition {
        ScreenPosition {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

/// Size of the battlefield volume in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapDimensions {
    /// Cells along x.
    pub width: i32,
    /// Cells along y.
    pub length: i32,
    /// Levels along z.
    pub height: i32,
}

impl MapDimensions {
    pub fn contains(&self, pos: GridPosition) -> bool {
        pos.x >= 0
            && pos.x < self.width
            && pos.y >= 0
            && pos.y < self.length
            && pos.z >= 0
            && pos.z < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width.max(0) as usize * self.length.max(0) as usize * self.height.max(0) as usize
    }

    pub fn max_level(&self) -> i32 {
        (self.height - 1).max(0)
    }
}

pub const DIRECTION_COUNT: u8 = 8;

const DIRECTION_VECTOR_X: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
const DIRECTION_VECTOR_Y: [i32; 8] = [1, 1, 0, -1, -1, -1, 0, 1];

/// One of the eight compass directions a unit can face, `0..=7`, clockwise
/// starting with the upper-right screen diagonal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Direction(u8);

impl Direction {
    pub const fn new(raw: u8) -> Option<Self> {
        if raw < DIRECTION_COUNT {
            Some(Self(raw))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub fn all() -> impl Iterator<Item = Direction> {
        (0..DIRECTION_COUNT).map(Direction)
    }

    pub fn vector(self) -> GridPosition {
        GridPosition {
            x: DIRECTION_VECTOR_X[self.index()],
            y: DIRECTION_VECTOR_Y[self.index()],
            z: 0,
        }
    }

    /// Direction whose vector matches the sign of `(dx, dy)`; `None` for a zero step.
    pub fn from_step(dx: i32, dy: i32) -> Option<Direction> {
        let step = (dx.signum(), dy.signum());
        Direction::all().find(|direction| {
            let vector = direction.vector();
            (vector.x, vector.y) == step
        })
    }
}

impl TryFrom<u8> for Direction {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Direction::new(value).ok_or_else(|| format!("direction {value} is outside 0..=7"))
    }
}

impl From<Direction> for u8 {
    fn from(value: Direction) -> Self {
        value.0
    }
}
