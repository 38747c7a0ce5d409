//! Hex grid geometry with axial coordinates

use serde::{Deserialize, Serialize};

/// Axial hex coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

/// Direction vectors in axial coordinates (dq, dr), indexed 0-5
pub const DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
];

impl Hex {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Distance between two hexes
    pub fn distance(&self, other: Hex) -> i32 {
        let dq = self.q - other.q;
        let dr = self.r - other.r;
        (dq.abs() + (dq + dr).abs() + dr.abs()) / 2
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: u8) -> Hex {
        let (dq, dr) = DIRECTIONS[direction as usize % 6];
        Hex::new(self.q + dq, self.r + dr)
    }

    /// All six neighbors, in direction order
    pub fn neighbors(&self) -> [Hex; 6] {
        let mut out = [*self; 6];
        for (i, hex) in out.iter_mut().enumerate() {
            *hex = self.neighbor(i as u8);
        }
        out
    }

    /// Approximate direction (0-5) toward `target`.
    ///
    /// The offset is floor-divided by its largest cube component and matched
    /// against [`DIRECTIONS`]. Off-axis offsets that do not reduce to a unit
    /// vector fall back to 0, as does a zero offset.
    pub fn direction_to(&self, target: Hex) -> u8 {
        let dq = target.q - self.q;
        let dr = target.r - self.r;

        let max_val = dq.abs().max(dr.abs()).max((dq + dr).abs());
        if max_val == 0 {
            return 0;
        }

        let norm = (dq.div_euclid(max_val), dr.div_euclid(max_val));
        DIRECTIONS
            .iter()
            .position(|&d| d == norm)
            .map(|i| i as u8)
            .unwrap_or(0)
    }
}

impl std::fmt::Display for Hex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Whether `direction` lies in the three-direction arc centred on `facing`
pub fn in_frontal_arc(facing: u8, direction: u8) -> bool {
    let diff = (direction as i32 - facing as i32).abs();
    !(diff > 1 && diff < 5)
}
