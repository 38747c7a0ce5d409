//! Map generation and deployment zones
//!
//! Level 4 - Utilities

use ledger_core::{Hex, Player};
use rand::Rng;

/// Random building placement attempts
const BUILDING_ATTEMPTS: std::ops::RangeInclusive<u32> = 5..=7;

/// Random blocked tile placement attempts
const BLOCKED_ATTEMPTS: std::ops::RangeInclusive<u32> = 3..=5;

/// Pip capacity of a generated building
pub const BUILDING_PIPS: std::ops::RangeInclusive<i32> = 3..=6;

/// Generated terrain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MapLayout {
    pub buildings: Vec<Hex>,
    pub blocked: Vec<Hex>,
}

/// Place buildings near the centre and a few blocked tiles.
///
/// Each attempt draws a coordinate pair; attempts that fall outside
/// `|q| + |r| <= radius` or hit an existing tile are dropped, so the
/// counts are upper bounds. A map without a ring around the centre gets no
/// terrain.
pub fn generate_map<R: Rng + ?Sized>(radius: i32, rng: &mut R) -> MapLayout {
    let mut layout = MapLayout::default();
    if radius < 1 {
        return layout;
    }

    let inner = (-radius).div_euclid(2)..=radius.div_euclid(2);
    for _ in 0..rng.gen_range(BUILDING_ATTEMPTS) {
        let q = rng.gen_range(inner.clone());
        let r = rng.gen_range(inner.clone());
        let pos = Hex::new(q, r);
        if q.abs() + r.abs() <= radius && !layout.buildings.contains(&pos) {
            layout.buildings.push(pos);
        }
    }

    let outer = (-radius + 1)..=(radius - 1);
    for _ in 0..rng.gen_range(BLOCKED_ATTEMPTS) {
        let q = rng.gen_range(outer.clone());
        let r = rng.gen_range(outer.clone());
        let pos = Hex::new(q, r);
        if q.abs() + r.abs() <= radius
            && !layout.buildings.contains(&pos)
            && !layout.blocked.contains(&pos)
        {
            layout.blocked.push(pos);
        }
    }

    layout
}

/// Deployment rows for a player, enumerated q-major inside the map
pub fn deployment_zone(player: Player, radius: i32) -> Vec<Hex> {
    let rows = match player {
        Player::One => 2..=4,
        Player::Two => -4..=-2,
    };

    let mut zone = Vec::new();
    for q in -radius..=radius {
        let lo = (-radius).max(-q - radius);
        let hi = radius.min(-q + radius);
        for r in lo..=hi {
            if rows.contains(&r) {
                zone.push(Hex::new(q, r));
            }
        }
    }
    zone
}

/// Initial facing toward the opponent's side
pub fn deployment_facing(player: Player) -> u8 {
    match player {
        Player::One => 2,
        Player::Two => 5,
    }
}
