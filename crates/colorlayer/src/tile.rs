use std::fmt;

use serde::{Deserialize, Serialize};

/// An XYZ tile of the host grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Tile {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Tile { x, y, z }
    }

    /// Number of tiles along one axis of the grid at the zoom level of this tile
    pub fn tiles_per_axis(&self) -> i64 {
        tiles_per_axis(self.z)
    }

    /// True when both the column and the row are inside the grid
    pub fn is_within_grid(&self) -> bool {
        let count = self.tiles_per_axis();
        (0..count).contains(&(self.x as i64)) && (0..count).contains(&(self.y as i64))
    }

    /// The same tile with the column wrapped around the antimeridian into the grid
    pub fn wrapped(&self) -> Tile {
        let count = self.tiles_per_axis();
        if count == 0 {
            return *self;
        }

        Tile {
            x: (self.x as i64).rem_euclid(count) as i32,
            ..*self
        }
    }
}

/// Number of tiles along one axis at the zoom level, negative levels have no tiles
pub fn tiles_per_axis(zoom: i32) -> i64 {
    match zoom {
        0..=62 => 1i64 << zoom,
        _ => 0,
    }
}

impl fmt::Display for Tile {
    /// z/y/x, the order of the tile endpoint of the image service
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.y, self.x)
    }
}
