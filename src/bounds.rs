use serde::{Deserialize, Serialize};

use crate::domain::{Layer, MapSettings};

pub const DEFAULT_MIN_ZOOM: u8 = 1;
pub const DEFAULT_MAX_ZOOM: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub const FULL_EXTENT: Bounds = Bounds {
        min_x: -180.0,
        min_y: -90.0,
        max_x: 180.0,
        max_y: 90.0,
    };

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_valid_wgs84(&self) -> bool {
        self.min_x.abs() <= 180.0
            && self.max_x.abs() <= 180.0
            && self.min_y.abs() <= 90.0
            && self.max_y.abs() <= 90.0
    }

    pub fn or_full_extent(self) -> Self {
        if self.is_valid_wgs84() {
            self
        } else {
            Self::FULL_EXTENT
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(value: [f64; 4]) -> Self {
        Self::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Bounds> for [f64; 4] {
    fn from(value: Bounds) -> Self {
        [value.min_x, value.min_y, value.max_x, value.max_y]
    }
}

/// Map settings covering every layer. Each field aggregates independently and
/// falls back to its own default when no layer provides a value.
pub fn merge_layers(layers: &[Layer]) -> MapSettings {
    let minzoom = layers
        .iter()
        .filter_map(|layer| layer.minzoom)
        .min()
        .unwrap_or(DEFAULT_MIN_ZOOM);
    let maxzoom = layers
        .iter()
        .filter_map(|layer| layer.maxzoom)
        .max()
        .unwrap_or(DEFAULT_MAX_ZOOM);
    let bounds = layers
        .iter()
        .map(|layer| layer.bounds)
        .reduce(|acc, bounds| acc.union(&bounds))
        .unwrap_or(Bounds::FULL_EXTENT);

    MapSettings {
        minzoom,
        maxzoom,
        bounds,
    }
}
