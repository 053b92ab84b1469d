//! Geographic coordinates in the latitude/longitude convention.
use serde::{Deserialize, Serialize};

/// A point on the map. Stored as `(lat, lng)`; external services that speak
/// `[lng, lat]` must go through [`Coord::from_lng_lat`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lat: f64,
    pub lng: f64,
}

impl Coord {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build a coordinate from a `[lng, lat]` pair.
    #[must_use]
    pub const fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self {
            lat: pair[1],
            lng: pair[0],
        }
    }

    /// Linear interpolation towards `other`. `t` is clamped to `[0, 1]`, and
    /// the endpoints are returned exactly at `0.0` and `1.0`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        Self {
            lat: (other.lat - self.lat).mul_add(t, self.lat),
            lng: (other.lng - self.lng).mul_add(t, self.lng),
        }
    }

    /// Whether both components are inside their valid geographic ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.lat, self.lng)
    }
}
