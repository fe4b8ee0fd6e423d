//! Resolved geographic values stored in the fetch cache.

use serde::{Deserialize, Serialize};

use super::Address;

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Geocoding result for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Canonical address reported by the geocoder.
    pub address: String,
    /// Resolved position.
    pub coordinate: Coordinate,
}

/// Route between two resolved places.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Polyline geometry, origin first.
    pub points: Vec<Coordinate>,
    /// Distance in meters.
    pub distance: f64,
    /// Expected travel time in seconds.
    pub time: f64,
}

/// Ordered address pair identifying a route cache entry.
///
/// `(a, b)` and `(b, a)` are distinct keys: travel time and geometry may be
/// asymmetric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    /// Origin address.
    pub origin: Address,
    /// Destination address.
    pub destination: Address,
}

impl RouteKey {
    /// Build a key for travelling from `origin` to `destination`.
    pub const fn new(origin: Address, destination: Address) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

impl std::fmt::Display for RouteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' -> '{}'", self.origin, self.destination)
    }
}
