//! DTOs for decoding Nominatim `jsonv2` search results.

use serde::Deserialize;

use crate::domain::{Coordinate, Place};

/// One search hit. Nominatim reports coordinates as decimal strings.
#[derive(Debug, Deserialize)]
pub(super) struct SearchHitDto {
    pub(super) lat: String,
    pub(super) lon: String,
    #[serde(default)]
    pub(super) display_name: Option<String>,
}

impl SearchHitDto {
    /// Map the hit to a place for `requested`, keeping the requested text
    /// when Nominatim omits a display name.
    pub(super) fn into_place(self, requested: &str) -> Result<Place, String> {
        let latitude = parse_degrees("lat", &self.lat)?;
        let longitude = parse_degrees("lon", &self.lon)?;
        Ok(Place {
            address: self.display_name.unwrap_or_else(|| requested.to_owned()),
            coordinate: Coordinate::new(latitude, longitude),
        })
    }
}

fn parse_degrees(field: &str, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| format!("{field} '{raw}' is not a finite number"))
}
