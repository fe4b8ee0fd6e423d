//! Nominatim geocoding adapter.

mod dto;
mod nominatim;

pub use nominatim::NominatimGeocoder;
