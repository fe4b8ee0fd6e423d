//! Driven port for turning address text into a coordinate.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Address, Coordinate, Place};

define_port_error! {
    /// Errors surfaced while geocoding an address.
    pub enum GeocodingError {
        /// Network transport failed before receiving a response.
        Transport {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "geocoder transport failed: {message}",
        /// The geocoder did not answer in time.
        Timeout {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "geocoder timeout: {message}",
        /// The geocoder answered with an error status.
        Rejected {
            /// HTTP status code.
            status: u16,
            /// Detail reported by the service or client.
            message: String,
        } =>
            "geocoder rejected request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "geocoder response decode failed: {message}",
        /// The geocoder knows no place for the address.
        NotFound {
            /// Address text.
            address: String,
        } =>
            "no place found for '{address}'",
    }
}

/// Port for geocoding one address.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Resolve `address` to a place.
    ///
    /// Dropping the returned future abandons the lookup.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use quickroute_engine::domain::Address;
    /// use quickroute_engine::domain::ports::{FixtureGeocodingService, GeocodingService};
    ///
    /// let place = FixtureGeocodingService
    ///     .lookup(&Address::new("Main Street 1")?)
    ///     .await?;
    /// assert_eq!(place.address, "Main Street 1");
    /// ```
    async fn lookup(&self, address: &Address) -> Result<Place, GeocodingError>;
}

/// Fixture geocoder placing every address at a stable pseudo-random point.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureGeocodingService;

impl FixtureGeocodingService {
    /// Coordinate the fixture reports for `address`.
    pub fn coordinate_for(address: &Address) -> Coordinate {
        let seed = address
            .as_str()
            .bytes()
            .fold(17_u32, |acc, byte| acc.wrapping_mul(31).wrapping_add(u32::from(byte)));
        let latitude = f64::from(seed % 1_000) / 100.0 + 45.0;
        let longitude = f64::from(seed.div_euclid(1_000) % 1_000) / 100.0;
        Coordinate::new(latitude, longitude)
    }
}

#[async_trait]
impl GeocodingService for FixtureGeocodingService {
    async fn lookup(&self, address: &Address) -> Result<Place, GeocodingError> {
        Ok(Place {
            address: address.to_string(),
            coordinate: Self::coordinate_for(address),
        })
    }
}
