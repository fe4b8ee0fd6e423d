//! Driven port for routing between two coordinates.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Coordinate, Route};

define_port_error! {
    /// Errors surfaced while requesting a route.
    pub enum RoutingError {
        /// Network transport failed before receiving a response.
        Transport {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "router transport failed: {message}",
        /// The router did not answer in time.
        Timeout {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "router timeout: {message}",
        /// The router answered with an error status.
        Rejected {
            /// HTTP status code.
            status: u16,
            /// Detail reported by the service or client.
            message: String,
        } =>
            "router rejected request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "router response decode failed: {message}",
        /// The router found no route between the coordinates.
        NoRoute {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "no route found: {message}",
    }
}

/// Port for computing a route between two points.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Route from `origin` to `destination`.
    ///
    /// Dropping the returned future abandons the request.
    async fn route(&self, origin: Coordinate, destination: Coordinate)
    -> Result<Route, RoutingError>;
}

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
const FIXTURE_SPEED_METERS_PER_SECOND: f64 = 13.9;

/// Fixture router returning a straight great-circle leg at urban speed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRoutingService;

impl FixtureRoutingService {
    /// Great-circle distance in meters.
    pub fn distance_between(origin: Coordinate, destination: Coordinate) -> f64 {
        let (lat1, lat2) = (origin.latitude.to_radians(), destination.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (destination.longitude - origin.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
    }
}

#[async_trait]
impl RoutingService for FixtureRoutingService {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RoutingError> {
        let distance = Self::distance_between(origin, destination);
        Ok(Route {
            points: vec![origin, destination],
            distance,
            time: distance / FIXTURE_SPEED_METERS_PER_SECOND,
        })
    }
}
