//! DTOs for decoding OSRM `route` responses.

use serde::Deserialize;

use crate::domain::{Coordinate, Route};

#[derive(Debug, Deserialize)]
pub(super) struct RouteResponseDto {
    pub(super) code: String,
    #[serde(default)]
    pub(super) message: Option<String>,
    #[serde(default)]
    pub(super) routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RouteDto {
    pub(super) distance: f64,
    pub(super) duration: f64,
    pub(super) geometry: GeometryDto,
}

/// GeoJSON line string; positions are `[lon, lat]`.
#[derive(Debug, Deserialize)]
pub(super) struct GeometryDto {
    #[serde(default)]
    pub(super) coordinates: Vec<[f64; 2]>,
}

/// Why a decoded response carries no usable route.
#[derive(Debug, PartialEq)]
pub(super) enum RouteRejection {
    NoRoute(String),
    Invalid(String),
}

impl RouteResponseDto {
    pub(super) fn into_route(self) -> Result<Route, RouteRejection> {
        if self.code != "Ok" {
            let detail = self.message.unwrap_or_default();
            return Err(RouteRejection::NoRoute(format!("{}: {detail}", self.code)));
        }
        let route = self
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| RouteRejection::NoRoute("response contained no routes".to_owned()))?;
        if !route.distance.is_finite() || !route.duration.is_finite() {
            return Err(RouteRejection::Invalid(
                "route includes non-finite distance or duration".to_owned(),
            ));
        }
        Ok(Route {
            points: route
                .geometry
                .coordinates
                .into_iter()
                .map(|[longitude, latitude]| Coordinate::new(latitude, longitude))
                .collect(),
            distance: route.distance,
            time: route.duration,
        })
    }
}
