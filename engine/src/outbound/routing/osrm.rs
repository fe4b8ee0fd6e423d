//! Reqwest-backed router speaking the OSRM HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::dto::{RouteRejection, RouteResponseDto};
use crate::domain::ports::{RoutingError, RoutingService};
use crate::domain::{Coordinate, Route};
use crate::outbound::http_support::{
    HttpFailure, decode, impl_from_http_failure, map_status_error,
};

impl_from_http_failure!(RoutingError);

/// Router issuing `GET {base}route/v1/driving/{lon},{lat};{lon},{lat}`.
pub struct OsrmRouter {
    client: Client,
    base: Url,
}

impl OsrmRouter {
    /// Build a router for the OSRM instance rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base: Url, timeout: Duration, user_agent: &str) -> Result<Self, RoutingError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|error| RoutingError::transport(error.to_string()))?;
        Ok(Self { client, base })
    }

    fn route_url(&self, origin: Coordinate, destination: Coordinate) -> Result<Url, RoutingError> {
        let path = format!(
            "route/v1/driving/{},{};{},{}",
            origin.longitude, origin.latitude, destination.longitude, destination.latitude
        );
        let mut url = self
            .base
            .join(&path)
            .map_err(|error| RoutingError::transport(format!("invalid base url: {error}")))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");
        Ok(url)
    }
}

#[async_trait]
impl RoutingService for OsrmRouter {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RoutingError> {
        let url = self.route_url(origin, destination)?;
        debug!(%url, "querying osrm");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| RoutingError::from(HttpFailure::from(error)))?;

        // OSRM reports "no route" with a 400 and a JSON body, so decode
        // before looking at the status.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| RoutingError::from(HttpFailure::from(error)))?;
        match decode::<RouteResponseDto>(body.as_ref()) {
            Ok(decoded) => parse_route(decoded),
            Err(_) if !status.is_success() => Err(map_status_error(status, body.as_ref()).into()),
            Err(failure) => Err(failure.into()),
        }
    }
}

fn parse_route(decoded: RouteResponseDto) -> Result<Route, RoutingError> {
    decoded.into_route().map_err(|rejection| match rejection {
        RouteRejection::NoRoute(message) => RoutingError::no_route(message),
        RouteRejection::Invalid(message) => RoutingError::decode(message),
    })
}

#[cfg(test)]
mod tests {
    //! URL construction and response interpretation.

    use super::*;

    fn router() -> OsrmRouter {
        let base = Url::parse("https://router.example.test/osrm/").expect("valid url");
        OsrmRouter::new(base, Duration::from_secs(5), "quickroute-test").expect("client builds")
    }

    fn parse(body: &str) -> Result<Route, RoutingError> {
        parse_route(decode(body.as_bytes()).expect("valid OSRM payload"))
    }

    #[test]
    fn url_orders_positions_longitude_first() {
        let url = router()
            .route_url(Coordinate::new(52.5, 13.4), Coordinate::new(48.1, 11.6))
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://router.example.test/osrm/route/v1/driving/13.4,52.5;11.6,48.1?overview=full&geometries=geojson"
        );
    }

    #[test]
    fn first_route_is_mapped_with_latitude_first_points() {
        let route = parse(
            r#"{
                "code": "Ok",
                "routes": [{
                    "distance": 1234.5,
                    "duration": 321.0,
                    "geometry": {"type": "LineString", "coordinates": [[13.4, 52.5], [11.6, 48.1]]}
                }]
            }"#,
        )
        .expect("route decodes");

        assert_eq!(route.distance, 1234.5);
        assert_eq!(route.time, 321.0);
        assert_eq!(
            route.points,
            vec![Coordinate::new(52.5, 13.4), Coordinate::new(48.1, 11.6)]
        );
    }

    #[test]
    fn non_ok_code_is_no_route() {
        let error = parse(r#"{"code": "NoRoute", "message": "Impossible route"}"#)
            .expect_err("no route");
        assert_eq!(error, RoutingError::no_route("NoRoute: Impossible route"));
    }

    #[test]
    fn ok_without_routes_is_no_route() {
        let error = parse(r#"{"code": "Ok", "routes": []}"#).expect_err("empty routes");
        assert!(matches!(error, RoutingError::NoRoute { .. }));
    }
}
