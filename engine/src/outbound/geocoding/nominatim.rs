//! Reqwest-backed geocoder speaking the Nominatim search API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use super::dto::SearchHitDto;
use crate::domain::ports::{GeocodingError, GeocodingService};
use crate::domain::{Address, Place};
use crate::outbound::http_support::{fetch_json, impl_from_http_failure};

impl_from_http_failure!(GeocodingError);

/// Geocoder issuing `GET {base}search?q=…&format=jsonv2&limit=1`.
pub struct NominatimGeocoder {
    client: Client,
    search: Url,
}

impl NominatimGeocoder {
    /// Build a geocoder for the Nominatim instance rooted at `base`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or
    /// `base` cannot carry a `search` path.
    pub fn new(base: &Url, timeout: Duration, user_agent: &str) -> Result<Self, GeocodingError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|error| GeocodingError::transport(error.to_string()))?;
        let search = base
            .join("search")
            .map_err(|error| GeocodingError::transport(format!("invalid base url: {error}")))?;
        Ok(Self { client, search })
    }
}

#[async_trait]
impl GeocodingService for NominatimGeocoder {
    async fn lookup(&self, address: &Address) -> Result<Place, GeocodingError> {
        debug!(%address, "querying nominatim");
        let request = self.client.get(self.search.clone()).query(&[
            ("q", address.as_str()),
            ("format", "jsonv2"),
            ("limit", "1"),
        ]);
        let hits: Vec<SearchHitDto> = fetch_json(request).await?;
        first_place(hits, address)
    }
}

fn first_place(hits: Vec<SearchHitDto>, address: &Address) -> Result<Place, GeocodingError> {
    let hit = hits
        .into_iter()
        .next()
        .ok_or_else(|| GeocodingError::not_found(address.as_str()))?;
    hit.into_place(address.as_str())
        .map_err(GeocodingError::decode)
}

#[cfg(test)]
mod tests {
    //! Result selection and coordinate parsing.

    use super::*;
    use crate::outbound::http_support::decode;
    use rstest::rstest;

    fn hits(body: &str) -> Vec<SearchHitDto> {
        decode(body.as_bytes()).expect("valid search payload")
    }

    fn address(text: &str) -> Address {
        Address::new(text).expect("valid address")
    }

    #[test]
    fn first_hit_becomes_the_place() {
        let body = r#"[
            {"lat": "52.5200066", "lon": "13.404954", "display_name": "Berlin, Deutschland"},
            {"lat": "0", "lon": "0", "display_name": "elsewhere"}
        ]"#;

        let place = first_place(hits(body), &address("Berlin")).expect("one hit");
        assert_eq!(place.address, "Berlin, Deutschland");
        assert!((place.coordinate.latitude - 52.520_006_6).abs() < 1e-9);
        assert!((place.coordinate.longitude - 13.404_954).abs() < 1e-9);
    }

    #[test]
    fn missing_display_name_keeps_the_requested_text() {
        let place = first_place(hits(r#"[{"lat": "1.5", "lon": "2.5"}]"#), &address("Somewhere 1"))
            .expect("one hit");
        assert_eq!(place.address, "Somewhere 1");
    }

    #[test]
    fn empty_result_is_not_found() {
        let error = first_place(hits("[]"), &address("Atlantis")).expect_err("no hits");
        assert_eq!(error, GeocodingError::not_found("Atlantis"));
    }

    #[rstest]
    #[case::not_a_number(r#"[{"lat": "north", "lon": "2"}]"#)]
    #[case::infinite(r#"[{"lat": "inf", "lon": "2"}]"#)]
    fn unusable_coordinates_fail_to_decode(#[case] body: &str) {
        let error = first_place(hits(body), &address("X")).expect_err("bad coordinate");
        assert!(matches!(error, GeocodingError::Decode { .. }), "{error}");
    }
}
