//! Behaviour of the fixture port implementations.

use chrono::{TimeZone, Utc};
use rstest::rstest;

use super::*;
use crate::domain::{
    Address, Coordinate, DriverId, FetchCache, Objective, PersistedState, WaypointList,
};

#[rstest]
#[tokio::test]
async fn fixture_geocoder_is_deterministic() {
    let address = Address::new("Main Street 1").expect("valid address");
    let first = FixtureGeocodingService
        .lookup(&address)
        .await
        .expect("fixture lookup");
    let second = FixtureGeocodingService
        .lookup(&address)
        .await
        .expect("fixture lookup");
    assert_eq!(first, second);
    assert_eq!(first.address, "Main Street 1");
}

#[rstest]
#[tokio::test]
async fn fixture_router_measures_great_circle_distance() {
    let origin = Coordinate::new(0.0, 0.0);
    let destination = Coordinate::new(0.0, 1.0);
    let route = FixtureRoutingService
        .route(origin, destination)
        .await
        .expect("fixture route");
    // One degree of longitude at the equator.
    assert!((route.distance - 111_195.0).abs() < 1.0, "{}", route.distance);
    assert_eq!(route.points, vec![origin, destination]);
}

#[rstest]
#[tokio::test]
async fn fixture_optimizer_keeps_order() {
    let ordering = FixtureOptimizationService
        .optimize(&[Coordinate::new(0.0, 0.0); 3], Objective::Time)
        .await
        .expect("fixture optimize");
    assert_eq!(ordering, vec![0, 1, 2]);
}

#[rstest]
#[tokio::test]
async fn fixture_importer_returns_nothing() {
    let entries = FixtureImportService
        .fetch_waypoints(&DriverId::new("1"))
        .await
        .expect("fixture import");
    assert!(entries.is_empty());
}

#[rstest]
#[tokio::test]
async fn fixture_state_store_round_trips() {
    let store = FixtureStateStore::default();
    assert!(store.load().await.expect("load").is_none());

    let saved_at = Utc
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .expect("valid timestamp");
    let state = PersistedState::capture(&WaypointList::new(), &FetchCache::new(), saved_at);
    store.save(&state).await.expect("save");
    assert_eq!(store.load().await.expect("load"), Some(state));
}

#[rstest]
fn port_errors_render_status_details() {
    let err = RoutingError::rejected(503_u16, "busy");
    assert_eq!(
        err.to_string(),
        "router rejected request with status 503: busy"
    );
}
