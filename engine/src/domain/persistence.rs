//! Sanitised engine state for the state store.
//!
//! Only settled, successful entries that the current list still uses are
//! kept. In-flight and failed entries are never persisted, so a restored
//! engine re-requests them.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Address, FetchCache, FetchResult, Place, Route, RouteKey, Waypoint, WaypointId, WaypointList,
};

/// Waypoint as stored; selection is not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedWaypoint {
    /// Stable identifier.
    pub id: WaypointId,
    /// Address text.
    pub address: Address,
}

/// Resolved route between two stored addresses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRoute {
    /// Origin address.
    pub origin: Address,
    /// Destination address.
    pub destination: Address,
    /// Resolved route.
    pub route: Route,
}

/// Snapshot handed to a [`crate::domain::ports::StateStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// Waypoints in order.
    pub waypoints: Vec<PersistedWaypoint>,
    /// Resolved places keyed by address.
    pub places: BTreeMap<Address, Place>,
    /// Resolved routes between adjacent-capable addresses.
    pub routes: Vec<PersistedRoute>,
    /// Capture time.
    pub saved_at: DateTime<Utc>,
}

impl PersistedState {
    /// Capture `waypoints` and the parts of `cache` they use.
    pub fn capture(waypoints: &WaypointList, cache: &FetchCache, saved_at: DateTime<Utc>) -> Self {
        let in_use: HashSet<&Address> = waypoints.as_slice().iter().map(Waypoint::address).collect();

        let places = cache
            .places()
            .filter(|(address, _)| in_use.contains(address))
            .filter_map(|(address, result)| {
                result.value().map(|place| (address.clone(), place.clone()))
            })
            .collect();

        let mut routes: Vec<PersistedRoute> = cache
            .routes()
            .filter(|(origin, destination, _)| {
                in_use.contains(origin) && in_use.contains(destination)
            })
            .filter_map(|(origin, destination, result)| {
                result.value().map(|route| PersistedRoute {
                    origin: origin.clone(),
                    destination: destination.clone(),
                    route: route.clone(),
                })
            })
            .collect();
        routes.sort_by(|a, b| (&a.origin, &a.destination).cmp(&(&b.origin, &b.destination)));

        Self {
            waypoints: waypoints
                .as_slice()
                .iter()
                .map(|waypoint| PersistedWaypoint {
                    id: waypoint.id(),
                    address: waypoint.address().clone(),
                })
                .collect(),
            places,
            routes,
            saved_at,
        }
    }

    /// Rebuild the waypoint list and a cache seeded with the stored entries.
    pub fn restore(self) -> (WaypointList, FetchCache) {
        let list = WaypointList::from_waypoints(
            self.waypoints
                .into_iter()
                .map(|stored| Waypoint::with_id(stored.id, stored.address))
                .collect(),
        );
        let mut cache = FetchCache::new();
        for (address, place) in self.places {
            cache.put_place(address, FetchResult::Success { value: place });
        }
        for stored in self.routes {
            cache.put_route(
                RouteKey::new(stored.origin, stored.destination),
                FetchResult::Success {
                    value: stored.route,
                },
            );
        }
        (list, cache)
    }
}

#[cfg(test)]
mod tests {
    //! Sanitising and restoring engine state.
    use super::*;
    use crate::domain::{Coordinate, ResolutionError};
    use chrono::TimeZone;
    use rstest::rstest;

    fn addr(text: &str) -> Address {
        Address::new(text).expect("valid address")
    }

    fn place(text: &str) -> FetchResult<Place> {
        FetchResult::Success {
            value: Place {
                address: text.to_owned(),
                coordinate: Coordinate::new(1.0, 2.0),
            },
        }
    }

    fn route() -> FetchResult<Route> {
        FetchResult::Success {
            value: Route {
                points: vec![Coordinate::new(1.0, 2.0)],
                distance: 10.0,
                time: 2.0,
            },
        }
    }

    fn saved_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn capture_keeps_only_successful_entries_in_use() {
        let mut list = WaypointList::from_addresses([addr("A"), addr("B")]);
        list.select(0).expect("valid index");
        let mut cache = FetchCache::new();
        cache.put_place(addr("A"), place("A"));
        cache.put_place(
            addr("B"),
            FetchResult::Failed {
                error: ResolutionError::lookup_failed("B", "not found"),
            },
        );
        cache.put_place(addr("Z"), place("Z"));
        cache.begin_place(&addr("C"));
        cache.put_route(RouteKey::new(addr("A"), addr("B")), route());
        cache.put_route(RouteKey::new(addr("A"), addr("Z")), route());

        let state = PersistedState::capture(&list, &cache, saved_at());

        assert_eq!(state.waypoints.len(), 2);
        assert_eq!(state.places.keys().collect::<Vec<_>>(), vec![&addr("A")]);
        assert_eq!(state.routes.len(), 1);
        assert_eq!(state.routes.first().map(|r| &r.destination), Some(&addr("B")));

        let (restored, cache) = state.restore();
        assert!(restored.as_slice().iter().all(|w| !w.is_selected()));
        assert_eq!(restored.get(0).map(Waypoint::id), list.get(0).map(Waypoint::id));
        assert!(cache.place(&addr("A")).is_some_and(FetchResult::is_settled));
        assert!(cache.place(&addr("B")).is_none());
    }

    #[rstest]
    fn serialises_with_camel_case_keys() {
        let state = PersistedState::capture(&WaypointList::new(), &FetchCache::new(), saved_at());
        let json = serde_json::to_value(&state).expect("serialise");
        assert!(json.get("savedAt").is_some());
        let back: PersistedState = serde_json::from_value(json).expect("deserialise");
        assert_eq!(back, state);
    }
}
