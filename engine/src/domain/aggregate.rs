//! Pure selectors deriving route status from the list and the cache.

use serde::Serialize;

use super::{FetchCache, FetchResult, Place, Route, Waypoint};

/// Aggregate status of the whole route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteInformation {
    /// Fewer than two waypoints.
    Empty,
    /// Some relevant entries are missing or in flight.
    Fetching {
        /// Settled share of the relevant entries, in `[0, 1)`.
        progress: f64,
    },
    /// Every relevant place and route resolved.
    Fetched {
        /// Sum of the route distances in meters.
        total_distance: f64,
        /// Sum of the route travel times in seconds.
        total_time: f64,
    },
    /// At least one relevant place or route failed.
    Failed,
}

/// Derive the aggregate status of `waypoints` from `cache`.
///
/// A list of `n` waypoints has `n` relevant places and `n - 1` relevant
/// routes. Places are counted per position, so a repeated address counts
/// once for each waypoint using it.
///
/// # Examples
///
/// ```
/// use quickroute_engine::domain::{route_information, FetchCache, RouteInformation};
///
/// assert_eq!(route_information(&[], &FetchCache::new()), RouteInformation::Empty);
/// ```
pub fn route_information(waypoints: &[Waypoint], cache: &FetchCache) -> RouteInformation {
    let count = waypoints.len();
    if count < 2 {
        return RouteInformation::Empty;
    }

    let places: Vec<Option<&FetchResult<Place>>> =
        waypoints.iter().map(|w| cache.place(w.address())).collect();
    let routes: Vec<Option<&FetchResult<Route>>> = waypoints
        .iter()
        .zip(waypoints.iter().skip(1))
        .map(|(origin, destination)| cache.route(origin.address(), destination.address()))
        .collect();

    let failed = places.iter().flatten().any(|entry| entry.is_failed())
        || routes.iter().flatten().any(|entry| entry.is_failed());
    if failed {
        return RouteInformation::Failed;
    }

    let completed = places
        .iter()
        .flatten()
        .filter(|entry| entry.is_settled())
        .count()
        + routes
            .iter()
            .flatten()
            .filter(|entry| entry.is_settled())
            .count();
    let total = 2 * count - 1;

    if completed == total {
        let resolved_routes: Vec<&Route> = routes
            .iter()
            .flatten()
            .filter_map(|entry| entry.value())
            .collect();
        RouteInformation::Fetched {
            total_distance: resolved_routes.iter().map(|route| route.distance).sum(),
            total_time: resolved_routes.iter().map(|route| route.time).sum(),
        }
    } else {
        #[expect(
            clippy::cast_precision_loss,
            reason = "waypoint counts are far below f64 precision limits"
        )]
        let progress = completed as f64 / total as f64;
        RouteInformation::Fetching { progress }
    }
}

/// Resolution status of one waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "failure", rename_all = "snake_case")]
pub enum WaypointStatus {
    /// Some relevant entry has not been requested or resolved yet.
    Pending,
    /// A relevant entry is in flight.
    Fetching,
    /// The place and both neighbouring routes resolved.
    Fetched,
    /// A relevant entry failed.
    Failed(WaypointFailure),
}

/// Which entry made a waypoint fail, in display precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointFailure {
    /// The address could not be geocoded.
    PlaceNotFound,
    /// Both the incoming and the outgoing route failed.
    RouteToAndFromFailed,
    /// The route from the previous waypoint failed.
    RouteFromPreviousFailed,
    /// The route to the next waypoint failed.
    RouteToNextFailed,
}

impl std::fmt::Display for WaypointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PlaceNotFound => "address not found",
            Self::RouteToAndFromFailed => "no route to or from this waypoint",
            Self::RouteFromPreviousFailed => "no route from the previous waypoint",
            Self::RouteToNextFailed => "no route to the next waypoint",
        })
    }
}

/// Status of the waypoint at `index`, or `None` when the index is out of
/// range.
pub fn waypoint_status(
    waypoints: &[Waypoint],
    index: usize,
    cache: &FetchCache,
) -> Option<WaypointStatus> {
    let waypoint = waypoints.get(index)?;
    let place = cache.place(waypoint.address());
    let incoming = index
        .checked_sub(1)
        .and_then(|previous| waypoints.get(previous))
        .map(|previous| cache.route(previous.address(), waypoint.address()));
    let outgoing = waypoints
        .get(index + 1)
        .map(|next| cache.route(waypoint.address(), next.address()));

    let place_failed = place.is_some_and(FetchResult::is_failed);
    let incoming_failed = incoming.flatten().is_some_and(FetchResult::is_failed);
    let outgoing_failed = outgoing.flatten().is_some_and(FetchResult::is_failed);

    let failure = if place_failed {
        Some(WaypointFailure::PlaceNotFound)
    } else if incoming_failed && outgoing_failed {
        Some(WaypointFailure::RouteToAndFromFailed)
    } else if incoming_failed {
        Some(WaypointFailure::RouteFromPreviousFailed)
    } else if outgoing_failed {
        Some(WaypointFailure::RouteToNextFailed)
    } else {
        None
    };
    if let Some(failure) = failure {
        return Some(WaypointStatus::Failed(failure));
    }

    let in_progress = place.is_some_and(FetchResult::is_in_progress)
        || incoming.flatten().is_some_and(FetchResult::is_in_progress)
        || outgoing.flatten().is_some_and(FetchResult::is_in_progress);
    if in_progress {
        return Some(WaypointStatus::Fetching);
    }

    // Absent neighbours (first or last waypoint) count as resolved.
    let resolved = place.is_some()
        && incoming.is_none_or(|entry| entry.is_some())
        && outgoing.is_none_or(|entry| entry.is_some());
    Some(if resolved {
        WaypointStatus::Fetched
    } else {
        WaypointStatus::Pending
    })
}

#[cfg(test)]
mod tests {
    //! Aggregate and per-waypoint selectors over hand-built caches.
    use super::*;
    use crate::domain::{Address, Coordinate, ResolutionError, RouteKey, WaypointList};
    use rstest::{fixture, rstest};

    fn addr(text: &str) -> Address {
        Address::new(text).expect("valid address")
    }

    fn resolved_place(cache: &mut FetchCache, text: &str) {
        cache.put_place(
            addr(text),
            FetchResult::Success {
                value: Place {
                    address: text.to_owned(),
                    coordinate: Coordinate::new(0.0, 0.0),
                },
            },
        );
    }

    fn failed_place(cache: &mut FetchCache, text: &str) {
        cache.put_place(
            addr(text),
            FetchResult::Failed {
                error: ResolutionError::lookup_failed(text, "not found"),
            },
        );
    }

    fn resolved_route(cache: &mut FetchCache, origin: &str, destination: &str, distance: f64, time: f64) {
        cache.put_route(
            RouteKey::new(addr(origin), addr(destination)),
            FetchResult::Success {
                value: Route {
                    points: vec![],
                    distance,
                    time,
                },
            },
        );
    }

    fn failed_route(cache: &mut FetchCache, origin: &str, destination: &str) {
        cache.put_route(
            RouteKey::new(addr(origin), addr(destination)),
            FetchResult::Failed {
                error: ResolutionError::route_failed(origin, destination, "no route"),
            },
        );
    }

    #[fixture]
    fn abc() -> WaypointList {
        WaypointList::from_addresses(["A", "B", "C"].into_iter().map(addr))
    }

    #[rstest]
    fn fully_resolved_route_sums_distance_and_time(abc: WaypointList) {
        let mut cache = FetchCache::new();
        for text in ["A", "B", "C"] {
            resolved_place(&mut cache, text);
        }
        resolved_route(&mut cache, "A", "B", 1000.0, 120.0);
        resolved_route(&mut cache, "B", "C", 500.0, 60.0);

        assert_eq!(
            route_information(abc.as_slice(), &cache),
            RouteInformation::Fetched {
                total_distance: 1500.0,
                total_time: 180.0,
            }
        );
    }

    #[rstest]
    fn failed_place_wins_over_in_flight_routes(abc: WaypointList) {
        let mut cache = FetchCache::new();
        resolved_place(&mut cache, "A");
        failed_place(&mut cache, "B");
        resolved_place(&mut cache, "C");
        cache.begin_route(&RouteKey::new(addr("A"), addr("B")));
        cache.begin_route(&RouteKey::new(addr("B"), addr("C")));

        assert_eq!(route_information(abc.as_slice(), &cache), RouteInformation::Failed);
    }

    #[rstest]
    fn failed_route_with_every_place_resolved_is_failed(abc: WaypointList) {
        let mut cache = FetchCache::new();
        for text in ["A", "B", "C"] {
            resolved_place(&mut cache, text);
        }
        resolved_route(&mut cache, "A", "B", 1.0, 1.0);
        failed_route(&mut cache, "B", "C");

        assert_eq!(route_information(abc.as_slice(), &cache), RouteInformation::Failed);
    }

    #[rstest]
    #[case(&[])]
    #[case(&["A"])]
    fn fewer_than_two_waypoints_is_empty(#[case] texts: &[&str]) {
        let list = WaypointList::from_addresses(texts.iter().copied().map(addr));
        let mut cache = FetchCache::new();
        failed_place(&mut cache, "A");
        assert_eq!(route_information(list.as_slice(), &cache), RouteInformation::Empty);
    }

    #[rstest]
    fn progress_counts_settled_entries(abc: WaypointList) {
        let mut cache = FetchCache::new();
        resolved_place(&mut cache, "A");
        resolved_place(&mut cache, "B");
        cache.begin_place(&addr("C"));
        resolved_route(&mut cache, "A", "B", 1.0, 1.0);

        let RouteInformation::Fetching { progress } = route_information(abc.as_slice(), &cache)
        else {
            panic!("expected fetching");
        };
        assert!((progress - 3.0 / 5.0).abs() < f64::EPSILON);
    }

    #[rstest]
    fn stale_entries_for_other_pairs_are_ignored(abc: WaypointList) {
        let mut cache = FetchCache::new();
        for text in ["A", "B", "C"] {
            resolved_place(&mut cache, text);
        }
        resolved_route(&mut cache, "A", "B", 1.0, 1.0);
        resolved_route(&mut cache, "B", "C", 1.0, 1.0);
        failed_route(&mut cache, "C", "A");

        assert!(matches!(
            route_information(abc.as_slice(), &cache),
            RouteInformation::Fetched { .. }
        ));
    }

    #[rstest]
    fn place_failure_takes_precedence_for_a_waypoint(abc: WaypointList) {
        let mut cache = FetchCache::new();
        failed_place(&mut cache, "B");
        failed_route(&mut cache, "A", "B");
        assert_eq!(
            waypoint_status(abc.as_slice(), 1, &cache),
            Some(WaypointStatus::Failed(WaypointFailure::PlaceNotFound))
        );
    }

    #[rstest]
    #[case(true, true, WaypointFailure::RouteToAndFromFailed)]
    #[case(true, false, WaypointFailure::RouteFromPreviousFailed)]
    #[case(false, true, WaypointFailure::RouteToNextFailed)]
    fn route_failures_name_the_direction(
        abc: WaypointList,
        #[case] incoming: bool,
        #[case] outgoing: bool,
        #[case] expected: WaypointFailure,
    ) {
        let mut cache = FetchCache::new();
        resolved_place(&mut cache, "B");
        if incoming {
            failed_route(&mut cache, "A", "B");
        } else {
            resolved_route(&mut cache, "A", "B", 1.0, 1.0);
        }
        if outgoing {
            failed_route(&mut cache, "B", "C");
        } else {
            resolved_route(&mut cache, "B", "C", 1.0, 1.0);
        }
        assert_eq!(
            waypoint_status(abc.as_slice(), 1, &cache),
            Some(WaypointStatus::Failed(expected))
        );
    }

    #[rstest]
    fn endpoint_waypoints_only_consider_existing_neighbours(abc: WaypointList) {
        let mut cache = FetchCache::new();
        resolved_place(&mut cache, "A");
        resolved_route(&mut cache, "A", "B", 1.0, 1.0);
        assert_eq!(waypoint_status(abc.as_slice(), 0, &cache), Some(WaypointStatus::Fetched));
        assert_eq!(waypoint_status(abc.as_slice(), 2, &cache), Some(WaypointStatus::Pending));
        cache.begin_place(&addr("C"));
        assert_eq!(waypoint_status(abc.as_slice(), 2, &cache), Some(WaypointStatus::Fetching));
        assert_eq!(waypoint_status(abc.as_slice(), 3, &cache), None);
    }
}
