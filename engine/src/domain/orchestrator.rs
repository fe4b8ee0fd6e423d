//! Translation of list edits into the fetches they make necessary.
//!
//! Planning is pure: it looks at the list after the edit has been applied and
//! names the place and route keys that must be fresh. [`retain_missing`] then
//! drops every key the cache already resolves or is resolving.

use std::collections::HashSet;

use super::{Address, FetchCache, FetchResult, RouteKey, WaypointEdit, WaypointList};

/// One fetch the engine should issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchRequest {
    /// Geocode an address.
    Place(Address),
    /// Route between two addresses.
    Route(RouteKey),
}

/// Requests made necessary by `edit`, given the list `after` it was applied.
pub fn plan_edit(edit: &WaypointEdit, after: &WaypointList) -> Vec<FetchRequest> {
    let addresses = after.addresses();
    match edit {
        WaypointEdit::Add { address } => {
            let mut requests = vec![FetchRequest::Place(address.clone())];
            if let [.., previous, _] = addresses.as_slice() {
                requests.push(route(previous, address));
            }
            requests
        }
        WaypointEdit::Delete { index } => {
            // The deleted waypoint had both neighbours when its successor
            // shifted into `index`.
            index
                .checked_sub(1)
                .and_then(|previous| addresses.get(previous))
                .zip(addresses.get(*index))
                .map(|(previous, next)| vec![route(previous, next)])
                .unwrap_or_default()
        }
        WaypointEdit::Move { .. } | WaypointEdit::MoveSelected { .. } | WaypointEdit::Reverse => {
            adjacent_routes(&addresses).collect()
        }
        WaypointEdit::SetAddress { index, address } => {
            let mut requests = vec![FetchRequest::Place(address.clone())];
            if let Some(previous) = index.checked_sub(1).and_then(|i| addresses.get(i)) {
                requests.push(route(previous, address));
            }
            if let Some(next) = addresses.get(index + 1) {
                requests.push(route(address, next));
            }
            requests
        }
        WaypointEdit::Replace { .. } => plan_fetch_all(after),
        WaypointEdit::Select { .. }
        | WaypointEdit::ToggleSelection { .. }
        | WaypointEdit::SelectRange { .. } => Vec::new(),
    }
}

/// Every place and every adjacent route of `list`.
pub fn plan_fetch_all(list: &WaypointList) -> Vec<FetchRequest> {
    let addresses = list.addresses();
    addresses
        .iter()
        .cloned()
        .map(FetchRequest::Place)
        .chain(adjacent_routes(&addresses))
        .collect()
}

/// Drop duplicates and every request whose key is already `Success` or
/// `InProgress`. Absent and `Failed` keys are kept. Order is preserved.
pub fn retain_missing(requests: Vec<FetchRequest>, cache: &FetchCache) -> Vec<FetchRequest> {
    let mut seen = HashSet::new();
    requests
        .into_iter()
        .filter(|request| needs_fetch(request, cache))
        .filter(|request| seen.insert(request.clone()))
        .collect()
}

/// Whether the cache neither holds nor is producing a value for `request`.
pub fn needs_fetch(request: &FetchRequest, cache: &FetchCache) -> bool {
    let current = match request {
        FetchRequest::Place(address) => cache.place(address).is_some_and(FetchResult::is_current),
        FetchRequest::Route(key) => cache.route_for(key).is_some_and(FetchResult::is_current),
    };
    !current
}

fn route(origin: &Address, destination: &Address) -> FetchRequest {
    FetchRequest::Route(RouteKey::new(origin.clone(), destination.clone()))
}

fn adjacent_routes(addresses: &[Address]) -> impl Iterator<Item = FetchRequest> + '_ {
    addresses
        .iter()
        .zip(addresses.iter().skip(1))
        .map(|(origin, destination)| route(origin, destination))
}

#[cfg(test)]
mod tests {
    //! Edit planning and the redundancy filter.
    use super::*;
    use crate::domain::{Coordinate, Place};
    use rstest::{fixture, rstest};

    fn addr(text: &str) -> Address {
        Address::new(text).expect("valid address")
    }

    fn place(text: &str) -> FetchRequest {
        FetchRequest::Place(addr(text))
    }

    fn pair(origin: &str, destination: &str) -> FetchRequest {
        FetchRequest::Route(RouteKey::new(addr(origin), addr(destination)))
    }

    fn list(texts: &[&str]) -> WaypointList {
        WaypointList::from_addresses(texts.iter().copied().map(addr))
    }

    fn apply(mut list: WaypointList, edit: &WaypointEdit) -> Vec<FetchRequest> {
        list.apply(edit).expect("edit applies");
        plan_edit(edit, &list)
    }

    #[fixture]
    fn abc() -> WaypointList {
        list(&["A", "B", "C"])
    }

    #[rstest]
    fn deleting_a_middle_waypoint_requests_only_the_bridging_route(abc: WaypointList) {
        let requests = apply(abc, &WaypointEdit::Delete { index: 1 });
        assert_eq!(requests, vec![pair("A", "C")]);
    }

    #[rstest]
    #[case(0)]
    #[case(2)]
    fn deleting_an_endpoint_requests_nothing(abc: WaypointList, #[case] index: usize) {
        assert!(apply(abc, &WaypointEdit::Delete { index }).is_empty());
    }

    #[rstest]
    fn adding_requests_place_and_route_from_previous_last(abc: WaypointList) {
        let requests = apply(abc, &WaypointEdit::Add { address: addr("D") });
        assert_eq!(requests, vec![place("D"), pair("C", "D")]);
    }

    #[rstest]
    fn adding_to_an_empty_list_requests_only_the_place() {
        let requests = apply(WaypointList::new(), &WaypointEdit::Add { address: addr("A") });
        assert_eq!(requests, vec![place("A")]);
    }

    #[rstest]
    fn reversing_requests_every_reversed_pair(abc: WaypointList) {
        let requests = apply(abc, &WaypointEdit::Reverse);
        assert_eq!(requests, vec![pair("C", "B"), pair("B", "A")]);
    }

    #[rstest]
    #[case(0, vec![place("Z"), pair("Z", "B")])]
    #[case(1, vec![place("Z"), pair("A", "Z"), pair("Z", "C")])]
    #[case(2, vec![place("Z"), pair("B", "Z")])]
    fn setting_an_address_requests_its_neighbour_routes(
        abc: WaypointList,
        #[case] index: usize,
        #[case] expected: Vec<FetchRequest>,
    ) {
        let edit = WaypointEdit::SetAddress {
            index,
            address: addr("Z"),
        };
        assert_eq!(apply(abc, &edit), expected);
    }

    #[rstest]
    fn replacing_requests_every_place_and_pair(abc: WaypointList) {
        let edit = WaypointEdit::Replace {
            addresses: vec![addr("C"), addr("A")],
        };
        assert_eq!(apply(abc, &edit), vec![place("C"), place("A"), pair("C", "A")]);
    }

    #[rstest]
    #[case(WaypointEdit::Select { index: 0 })]
    #[case(WaypointEdit::ToggleSelection { index: 1 })]
    #[case(WaypointEdit::SelectRange { index: 2 })]
    fn selection_requests_nothing(abc: WaypointList, #[case] edit: WaypointEdit) {
        assert!(apply(abc, &edit).is_empty());
    }

    #[rstest]
    fn filter_skips_success_and_in_progress_but_keeps_failed() {
        let mut cache = FetchCache::new();
        cache.put_place(
            addr("A"),
            FetchResult::Success {
                value: Place {
                    address: "A".to_owned(),
                    coordinate: Coordinate::new(0.0, 0.0),
                },
            },
        );
        cache.begin_place(&addr("B"));
        cache.put_place(
            addr("C"),
            FetchResult::Failed {
                error: crate::domain::ResolutionError::lookup_failed("C", "not found"),
            },
        );

        let requests = vec![place("A"), place("B"), place("C"), place("D"), place("D")];
        assert_eq!(retain_missing(requests, &cache), vec![place("C"), place("D")]);
    }
}
