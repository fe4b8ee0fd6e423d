//! Keyed store of place and route fetch results.
//!
//! The cache is the single source of truth for resolution state. It is owned
//! by the engine actor, so it needs no internal locking: every read and write
//! happens on the actor task in message order. Entries are never removed on
//! waypoint edits; unreferenced entries are simply ignored by the selectors.

use std::collections::HashMap;
use std::hash::Hash;

use super::{Address, FetchResult, FetchToken, Place, ResolutionError, Route, RouteKey};

/// Place and route fetch results keyed by address and ordered address pair.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    places: HashMap<Address, FetchResult<Place>>,
    // origin -> destination -> result; nested so lookups borrow both keys.
    routes: HashMap<Address, HashMap<Address, FetchResult<Route>>>,
    next_issuance: u64,
    revision: u64,
}

impl FetchCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached state for `address`.
    pub fn place(&self, address: &Address) -> Option<&FetchResult<Place>> {
        self.places.get(address)
    }

    /// Cached state for the route from `origin` to `destination`.
    pub fn route(&self, origin: &Address, destination: &Address) -> Option<&FetchResult<Route>> {
        self.routes
            .get(origin)
            .and_then(|destinations| destinations.get(destination))
    }

    /// Cached state for `key`.
    pub fn route_for(&self, key: &RouteKey) -> Option<&FetchResult<Route>> {
        self.route(&key.origin, &key.destination)
    }

    /// Whether `address` has a `Success` or `Failed` entry.
    pub fn place_is_settled(&self, address: &Address) -> bool {
        self.place(address).is_some_and(FetchResult::is_settled)
    }

    /// Overwrite the entry for `address`. A displaced in-flight fetch is
    /// cancelled.
    pub fn put_place(&mut self, address: Address, result: FetchResult<Place>) {
        cancel_displaced(self.places.insert(address, result));
        self.bump();
    }

    /// Overwrite the entry for `key`. A displaced in-flight fetch is
    /// cancelled.
    pub fn put_route(&mut self, key: RouteKey, result: FetchResult<Route>) {
        let RouteKey {
            origin,
            destination,
        } = key;
        cancel_displaced(
            self.routes
                .entry(origin)
                .or_default()
                .insert(destination, result),
        );
        self.bump();
    }

    /// Every place entry, in no particular order.
    pub fn places(&self) -> impl Iterator<Item = (&Address, &FetchResult<Place>)> {
        self.places.iter()
    }

    /// Every route entry as `(origin, destination, result)`, in no particular
    /// order.
    pub fn routes(&self) -> impl Iterator<Item = (&Address, &Address, &FetchResult<Route>)> {
        self.routes.iter().flat_map(|(origin, destinations)| {
            destinations
                .iter()
                .map(move |(destination, result)| (origin, destination, result))
        })
    }

    /// Counter bumped on every write.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Install a fresh `InProgress` entry for `address`, cancelling any
    /// previous in-flight issuance first.
    pub(crate) fn begin_place(&mut self, address: &Address) -> FetchToken {
        let token = self.next_token();
        begin_in(&mut self.places, address, token.clone());
        self.bump();
        token
    }

    /// Install a fresh `InProgress` entry for `key`, cancelling any previous
    /// in-flight issuance first.
    pub(crate) fn begin_route(&mut self, key: &RouteKey) -> FetchToken {
        let token = self.next_token();
        let destinations = self.routes.entry(key.origin.clone()).or_default();
        begin_in(destinations, &key.destination, token.clone());
        self.bump();
        token
    }

    /// Record the outcome of place issuance `issuance`.
    ///
    /// Returns `false` and leaves the cache untouched when the entry no longer
    /// belongs to that issuance.
    pub(crate) fn complete_place(
        &mut self,
        address: &Address,
        issuance: u64,
        result: Result<Place, ResolutionError>,
    ) -> bool {
        let written = complete_in(&mut self.places, address, issuance, result);
        if written {
            self.bump();
        }
        written
    }

    /// Record the outcome of route issuance `issuance`.
    ///
    /// Returns `false` and leaves the cache untouched when the entry no longer
    /// belongs to that issuance.
    pub(crate) fn complete_route(
        &mut self,
        key: &RouteKey,
        issuance: u64,
        result: Result<Route, ResolutionError>,
    ) -> bool {
        let written = self.routes.get_mut(&key.origin).is_some_and(|destinations| {
            complete_in(destinations, &key.destination, issuance, result)
        });
        if written {
            self.bump();
        }
        written
    }

    /// Token of route issuance `issuance`, while it still owns the entry for
    /// `key`.
    pub(crate) fn current_route_token(
        &self,
        key: &RouteKey,
        issuance: u64,
    ) -> Option<&FetchToken> {
        self.route_for(key)
            .and_then(FetchResult::token)
            .filter(|token| token.issuance() == issuance)
    }

    /// Cancel every in-flight fetch. Entries stay `InProgress`.
    pub(crate) fn cancel_in_flight(&self) {
        self.places
            .values()
            .filter_map(FetchResult::token)
            .for_each(FetchToken::cancel);
        self.routes
            .values()
            .flat_map(HashMap::values)
            .filter_map(FetchResult::token)
            .for_each(FetchToken::cancel);
    }

    fn next_token(&mut self) -> FetchToken {
        self.next_issuance = self.next_issuance.saturating_add(1);
        FetchToken::new(self.next_issuance)
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

fn cancel_displaced<T>(previous: Option<FetchResult<T>>) {
    if let Some(token) = previous.as_ref().and_then(FetchResult::token) {
        token.cancel();
    }
}

fn begin_in<K, T>(map: &mut HashMap<K, FetchResult<T>>, key: &K, token: FetchToken)
where
    K: Eq + Hash + Clone,
{
    if let Some(previous) = map.get(key).and_then(FetchResult::token) {
        previous.cancel();
    }
    map.insert(key.clone(), FetchResult::InProgress { token });
}

fn complete_in<K, T>(
    map: &mut HashMap<K, FetchResult<T>>,
    key: &K,
    issuance: u64,
    result: Result<T, ResolutionError>,
) -> bool
where
    K: Eq + Hash,
{
    match map.get_mut(key) {
        Some(entry) if entry.token().is_some_and(|token| token.issuance() == issuance) => {
            *entry = result.into();
            true
        }
        _ => false,
    }
}
