//! Condition-wait registry for work that needs settled places.
//!
//! A waiter names the place keys it depends on and what to resume once all of
//! them are settled. The engine drains the registry after every cache write;
//! each waiter fires at most once.

use super::{Address, FetchCache, RouteKey, WorkflowId};

/// Work resumed when a waiter's places are settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaiterTarget {
    /// Release the route issuance `issuance` for `key`.
    Route {
        /// Route waiting for its endpoints.
        key: RouteKey,
        /// Issuance that registered the waiter.
        issuance: u64,
    },
    /// Continue the optimization workflow `workflow`.
    Cohort {
        /// Workflow waiting for its cohort.
        workflow: WorkflowId,
    },
}

#[derive(Debug, Clone)]
struct Waiter {
    keys: Vec<Address>,
    target: WaiterTarget,
}

/// Registry of pending waiters.
#[derive(Debug, Default)]
pub struct DependencyWaiters {
    waiters: Vec<Waiter>,
}

impl DependencyWaiters {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` to fire once every key in `keys` is settled.
    pub fn register(&mut self, keys: Vec<Address>, target: WaiterTarget) {
        self.waiters.push(Waiter { keys, target });
    }

    /// Drop any waiter releasing a route for `key`.
    pub fn remove_route(&mut self, key: &RouteKey) {
        self.waiters.retain(
            |waiter| !matches!(&waiter.target, WaiterTarget::Route { key: waiting, .. } if waiting == key),
        );
    }

    /// Drop any waiter continuing `workflow`.
    pub fn remove_cohort(&mut self, workflow: WorkflowId) {
        self.waiters.retain(|waiter| {
            !matches!(waiter.target, WaiterTarget::Cohort { workflow: waiting } if waiting == workflow)
        });
    }

    /// Remove and return, in registration order, every waiter whose keys are
    /// all settled in `cache`.
    pub fn take_settled(&mut self, cache: &FetchCache) -> Vec<WaiterTarget> {
        let (ready, pending): (Vec<_>, Vec<_>) = self
            .waiters
            .drain(..)
            .partition(|waiter| all_settled(&waiter.keys, cache));
        self.waiters = pending;
        ready.into_iter().map(|waiter| waiter.target).collect()
    }

    /// Number of pending waiters.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether no waiter is pending.
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

/// Whether every address in `keys` has a settled place entry.
pub fn all_settled(keys: &[Address], cache: &FetchCache) -> bool {
    keys.iter().all(|key| cache.place_is_settled(key))
}

#[cfg(test)]
mod tests {
    //! Firing and removal rules of the waiter registry.
    use super::*;
    use crate::domain::{Coordinate, FetchResult, Place, ResolutionError};
    use rstest::rstest;

    fn addr(text: &str) -> Address {
        Address::new(text).expect("valid address")
    }

    fn settle(cache: &mut FetchCache, text: &str) {
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

    fn route_target(issuance: u64) -> WaiterTarget {
        WaiterTarget::Route {
            key: RouteKey::new(addr("A"), addr("B")),
            issuance,
        }
    }

    #[rstest]
    fn waiter_fires_once_when_every_key_settles() {
        let mut cache = FetchCache::new();
        let mut waiters = DependencyWaiters::new();
        waiters.register(vec![addr("A"), addr("B")], route_target(1));

        settle(&mut cache, "A");
        assert!(waiters.take_settled(&cache).is_empty());

        cache.put_place(
            addr("B"),
            FetchResult::Failed {
                error: ResolutionError::lookup_failed("B", "not found"),
            },
        );
        assert_eq!(waiters.take_settled(&cache), vec![route_target(1)]);
        assert!(waiters.take_settled(&cache).is_empty());
        assert!(waiters.is_empty());
    }

    #[rstest]
    fn superseded_route_waiter_is_removed() {
        let mut waiters = DependencyWaiters::new();
        waiters.register(vec![addr("A"), addr("B")], route_target(1));
        waiters.register(vec![addr("A")], WaiterTarget::Cohort {
            workflow: WorkflowId::new(3),
        });

        waiters.remove_route(&RouteKey::new(addr("A"), addr("B")));
        assert_eq!(waiters.len(), 1);

        waiters.remove_cohort(WorkflowId::new(3));
        assert!(waiters.is_empty());
    }

    #[rstest]
    fn empty_key_set_is_immediately_settled() {
        assert!(all_settled(&[], &FetchCache::new()));
    }
}
