//! Issues place and route fetches through the ports.
//!
//! Every issuance installs a fresh `InProgress` entry (cancelling the one it
//! replaces) and spawns the port call on the runtime. The spawned task races
//! the call against the issuance's cancellation token; a cancelled task
//! posts nothing. Completions travel back to the engine, which writes them
//! only when the entry still belongs to the same issuance.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::orchestrator::{needs_fetch, retain_missing};
use super::ports::{GeocodingService, RoutingService};
use super::{
    Address, DependencyWaiters, FetchCache, FetchRequest, FetchResult, Place, ResolutionError,
    Route, RouteKey, WaiterTarget, WorkflowId,
};

/// Result posted back to the engine by a spawned task.
#[derive(Debug)]
pub(crate) enum Completion {
    Place {
        address: Address,
        issuance: u64,
        result: Result<Place, ResolutionError>,
    },
    Route {
        key: RouteKey,
        issuance: u64,
        result: Result<Route, ResolutionError>,
    },
    Optimization {
        workflow: WorkflowId,
        result: Result<Vec<usize>, ResolutionError>,
    },
    Import {
        workflow: WorkflowId,
        result: Result<Vec<String>, ResolutionError>,
    },
}

/// Spawn `work`, dropping it as soon as `cancellation` fires.
pub(crate) fn spawn_until_cancelled<F>(cancellation: CancellationToken, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            () = cancellation.cancelled() => {}
            () = work => {}
        }
    });
}

/// Post `completion`, logging when the engine is gone.
pub(crate) fn post(completions: &UnboundedSender<Completion>, completion: Completion) {
    if completions.send(completion).is_err() {
        debug!("engine stopped before completion was delivered");
    }
}

pub(crate) struct RequestExecutor {
    geocoder: Arc<dyn GeocodingService>,
    router: Arc<dyn RoutingService>,
    completions: UnboundedSender<Completion>,
}

impl RequestExecutor {
    pub(crate) fn new(
        geocoder: Arc<dyn GeocodingService>,
        router: Arc<dyn RoutingService>,
        completions: UnboundedSender<Completion>,
    ) -> Self {
        Self {
            geocoder,
            router,
            completions,
        }
    }

    /// Issue every request the cache does not already satisfy.
    ///
    /// Requests are re-checked at issuance: a route issues its endpoint
    /// places, so a later place request for the same address is skipped.
    pub(crate) fn dispatch(
        &self,
        requests: Vec<FetchRequest>,
        cache: &mut FetchCache,
        waiters: &mut DependencyWaiters,
    ) {
        for request in retain_missing(requests, cache) {
            if !needs_fetch(&request, cache) {
                continue;
            }
            match request {
                FetchRequest::Place(address) => self.issue_place(address, cache),
                FetchRequest::Route(key) => self.issue_route(key, cache, waiters),
            }
        }
    }

    fn issue_place(&self, address: Address, cache: &mut FetchCache) {
        let token = cache.begin_place(&address);
        let issuance = token.issuance();
        debug!(address = %address, issuance, "issuing place lookup");

        let geocoder = Arc::clone(&self.geocoder);
        let completions = self.completions.clone();
        spawn_until_cancelled(token.cancellation(), async move {
            let result = geocoder
                .lookup(&address)
                .await
                .map_err(|err| ResolutionError::lookup_failed(address.as_str(), err.to_string()));
            post(
                &completions,
                Completion::Place {
                    address,
                    issuance,
                    result,
                },
            );
        });
    }

    fn issue_route(&self, key: RouteKey, cache: &mut FetchCache, waiters: &mut DependencyWaiters) {
        for endpoint in [&key.origin, &key.destination] {
            let place = FetchRequest::Place(endpoint.clone());
            if needs_fetch(&place, cache) {
                self.issue_place(endpoint.clone(), cache);
            }
        }

        let token = cache.begin_route(&key);
        let issuance = token.issuance();
        waiters.remove_route(&key);
        debug!(route = %key, issuance, "issuing route fetch");

        if cache.place_is_settled(&key.origin) && cache.place_is_settled(&key.destination) {
            self.release_route(&key, issuance, cache);
        } else {
            waiters.register(
                vec![key.origin.clone(), key.destination.clone()],
                WaiterTarget::Route { key, issuance },
            );
        }
    }

    /// Continue route issuance `issuance` once both endpoints are settled.
    ///
    /// A failed endpoint fails the route without calling the router.
    pub(crate) fn release_route(&self, key: &RouteKey, issuance: u64, cache: &mut FetchCache) {
        let Some(token) = cache.current_route_token(key, issuance).cloned() else {
            debug!(route = %key, issuance, "dropping release of superseded route issuance");
            return;
        };

        let origin = cache.place(&key.origin);
        let destination = cache.place(&key.destination);
        let endpoints = match (origin, destination) {
            (Some(FetchResult::Success { value: from }), Some(FetchResult::Success { value: to })) => {
                Ok((from.coordinate, to.coordinate))
            }
            (Some(FetchResult::Failed { error }), _) | (_, Some(FetchResult::Failed { error })) => {
                Err(ResolutionError::route_failed(
                    key.origin.as_str(),
                    key.destination.as_str(),
                    format!("dependent place failed: {error}"),
                ))
            }
            _ => {
                debug!(route = %key, issuance, "route released before endpoints settled");
                return;
            }
        };

        match endpoints {
            Ok((from, to)) => {
                debug!(route = %key, issuance, "requesting route from router");
                let router = Arc::clone(&self.router);
                let completions = self.completions.clone();
                let key = key.clone();
                spawn_until_cancelled(token.cancellation(), async move {
                    let result = router.route(from, to).await.map_err(|err| {
                        ResolutionError::route_failed(
                            key.origin.as_str(),
                            key.destination.as_str(),
                            err.to_string(),
                        )
                    });
                    post(
                        &completions,
                        Completion::Route {
                            key,
                            issuance,
                            result,
                        },
                    );
                });
            }
            Err(error) => {
                warn!(route = %key, %error, "route failed without routing call");
                cache.complete_route(key, issuance, Err(error));
            }
        }
    }

    /// Write a place completion. Returns whether the cache changed.
    pub(crate) fn complete_place(
        cache: &mut FetchCache,
        address: &Address,
        issuance: u64,
        result: Result<Place, ResolutionError>,
    ) -> bool {
        if let Err(error) = &result {
            warn!(address = %address, issuance, %error, "place lookup failed");
        }
        let written = cache.complete_place(address, issuance, result);
        if !written {
            debug!(address = %address, issuance, "discarding superseded place completion");
        }
        written
    }

    /// Write a route completion. Returns whether the cache changed.
    pub(crate) fn complete_route(
        cache: &mut FetchCache,
        key: &RouteKey,
        issuance: u64,
        result: Result<Route, ResolutionError>,
    ) -> bool {
        if let Err(error) = &result {
            warn!(route = %key, issuance, %error, "route fetch failed");
        }
        let written = cache.complete_route(key, issuance, result);
        if !written {
            debug!(route = %key, issuance, "discarding superseded route completion");
        }
        written
    }
}
