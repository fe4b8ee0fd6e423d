//! Shared harness for engine scenario tests.
//!
//! Integration tests compile as separate crates under `engine/tests/`. The
//! harness wires an engine to controlled services so each scenario decides
//! when, and with what, every external call completes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use quickroute_engine::domain::ports::{
    GeocodingError, ImportServiceError, OptimizationServiceError, RoutingError,
};
use quickroute_engine::domain::{
    Address, Coordinate, DriverId, EngineHandle, EngineStatus, Objective, Place,
    ResolutionEngine, ResolutionEnginePorts, Route,
};
use quickroute_engine::test_support::services::{
    CallQueue, ControlledGeocoder, ControlledImporter, ControlledOptimizer, ControlledRouter,
    PendingCall,
};
use quickroute_engine::test_support::{FixedClock, place};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub type GeocoderCall = PendingCall<Address, Result<Place, GeocodingError>>;
pub type RouterCall = PendingCall<(Coordinate, Coordinate), Result<Route, RoutingError>>;
pub type OptimizerCall =
    PendingCall<(Vec<Coordinate>, Objective), Result<Vec<usize>, OptimizationServiceError>>;
pub type ImporterCall = PendingCall<DriverId, Result<Vec<String>, ImportServiceError>>;

/// Running engine plus the queues its service calls arrive on.
pub struct Harness {
    pub handle: EngineHandle,
    pub geocoder: CallQueue<Address, Result<Place, GeocodingError>>,
    pub router: CallQueue<(Coordinate, Coordinate), Result<Route, RoutingError>>,
    pub optimizer:
        CallQueue<(Vec<Coordinate>, Objective), Result<Vec<usize>, OptimizationServiceError>>,
    pub importer: CallQueue<DriverId, Result<Vec<String>, ImportServiceError>>,
}

impl Harness {
    /// Spawn an engine with every port controlled by the test.
    pub fn start() -> Self {
        let (geocoder, geocoder_calls) = ControlledGeocoder::new();
        let (router, router_calls) = ControlledRouter::new();
        let (optimizer, optimizer_calls) = ControlledOptimizer::new();
        let (importer, importer_calls) = ControlledImporter::new();
        let ports = ResolutionEnginePorts::new(
            Arc::new(geocoder),
            Arc::new(router),
            Arc::new(optimizer),
            Arc::new(importer),
        );
        let handle = ResolutionEngine::new(ports, Arc::new(FixedClock::reference())).spawn();
        Self {
            handle,
            geocoder: geocoder_calls,
            router: router_calls,
            optimizer: optimizer_calls,
            importer: importer_calls,
        }
    }

    pub async fn next_lookup(&mut self) -> GeocoderCall {
        within(self.geocoder.recv()).await.expect("geocoder is alive")
    }

    pub async fn next_route(&mut self) -> RouterCall {
        within(self.router.recv()).await.expect("router is alive")
    }

    pub async fn next_optimization(&mut self) -> OptimizerCall {
        within(self.optimizer.recv()).await.expect("optimizer is alive")
    }

    pub async fn next_import(&mut self) -> ImporterCall {
        within(self.importer.recv()).await.expect("importer is alive")
    }

    /// Answer the next `count` lookups from `table`; other addresses are not
    /// found.
    pub async fn answer_lookups(&mut self, count: usize, table: &[(&str, Coordinate)]) {
        for _ in 0..count {
            let call = self.next_lookup().await;
            let requested = call.request().clone();
            let response = table
                .iter()
                .find(|(text, _)| *text == requested.as_str())
                .map(|(text, coordinate)| place(text, *coordinate))
                .ok_or_else(|| GeocodingError::not_found(requested.as_str()));
            assert!(call.respond(response), "lookup for {requested} was abandoned");
        }
    }

    /// Wait until the published status satisfies `predicate`.
    pub async fn wait_for_status(
        &self,
        mut predicate: impl FnMut(&EngineStatus) -> bool,
    ) -> EngineStatus {
        let mut status = self.handle.subscribe();
        within(status.wait_for(|current| predicate(current)))
            .await
            .expect("engine is running")
            .clone()
    }

    pub async fn settled(&self) -> EngineStatus {
        within(self.handle.wait_until_settled())
            .await
            .expect("engine is running")
    }

    /// Whether no routing call has been made so far.
    pub fn router_is_idle(&mut self) -> bool {
        self.router.try_recv().is_err()
    }
}

/// Await `future`, failing the test if it does not finish promptly.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(STEP_TIMEOUT, future)
        .await
        .expect("step finished before timeout")
}
