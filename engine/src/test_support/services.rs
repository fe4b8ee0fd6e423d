//! Scripted port doubles.
//!
//! Controlled services hand every call to the test as a [`PendingCall`] and
//! block until the test responds, which lets tests order completions and
//! observe cancellation. Static services answer immediately from a table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::domain::ports::{
    GeocodingError, GeocodingService, ImportService, ImportServiceError, OptimizationService,
    OptimizationServiceError, RoutingError, RoutingService,
};
use crate::domain::{Address, Coordinate, DriverId, Objective, Place, Route};

/// One call waiting for the test to answer.
#[derive(Debug)]
pub struct PendingCall<Req, Resp> {
    request: Req,
    responder: oneshot::Sender<Resp>,
}

impl<Req, Resp> PendingCall<Req, Resp> {
    /// Arguments of the call.
    pub fn request(&self) -> &Req {
        &self.request
    }

    /// Answer the call. Returns `false` when the caller already gave up.
    pub fn respond(self, response: Resp) -> bool {
        self.responder.send(response).is_ok()
    }

    /// Whether the caller dropped the call's future.
    pub fn is_abandoned(&self) -> bool {
        self.responder.is_closed()
    }

    /// Wait until the caller drops the call's future.
    pub async fn abandoned(&mut self) {
        self.responder.closed().await;
    }
}

/// Receiving side of a controlled service.
pub type CallQueue<Req, Resp> = mpsc::UnboundedReceiver<PendingCall<Req, Resp>>;

async fn forward<Req, Resp>(
    calls: &mpsc::UnboundedSender<PendingCall<Req, Resp>>,
    request: Req,
    on_drop: impl FnOnce() -> Resp,
) -> Resp {
    let (responder, response) = oneshot::channel();
    if calls.send(PendingCall { request, responder }).is_err() {
        return on_drop();
    }
    match response.await {
        Ok(response) => response,
        Err(_) => on_drop(),
    }
}

/// Geocoder answered by the test.
#[derive(Debug, Clone)]
pub struct ControlledGeocoder {
    calls: mpsc::UnboundedSender<PendingCall<Address, Result<Place, GeocodingError>>>,
}

impl ControlledGeocoder {
    /// Create the service and the queue its calls arrive on.
    pub fn new() -> (Self, CallQueue<Address, Result<Place, GeocodingError>>) {
        let (calls, queue) = mpsc::unbounded_channel();
        (Self { calls }, queue)
    }
}

#[async_trait]
impl GeocodingService for ControlledGeocoder {
    async fn lookup(&self, address: &Address) -> Result<Place, GeocodingError> {
        forward(&self.calls, address.clone(), || {
            Err(GeocodingError::transport("test harness dropped the call"))
        })
        .await
    }
}

/// Router answered by the test.
#[derive(Debug, Clone)]
pub struct ControlledRouter {
    calls: mpsc::UnboundedSender<PendingCall<(Coordinate, Coordinate), Result<Route, RoutingError>>>,
}

impl ControlledRouter {
    /// Create the service and the queue its calls arrive on.
    pub fn new() -> (
        Self,
        CallQueue<(Coordinate, Coordinate), Result<Route, RoutingError>>,
    ) {
        let (calls, queue) = mpsc::unbounded_channel();
        (Self { calls }, queue)
    }
}

#[async_trait]
impl RoutingService for ControlledRouter {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RoutingError> {
        forward(&self.calls, (origin, destination), || {
            Err(RoutingError::transport("test harness dropped the call"))
        })
        .await
    }
}

/// Optimizer answered by the test.
#[derive(Debug, Clone)]
pub struct ControlledOptimizer {
    calls: mpsc::UnboundedSender<
        PendingCall<(Vec<Coordinate>, Objective), Result<Vec<usize>, OptimizationServiceError>>,
    >,
}

impl ControlledOptimizer {
    /// Create the service and the queue its calls arrive on.
    pub fn new() -> (
        Self,
        CallQueue<(Vec<Coordinate>, Objective), Result<Vec<usize>, OptimizationServiceError>>,
    ) {
        let (calls, queue) = mpsc::unbounded_channel();
        (Self { calls }, queue)
    }
}

#[async_trait]
impl OptimizationService for ControlledOptimizer {
    async fn optimize(
        &self,
        coordinates: &[Coordinate],
        objective: Objective,
    ) -> Result<Vec<usize>, OptimizationServiceError> {
        forward(&self.calls, (coordinates.to_vec(), objective), || {
            Err(OptimizationServiceError::transport(
                "test harness dropped the call",
            ))
        })
        .await
    }
}

/// Import service answered by the test.
#[derive(Debug, Clone)]
pub struct ControlledImporter {
    calls: mpsc::UnboundedSender<PendingCall<DriverId, Result<Vec<String>, ImportServiceError>>>,
}

impl ControlledImporter {
    /// Create the service and the queue its calls arrive on.
    pub fn new() -> (
        Self,
        CallQueue<DriverId, Result<Vec<String>, ImportServiceError>>,
    ) {
        let (calls, queue) = mpsc::unbounded_channel();
        (Self { calls }, queue)
    }
}

#[async_trait]
impl ImportService for ControlledImporter {
    async fn fetch_waypoints(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<String>, ImportServiceError> {
        forward(&self.calls, driver_id.clone(), || {
            Err(ImportServiceError::transport("test harness dropped the call"))
        })
        .await
    }
}

/// Geocoder answering from a table; unknown addresses are not found.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    places: HashMap<Address, Coordinate>,
    calls: AtomicUsize,
}

impl StaticGeocoder {
    /// Resolve `address` to `coordinate`.
    #[must_use]
    pub fn with(mut self, address: Address, coordinate: Coordinate) -> Self {
        self.places.insert(address, coordinate);
        self
    }

    /// Number of lookups served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodingService for StaticGeocoder {
    async fn lookup(&self, address: &Address) -> Result<Place, GeocodingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.places
            .get(address)
            .map(|coordinate| Place {
                address: address.to_string(),
                coordinate: *coordinate,
            })
            .ok_or_else(|| GeocodingError::not_found(address.as_str()))
    }
}

/// Router answering from a table of legs; unknown legs have no route.
#[derive(Debug, Default)]
pub struct StaticRouter {
    legs: Vec<(Coordinate, Coordinate, Route)>,
    calls: AtomicUsize,
}

impl StaticRouter {
    /// Answer `origin -> destination` with `distance` meters and `time`
    /// seconds.
    #[must_use]
    pub fn with(mut self, origin: Coordinate, destination: Coordinate, distance: f64, time: f64) -> Self {
        self.legs.push((
            origin,
            destination,
            super::route(origin, destination, distance, time),
        ));
        self
    }

    /// Number of routing calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingService for StaticRouter {
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, RoutingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.legs
            .iter()
            .find(|(from, to, _)| *from == origin && *to == destination)
            .map(|(_, _, route)| route.clone())
            .ok_or_else(|| RoutingError::no_route("no leg configured"))
    }
}
