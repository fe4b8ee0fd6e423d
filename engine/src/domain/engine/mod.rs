//! Resolution engine actor.
//!
//! One task owns the waypoint list, the fetch cache, the dependency waiters
//! and the workflow registries. Domain events and queries arrive through a
//! bounded command inbox; spawned fetch and workflow tasks post their results
//! to a completion inbox. Both are handled strictly one message at a time, so
//! no state is shared across tasks. After every message the waiters are
//! drained and the status is republished on a watch channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::executor::{Completion, RequestExecutor, post, spawn_until_cancelled};
use super::import::ImportRuns;
use super::optimization::{OptimizationRuns, PendingOptimization};
use super::ports::{GeocodingService, ImportService, OptimizationService, RoutingService};
use super::workflow::WorkflowIds;
use super::{
    Address, DependencyWaiters, DomainEvent, DriverId, FetchCache, FetchRequest, ImportStatus,
    OptimizationRequest, OptimizationStatus, PersistedState, ResolutionError, RouteInformation,
    WaiterTarget, Waypoint, WaypointEdit, WaypointList, WaypointStatus, WorkflowId, build_cohort,
    cohort_coordinates, imported_addresses, plan_edit, plan_fetch_all, remap, route_information,
    trim_ordering, waypoint_status,
};

mod handle;

pub use handle::EngineHandle;

const COMMAND_CAPACITY: usize = 64;

/// Port bundle required by the resolution engine.
pub struct ResolutionEnginePorts {
    /// Address geocoder.
    pub geocoder: Arc<dyn GeocodingService>,
    /// Point-to-point router.
    pub router: Arc<dyn RoutingService>,
    /// Visiting-order optimizer.
    pub optimizer: Arc<dyn OptimizationService>,
    /// Driver waypoint importer.
    pub importer: Arc<dyn ImportService>,
}

impl ResolutionEnginePorts {
    /// Build a strongly-typed engine port bundle.
    pub fn new(
        geocoder: Arc<dyn GeocodingService>,
        router: Arc<dyn RoutingService>,
        optimizer: Arc<dyn OptimizationService>,
        importer: Arc<dyn ImportService>,
    ) -> Self {
        Self {
            geocoder,
            router,
            optimizer,
            importer,
        }
    }
}

/// Status published after every engine step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    /// Aggregate of the current waypoint list.
    pub route_information: RouteInformation,
    /// Latest optimization run, cleared on cancellation.
    pub optimization: Option<OptimizationStatus>,
    /// Latest import per driver.
    pub imports: BTreeMap<DriverId, ImportStatus>,
    /// Number of waypoints.
    pub waypoint_count: usize,
    /// Cache entries currently `InProgress`.
    pub fetches_in_flight: usize,
    /// Optimization and import runs still pending.
    pub workflows_in_flight: usize,
}

impl EngineStatus {
    /// Whether nothing is in flight.
    pub fn is_settled(&self) -> bool {
        self.fetches_in_flight == 0 && self.workflows_in_flight == 0
    }
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            route_information: RouteInformation::Empty,
            optimization: None,
            imports: BTreeMap::new(),
            waypoint_count: 0,
            fetches_in_flight: 0,
            workflows_in_flight: 0,
        }
    }
}

/// Point-in-time copy of the engine state.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    /// Waypoints in order.
    pub waypoints: Vec<Waypoint>,
    /// Copy of the fetch cache.
    pub cache: FetchCache,
    /// Status of each waypoint, in list order.
    pub waypoint_statuses: Vec<WaypointStatus>,
    /// Published status at the time of the snapshot.
    pub status: EngineStatus,
}

impl EngineSnapshot {
    /// Aggregate of the snapshot's waypoint list.
    pub fn route_information(&self) -> RouteInformation {
        self.status.route_information
    }

    /// Addresses in list order.
    pub fn addresses(&self) -> Vec<Address> {
        self.waypoints.iter().map(|w| w.address().clone()).collect()
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Event(DomainEvent),
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Persist(oneshot::Sender<PersistedState>),
    Shutdown,
}

/// Actor owning every piece of resolution state.
pub struct ResolutionEngine {
    waypoints: WaypointList,
    cache: FetchCache,
    waiters: DependencyWaiters,
    executor: RequestExecutor,
    optimizer: Arc<dyn OptimizationService>,
    importer: Arc<dyn ImportService>,
    clock: Arc<dyn Clock>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    workflow_ids: WorkflowIds,
    optimizations: OptimizationRuns,
    optimization_status: Option<OptimizationStatus>,
    imports: ImportRuns,
    status: watch::Sender<EngineStatus>,
}

impl ResolutionEngine {
    /// Build an engine with an empty waypoint list.
    pub fn new(ports: ResolutionEnginePorts, clock: Arc<dyn Clock>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(EngineStatus::default());
        Self {
            waypoints: WaypointList::new(),
            cache: FetchCache::new(),
            waiters: DependencyWaiters::new(),
            executor: RequestExecutor::new(ports.geocoder, ports.router, completions_tx.clone()),
            optimizer: ports.optimizer,
            importer: ports.importer,
            clock,
            completions_tx,
            completions_rx,
            workflow_ids: WorkflowIds::default(),
            optimizations: OptimizationRuns::default(),
            optimization_status: None,
            imports: ImportRuns::default(),
            status,
        }
    }

    /// Seed the engine with a previously persisted state.
    ///
    /// Missing and failed entries are requested when the engine starts.
    #[must_use]
    pub fn with_state(mut self, state: PersistedState) -> Self {
        let (waypoints, cache) = state.restore();
        self.waypoints = waypoints;
        self.cache = cache;
        self
    }

    /// Start the actor on the current tokio runtime.
    pub fn spawn(self) -> EngineHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = EngineHandle::new(commands_tx, self.status.subscribe());
        tokio::spawn(self.run(commands_rx));
        handle
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(waypoints = self.waypoints.len(), "resolution engine started");
        self.dispatch(plan_fetch_all(&self.waypoints));
        self.step();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = self.completions_rx.recv() => self.handle_completion(completion),
            }
            self.step();
        }

        self.stop();
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Event(event) => self.handle_event(event),
            Command::Snapshot(reply) => {
                // Drain first so the snapshot reflects every earlier event.
                self.step();
                if reply.send(self.snapshot()).is_err() {
                    debug!("snapshot requester went away");
                }
            }
            Command::Persist(reply) => {
                let state = PersistedState::capture(&self.waypoints, &self.cache, self.clock.utc());
                if reply.send(state).is_err() {
                    debug!("persisted state requester went away");
                }
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: DomainEvent) {
        match event {
            DomainEvent::Edit(edit) => self.apply_edit(&edit),
            DomainEvent::FetchAll => self.dispatch(plan_fetch_all(&self.waypoints)),
            DomainEvent::ImportWaypoints { driver_id } => self.start_import(driver_id),
            DomainEvent::CancelImport { driver_id } => self.cancel_import(&driver_id),
            DomainEvent::OptimizeRoute(request) => self.start_optimization(request),
            DomainEvent::CancelOptimization { start, end } => {
                self.cancel_optimization(start.as_ref(), end.as_ref());
            }
        }
    }

    fn apply_edit(&mut self, edit: &WaypointEdit) {
        if let Err(error) = self.waypoints.apply(edit) {
            warn!(?edit, %error, "rejected waypoint edit");
            return;
        }
        self.dispatch(plan_edit(edit, &self.waypoints));
    }

    fn dispatch(&mut self, requests: Vec<FetchRequest>) {
        self.executor
            .dispatch(requests, &mut self.cache, &mut self.waiters);
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Place {
                address,
                issuance,
                result,
            } => {
                RequestExecutor::complete_place(&mut self.cache, &address, issuance, result);
            }
            Completion::Route {
                key,
                issuance,
                result,
            } => {
                RequestExecutor::complete_route(&mut self.cache, &key, issuance, result);
            }
            Completion::Optimization { workflow, result } => {
                self.finish_optimization(workflow, result);
            }
            Completion::Import { workflow, result } => self.finish_import(workflow, result),
        }
    }

    /// Fire settled waiters and republish the status.
    fn step(&mut self) {
        loop {
            let ready = self.waiters.take_settled(&self.cache);
            if ready.is_empty() {
                break;
            }
            for target in ready {
                match target {
                    WaiterTarget::Route { key, issuance } => {
                        debug!(route = %key, issuance, "route endpoints settled");
                        self.executor.release_route(&key, issuance, &mut self.cache);
                    }
                    WaiterTarget::Cohort { workflow } => {
                        debug!(%workflow, "optimization cohort settled");
                        self.continue_optimization(workflow);
                    }
                }
            }
        }
        self.publish();
    }

    fn publish(&self) {
        let next = self.current_status();
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn current_status(&self) -> EngineStatus {
        let in_progress_places = self.cache.places().filter(|(_, r)| r.is_in_progress()).count();
        let in_progress_routes = self
            .cache
            .routes()
            .filter(|(_, _, r)| r.is_in_progress())
            .count();
        EngineStatus {
            route_information: route_information(self.waypoints.as_slice(), &self.cache),
            optimization: self.optimization_status.clone(),
            imports: self.imports.statuses().clone(),
            waypoint_count: self.waypoints.len(),
            fetches_in_flight: in_progress_places + in_progress_routes,
            workflows_in_flight: self.optimizations.len() + self.imports.len(),
        }
    }

    fn snapshot(&self) -> EngineSnapshot {
        let waypoints = self.waypoints.as_slice();
        EngineSnapshot {
            waypoints: waypoints.to_vec(),
            cache: self.cache.clone(),
            waypoint_statuses: (0..waypoints.len())
                .filter_map(|index| waypoint_status(waypoints, index, &self.cache))
                .collect(),
            status: self.current_status(),
        }
    }

    fn start_optimization(&mut self, request: OptimizationRequest) {
        let workflow = self.workflow_ids.allocate();
        let addresses = self.waypoints.addresses();
        let cohort = build_cohort(&addresses, &request);
        info!(
            %workflow,
            objective = %request.objective,
            cohort = cohort.len(),
            "starting route optimization"
        );

        self.optimization_status = Some(OptimizationStatus::InProgress {
            objective: request.objective,
        });
        self.dispatch(cohort.iter().cloned().map(FetchRequest::Place).collect());
        self.waiters.register(
            cohort.clone(),
            WaiterTarget::Cohort { workflow },
        );
        self.optimizations.insert(
            workflow,
            PendingOptimization {
                request,
                addresses,
                cohort,
                cancellation: CancellationToken::new(),
            },
        );
    }

    fn continue_optimization(&mut self, workflow: WorkflowId) {
        let Some(run) = self.optimizations.get(workflow) else {
            debug!(%workflow, "optimization cancelled before its cohort settled");
            return;
        };
        match cohort_coordinates(&run.cohort, &self.cache) {
            Ok(coordinates) => {
                let optimizer = Arc::clone(&self.optimizer);
                let completions = self.completions_tx.clone();
                let objective = run.request.objective;
                spawn_until_cancelled(run.cancellation.clone(), async move {
                    let result = optimizer
                        .optimize(&coordinates, objective)
                        .await
                        .map_err(|err| ResolutionError::optimization_failed(err.to_string()));
                    post(&completions, Completion::Optimization { workflow, result });
                });
            }
            Err(error) => self.finish_optimization(workflow, Err(error)),
        }
    }

    fn finish_optimization(
        &mut self,
        workflow: WorkflowId,
        result: Result<Vec<usize>, ResolutionError>,
    ) {
        let Some(run) = self.optimizations.remove(workflow) else {
            debug!(%workflow, "discarding result of cancelled optimization");
            return;
        };
        let objective = run.request.objective;
        let ordered = result
            .and_then(|ordering| trim_ordering(&ordering, &run.request))
            .and_then(|ordering| remap(&ordering, &run.addresses));

        match ordered {
            Ok(addresses) => {
                info!(%workflow, %objective, waypoints = addresses.len(), "route optimized");
                self.optimization_status = Some(OptimizationStatus::Succeeded { objective });
                self.apply_edit(&WaypointEdit::Replace { addresses });
            }
            Err(error) => {
                warn!(%workflow, %objective, %error, "route optimization failed");
                self.optimization_status = Some(OptimizationStatus::Failed {
                    objective,
                    error: error.to_string(),
                });
            }
        }
    }

    fn cancel_optimization(&mut self, start: Option<&Address>, end: Option<&Address>) {
        let cancelled = self.optimizations.take_matching(start, end);
        if cancelled.is_empty() {
            debug!("no pending optimization matches cancel request");
            return;
        }
        for (workflow, run) in cancelled {
            info!(%workflow, "route optimization cancelled");
            run.cancellation.cancel();
            self.waiters.remove_cohort(workflow);
        }
        self.optimization_status = None;
    }

    fn start_import(&mut self, driver_id: DriverId) {
        let workflow = self.workflow_ids.allocate();
        let cancellation = CancellationToken::new();
        info!(%workflow, driver = %driver_id, "importing waypoints");
        self.imports
            .start(workflow, driver_id.clone(), cancellation.clone());

        let importer = Arc::clone(&self.importer);
        let completions = self.completions_tx.clone();
        spawn_until_cancelled(cancellation, async move {
            let result = importer
                .fetch_waypoints(&driver_id)
                .await
                .map_err(|err| ResolutionError::import_failed(driver_id.as_str(), err.to_string()));
            post(&completions, Completion::Import { workflow, result });
        });
    }

    fn finish_import(&mut self, workflow: WorkflowId, result: Result<Vec<String>, ResolutionError>) {
        let Some(driver_id) = self.imports.finish(workflow) else {
            debug!(%workflow, "discarding result of cancelled import");
            return;
        };
        match result.and_then(|entries| imported_addresses(&driver_id, entries)) {
            Ok(addresses) => {
                info!(%workflow, driver = %driver_id, waypoints = addresses.len(), "waypoints imported");
                self.imports.record(driver_id, ImportStatus::Succeeded);
                self.apply_edit(&WaypointEdit::Replace { addresses });
            }
            Err(error) => {
                warn!(%workflow, driver = %driver_id, %error, "waypoint import failed");
                self.imports.record(
                    driver_id,
                    ImportStatus::Failed {
                        error: error.to_string(),
                    },
                );
            }
        }
    }

    fn cancel_import(&mut self, driver_id: &DriverId) {
        let cancelled = self.imports.cancel_driver(driver_id);
        info!(driver = %driver_id, cancelled, "waypoint import cancelled");
    }

    fn stop(&mut self) {
        self.cache.cancel_in_flight();
        self.optimizations.cancel_all();
        self.imports.cancel_all();
        info!("resolution engine stopped");
    }
}
