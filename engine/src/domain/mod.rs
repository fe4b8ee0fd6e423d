//! Domain model and resolution engine.
//!
//! Purpose: keep a user-edited list of address waypoints resolved into
//! geocoded places and point-to-point routes, re-deriving only what each
//! edit invalidates. External services are reached exclusively through the
//! driven ports in [`ports`].
//!
//! Public surface:
//! - [`WaypointList`] and [`WaypointEdit`]: the editable list and its edits.
//! - [`FetchCache`] and [`FetchResult`]: resolution state per key.
//! - [`ResolutionEngine`] and [`EngineHandle`]: the actor and its client.
//! - [`route_information`] and [`waypoint_status`]: pure status selectors.

mod address;
mod aggregate;
mod dependency;
mod engine;
mod error;
mod event;
mod executor;
mod fetch_cache;
mod fetch_result;
mod geo;
mod import;
mod optimization;
mod orchestrator;
mod persistence;
pub mod ports;
mod waypoint;
mod workflow;

pub use self::address::{Address, AddressValidationError};
pub use self::aggregate::{
    RouteInformation, WaypointFailure, WaypointStatus, route_information, waypoint_status,
};
pub use self::dependency::{DependencyWaiters, WaiterTarget, all_settled};
pub use self::engine::{
    EngineHandle, EngineSnapshot, EngineStatus, ResolutionEngine, ResolutionEnginePorts,
};
pub use self::error::{EngineError, ResolutionError};
pub use self::event::{DomainEvent, WaypointEdit};
pub use self::fetch_cache::FetchCache;
pub use self::fetch_result::{FetchResult, FetchToken};
pub use self::geo::{Coordinate, Place, Route, RouteKey};
pub use self::import::{DriverId, ImportStatus, imported_addresses};
pub use self::optimization::{
    Objective, OptimizationRequest, OptimizationStatus, build_cohort, cohort_coordinates, remap,
    trim_ordering,
};
pub use self::orchestrator::{
    FetchRequest, needs_fetch, plan_edit, plan_fetch_all, retain_missing,
};
pub use self::persistence::{PersistedRoute, PersistedState, PersistedWaypoint};
pub use self::waypoint::{Waypoint, WaypointId, WaypointList, WaypointListError};
pub use self::workflow::WorkflowId;
