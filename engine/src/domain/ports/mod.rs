//! Driven ports through which the engine reaches external services.

mod macros;
pub(crate) use macros::define_port_error;

mod geocoding_service;
mod import_service;
mod optimization_service;
mod routing_service;
mod state_store;

#[cfg(test)]
pub use geocoding_service::MockGeocodingService;
pub use geocoding_service::{FixtureGeocodingService, GeocodingError, GeocodingService};
#[cfg(test)]
pub use import_service::MockImportService;
pub use import_service::{FixtureImportService, ImportService, ImportServiceError};
#[cfg(test)]
pub use optimization_service::MockOptimizationService;
pub use optimization_service::{
    FixtureOptimizationService, OptimizationService, OptimizationServiceError,
};
#[cfg(test)]
pub use routing_service::MockRoutingService;
pub use routing_service::{FixtureRoutingService, RoutingError, RoutingService};
#[cfg(test)]
pub use state_store::MockStateStore;
pub use state_store::{FixtureStateStore, StateStore, StateStoreError};

#[cfg(test)]
mod tests;
