//! Failure taxonomy of the resolution engine.
//!
//! Failures are data: they are stored in `Failed` cache entries and workflow
//! statuses rather than propagated as control flow between components.

use super::ports::define_port_error;

define_port_error! {
    /// Typed failure recorded for a place, route, import or optimization.
    pub enum ResolutionError {
        /// Geocoding an address failed.
        LookupFailed {
            /// Address text.
            address: String,
            /// Underlying cause.
            reason: String,
        } =>
            "lookup failed for '{address}': {reason}",
        /// Routing between two addresses failed, including when an endpoint
        /// place could not be resolved.
        RouteFailed {
            /// Origin address text.
            origin: String,
            /// Destination address text.
            destination: String,
            /// Underlying cause.
            reason: String,
        } =>
            "route failed ('{origin}' -> '{destination}'): {reason}",
        /// Importing waypoints for a driver failed.
        ImportFailed {
            /// Driver whose stops were requested.
            driver_id: String,
            /// Underlying cause.
            reason: String,
        } =>
            "import failed for driver {driver_id}: {reason}",
        /// The optimization workflow failed.
        OptimizationFailed {
            /// Underlying cause.
            reason: String,
        } =>
            "optimization failed: {reason}",
    }
}

define_port_error! {
    /// Errors returned by [`crate::domain::EngineHandle`] calls.
    pub enum EngineError {
        /// The engine actor has stopped and no longer accepts messages.
        Closed => "resolution engine has stopped",
    }
}
