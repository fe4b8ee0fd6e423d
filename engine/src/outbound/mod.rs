//! Outbound adapters implementing the driven ports.
//!
//! Adapters are thin translators between wire formats and domain types. They
//! hold no resolution logic:
//!
//! - **geocoding**: Nominatim search
//! - **routing**: OSRM route service
//! - **quickroute_api**: driver import and route optimization
//! - **state_store**: JSON snapshot in a capability-scoped directory

pub mod geocoding;
pub(crate) mod http_support;
pub mod quickroute_api;
pub mod routing;
pub mod state_store;
