//! Driven port for fetching the stops assigned to a driver.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::DriverId;

define_port_error! {
    /// Errors surfaced by the import service.
    pub enum ImportServiceError {
        /// Network transport failed before receiving a response.
        Transport {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "import transport failed: {message}",
        /// The service did not answer in time.
        Timeout {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "import timeout: {message}",
        /// The service answered with an error status.
        Rejected {
            /// HTTP status code.
            status: u16,
            /// Detail reported by the service or client.
            message: String,
        } =>
            "import rejected with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "import response decode failed: {message}",
    }
}

/// Port for importing a driver's waypoints.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImportService: Send + Sync {
    /// Address lines for every stop assigned to `driver_id`, in service
    /// order.
    async fn fetch_waypoints(&self, driver_id: &DriverId)
    -> Result<Vec<String>, ImportServiceError>;
}

/// Fixture import service with no assignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureImportService;

#[async_trait]
impl ImportService for FixtureImportService {
    async fn fetch_waypoints(
        &self,
        _driver_id: &DriverId,
    ) -> Result<Vec<String>, ImportServiceError> {
        Ok(Vec::new())
    }
}
