//! Driver waypoint import over `GET {api}waypoints/{driver}`.

use async_trait::async_trait;
use tracing::debug;

use super::QuickRouteApi;
use super::dto::WaypointsResponseDto;
use crate::domain::DriverId;
use crate::domain::ports::{ImportService, ImportServiceError};
use crate::outbound::http_support::{fetch_json, impl_from_http_failure};

impl_from_http_failure!(ImportServiceError);

/// Import service backed by the QuickRoute API.
#[derive(Debug, Clone)]
pub struct HttpImportService {
    api: QuickRouteApi,
}

impl HttpImportService {
    /// Build the adapter on a shared API client.
    pub fn new(api: QuickRouteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ImportService for HttpImportService {
    async fn fetch_waypoints(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<String>, ImportServiceError> {
        let url = self
            .api
            .endpoint(&format!("waypoints/{driver_id}"))
            .map_err(ImportServiceError::transport)?;
        let response: WaypointsResponseDto = fetch_json(self.api.client.get(url)).await?;
        debug!(
            driver = %response.driver_number,
            date = ?response.date,
            dispatched = response.waypoints.dispatched.len(),
            in_progress = response.waypoints.inprogress.len(),
            "driver waypoints received"
        );
        Ok(response.into_address_lines())
    }
}
