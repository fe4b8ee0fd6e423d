//! Wire types of the QuickRoute service API.

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, Objective};

/// `GET waypoints/{driver}` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WaypointsResponseDto {
    #[serde(default)]
    pub(super) date: Option<String>,
    pub(super) driver_number: String,
    pub(super) waypoints: WaypointsSetDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct WaypointsSetDto {
    #[serde(default)]
    pub(super) dispatched: Vec<AssignedStopDto>,
    #[serde(default)]
    pub(super) inprogress: Vec<AssignedStopDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AssignedStopDto {
    pub(super) address: String,
    #[serde(default)]
    pub(super) postal_code: String,
}

impl WaypointsResponseDto {
    /// Address lines for dispatched stops followed by in-progress ones.
    pub(super) fn into_address_lines(self) -> Vec<String> {
        self.waypoints
            .dispatched
            .into_iter()
            .chain(self.waypoints.inprogress)
            .map(|stop| stop.address_line())
            .collect()
    }
}

impl AssignedStopDto {
    /// Street part of the address (up to the first comma or newline)
    /// followed by the postal code.
    fn address_line(&self) -> String {
        let street = self
            .address
            .split([',', '\n'])
            .next()
            .unwrap_or_default();
        format!("{street} {}", self.postal_code)
    }
}

/// `POST optimize` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OptimizeRequestDto<'a> {
    pub(super) coordinates: &'a [Coordinate],
    pub(super) optimization_parameter: Objective,
}

/// `POST optimize` response body.
#[derive(Debug, Deserialize)]
pub(super) struct OptimizeResponseDto {
    pub(super) result: Vec<usize>,
}
