//! Driver waypoint import workflow.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Address, ResolutionError, WorkflowId};

/// Identifier of a driver whose assigned stops can be imported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DriverId(String);

impl DriverId {
    /// Wrap a driver number.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Driver number as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DriverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Published state of the imports for one driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportStatus {
    /// The import service has been called.
    InProgress,
    /// The waypoint list was replaced with the imported stops.
    Succeeded,
    /// The import failed; the waypoint list is unchanged.
    Failed {
        /// Failure text.
        error: String,
    },
}

/// Turn the service's entries into addresses, skipping blank ones.
///
/// # Errors
///
/// Returns `ImportFailed` when no usable address remains.
pub fn imported_addresses(
    driver_id: &DriverId,
    entries: Vec<String>,
) -> Result<Vec<Address>, ResolutionError> {
    let addresses: Vec<Address> = entries
        .into_iter()
        .filter_map(|entry| Address::new(entry).ok())
        .collect();
    if addresses.is_empty() {
        return Err(ResolutionError::import_failed(
            driver_id.as_str(),
            "no waypoints returned",
        ));
    }
    Ok(addresses)
}

#[derive(Debug)]
struct PendingImport {
    driver_id: DriverId,
    cancellation: CancellationToken,
}

/// Running imports and the latest status per driver.
#[derive(Debug, Default)]
pub(crate) struct ImportRuns {
    pending: HashMap<WorkflowId, PendingImport>,
    statuses: BTreeMap<DriverId, ImportStatus>,
}

impl ImportRuns {
    pub(crate) fn start(
        &mut self,
        id: WorkflowId,
        driver_id: DriverId,
        cancellation: CancellationToken,
    ) {
        self.statuses
            .insert(driver_id.clone(), ImportStatus::InProgress);
        self.pending.insert(
            id,
            PendingImport {
                driver_id,
                cancellation,
            },
        );
    }

    /// Remove a finished run and return its driver.
    pub(crate) fn finish(&mut self, id: WorkflowId) -> Option<DriverId> {
        self.pending.remove(&id).map(|run| run.driver_id)
    }

    pub(crate) fn record(&mut self, driver_id: DriverId, status: ImportStatus) {
        self.statuses.insert(driver_id, status);
    }

    /// Cancel every run for `driver_id` and clear its status. Returns how
    /// many runs were cancelled.
    pub(crate) fn cancel_driver(&mut self, driver_id: &DriverId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, run| {
            let matches = &run.driver_id == driver_id;
            if matches {
                run.cancellation.cancel();
            }
            !matches
        });
        self.statuses.remove(driver_id);
        before - self.pending.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        for run in self.pending.values() {
            run.cancellation.cancel();
        }
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn statuses(&self) -> &BTreeMap<DriverId, ImportStatus> {
        &self.statuses
    }
}
