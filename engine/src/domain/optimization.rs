//! Route optimization workflow.
//!
//! A run collects the coordinates of its cohort (the waypoints, plus the
//! optional start and end overrides), asks the optimization service for a
//! visiting order and maps that order back onto the waypoint addresses
//! captured when the run started.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{Address, Coordinate, FetchCache, FetchResult, ResolutionError, WorkflowId};

/// Quantity the optimization service minimises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Shortest total distance.
    Distance,
    /// Shortest total travel time.
    Time,
}

impl std::fmt::Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Distance => "distance",
            Self::Time => "time",
        })
    }
}

/// Parameters of one optimization run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizationRequest {
    /// Quantity to minimise.
    pub objective: Objective,
    /// Forced first stop, not part of the waypoint list.
    pub start: Option<Address>,
    /// Forced last stop, not part of the waypoint list.
    pub end: Option<Address>,
}

impl OptimizationRequest {
    /// Optimize the waypoints alone.
    pub const fn new(objective: Objective) -> Self {
        Self {
            objective,
            start: None,
            end: None,
        }
    }

    /// Force the route to begin at `start`.
    #[must_use]
    pub fn with_start(mut self, start: Address) -> Self {
        self.start = Some(start);
        self
    }

    /// Force the route to finish at `end`.
    #[must_use]
    pub fn with_end(mut self, end: Address) -> Self {
        self.end = Some(end);
        self
    }

    /// Whether a cancel event for `(start, end)` targets this run.
    pub fn matches(&self, start: Option<&Address>, end: Option<&Address>) -> bool {
        self.start.as_ref() == start && self.end.as_ref() == end
    }
}

/// Published state of the latest optimization run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OptimizationStatus {
    /// Waiting on the cohort or the optimization service.
    InProgress {
        /// Objective of the run.
        objective: Objective,
    },
    /// The waypoint list was replaced by the optimized order.
    Succeeded {
        /// Objective of the run.
        objective: Objective,
    },
    /// The run failed; the waypoint list is unchanged.
    Failed {
        /// Objective of the run.
        objective: Objective,
        /// Failure text.
        error: String,
    },
}

/// Addresses whose places an optimization run needs, in service order.
pub fn build_cohort(waypoints: &[Address], request: &OptimizationRequest) -> Vec<Address> {
    request
        .start
        .iter()
        .chain(waypoints)
        .chain(request.end.iter())
        .cloned()
        .collect()
}

/// Coordinates of a settled cohort.
///
/// # Errors
///
/// Returns `OptimizationFailed` naming the first cohort address, in cohort
/// order, whose place is not resolved.
pub fn cohort_coordinates(
    cohort: &[Address],
    cache: &FetchCache,
) -> Result<Vec<Coordinate>, ResolutionError> {
    cohort
        .iter()
        .map(|address| match cache.place(address) {
            Some(FetchResult::Success { value }) => Ok(value.coordinate),
            Some(FetchResult::Failed { error }) => Err(ResolutionError::optimization_failed(
                format!("{error} ('{address}')"),
            )),
            Some(FetchResult::InProgress { .. }) | None => Err(
                ResolutionError::optimization_failed(format!("place is not settled ('{address}')")),
            ),
        })
        .collect()
}

/// Strip the forced endpoints from the service's ordering and shift the
/// remaining indices back into waypoint space.
///
/// # Errors
///
/// Returns `OptimizationFailed` when the forced start is not the first index.
pub fn trim_ordering(
    ordering: &[usize],
    request: &OptimizationRequest,
) -> Result<Vec<usize>, ResolutionError> {
    let mut trimmed: Vec<usize> = if request.start.is_some() {
        ordering
            .iter()
            .skip(1)
            .map(|index| {
                index.checked_sub(1).ok_or_else(|| {
                    ResolutionError::optimization_failed(
                        "optimizer moved the start point away from the front",
                    )
                })
            })
            .collect::<Result<_, _>>()?
    } else {
        ordering.to_vec()
    };
    if request.end.is_some() {
        trimmed.pop();
    }
    Ok(trimmed)
}

/// Map a trimmed ordering onto the addresses captured at run start.
///
/// # Errors
///
/// Returns `OptimizationFailed` when an index is out of range.
pub fn remap(ordering: &[usize], addresses: &[Address]) -> Result<Vec<Address>, ResolutionError> {
    ordering
        .iter()
        .map(|&index| {
            addresses.get(index).cloned().ok_or_else(|| {
                ResolutionError::optimization_failed(format!(
                    "optimizer returned index {index} for {} waypoints",
                    addresses.len()
                ))
            })
        })
        .collect()
}

/// Bookkeeping for one running optimization.
#[derive(Debug, Clone)]
pub(crate) struct PendingOptimization {
    pub(crate) request: OptimizationRequest,
    /// Waypoint addresses when the run started.
    pub(crate) addresses: Vec<Address>,
    pub(crate) cohort: Vec<Address>,
    pub(crate) cancellation: CancellationToken,
}

/// Running optimizations keyed by workflow id.
#[derive(Debug, Default)]
pub(crate) struct OptimizationRuns {
    pending: HashMap<WorkflowId, PendingOptimization>,
}

impl OptimizationRuns {
    pub(crate) fn insert(&mut self, id: WorkflowId, run: PendingOptimization) {
        self.pending.insert(id, run);
    }

    pub(crate) fn get(&self, id: WorkflowId) -> Option<&PendingOptimization> {
        self.pending.get(&id)
    }

    pub(crate) fn remove(&mut self, id: WorkflowId) -> Option<PendingOptimization> {
        self.pending.remove(&id)
    }

    /// Remove and return every run started with the `(start, end)` pair.
    pub(crate) fn take_matching(
        &mut self,
        start: Option<&Address>,
        end: Option<&Address>,
    ) -> Vec<(WorkflowId, PendingOptimization)> {
        let ids: Vec<WorkflowId> = self
            .pending
            .iter()
            .filter(|(_, run)| run.request.matches(start, end))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|run| (id, run)))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn cancel_all(&mut self) {
        for run in self.pending.values() {
            run.cancellation.cancel();
        }
        self.pending.clear();
    }
}
