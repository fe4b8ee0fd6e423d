//! Domain events accepted by the resolution engine.

use super::{Address, DriverId, OptimizationRequest};

/// Mutation of the waypoint list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaypointEdit {
    /// Append a waypoint at the end of the list.
    Add {
        /// Address of the new waypoint.
        address: Address,
    },
    /// Remove the waypoint at `index`.
    Delete {
        /// Position of the waypoint to remove.
        index: usize,
    },
    /// Move one waypoint from `source` to `target`.
    Move {
        /// Current position.
        source: usize,
        /// Position after the move.
        target: usize,
    },
    /// Move every selected waypoint to the drop position `target`.
    MoveSelected {
        /// Drop position.
        target: usize,
    },
    /// Reverse the list.
    Reverse,
    /// Change the address of the waypoint at `index`.
    SetAddress {
        /// Position of the waypoint.
        index: usize,
        /// New address.
        address: Address,
    },
    /// Replace the whole list, as after a paste, import or optimization.
    Replace {
        /// New addresses in order.
        addresses: Vec<Address>,
    },
    /// Make `index` the only selected waypoint.
    Select {
        /// Clicked position.
        index: usize,
    },
    /// Flip the selection of `index`.
    ToggleSelection {
        /// Clicked position.
        index: usize,
    },
    /// Select from the last selected waypoint up to `index`.
    SelectRange {
        /// Clicked position.
        index: usize,
    },
}

impl WaypointEdit {
    /// Whether the edit only touches selection state.
    pub fn is_selection_only(&self) -> bool {
        matches!(
            self,
            Self::Select { .. } | Self::ToggleSelection { .. } | Self::SelectRange { .. }
        )
    }
}

/// Input to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// Edit the waypoint list.
    Edit(WaypointEdit),
    /// Re-request every place and adjacent route; used to recover failures.
    FetchAll,
    /// Import the waypoints assigned to a driver and replace the list.
    ImportWaypoints {
        /// Driver whose waypoints are imported.
        driver_id: DriverId,
    },
    /// Abort a pending import for `driver_id`.
    CancelImport {
        /// Driver whose import is aborted.
        driver_id: DriverId,
    },
    /// Reorder the waypoints through the optimization service.
    OptimizeRoute(OptimizationRequest),
    /// Abort the pending optimization started with the same overrides.
    CancelOptimization {
        /// Start override of the workflow to abort.
        start: Option<Address>,
        /// End override of the workflow to abort.
        end: Option<Address>,
    },
}

impl From<WaypointEdit> for DomainEvent {
    fn from(edit: WaypointEdit) -> Self {
        Self::Edit(edit)
    }
}
