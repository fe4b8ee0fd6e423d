//! Ordered waypoint list and its editing operations.
//!
//! List order is the only source of adjacency. Waypoint ids are stable across
//! reorders and edits; cache keys are addresses, not ids.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{Address, WaypointEdit};

/// Opaque, stable waypoint identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointId(Uuid);

impl WaypointId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for WaypointId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for WaypointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One stop of the route being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waypoint {
    id: WaypointId,
    address: Address,
    selected: bool,
}

impl Waypoint {
    /// Create an unselected waypoint with a fresh id.
    pub fn new(address: Address) -> Self {
        Self::with_id(WaypointId::random(), address)
    }

    /// Create an unselected waypoint with a known id.
    pub fn with_id(id: WaypointId, address: Address) -> Self {
        Self {
            id,
            address,
            selected: false,
        }
    }

    /// Stable identifier.
    pub fn id(&self) -> WaypointId {
        self.id
    }

    /// Address text, also the place cache key.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether the waypoint is part of the current selection.
    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Errors returned by rejected list edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaypointListError {
    /// An index did not refer to a waypoint.
    #[error("waypoint index {index} is out of range for {len} waypoints")]
    IndexOutOfRange {
        /// Offending index.
        index: usize,
        /// List length at the time of the edit.
        len: usize,
    },
}

/// Ordered, editable list of waypoints with a selection model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaypointList {
    waypoints: Vec<Waypoint>,
    last_selected_index: usize,
}

impl WaypointList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list with fresh ids from addresses in order.
    pub fn from_addresses(addresses: impl IntoIterator<Item = Address>) -> Self {
        Self::from_waypoints(addresses.into_iter().map(Waypoint::new).collect())
    }

    /// Build a list from existing waypoints.
    pub fn from_waypoints(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            last_selected_index: 0,
        }
    }

    /// Waypoints in order.
    pub fn as_slice(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Addresses in order.
    pub fn addresses(&self) -> Vec<Address> {
        self.waypoints.iter().map(|w| w.address.clone()).collect()
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Whether the list has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint at `index`.
    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Index of the waypoint most recently clicked or toggled.
    pub fn last_selected_index(&self) -> usize {
        self.last_selected_index
    }

    /// Apply one edit.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] when an index in the
    /// edit does not refer to a waypoint; the list is left unchanged.
    pub fn apply(&mut self, edit: &WaypointEdit) -> Result<(), WaypointListError> {
        match edit {
            WaypointEdit::Add { address } => {
                self.add(address.clone());
                Ok(())
            }
            WaypointEdit::Delete { index } => self.delete(*index).map(drop),
            WaypointEdit::Move { source, target } => self.move_waypoint(*source, *target),
            WaypointEdit::MoveSelected { target } => self.move_selected(*target),
            WaypointEdit::Reverse => {
                self.reverse();
                Ok(())
            }
            WaypointEdit::SetAddress { index, address } => {
                self.set_address(*index, address.clone())
            }
            WaypointEdit::Replace { addresses } => {
                self.replace(addresses.iter().cloned());
                Ok(())
            }
            WaypointEdit::Select { index } => self.select(*index),
            WaypointEdit::ToggleSelection { index } => self.toggle_selection(*index),
            WaypointEdit::SelectRange { index } => self.select_range(*index),
        }
    }

    /// Append a waypoint and return its id.
    pub fn add(&mut self, address: Address) -> WaypointId {
        let waypoint = Waypoint::new(address);
        let id = waypoint.id;
        self.waypoints.push(waypoint);
        id
    }

    /// Remove and return the waypoint at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn delete(&mut self, index: usize) -> Result<Waypoint, WaypointListError> {
        self.check(index)?;
        Ok(self.waypoints.remove(index))
    }

    /// Move the waypoint at `source` so it ends up at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn move_waypoint(&mut self, source: usize, target: usize) -> Result<(), WaypointListError> {
        self.check(source)?;
        self.check(target)?;
        if source != target {
            let moved = self.waypoints.remove(source);
            self.waypoints.insert(target, moved);
        }
        Ok(())
    }

    /// Move every selected waypoint, keeping their relative order, to the
    /// drop position `target`.
    ///
    /// Unselected waypoints before the drop position stay in front of the
    /// moved block; the rest follow it. When the first selected waypoint sits
    /// before `target`, the drop position is just after `target`.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn move_selected(&mut self, target: usize) -> Result<(), WaypointListError> {
        self.check(target)?;
        let Some(lowest_selected) = self.waypoints.iter().position(Waypoint::is_selected) else {
            return Ok(());
        };
        let partition = if lowest_selected < target {
            target + 1
        } else {
            target
        };
        let last_selected_id = self.waypoints.get(self.last_selected_index).map(Waypoint::id);

        let mut before = Vec::new();
        let mut moved = Vec::new();
        let mut after = Vec::new();
        for (index, waypoint) in self.waypoints.drain(..).enumerate() {
            if waypoint.selected {
                moved.push(waypoint);
            } else if index < partition {
                before.push(waypoint);
            } else {
                after.push(waypoint);
            }
        }
        before.append(&mut moved);
        before.append(&mut after);
        self.waypoints = before;

        if let Some(position) =
            last_selected_id.and_then(|id| self.waypoints.iter().position(|w| w.id == id))
        {
            self.last_selected_index = position;
        }
        Ok(())
    }

    /// Reverse the order of the list.
    pub fn reverse(&mut self) {
        self.waypoints.reverse();
    }

    /// Replace the address of the waypoint at `index`, keeping its id and
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn set_address(&mut self, index: usize, address: Address) -> Result<(), WaypointListError> {
        let len = self.len();
        let waypoint = self
            .waypoints
            .get_mut(index)
            .ok_or(WaypointListError::IndexOutOfRange { index, len })?;
        waypoint.address = address;
        Ok(())
    }

    /// Replace the whole list with fresh waypoints.
    pub fn replace(&mut self, addresses: impl IntoIterator<Item = Address>) {
        self.waypoints = addresses.into_iter().map(Waypoint::new).collect();
    }

    /// Make `index` the only selected waypoint. Selecting the sole selected
    /// waypoint again clears the selection.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn select(&mut self, index: usize) -> Result<(), WaypointListError> {
        self.check(index)?;
        let selected_count = self.waypoints.iter().filter(|w| w.selected).count();
        for (position, waypoint) in self.waypoints.iter_mut().enumerate() {
            if position != index {
                waypoint.selected = false;
            } else if !waypoint.selected {
                waypoint.selected = true;
            } else if selected_count == 1 {
                waypoint.selected = false;
            }
        }
        self.last_selected_index = index;
        Ok(())
    }

    /// Flip the selection of `index`, leaving the rest untouched.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn toggle_selection(&mut self, index: usize) -> Result<(), WaypointListError> {
        let len = self.len();
        let waypoint = self
            .waypoints
            .get_mut(index)
            .ok_or(WaypointListError::IndexOutOfRange { index, len })?;
        waypoint.selected = !waypoint.selected;
        self.last_selected_index = index;
        Ok(())
    }

    /// Extend the selection from the last selected waypoint to `index`.
    ///
    /// # Errors
    ///
    /// Returns [`WaypointListError::IndexOutOfRange`] for a bad index.
    pub fn select_range(&mut self, index: usize) -> Result<(), WaypointListError> {
        self.check(index)?;
        let anchor = self.last_selected_index;
        for (position, waypoint) in self.waypoints.iter_mut().enumerate() {
            let in_range = if index < anchor {
                position >= index && position < anchor
            } else {
                position <= index && position > anchor
            };
            if in_range {
                waypoint.selected = true;
            }
        }
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), WaypointListError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(WaypointListError::IndexOutOfRange {
                index,
                len: self.len(),
            })
        }
    }
}
