//! Waypoint resolution engine.
//!
//! Keeps an ordered list of address waypoints resolved into geocoded places
//! and point-to-point routes, reacting to list edits by fetching only what
//! each edit invalidates. Driver import and route optimization run as
//! cancellable workflows on the same engine.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
