//! OSRM routing adapter.

mod dto;
mod osrm;

pub use osrm::OsrmRouter;
