//! Test utilities for the engine crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    FixtureGeocodingService, FixtureImportService, FixtureOptimizationService,
    FixtureRoutingService,
};
use crate::domain::{Address, Coordinate, Place, ResolutionEnginePorts, Route};

pub mod services;

/// Build an address, panicking on blank text.
pub fn address(text: &str) -> Address {
    match Address::new(text) {
        Ok(address) => address,
        Err(error) => panic!("invalid test address {text:?}: {error}"),
    }
}

/// Build addresses in order.
pub fn addresses(texts: &[&str]) -> Vec<Address> {
    texts.iter().copied().map(address).collect()
}

/// Place named `text` at `coordinate`.
pub fn place(text: &str, coordinate: Coordinate) -> Place {
    Place {
        address: text.to_owned(),
        coordinate,
    }
}

/// Straight two-point route.
pub fn route(origin: Coordinate, destination: Coordinate, distance: f64, time: f64) -> Route {
    Route {
        points: vec![origin, destination],
        distance,
        time,
    }
}

/// Port bundle backed entirely by fixture services.
pub fn fixture_ports() -> ResolutionEnginePorts {
    ResolutionEnginePorts::new(
        Arc::new(FixtureGeocodingService),
        Arc::new(FixtureRoutingService),
        Arc::new(FixtureOptimizationService),
        Arc::new(FixtureImportService),
    )
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(now)
    }

    /// Freeze the clock at a fixed reference instant.
    pub fn reference() -> Self {
        match Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).single() {
            Some(now) => Self(now),
            None => panic!("reference instant is unambiguous"),
        }
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}
