//! Driven port for ordering a set of stops.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{Coordinate, Objective};

define_port_error! {
    /// Errors surfaced by the optimization service.
    pub enum OptimizationServiceError {
        /// Network transport failed before receiving a response.
        Transport {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "optimizer transport failed: {message}",
        /// The optimizer did not answer in time.
        Timeout {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "optimizer timeout: {message}",
        /// The optimizer answered with an error status.
        Rejected {
            /// HTTP status code.
            status: u16,
            /// Detail reported by the service or client.
            message: String,
        } =>
            "optimizer rejected request with status {status}: {message}",
        /// The response body could not be decoded.
        Decode {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "optimizer response decode failed: {message}",
    }
}

/// Port for computing a visiting order.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OptimizationService: Send + Sync {
    /// Return a permutation of `0..coordinates.len()` minimising `objective`.
    async fn optimize(
        &self,
        coordinates: &[Coordinate],
        objective: Objective,
    ) -> Result<Vec<usize>, OptimizationServiceError>;
}

/// Fixture optimizer that keeps the input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureOptimizationService;

#[async_trait]
impl OptimizationService for FixtureOptimizationService {
    async fn optimize(
        &self,
        coordinates: &[Coordinate],
        _objective: Objective,
    ) -> Result<Vec<usize>, OptimizationServiceError> {
        Ok((0..coordinates.len()).collect())
    }
}
