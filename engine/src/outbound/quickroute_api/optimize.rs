//! Route optimization over `POST {api}optimize`.

use async_trait::async_trait;

use super::QuickRouteApi;
use super::dto::{OptimizeRequestDto, OptimizeResponseDto};
use crate::domain::ports::{OptimizationService, OptimizationServiceError};
use crate::domain::{Coordinate, Objective};
use crate::outbound::http_support::{fetch_json, impl_from_http_failure};

impl_from_http_failure!(OptimizationServiceError);

/// Optimization service backed by the QuickRoute API.
#[derive(Debug, Clone)]
pub struct HttpOptimizationService {
    api: QuickRouteApi,
}

impl HttpOptimizationService {
    /// Build the adapter on a shared API client.
    pub fn new(api: QuickRouteApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OptimizationService for HttpOptimizationService {
    async fn optimize(
        &self,
        coordinates: &[Coordinate],
        objective: Objective,
    ) -> Result<Vec<usize>, OptimizationServiceError> {
        let url = self
            .api
            .endpoint("optimize")
            .map_err(OptimizationServiceError::transport)?;
        let body = OptimizeRequestDto {
            coordinates,
            optimization_parameter: objective,
        };
        let response: OptimizeResponseDto =
            fetch_json(self.api.client.post(url).json(&body)).await?;
        validate_permutation(response.result, coordinates.len())
    }
}

/// Reject orderings that are not a permutation of `0..len`.
fn validate_permutation(
    ordering: Vec<usize>,
    len: usize,
) -> Result<Vec<usize>, OptimizationServiceError> {
    let mut seen = vec![false; len];
    for &index in &ordering {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => {
                return Err(OptimizationServiceError::decode(format!(
                    "result {ordering:?} is not a permutation of {len} coordinates"
                )));
            }
        }
    }
    if ordering.len() != len {
        return Err(OptimizationServiceError::decode(format!(
            "result has {} entries for {len} coordinates",
            ordering.len()
        )));
    }
    Ok(ordering)
}
