//! Driven port for loading and saving engine state.

use std::sync::Mutex;

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::PersistedState;

define_port_error! {
    /// Errors surfaced by a state store.
    pub enum StateStoreError {
        /// The backing storage could not be read or written.
        Io {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "state store i/o failed: {message}",
        /// Stored content could not be serialised or deserialised.
        Serialization {
            /// Detail reported by the service or client.
            message: String,
        } =>
            "state store serialisation failed: {message}",
    }
}

/// Port for persisting sanitised engine state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved state, if any.
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError>;

    /// Replace the saved state.
    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError>;
}

/// In-memory state store.
#[derive(Debug, Default)]
pub struct FixtureStateStore {
    state: Mutex<Option<PersistedState>>,
}

impl FixtureStateStore {
    /// Create a store pre-loaded with `state`.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

#[async_trait]
impl StateStore for FixtureStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StateStoreError> {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .map_err(|err| StateStoreError::io(err.to_string()))
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StateStoreError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|err| StateStoreError::io(err.to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }
}
