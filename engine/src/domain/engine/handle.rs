//! Client side of the resolution engine actor.

use tokio::sync::{mpsc, oneshot, watch};

use super::{Command, EngineSnapshot, EngineStatus};
use crate::domain::{
    DomainEvent, EngineError, PersistedState, RouteInformation, WaypointEdit,
};

/// Cloneable handle to a running engine.
///
/// The engine stops when [`EngineHandle::shutdown`] is called or the last
/// handle is dropped.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<EngineStatus>,
}

impl EngineHandle {
    pub(super) fn new(
        commands: mpsc::Sender<Command>,
        status: watch::Receiver<EngineStatus>,
    ) -> Self {
        Self { commands, status }
    }

    /// Submit a domain event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine has stopped.
    pub async fn dispatch(&self, event: impl Into<DomainEvent>) -> Result<(), EngineError> {
        self.send(Command::Event(event.into())).await
    }

    /// Submit a waypoint edit.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine has stopped.
    pub async fn edit(&self, edit: WaypointEdit) -> Result<(), EngineError> {
        self.dispatch(edit).await
    }

    /// Full view of the engine after every previously submitted event.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine has stopped.
    pub async fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        response.await.map_err(|_| EngineError::closed())
    }

    /// Sanitised state for a state store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine has stopped.
    pub async fn persisted_state(&self) -> Result<PersistedState, EngineError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Persist(reply)).await?;
        response.await.map_err(|_| EngineError::closed())
    }

    /// Latest published status.
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// Latest published aggregate.
    pub fn route_information(&self) -> RouteInformation {
        self.status.borrow().route_information
    }

    /// Receiver notified whenever the published status changes.
    pub fn subscribe(&self) -> watch::Receiver<EngineStatus> {
        self.status.clone()
    }

    /// Wait until no fetch or workflow is in flight and return that status.
    ///
    /// Every event submitted before the call is taken into account.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] when the engine stops first.
    pub async fn wait_until_settled(&self) -> Result<EngineStatus, EngineError> {
        self.snapshot().await?;
        let mut status = self.status.clone();
        let settled = status
            .wait_for(EngineStatus::is_settled)
            .await
            .map_err(|_| EngineError::closed())?;
        Ok(settled.clone())
    }

    /// Stop the engine, cancelling in-flight work, and wait for it to exit.
    pub async fn shutdown(&self) {
        // A closed engine has already shut down.
        if self.commands.send(Command::Shutdown).await.is_ok() {
            self.commands.closed().await;
        }
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::closed())
    }
}
