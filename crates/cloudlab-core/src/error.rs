//! Simulation errors.

use thiserror::Error;

use crate::component::Id;

/// Errors detected while running the simulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Event is addressed to a component without registered event handler.
    #[error("event {event_id} is addressed to unknown component {id}")]
    UnknownComponent {
        /// Destination of the undelivered event.
        id: Id,
        /// Identifier of the undelivered event.
        event_id: u64,
    },
}
