//! Errors reported by the cloud model.

use serde::Serialize;
use thiserror::Error;

use cloudlab_core::SimulationError;

use crate::core::common::AllocationVerdict;

#[derive(Error, Serialize, Clone, Debug, PartialEq)]
pub enum CloudError {
    /// No host of the datacenter(s) could accommodate the VM.
    #[error("cannot allocate vm {vm_id}: {verdict}")]
    InsufficientCapacity { vm_id: u32, verdict: AllocationVerdict },

    /// Entity or configuration parameters are out of their valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Referenced entity (component, VM or cloudlet) does not exist.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

impl From<SimulationError> for CloudError {
    fn from(err: SimulationError) -> Self {
        CloudError::UnknownEntity(err.to_string())
    }
}
