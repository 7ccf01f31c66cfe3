//! Virtual machine.

use serde::{Deserialize, Serialize};

use cloudlab_core::component::Id;

use crate::core::error::CloudError;

/// Policy used inside a VM to share its capacity between cloudlets.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudletSchedulerKind {
    TimeShared,
    SpaceShared,
}

/// Identifies VM inside a datacenter as a pair of its broker and its ID.
///
/// Brokers number their VMs independently, so VM ID alone is unique only within the broker.
pub type VmKey = (Id, u32);

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmStatus {
    /// VM is submitted but not placed on a host, including the case when placement has failed.
    Created,
    Running,
    Destroyed,
}

impl std::fmt::Display for VmStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Created => write!(f, "created"),
            VmStatus::Running => write!(f, "running"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Represents virtual machine requesting a number of PEs with the same MIPS rating
/// and fixed amounts of memory (MB), bandwidth and storage (MB).
#[derive(Serialize, Clone, Debug)]
pub struct VirtualMachine {
    pub id: u32,
    pub broker_id: Id,
    pub mips: f64,
    pub pes_number: u32,
    pub ram: u64,
    pub bw: u64,
    pub size: u64,
    pub vmm: String,
    pub cloudlet_scheduler: CloudletSchedulerKind,
    pub status: VmStatus,
    pub host_id: Option<u32>,
    pub datacenter_id: Option<Id>,
}

impl VirtualMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        mips: f64,
        pes_number: u32,
        ram: u64,
        bw: u64,
        size: u64,
        vmm: &str,
        cloudlet_scheduler: CloudletSchedulerKind,
    ) -> Self {
        Self {
            id,
            broker_id: 0,
            mips,
            pes_number,
            ram,
            bw,
            size,
            vmm: vmm.to_string(),
            cloudlet_scheduler,
            status: VmStatus::Created,
            host_id: None,
            datacenter_id: None,
        }
    }

    pub fn key(&self) -> VmKey {
        (self.broker_id, self.id)
    }

    /// MIPS requested for each virtual PE.
    pub fn requested_mips(&self) -> Vec<f64> {
        vec![self.mips; self.pes_number as usize]
    }

    pub fn total_mips(&self) -> f64 {
        self.mips * self.pes_number as f64
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if !self.mips.is_finite() || self.mips <= 0. {
            return Err(CloudError::InvalidConfiguration(format!(
                "vm {} has non-positive mips: {}",
                self.id, self.mips
            )));
        }
        if self.pes_number == 0 {
            return Err(CloudError::InvalidConfiguration(format!("vm {} has no pes", self.id)));
        }
        Ok(())
    }
}
