//! Cloudlet (unit of work executed inside a VM).

use serde::{Deserialize, Serialize};

use cloudlab_core::component::Id;

use crate::core::error::CloudError;

/// Describes which fraction of the allocated capacity is actually used by a cloudlet.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum UtilizationModel {
    /// Cloudlet uses all capacity given to it.
    Full,
    /// Cloudlet uses the fixed fraction of its capacity.
    Constant { ratio: f64 },
}

impl UtilizationModel {
    pub fn utilization(&self) -> f64 {
        match self {
            UtilizationModel::Full => 1.,
            UtilizationModel::Constant { ratio } => *ratio,
        }
    }
}

impl Default for UtilizationModel {
    fn default() -> Self {
        UtilizationModel::Full
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloudletStatus {
    Created,
    Queued,
    InExec,
    Paused,
    Success,
    Failed,
    Canceled,
}

impl CloudletStatus {
    /// Terminal statuses are never changed afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CloudletStatus::Success | CloudletStatus::Failed | CloudletStatus::Canceled
        )
    }
}

impl std::fmt::Display for CloudletStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            CloudletStatus::Created => "CREATED",
            CloudletStatus::Queued => "QUEUED",
            CloudletStatus::InExec => "INEXEC",
            CloudletStatus::Paused => "PAUSED",
            CloudletStatus::Success => "SUCCESS",
            CloudletStatus::Failed => "FAILED",
            CloudletStatus::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

/// Represents a job of given length (in MI) requiring a number of PEs of its VM.
///
/// Timing fields are filled during execution: `exec_start_time` is set when the cloudlet
/// first gets processing capacity, `finish_time` is set when it reaches a terminal status,
/// `actual_cpu_time` is the wall-clock time between these two moments.
#[derive(Serialize, Clone, Debug)]
pub struct Cloudlet {
    pub id: u32,
    pub length: u64,
    pub pes_number: u32,
    pub file_size: u64,
    pub output_size: u64,
    pub utilization_model: UtilizationModel,
    pub broker_id: Id,
    pub vm_id: Option<u32>,
    pub datacenter_id: Option<Id>,
    pub status: CloudletStatus,
    pub submission_time: f64,
    pub exec_start_time: Option<f64>,
    pub finish_time: Option<f64>,
    pub actual_cpu_time: f64,
    pub cost: f64,
}

impl Cloudlet {
    pub fn new(
        id: u32,
        length: u64,
        pes_number: u32,
        file_size: u64,
        output_size: u64,
        utilization_model: UtilizationModel,
    ) -> Self {
        Self {
            id,
            length,
            pes_number,
            file_size,
            output_size,
            utilization_model,
            broker_id: 0,
            vm_id: None,
            datacenter_id: None,
            status: CloudletStatus::Created,
            submission_time: 0.,
            exec_start_time: None,
            finish_time: None,
            actual_cpu_time: 0.,
            cost: 0.,
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if self.length == 0 {
            return Err(CloudError::InvalidConfiguration(format!(
                "cloudlet {} has zero length",
                self.id
            )));
        }
        if self.pes_number == 0 {
            return Err(CloudError::InvalidConfiguration(format!("cloudlet {} has no pes", self.id)));
        }
        let utilization = self.utilization_model.utilization();
        if !utilization.is_finite() || utilization <= 0. || utilization > 1. {
            return Err(CloudError::InvalidConfiguration(format!(
                "cloudlet {} has utilization out of (0, 1]: {}",
                self.id, utilization
            )));
        }
        Ok(())
    }

    /// Marks the cloudlet as finished with the given terminal status.
    pub(crate) fn finish(&mut self, status: CloudletStatus, time: f64) {
        self.status = status;
        self.finish_time = Some(time);
        if let Some(start) = self.exec_start_time {
            self.actual_cpu_time = time - start;
        }
    }
}
