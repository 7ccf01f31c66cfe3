//! Datacenter characteristics and resource prices.

use serde::{Deserialize, Serialize};

use crate::core::error::CloudError;

/// Static properties of a datacenter along with the prices of its resources.
///
/// Prices are charged for memory (per MB) and storage (per MB) on VM creation,
/// for bandwidth (per MB of cloudlet input and output) on cloudlet submission
/// and for processing (per second per PE) when a cloudlet leaves its VM.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DatacenterCharacteristics {
    pub architecture: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    pub cost_per_pe_time: f64,
    pub cost_per_mem: f64,
    pub cost_per_storage: f64,
    pub cost_per_bw: f64,
}

impl DatacenterCharacteristics {
    pub fn validate(&self) -> Result<(), CloudError> {
        if !self.time_zone.is_finite() || !(-12. ..=14.).contains(&self.time_zone) {
            return Err(CloudError::InvalidConfiguration(format!(
                "time zone out of range: {}",
                self.time_zone
            )));
        }
        let prices = [
            ("cost_per_pe_time", self.cost_per_pe_time),
            ("cost_per_mem", self.cost_per_mem),
            ("cost_per_storage", self.cost_per_storage),
            ("cost_per_bw", self.cost_per_bw),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value < 0. {
                return Err(CloudError::InvalidConfiguration(format!("{} is negative: {}", name, value)));
            }
        }
        Ok(())
    }

    pub fn memory_cost(&self, ram: u64) -> f64 {
        ram as f64 * self.cost_per_mem
    }

    pub fn storage_cost(&self, size: u64) -> f64 {
        size as f64 * self.cost_per_storage
    }

    pub fn bw_cost(&self, amount: u64) -> f64 {
        amount as f64 * self.cost_per_bw
    }

    pub fn processing_cost(&self, cpu_time: f64, pes: u32) -> f64 {
        cpu_time * pes as f64 * self.cost_per_pe_time
    }
}

impl Default for DatacenterCharacteristics {
    fn default() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "Xen".to_string(),
            time_zone: 10.0,
            cost_per_pe_time: 3.0,
            cost_per_mem: 0.05,
            cost_per_storage: 0.001,
            cost_per_bw: 0.0,
        }
    }
}
