//! Simulation configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::error::CloudError;
use crate::core::host::Host;
use crate::core::pe::make_pes;
use crate::core::vm_scheduler::vm_scheduler_resolver;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawSimulationConfig {
    pub seed: Option<u64>,
    pub message_delay: Option<f64>,
    pub allocation_retry_period: Option<f64>,
    pub vm_allocation_timeout: Option<f64>,
    pub simulation_length: Option<f64>,
    pub datacenters: Option<Vec<DatacenterConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of processing elements.
    pub pes: u32,
    /// MIPS rating of each processing element.
    pub mips: f64,
    /// Memory capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// VM scheduler, `TimeShared` by default.
    pub vm_scheduler: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl HostConfig {
    /// Builds hosts described by this config with IDs starting from `first_id`.
    pub fn build_hosts(&self, first_id: u32) -> Result<Vec<Host>, CloudError> {
        let scheduler = self.vm_scheduler.as_deref().unwrap_or("TimeShared");
        let mut hosts = Vec::new();
        for id in first_id..first_id + self.count.unwrap_or(1) {
            let pes = make_pes(self.pes, self.mips);
            let vm_scheduler = vm_scheduler_resolver(scheduler, pes.clone())?;
            hosts.push(Host::new(id, pes, self.ram, self.bw, self.storage, vm_scheduler));
        }
        Ok(hosts)
    }
}

/// Holds configuration of a single datacenter.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct DatacenterConfig {
    /// Datacenter name, must be unique.
    pub name: String,
    #[serde(default)]
    pub characteristics: DatacenterCharacteristics,
    /// VM allocation policy, `FirstFit` by default.
    pub allocation_policy: Option<String>,
    pub hosts: Vec<HostConfig>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Random seed.
    pub seed: u64,
    /// Message delay in seconds for communications between broker and datacenters.
    pub message_delay: f64,
    /// Period in seconds for retrying the failed VM allocation.
    pub allocation_retry_period: f64,
    /// Time in seconds during which a VM waits for free capacity, zero means no waiting.
    pub vm_allocation_timeout: f64,
    /// Simulation stops after this time, zero means running until no events are left.
    pub simulation_length: f64,
    /// Datacenters created by `CloudSimulation::from_config`.
    pub datacenters: Vec<DatacenterConfig>,
}

impl SimulationConfig {
    /// Creates simulation config with default parameter values.
    pub fn new() -> Self {
        Self {
            seed: 123,
            message_delay: 0.,
            allocation_retry_period: 1.0,
            vm_allocation_timeout: 0.,
            simulation_length: 0.,
            datacenters: Vec::new(),
        }
    }

    /// Creates simulation config from YAML string (uses default values if some parameters are absent).
    pub fn from_yaml(yaml: &str) -> Result<Self, CloudError> {
        let data: RawSimulationConfig = serde_yaml::from_str(yaml)
            .map_err(|e| CloudError::InvalidConfiguration(format!("can't parse YAML: {}", e)))?;
        let default = SimulationConfig::new();
        let config = Self {
            seed: data.seed.unwrap_or(default.seed),
            message_delay: data.message_delay.unwrap_or(default.message_delay),
            allocation_retry_period: data.allocation_retry_period.unwrap_or(default.allocation_retry_period),
            vm_allocation_timeout: data.vm_allocation_timeout.unwrap_or(default.vm_allocation_timeout),
            simulation_length: data.simulation_length.unwrap_or(default.simulation_length),
            datacenters: data.datacenters.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates simulation config by reading parameter values from .yaml file.
    pub fn from_file(file_name: &str) -> Result<Self, CloudError> {
        let yaml = std::fs::read_to_string(file_name)
            .map_err(|e| CloudError::InvalidConfiguration(format!("can't read file {}: {}", file_name, e)))?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        let durations = [
            ("message_delay", self.message_delay),
            ("allocation_retry_period", self.allocation_retry_period),
            ("vm_allocation_timeout", self.vm_allocation_timeout),
            ("simulation_length", self.simulation_length),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0. {
                return Err(CloudError::InvalidConfiguration(format!("{} is negative: {}", name, value)));
            }
        }
        if self.vm_allocation_timeout > 0. && self.allocation_retry_period <= 0. {
            return Err(CloudError::InvalidConfiguration(
                "allocation_retry_period must be positive when vm_allocation_timeout is set".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses config value string, which consists of two parts - name and options.
/// Example: TimeShared[oversubscription=true] parts are name TimeShared and options string "oversubscription=true".
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.split_once('[') {
        Some((l, r)) => (l.to_string(), Some(r.to_string().replace(']', ""))),
        None => (config_str.to_string(), None),
    }
}

/// Parses options string from config value, returns map with option names and values.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    let mut options = HashMap::new();
    for option_str in options_str.split(',') {
        if let Some((name, value)) = option_str.split_once('=') {
            options.insert(name.trim().to_string(), value.trim().to_string());
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_value() {
        let (name, options) = parse_config_value("TimeShared[oversubscription=true]");
        assert_eq!(name, "TimeShared");
        assert_eq!(options, Some("oversubscription=true".to_string()));
        assert_eq!(parse_config_value("FirstFit"), ("FirstFit".to_string(), None));

        let options = parse_options("option1=0.8, option2=something");
        assert_eq!(options.get("option1").unwrap(), "0.8");
        assert_eq!(options.get("option2").unwrap(), "something");
        assert_eq!(options.get("option3"), None);
    }

    #[test]
    fn test_missing_values_use_defaults() {
        let config = SimulationConfig::from_yaml("message_delay: 0.5\n").unwrap();
        assert_eq!(config.message_delay, 0.5);
        assert_eq!(config.seed, 123);
        assert_eq!(config.allocation_retry_period, 1.0);
        assert!(config.datacenters.is_empty());
    }

    #[test]
    fn test_datacenters_are_parsed() {
        let yaml = r#"
datacenters:
  - name: dc
    allocation_policy: BestFit
    characteristics:
      cost_per_pe_time: 1.5
    hosts:
      - pes: 2
        mips: 1000
        ram: 2048
        bw: 10000
        storage: 1000000
        count: 3
"#;
        let config = SimulationConfig::from_yaml(yaml).unwrap();
        let dc = &config.datacenters[0];
        assert_eq!(dc.allocation_policy.as_deref(), Some("BestFit"));
        assert_eq!(dc.characteristics.cost_per_pe_time, 1.5);
        assert_eq!(dc.characteristics.os, "Linux");
        let hosts = dc.hosts[0].build_hosts(10).unwrap();
        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts[2].id(), 12);
        assert_eq!(hosts[0].total_mips(), 2000.);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            SimulationConfig::from_yaml("message_delay: -1\n"),
            Err(CloudError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SimulationConfig::from_yaml("seed: [1, 2]\n"),
            Err(CloudError::InvalidConfiguration(_))
        ));
    }
}
