//! VM allocation policies.

use crate::core::config::parse_config_value;
use crate::core::error::CloudError;
use crate::core::resource_pool::HostPool;
pub use crate::core::vm_allocation_policies::best_fit::BestFit;
pub use crate::core::vm_allocation_policies::first_fit::FirstFit;
pub use crate::core::vm_allocation_policies::worst_fit::WorstFit;
use crate::core::vm::VirtualMachine;

/// Trait for implementation of VM allocation policies.
///
/// The policy is defined as a function of VM and current state of datacenter hosts, which returns an ID of host
/// selected for VM placement or `None` if there is no suitable host. The policy does not change the pool,
/// the placement itself is performed by the datacenter.
pub trait VmAllocationPolicy {
    fn select_host(&self, vm: &VirtualMachine, pool: &HostPool) -> Option<u32>;
}

/// Creates allocation policy from its name.
pub fn allocation_policy_resolver(config_str: &str) -> Result<Box<dyn VmAllocationPolicy>, CloudError> {
    let (policy_name, _options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "FirstFit" | "Simple" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        _ => Err(CloudError::InvalidConfiguration(format!(
            "unknown vm allocation policy: {}",
            config_str
        ))),
    }
}
