//! Sharing of host processing capacity between VMs.

use crate::core::common::AllocationVerdict;
use crate::core::config::{parse_config_value, parse_options};
use crate::core::error::CloudError;
use crate::core::pe::ProcessingElement;
use crate::core::vm::VmKey;
pub use crate::core::vm_schedulers::space_shared::SpaceSharedVmScheduler;
pub use crate::core::vm_schedulers::time_shared::TimeSharedVmScheduler;

/// Trait for implementation of VM schedulers.
///
/// VM scheduler decides whether a VM with the given per-PE MIPS request can be admitted on the host
/// and how much MIPS each virtual PE of admitted VMs actually gets.
/// The allocated shares are recomputed whenever a VM is allocated or deallocated,
/// and the total allocated MIPS never exceeds the total MIPS of host PEs.
pub trait VmScheduler {
    /// Checks whether the VM can be admitted given the current allocations.
    fn can_allocate(&self, requested_mips: &[f64]) -> AllocationVerdict;

    /// Checks whether the VM could be admitted if the host was empty.
    fn can_allocate_on_empty(&self, requested_mips: &[f64]) -> AllocationVerdict;

    /// Admits the VM, returns `false` if it does not fit.
    fn allocate(&mut self, vm: VmKey, requested_mips: &[f64]) -> bool;

    fn deallocate(&mut self, vm: VmKey);

    /// Returns MIPS currently allocated to each virtual PE of the VM.
    fn allocated_mips(&self, vm: VmKey) -> Vec<f64>;

    fn total_allocated_mips(&self, vm: VmKey) -> f64 {
        self.allocated_mips(vm).iter().sum()
    }

    /// Returns MIPS which are not requested by any VM.
    fn available_mips(&self) -> f64;

    fn total_mips(&self) -> f64;

    fn vm_count(&self) -> usize;
}

/// Creates VM scheduler from a config string such as `TimeShared`, `TimeShared[oversubscription=true]`
/// or `SpaceShared`.
pub fn vm_scheduler_resolver(
    config_str: &str,
    pes: Vec<ProcessingElement>,
) -> Result<Box<dyn VmScheduler>, CloudError> {
    let (name, options) = parse_config_value(config_str);
    match name.as_str() {
        "TimeShared" => {
            let options = parse_options(&options.unwrap_or_default());
            match options.get("oversubscription").map(|s| s.as_str()) {
                None | Some("false") => Ok(Box::new(TimeSharedVmScheduler::new(pes))),
                Some("true") => Ok(Box::new(TimeSharedVmScheduler::with_oversubscription(pes))),
                Some(value) => Err(CloudError::InvalidConfiguration(format!(
                    "bad oversubscription value: {}",
                    value
                ))),
            }
        }
        "SpaceShared" => Ok(Box::new(SpaceSharedVmScheduler::new(pes))),
        _ => Err(CloudError::InvalidConfiguration(format!(
            "unknown vm scheduler: {}",
            config_str
        ))),
    }
}
