//! Worst Fit policy.

use crate::core::common::AllocationVerdict;
use crate::core::resource_pool::HostPool;
use crate::core::vm::VirtualMachine;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the least loaded (by unrequested MIPS) suitable host.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmAllocationPolicy for WorstFit {
    fn select_host(&self, vm: &VirtualMachine, pool: &HostPool) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut max_available_mips = f64::NEG_INFINITY;

        for host in pool.get_hosts_list() {
            if pool.can_allocate(vm, host) == AllocationVerdict::Success
                && pool.get_available_mips(host) > max_available_mips
            {
                max_available_mips = pool.get_available_mips(host);
                result = Some(host);
            }
        }
        result
    }
}
