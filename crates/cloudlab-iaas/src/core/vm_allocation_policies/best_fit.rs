//! Best Fit policy.

use crate::core::common::AllocationVerdict;
use crate::core::resource_pool::HostPool;
use crate::core::vm::VirtualMachine;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the most loaded (by unrequested MIPS) suitable host.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmAllocationPolicy for BestFit {
    fn select_host(&self, vm: &VirtualMachine, pool: &HostPool) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_available_mips = f64::INFINITY;

        for host in pool.get_hosts_list() {
            if pool.can_allocate(vm, host) == AllocationVerdict::Success
                && pool.get_available_mips(host) < min_available_mips
            {
                min_available_mips = pool.get_available_mips(host);
                result = Some(host);
            }
        }
        result
    }
}
