//! First Fit policy.

use crate::core::common::AllocationVerdict;
use crate::core::resource_pool::HostPool;
use crate::core::vm::VirtualMachine;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the first suitable host in the order of host IDs.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmAllocationPolicy for FirstFit {
    fn select_host(&self, vm: &VirtualMachine, pool: &HostPool) -> Option<u32> {
        pool.get_hosts_list()
            .into_iter()
            .find(|host| pool.can_allocate(vm, *host) == AllocationVerdict::Success)
    }
}
