//! Pool of datacenter hosts.

use std::collections::BTreeMap;

use crate::core::common::AllocationVerdict;
use crate::core::error::CloudError;
use crate::core::host::Host;
use crate::core::vm::{VirtualMachine, VmKey};

/// Stores datacenter hosts ordered by their IDs along with current VM placements.
pub struct HostPool {
    hosts: BTreeMap<u32, Host>,
    vm_to_host: BTreeMap<VmKey, u32>,
}

impl HostPool {
    /// Creates empty host pool.
    pub fn new() -> Self {
        Self {
            hosts: BTreeMap::new(),
            vm_to_host: BTreeMap::new(),
        }
    }

    /// Adds host to pool, host IDs must be unique.
    pub fn add_host(&mut self, host: Host) -> Result<(), CloudError> {
        host.validate()?;
        if self.hosts.contains_key(&host.id()) {
            return Err(CloudError::InvalidConfiguration(format!("duplicate host id: {}", host.id())));
        }
        self.hosts.insert(host.id(), host);
        Ok(())
    }

    /// Returns IDs of all hosts in ascending order.
    pub fn get_hosts_list(&self) -> Vec<u32> {
        self.hosts.keys().cloned().collect()
    }

    pub fn get_host_count(&self) -> u32 {
        self.hosts.len() as u32
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(&host_id)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Checks if the VM can currently be placed on the specified host.
    pub fn can_allocate(&self, vm: &VirtualMachine, host_id: u32) -> AllocationVerdict {
        match self.hosts.get(&host_id) {
            Some(host) => host.can_allocate(vm),
            None => AllocationVerdict::HostNotFound,
        }
    }

    /// Places the VM on the specified host.
    pub fn allocate(&mut self, vm: &VirtualMachine, host_id: u32) -> AllocationVerdict {
        if let Some(current) = self.vm_to_host.get(&vm.key()) {
            return if *current == host_id {
                AllocationVerdict::Success
            } else {
                AllocationVerdict::HostNotFound
            };
        }
        let verdict = match self.hosts.get_mut(&host_id) {
            Some(host) => host.allocate(vm),
            None => AllocationVerdict::HostNotFound,
        };
        if verdict == AllocationVerdict::Success {
            self.vm_to_host.insert(vm.key(), host_id);
        }
        verdict
    }

    /// Removes the VM from its host, returns the host ID.
    pub fn deallocate(&mut self, vm: VmKey) -> Option<u32> {
        let host_id = self.vm_to_host.remove(&vm)?;
        if let Some(host) = self.hosts.get_mut(&host_id) {
            host.deallocate(vm);
        }
        Some(host_id)
    }

    pub fn host_of_vm(&self, vm: VmKey) -> Option<u32> {
        self.vm_to_host.get(&vm).copied()
    }

    pub fn get_available_mips(&self, host_id: u32) -> f64 {
        self.hosts.get(&host_id).map(|host| host.available_mips()).unwrap_or(0.)
    }

    /// Checks if the VM fits at least one host when it is empty.
    ///
    /// Returns the verdict of the first host otherwise, or `HostNotFound` for the empty pool.
    pub fn fits_empty_host(&self, vm: &VirtualMachine) -> AllocationVerdict {
        let mut result = AllocationVerdict::HostNotFound;
        for host in self.hosts.values() {
            let verdict = host.can_allocate_on_empty(vm);
            if verdict == AllocationVerdict::Success {
                return verdict;
            }
            if result == AllocationVerdict::HostNotFound {
                result = verdict;
            }
        }
        result
    }

    /// Explains why the VM cannot be placed right now, using the verdict of the first host.
    pub fn rejection_verdict(&self, vm: &VirtualMachine) -> AllocationVerdict {
        self.hosts
            .values()
            .map(|host| host.can_allocate(vm))
            .find(|verdict| *verdict != AllocationVerdict::Success)
            .unwrap_or(AllocationVerdict::HostNotFound)
    }
}

impl Default for HostPool {
    fn default() -> Self {
        Self::new()
    }
}
