//! Physical host.

use std::collections::BTreeSet;

use crate::core::common::AllocationVerdict;
use crate::core::error::CloudError;
use crate::core::pe::ProcessingElement;
use crate::core::provisioner::ResourceProvisioner;
use crate::core::vm::{VirtualMachine, VmKey};
use crate::core::vm_scheduler::VmScheduler;

/// Physical machine with processing elements, memory, bandwidth and storage.
///
/// Memory, bandwidth and storage are split between VMs by provisioners,
/// processing capacity is shared by the VM scheduler.
pub struct Host {
    id: u32,
    pes: Vec<ProcessingElement>,
    ram: ResourceProvisioner,
    bw: ResourceProvisioner,
    storage: ResourceProvisioner,
    vm_scheduler: Box<dyn VmScheduler>,
    vms: BTreeSet<VmKey>,
}

impl Host {
    pub fn new(
        id: u32,
        pes: Vec<ProcessingElement>,
        ram: u64,
        bw: u64,
        storage: u64,
        vm_scheduler: Box<dyn VmScheduler>,
    ) -> Self {
        Self {
            id,
            pes,
            ram: ResourceProvisioner::new(ram),
            bw: ResourceProvisioner::new(bw),
            storage: ResourceProvisioner::new(storage),
            vm_scheduler,
            vms: BTreeSet::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if self.pes.is_empty() {
            return Err(CloudError::InvalidConfiguration(format!("host {} has no pes", self.id)));
        }
        if let Some(pe) = self.pes.iter().find(|pe| !pe.mips.is_finite() || pe.mips <= 0.) {
            return Err(CloudError::InvalidConfiguration(format!(
                "pe {} of host {} has non-positive mips: {}",
                pe.id, self.id, pe.mips
            )));
        }
        let total_mips: f64 = self.pes.iter().map(|pe| pe.mips).sum();
        if (total_mips - self.vm_scheduler.total_mips()).abs() > 1e-9 * total_mips {
            return Err(CloudError::InvalidConfiguration(format!(
                "vm scheduler of host {} is built for other pes",
                self.id
            )));
        }
        Ok(())
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn pes(&self) -> &[ProcessingElement] {
        &self.pes
    }

    pub fn total_mips(&self) -> f64 {
        self.vm_scheduler.total_mips()
    }

    pub fn available_mips(&self) -> f64 {
        self.vm_scheduler.available_mips()
    }

    pub fn ram(&self) -> &ResourceProvisioner {
        &self.ram
    }

    pub fn bw(&self) -> &ResourceProvisioner {
        &self.bw
    }

    pub fn storage(&self) -> &ResourceProvisioner {
        &self.storage
    }

    /// Returns keys of VMs placed on the host.
    pub fn vms(&self) -> Vec<VmKey> {
        self.vms.iter().copied().collect()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// Checks if the VM can be placed on the host right now.
    pub fn can_allocate(&self, vm: &VirtualMachine) -> AllocationVerdict {
        if !self.storage.can_allocate(vm.size) {
            return AllocationVerdict::NotEnoughStorage;
        }
        if !self.ram.can_allocate(vm.ram) {
            return AllocationVerdict::NotEnoughMemory;
        }
        if !self.bw.can_allocate(vm.bw) {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        self.vm_scheduler.can_allocate(&vm.requested_mips())
    }

    /// Checks if the VM could be placed on the host without other VMs.
    pub fn can_allocate_on_empty(&self, vm: &VirtualMachine) -> AllocationVerdict {
        if vm.size > self.storage.capacity() {
            return AllocationVerdict::NotEnoughStorage;
        }
        if vm.ram > self.ram.capacity() {
            return AllocationVerdict::NotEnoughMemory;
        }
        if vm.bw > self.bw.capacity() {
            return AllocationVerdict::NotEnoughBandwidth;
        }
        self.vm_scheduler.can_allocate_on_empty(&vm.requested_mips())
    }

    /// Places the VM on the host if it fits, otherwise leaves the host unchanged.
    pub fn allocate(&mut self, vm: &VirtualMachine) -> AllocationVerdict {
        let key = vm.key();
        if self.vms.contains(&key) {
            return AllocationVerdict::Success;
        }
        let verdict = self.can_allocate(vm);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        self.ram.allocate(key, vm.ram);
        self.bw.allocate(key, vm.bw);
        self.storage.allocate(key, vm.size);
        self.vm_scheduler.allocate(key, &vm.requested_mips());
        self.vms.insert(key);
        AllocationVerdict::Success
    }

    /// Releases all resources of the VM, returns `false` if the VM is not on this host.
    pub fn deallocate(&mut self, vm: VmKey) -> bool {
        if !self.vms.remove(&vm) {
            return false;
        }
        self.ram.release(vm);
        self.bw.release(vm);
        self.storage.release(vm);
        self.vm_scheduler.deallocate(vm);
        true
    }

    /// Returns MIPS allocated to each virtual PE of the VM.
    pub fn allocated_mips(&self, vm: VmKey) -> Vec<f64> {
        self.vm_scheduler.allocated_mips(vm)
    }

    pub fn total_allocated_mips(&self, vm: VmKey) -> f64 {
        self.vm_scheduler.total_allocated_mips(vm)
    }
}
