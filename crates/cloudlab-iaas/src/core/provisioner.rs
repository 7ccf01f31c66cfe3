//! Provisioning of host resources between VMs.

use std::collections::BTreeMap;

use crate::core::vm::VmKey;

/// Tracks the allocation of a single host resource (memory, bandwidth or storage) between VMs.
///
/// The total amount allocated to VMs never exceeds the resource capacity.
#[derive(Clone, Debug)]
pub struct ResourceProvisioner {
    capacity: u64,
    available: u64,
    allocations: BTreeMap<VmKey, u64>,
}

impl ResourceProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            available: capacity,
            allocations: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn available(&self) -> u64 {
        self.available
    }

    pub fn allocated(&self) -> u64 {
        self.capacity - self.available
    }

    /// Returns the amount allocated to the specified VM (zero if there is no allocation).
    pub fn allocated_for(&self, vm: VmKey) -> u64 {
        self.allocations.get(&vm).copied().unwrap_or(0)
    }

    pub fn can_allocate(&self, amount: u64) -> bool {
        amount <= self.available
    }

    /// Allocates the specified amount to the VM, replacing its previous allocation.
    ///
    /// Returns `false` and keeps the previous allocation if there is not enough resource.
    pub fn allocate(&mut self, vm: VmKey, amount: u64) -> bool {
        let previous = self.allocated_for(vm);
        if amount > self.available + previous {
            return false;
        }
        self.available = self.available + previous - amount;
        self.allocations.insert(vm, amount);
        true
    }

    /// Releases the allocation of the VM and returns the released amount.
    pub fn release(&mut self, vm: VmKey) -> u64 {
        let amount = self.allocations.remove(&vm).unwrap_or(0);
        self.available += amount;
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_release() {
        let mut ram = ResourceProvisioner::new(2048);
        assert!(ram.allocate((0, 0), 512));
        assert!(ram.allocate((0, 1), 1024));
        assert_eq!(ram.available(), 512);
        assert_eq!(ram.allocated(), 1536);
        assert!(!ram.can_allocate(1024));
        assert!(!ram.allocate((0, 2), 1024));
        assert_eq!(ram.allocated_for((0, 2)), 0);

        assert_eq!(ram.release((0, 1)), 1024);
        assert_eq!(ram.release((0, 1)), 0);
        assert_eq!(ram.available(), 1536);
    }

    #[test]
    fn test_reallocation_replaces_previous_amount() {
        let mut bw = ResourceProvisioner::new(1000);
        assert!(bw.allocate((0, 0), 800));
        assert!(bw.allocate((0, 0), 1000));
        assert_eq!(bw.available(), 0);
        assert!(!bw.allocate((0, 0), 1001));
        assert_eq!(bw.allocated_for((0, 0)), 1000);
        assert!(bw.allocate((0, 0), 100));
        assert_eq!(bw.available(), 900);
    }

    #[test]
    fn test_exact_capacity_fits() {
        let mut storage = ResourceProvisioner::new(10000);
        assert!(storage.can_allocate(10000));
        assert!(storage.allocate((0, 3), 10000));
        assert!(!storage.can_allocate(1));
    }
}
