use std::collections::BTreeMap;

use cloudlab_core::EPSILON;

use crate::core::common::AllocationVerdict;
use crate::core::pe::ProcessingElement;
use crate::core::vm::VmKey;
use crate::core::vm_scheduler::VmScheduler;

/// Shares the host capacity between VMs by time slicing.
///
/// Each VM gets its requested MIPS while the total request fits the host.
/// In oversubscription mode VMs are admitted beyond the host capacity, and all requests are scaled
/// proportionally so that the sum of allocated MIPS equals the host capacity.
pub struct TimeSharedVmScheduler {
    pes: Vec<ProcessingElement>,
    oversubscription: bool,
    requested: BTreeMap<VmKey, Vec<f64>>,
}

impl TimeSharedVmScheduler {
    /// Creates scheduler which rejects VMs not fitting into the free capacity.
    pub fn new(pes: Vec<ProcessingElement>) -> Self {
        Self {
            pes,
            oversubscription: false,
            requested: BTreeMap::new(),
        }
    }

    /// Creates scheduler which admits VMs beyond the host capacity.
    pub fn with_oversubscription(pes: Vec<ProcessingElement>) -> Self {
        Self {
            pes,
            oversubscription: true,
            requested: BTreeMap::new(),
        }
    }

    fn max_pe_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).fold(0., f64::max)
    }

    fn total_requested(&self) -> f64 {
        self.requested.values().flatten().sum()
    }

    fn share_factor(&self) -> f64 {
        let total_requested = self.total_requested();
        let total_mips = self.total_mips();
        if total_requested <= total_mips {
            1.
        } else {
            total_mips / total_requested
        }
    }

    fn check(&self, requested_mips: &[f64], already_requested: f64) -> AllocationVerdict {
        if requested_mips.is_empty() || requested_mips.len() > self.pes.len() {
            return AllocationVerdict::NotEnoughPes;
        }
        let max_pe_mips = self.max_pe_mips();
        if requested_mips.iter().any(|mips| *mips > max_pe_mips) {
            return AllocationVerdict::NotEnoughMips;
        }
        let request: f64 = requested_mips.iter().sum();
        if !self.oversubscription && already_requested + request > self.total_mips() + EPSILON {
            return AllocationVerdict::NotEnoughMips;
        }
        AllocationVerdict::Success
    }
}

impl VmScheduler for TimeSharedVmScheduler {
    fn can_allocate(&self, requested_mips: &[f64]) -> AllocationVerdict {
        self.check(requested_mips, self.total_requested())
    }

    fn can_allocate_on_empty(&self, requested_mips: &[f64]) -> AllocationVerdict {
        self.check(requested_mips, 0.)
    }

    fn allocate(&mut self, vm: VmKey, requested_mips: &[f64]) -> bool {
        if self.requested.contains_key(&vm) || self.can_allocate(requested_mips) != AllocationVerdict::Success {
            return false;
        }
        self.requested.insert(vm, requested_mips.to_vec());
        true
    }

    fn deallocate(&mut self, vm: VmKey) {
        self.requested.remove(&vm);
    }

    fn allocated_mips(&self, vm: VmKey) -> Vec<f64> {
        let factor = self.share_factor();
        match self.requested.get(&vm) {
            Some(requested) => requested.iter().map(|mips| mips * factor).collect(),
            None => Vec::new(),
        }
    }

    fn available_mips(&self) -> f64 {
        (self.total_mips() - self.total_requested()).max(0.)
    }

    fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).sum()
    }

    fn vm_count(&self) -> usize {
        self.requested.len()
    }
}
