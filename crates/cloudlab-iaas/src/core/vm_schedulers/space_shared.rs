use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::AllocationVerdict;
use crate::core::pe::ProcessingElement;
use crate::core::vm::VmKey;
use crate::core::vm_scheduler::VmScheduler;

/// Assigns host PEs to VMs exclusively.
///
/// Each virtual PE is pinned to a distinct free host PE with enough MIPS
/// and gets exactly the requested MIPS.
pub struct SpaceSharedVmScheduler {
    pes: Vec<ProcessingElement>,
    free_pes: BTreeSet<usize>,
    assignments: BTreeMap<VmKey, Vec<(usize, f64)>>,
}

impl SpaceSharedVmScheduler {
    pub fn new(pes: Vec<ProcessingElement>) -> Self {
        let free_pes = (0..pes.len()).collect();
        Self {
            pes,
            free_pes,
            assignments: BTreeMap::new(),
        }
    }

    /// Selects a distinct PE for each requested virtual PE among the candidates.
    fn select_pes(&self, requested_mips: &[f64], candidates: &BTreeSet<usize>) -> Result<Vec<usize>, AllocationVerdict> {
        if requested_mips.is_empty() || requested_mips.len() > candidates.len() {
            return Err(AllocationVerdict::NotEnoughPes);
        }
        let mut selected: Vec<usize> = Vec::with_capacity(requested_mips.len());
        for mips in requested_mips {
            let pe = candidates
                .iter()
                .find(|idx| !selected.contains(*idx) && self.pes[**idx].mips >= *mips);
            match pe {
                Some(idx) => selected.push(*idx),
                None => return Err(AllocationVerdict::NotEnoughMips),
            }
        }
        Ok(selected)
    }
}

impl VmScheduler for SpaceSharedVmScheduler {
    fn can_allocate(&self, requested_mips: &[f64]) -> AllocationVerdict {
        match self.select_pes(requested_mips, &self.free_pes) {
            Ok(_) => AllocationVerdict::Success,
            Err(verdict) => verdict,
        }
    }

    fn can_allocate_on_empty(&self, requested_mips: &[f64]) -> AllocationVerdict {
        let all_pes: BTreeSet<usize> = (0..self.pes.len()).collect();
        match self.select_pes(requested_mips, &all_pes) {
            Ok(_) => AllocationVerdict::Success,
            Err(verdict) => verdict,
        }
    }

    fn allocate(&mut self, vm: VmKey, requested_mips: &[f64]) -> bool {
        if self.assignments.contains_key(&vm) {
            return false;
        }
        match self.select_pes(requested_mips, &self.free_pes) {
            Ok(selected) => {
                for idx in selected.iter() {
                    self.free_pes.remove(idx);
                }
                let assignment = selected.into_iter().zip(requested_mips.iter().copied()).collect();
                self.assignments.insert(vm, assignment);
                true
            }
            Err(_) => false,
        }
    }

    fn deallocate(&mut self, vm: VmKey) {
        if let Some(assignment) = self.assignments.remove(&vm) {
            for (idx, _) in assignment {
                self.free_pes.insert(idx);
            }
        }
    }

    fn allocated_mips(&self, vm: VmKey) -> Vec<f64> {
        match self.assignments.get(&vm) {
            Some(assignment) => assignment.iter().map(|(_, mips)| *mips).collect(),
            None => Vec::new(),
        }
    }

    fn available_mips(&self) -> f64 {
        self.free_pes.iter().map(|idx| self.pes[*idx].mips).sum()
    }

    fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.mips).sum()
    }

    fn vm_count(&self) -> usize {
        self.assignments.len()
    }
}
