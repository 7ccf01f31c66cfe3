use cloudlab_iaas::core::common::AllocationVerdict;
use cloudlab_iaas::core::error::CloudError;
use cloudlab_iaas::core::host::Host;
use cloudlab_iaas::core::pe::make_pes;
use cloudlab_iaas::core::resource_pool::HostPool;
use cloudlab_iaas::core::vm::{CloudletSchedulerKind, VirtualMachine};
use cloudlab_iaas::core::vm_allocation_policy::{allocation_policy_resolver, BestFit, FirstFit, VmAllocationPolicy, WorstFit};
use cloudlab_iaas::core::vm_scheduler::TimeSharedVmScheduler;

fn make_host(id: u32, mips: f64, ram: u64) -> Host {
    let pes = make_pes(1, mips);
    Host::new(id, pes.clone(), ram, 10000, 1000000, Box::new(TimeSharedVmScheduler::new(pes)))
}

fn make_vm(id: u32, mips: f64, ram: u64) -> VirtualMachine {
    VirtualMachine::new(id, mips, 1, ram, 100, 1000, "Xen", CloudletSchedulerKind::TimeShared)
}

/// Hosts with 1000, 3000 and 2000 MIPS, the first one is partially used.
fn make_pool() -> HostPool {
    let mut pool = HostPool::new();
    pool.add_host(make_host(0, 1000., 4096)).unwrap();
    pool.add_host(make_host(1, 3000., 4096)).unwrap();
    pool.add_host(make_host(2, 2000., 4096)).unwrap();
    assert_eq!(pool.allocate(&make_vm(100, 600., 512), 0), AllocationVerdict::Success);
    pool
}

#[test]
fn test_first_fit() {
    let pool = make_pool();
    let policy = FirstFit::new();
    assert_eq!(policy.select_host(&make_vm(0, 400., 512), &pool), Some(0));
    assert_eq!(policy.select_host(&make_vm(0, 500., 512), &pool), Some(1));
    assert_eq!(policy.select_host(&make_vm(0, 3500., 512), &pool), None);
}

#[test]
fn test_best_fit() {
    let pool = make_pool();
    let policy = BestFit::new();
    assert_eq!(policy.select_host(&make_vm(0, 400., 512), &pool), Some(0));
    assert_eq!(policy.select_host(&make_vm(0, 1500., 512), &pool), Some(2));
    assert_eq!(policy.select_host(&make_vm(0, 1500., 8192), &pool), None);
}

#[test]
fn test_worst_fit() {
    let pool = make_pool();
    let policy = WorstFit::new();
    assert_eq!(policy.select_host(&make_vm(0, 400., 512), &pool), Some(1));
    assert_eq!(policy.select_host(&make_vm(0, 2500., 512), &pool), Some(1));
}

#[test]
fn test_policy_does_not_change_pool() {
    let pool = make_pool();
    let vm = make_vm(0, 400., 512);
    FirstFit::new().select_host(&vm, &pool);
    assert_eq!(pool.host_of_vm((0, 0)), None);
    assert_eq!(pool.get_available_mips(0), 400.);
}

#[test]
fn test_same_vm_id_of_different_brokers() {
    let mut pool = make_pool();
    let mut vm = make_vm(100, 600., 512);
    vm.broker_id = 5;
    assert_eq!(pool.allocate(&vm, 1), AllocationVerdict::Success);
    assert_eq!(pool.host_of_vm((0, 100)), Some(0));
    assert_eq!(pool.host_of_vm((5, 100)), Some(1));
    assert_eq!(pool.host(1).unwrap().vms(), vec![(5, 100)]);

    assert_eq!(pool.deallocate((5, 100)), Some(1));
    assert_eq!(pool.host_of_vm((0, 100)), Some(0));
    assert_eq!(pool.get_available_mips(0), 400.);
    assert_eq!(pool.get_available_mips(1), 3000.);
}

#[test]
fn test_pool_allocation() {
    let mut pool = make_pool();
    assert_eq!(pool.host_of_vm((0, 100)), Some(0));
    assert_eq!(pool.can_allocate(&make_vm(0, 100., 512), 7), AllocationVerdict::HostNotFound);
    assert_eq!(
        pool.can_allocate(&make_vm(0, 100., 8192), 1),
        AllocationVerdict::NotEnoughMemory
    );
    assert_eq!(pool.fits_empty_host(&make_vm(0, 3000., 512)), AllocationVerdict::Success);
    assert_eq!(
        pool.fits_empty_host(&make_vm(0, 5000., 512)),
        AllocationVerdict::NotEnoughMips
    );

    assert_eq!(pool.deallocate((0, 100)), Some(0));
    assert_eq!(pool.deallocate((0, 100)), None);
    assert_eq!(pool.get_available_mips(0), 1000.);
    assert_eq!(pool.host(0).unwrap().ram().available(), 4096);
}

#[test]
fn test_duplicate_host_is_rejected() {
    let mut pool = make_pool();
    assert!(matches!(
        pool.add_host(make_host(1, 1000., 1024)),
        Err(CloudError::InvalidConfiguration(_))
    ));
    assert_eq!(pool.get_host_count(), 3);
}

#[test]
fn test_policy_resolver() {
    let pool = make_pool();
    let vm = make_vm(0, 400., 512);
    assert_eq!(allocation_policy_resolver("FirstFit").unwrap().select_host(&vm, &pool), Some(0));
    assert_eq!(allocation_policy_resolver("Simple").unwrap().select_host(&vm, &pool), Some(0));
    assert_eq!(allocation_policy_resolver("WorstFit").unwrap().select_host(&vm, &pool), Some(1));
    assert!(matches!(
        allocation_policy_resolver("Random"),
        Err(CloudError::InvalidConfiguration(_))
    ));
}
