use cloudlab_iaas::core::cloudlet::{Cloudlet, CloudletStatus, UtilizationModel};
use cloudlab_iaas::core::cloudlet_scheduler::{
    CloudletScheduler, SpaceSharedCloudletScheduler, TimeSharedCloudletScheduler,
};
use cloudlab_iaas::core::common::AllocationVerdict;
use cloudlab_iaas::core::error::CloudError;
use cloudlab_iaas::core::pe::make_pes;
use cloudlab_iaas::core::vm_scheduler::{
    vm_scheduler_resolver, SpaceSharedVmScheduler, TimeSharedVmScheduler, VmScheduler,
};

fn make_cloudlet(id: u32, length: u64, pes: u32) -> Cloudlet {
    Cloudlet::new(id, length, pes, 0, 0, UtilizationModel::Full)
}

fn rate_of(scheduler: &dyn CloudletScheduler, cloudlet_id: u32) -> f64 {
    scheduler
        .allocated_rates()
        .into_iter()
        .find(|(id, _)| *id == cloudlet_id)
        .map(|(_, rate)| rate)
        .unwrap()
}

#[test]
fn test_time_shared_vm_scheduler() {
    let mut scheduler = TimeSharedVmScheduler::new(make_pes(2, 1000.));
    assert_eq!(scheduler.can_allocate(&[500., 500., 500.]), AllocationVerdict::NotEnoughPes);
    assert_eq!(scheduler.can_allocate(&[1500.]), AllocationVerdict::NotEnoughMips);
    assert!(scheduler.allocate((0, 0), &[800., 800.]));
    assert_eq!(scheduler.allocated_mips((0, 0)), vec![800., 800.]);
    assert_eq!(scheduler.available_mips(), 400.);
    assert_eq!(scheduler.can_allocate(&[500.]), AllocationVerdict::NotEnoughMips);
    assert_eq!(scheduler.can_allocate_on_empty(&[500.]), AllocationVerdict::Success);
    assert!(!scheduler.allocate((0, 1), &[500.]));
    assert!(scheduler.allocate((0, 1), &[400.]));
    assert_eq!(scheduler.vm_count(), 2);

    scheduler.deallocate((0, 0));
    assert_eq!(scheduler.available_mips(), 1600.);
    assert_eq!(scheduler.allocated_mips((0, 0)), Vec::<f64>::new());
}

#[test]
fn test_time_shared_vm_scheduler_with_oversubscription() {
    let mut scheduler = TimeSharedVmScheduler::with_oversubscription(make_pes(1, 1000.));
    assert!(scheduler.allocate((0, 0), &[1000.]));
    assert!(scheduler.allocate((0, 1), &[1000.]));
    assert!(scheduler.allocate((0, 2), &[500.]));
    assert_eq!(scheduler.total_allocated_mips((0, 0)), 400.);
    assert_eq!(scheduler.total_allocated_mips((0, 2)), 200.);
    let total: f64 = (0..3).map(|vm_id| scheduler.total_allocated_mips((0, vm_id))).sum();
    assert!(total <= scheduler.total_mips() + 1e-9);

    scheduler.deallocate((0, 1));
    assert!((scheduler.total_allocated_mips((0, 0)) - 2000. / 3.).abs() < 1e-9);
    scheduler.deallocate((0, 2));
    assert_eq!(scheduler.total_allocated_mips((0, 0)), 1000.);
}

#[test]
fn test_space_shared_vm_scheduler() {
    let mut scheduler = SpaceSharedVmScheduler::new(make_pes(3, 1000.));
    assert!(scheduler.allocate((0, 0), &[1000., 1000.]));
    assert_eq!(scheduler.allocated_mips((0, 0)), vec![1000., 1000.]);
    assert_eq!(scheduler.available_mips(), 1000.);
    assert_eq!(scheduler.can_allocate(&[700., 700.]), AllocationVerdict::NotEnoughPes);
    assert_eq!(scheduler.can_allocate_on_empty(&[700., 700.]), AllocationVerdict::Success);
    assert!(scheduler.allocate((0, 1), &[700.]));
    assert_eq!(scheduler.available_mips(), 0.);

    scheduler.deallocate((0, 0));
    assert_eq!(scheduler.available_mips(), 2000.);
    assert_eq!(scheduler.can_allocate(&[1200.]), AllocationVerdict::NotEnoughMips);
}

#[test]
fn test_vm_scheduler_resolver() {
    let pes = make_pes(1, 1000.);
    let mut strict = vm_scheduler_resolver("TimeShared", pes.clone()).unwrap();
    assert!(strict.allocate((0, 0), &[1000.]));
    assert!(!strict.allocate((0, 1), &[1000.]));

    let mut oversubscribed = vm_scheduler_resolver("TimeShared[oversubscription=true]", pes.clone()).unwrap();
    assert!(oversubscribed.allocate((0, 0), &[1000.]));
    assert!(oversubscribed.allocate((0, 1), &[1000.]));

    assert!(vm_scheduler_resolver("SpaceShared", pes.clone()).is_ok());
    assert!(matches!(
        vm_scheduler_resolver("TimeShared[oversubscription=maybe]", pes.clone()),
        Err(CloudError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        vm_scheduler_resolver("Dynamic", pes),
        Err(CloudError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_time_shared_cloudlet_scheduler_rates() {
    let mut scheduler = TimeSharedCloudletScheduler::new(2);
    scheduler.update_capacity(0., &[500., 500.]);
    scheduler.submit(0., make_cloudlet(0, 10000, 1)).unwrap();
    // single-PE cloudlet cannot use the second PE
    assert_eq!(rate_of(&scheduler, 0), 500.);
    assert_eq!(scheduler.next_finish_time(), Some(20.));

    scheduler.submit(4., make_cloudlet(1, 6000, 2)).unwrap();
    // 3 requested PEs share 1000 MIPS
    assert!((rate_of(&scheduler, 0) - 1000. / 3.).abs() < 1e-9);
    assert!((rate_of(&scheduler, 1) - 2000. / 3.).abs() < 1e-9);
    assert_eq!(scheduler.running_count(), 2);

    let rejected = scheduler.submit(4., make_cloudlet(2, 100, 3));
    assert_eq!(rejected.unwrap_err().id, 2);
}

#[test]
fn test_time_shared_cloudlet_scheduler_progress() {
    let mut scheduler = TimeSharedCloudletScheduler::new(1);
    scheduler.update_capacity(0., &[100.]);
    scheduler.submit(0., make_cloudlet(0, 1000, 1)).unwrap();
    scheduler.submit(0., make_cloudlet(1, 500, 1)).unwrap();
    assert_eq!(scheduler.next_finish_time(), Some(10.));
    assert!(scheduler.collect_finished(5.).is_empty());

    let finished = scheduler.collect_finished(10.);
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].id, 1);
    assert_eq!(finished[0].status, CloudletStatus::Success);
    assert_eq!(finished[0].finish_time, Some(10.));
    assert_eq!(scheduler.next_finish_time(), Some(15.));

    // capacity drop at 11 slows the remaining 400 MI down to 50 MIPS
    scheduler.update_capacity(11., &[50.]);
    assert_eq!(scheduler.next_finish_time(), Some(19.));
    let finished = scheduler.collect_finished(19.);
    assert_eq!(finished[0].actual_cpu_time, 19.);
    assert!(scheduler.is_idle());
}

#[test]
fn test_time_shared_cloudlet_scheduler_pause_and_cancel() {
    let mut scheduler = TimeSharedCloudletScheduler::new(1);
    scheduler.update_capacity(0., &[100.]);
    scheduler.submit(0., make_cloudlet(0, 1000, 1)).unwrap();
    scheduler.submit(0., make_cloudlet(1, 1000, 1)).unwrap();

    assert!(scheduler.pause(2., 0));
    assert!(!scheduler.pause(2., 0));
    assert_eq!(scheduler.paused_count(), 1);
    assert_eq!(rate_of(&scheduler, 1), 100.);
    // 900 MI left for cloudlet 1
    assert_eq!(scheduler.next_finish_time(), Some(11.));

    assert!(scheduler.resume(3., 0));
    // 800 MI left for cloudlet 1 at 50 MIPS
    assert_eq!(scheduler.next_finish_time(), Some(19.));

    let canceled = scheduler.cancel(4., 1).unwrap();
    assert_eq!(canceled.status, CloudletStatus::Canceled);
    assert_eq!(canceled.finish_time, Some(4.));
    assert!(scheduler.cancel(4., 1).is_none());

    let rest = scheduler.cancel_all(5.);
    assert_eq!(rest.len(), 1);
    assert!(scheduler.is_idle());
}

#[test]
fn test_space_shared_cloudlet_scheduler() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(2);
    scheduler.update_capacity(0., &[100., 100.]);
    scheduler.submit(0., make_cloudlet(0, 1000, 1)).unwrap();
    scheduler.submit(0., make_cloudlet(1, 2000, 2)).unwrap();
    scheduler.submit(0., make_cloudlet(2, 500, 1)).unwrap();

    // cloudlet 2 fits the free PE but does not overtake cloudlet 1
    assert_eq!(scheduler.running_count(), 1);
    assert_eq!(scheduler.waiting_count(), 2);
    assert_eq!(rate_of(&scheduler, 0), 100.);

    let finished = scheduler.collect_finished(10.);
    assert_eq!(finished[0].id, 0);
    assert_eq!(scheduler.running_count(), 1);
    assert_eq!(rate_of(&scheduler, 1), 200.);
    assert_eq!(scheduler.next_finish_time(), Some(20.));

    let finished = scheduler.collect_finished(20.);
    assert_eq!(finished[0].exec_start_time, Some(10.));
    assert_eq!(rate_of(&scheduler, 2), 100.);
    assert_eq!(scheduler.next_finish_time(), Some(25.));
}

#[test]
fn test_space_shared_cloudlet_scheduler_resume_requeues() {
    let mut scheduler = SpaceSharedCloudletScheduler::new(1);
    scheduler.update_capacity(0., &[100.]);
    scheduler.submit(0., make_cloudlet(0, 1000, 1)).unwrap();
    scheduler.submit(0., make_cloudlet(1, 1000, 1)).unwrap();

    assert!(scheduler.pause(5., 0));
    assert_eq!(rate_of(&scheduler, 1), 100.);
    assert!(scheduler.resume(6., 0));
    assert_eq!(scheduler.waiting_count(), 1);
    assert_eq!(scheduler.running_count(), 1);

    let finished = scheduler.collect_finished(15.);
    assert_eq!(finished[0].id, 1);
    // 500 MI left after the pause
    assert_eq!(scheduler.next_finish_time(), Some(20.));
}

#[test]
fn test_partial_utilization_slows_cloudlet() {
    let mut scheduler = TimeSharedCloudletScheduler::new(1);
    scheduler.update_capacity(0., &[100.]);
    let mut cloudlet = make_cloudlet(0, 1000, 1);
    cloudlet.utilization_model = UtilizationModel::Constant { ratio: 0.25 };
    scheduler.submit(0., cloudlet).unwrap();
    assert_eq!(rate_of(&scheduler, 0), 25.);
    assert_eq!(scheduler.next_finish_time(), Some(40.));
}

#[test]
fn test_long_cloudlets_finish_at_large_times() {
    for mips in [333.3, 777.7, 1000. / 3., 123.456] {
        let mut scheduler = TimeSharedCloudletScheduler::new(1);
        scheduler.update_capacity(0., &[mips]);
        scheduler.submit(0., make_cloudlet(0, 100_000_000_000, 1)).unwrap();
        scheduler.submit(0., make_cloudlet(1, 100_000_000_000, 1)).unwrap();

        let mut finished = Vec::new();
        let mut updates = 0;
        while let Some(time) = scheduler.next_finish_time() {
            finished.extend(scheduler.collect_finished(time));
            updates += 1;
            assert!(updates < 100, "no progress at {} MIPS", mips);
        }
        assert_eq!(finished.len(), 2);
        let expected = 2e11 / mips;
        for cloudlet in finished {
            let finish_time = cloudlet.finish_time.unwrap();
            assert!((finish_time - expected).abs() / expected < 1e-9);
        }
    }
}
