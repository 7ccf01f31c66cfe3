//! Sharing of VM processing capacity between cloudlets.

use crate::core::cloudlet::Cloudlet;
pub use crate::core::cloudlet_schedulers::space_shared::SpaceSharedCloudletScheduler;
pub use crate::core::cloudlet_schedulers::time_shared::TimeSharedCloudletScheduler;
use crate::core::vm::CloudletSchedulerKind;

/// Remaining length (in MI) below which a cloudlet is considered finished.
pub const FINISH_TOLERANCE: f64 = 1e-6;

/// Trait for implementation of cloudlet schedulers.
///
/// The scheduler keeps the progress of each cloudlet in its VM. Processing rates are constant between
/// changes (capacity update, cloudlet submission, completion, pause, resume or cancellation), so every
/// method taking `time` first advances the progress of running cloudlets to `time` at the old rates
/// and then recalculates the rates.
pub trait CloudletScheduler {
    /// Advances the progress of running cloudlets to the given time.
    fn advance(&mut self, time: f64);

    /// Sets MIPS available to each virtual PE of the VM.
    fn update_capacity(&mut self, time: f64, mips_share: &[f64]);

    /// Accepts the cloudlet for execution.
    ///
    /// Returns the cloudlet back if it requires more PEs than the VM has.
    fn submit(&mut self, time: f64, cloudlet: Cloudlet) -> Result<(), Cloudlet>;

    /// Removes the cloudlet in any non-terminal state and marks it as canceled.
    fn cancel(&mut self, time: f64, cloudlet_id: u32) -> Option<Cloudlet>;

    /// Cancels all cloudlets, e.g. when the VM is destroyed.
    fn cancel_all(&mut self, time: f64) -> Vec<Cloudlet>;

    /// Stops processing of the running or waiting cloudlet keeping its progress.
    fn pause(&mut self, time: f64, cloudlet_id: u32) -> bool;

    /// Resumes processing of the paused cloudlet.
    fn resume(&mut self, time: f64, cloudlet_id: u32) -> bool;

    /// Removes and returns the cloudlets which have completed by the given time.
    fn collect_finished(&mut self, time: f64) -> Vec<Cloudlet>;

    /// Returns the earliest completion time of running cloudlets at the current rates.
    fn next_finish_time(&self) -> Option<f64>;

    /// Returns the current processing rate (MIPS) of each running cloudlet.
    fn allocated_rates(&self) -> Vec<(u32, f64)>;

    fn running_count(&self) -> usize;

    fn waiting_count(&self) -> usize;

    fn paused_count(&self) -> usize;

    fn is_idle(&self) -> bool {
        self.running_count() + self.waiting_count() + self.paused_count() == 0
    }
}

/// Creates cloudlet scheduler of the given kind for VM with `vm_pes` virtual PEs.
pub fn cloudlet_scheduler_resolver(kind: CloudletSchedulerKind, vm_pes: u32) -> Box<dyn CloudletScheduler> {
    match kind {
        CloudletSchedulerKind::TimeShared => Box::new(TimeSharedCloudletScheduler::new(vm_pes)),
        CloudletSchedulerKind::SpaceShared => Box::new(SpaceSharedCloudletScheduler::new(vm_pes)),
    }
}

/// Cloudlet being processed along with its progress.
pub(crate) struct CloudletExecution {
    pub cloudlet: Cloudlet,
    pub remaining: f64,
    pub rate: f64,
}

impl CloudletExecution {
    pub fn new(cloudlet: Cloudlet) -> Self {
        Self {
            remaining: cloudlet.length as f64,
            cloudlet,
            rate: 0.,
        }
    }

    pub fn id(&self) -> u32 {
        self.cloudlet.id
    }

    /// Checks whether the cloudlet is completed at `time` of the last progress update.
    ///
    /// At large times the remaining length may be too small to move the clock forward,
    /// such cloudlet is completed as well.
    pub fn is_finished(&self, time: f64) -> bool {
        self.remaining <= FINISH_TOLERANCE || self.finish_time(time).map_or(false, |finish| finish <= time)
    }

    pub fn finish_time(&self, current_time: f64) -> Option<f64> {
        if self.rate > 0. {
            Some(current_time + self.remaining / self.rate)
        } else {
            None
        }
    }
}

/// Applies the constant rates during the interval since `last_update`.
pub(crate) fn advance_executions(executions: &mut [CloudletExecution], last_update: f64, time: f64) {
    let elapsed = time - last_update;
    if elapsed <= 0. {
        return;
    }
    for exec in executions.iter_mut() {
        exec.remaining = (exec.remaining - exec.rate * elapsed).max(0.);
    }
}

/// Removes the execution with given cloudlet id from the list.
pub(crate) fn take_execution(executions: &mut Vec<CloudletExecution>, cloudlet_id: u32) -> Option<CloudletExecution> {
    let pos = executions.iter().position(|exec| exec.id() == cloudlet_id)?;
    Some(executions.remove(pos))
}
