use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{advance_executions, take_execution, CloudletExecution, CloudletScheduler};

/// Runs cloudlets on exclusively assigned virtual PEs.
///
/// A cloudlet starts only when enough VM PEs are free, otherwise it waits in the FIFO queue.
/// The queue is strict: a cloudlet never overtakes an earlier waiting one.
pub struct SpaceSharedCloudletScheduler {
    vm_pes: u32,
    mips_share: Vec<f64>,
    running: Vec<CloudletExecution>,
    waiting: Vec<CloudletExecution>,
    paused: Vec<CloudletExecution>,
    last_update: f64,
}

impl SpaceSharedCloudletScheduler {
    pub fn new(vm_pes: u32) -> Self {
        Self {
            vm_pes,
            mips_share: Vec::new(),
            running: Vec::new(),
            waiting: Vec::new(),
            paused: Vec::new(),
            last_update: 0.,
        }
    }

    fn used_pes(&self) -> u32 {
        self.running.iter().map(|exec| exec.cloudlet.pes_number).sum()
    }

    fn recalculate(&mut self) {
        while let Some(next) = self.waiting.first() {
            if self.used_pes() + next.cloudlet.pes_number > self.vm_pes {
                break;
            }
            let mut exec = self.waiting.remove(0);
            exec.cloudlet.status = CloudletStatus::InExec;
            exec.cloudlet.exec_start_time.get_or_insert(self.last_update);
            self.running.push(exec);
        }

        let per_pe = if self.mips_share.is_empty() {
            0.
        } else {
            self.mips_share.iter().sum::<f64>() / self.mips_share.len() as f64
        };
        for exec in self.running.iter_mut() {
            exec.rate = per_pe * exec.cloudlet.pes_number as f64 * exec.cloudlet.utilization_model.utilization();
        }
    }
}

impl CloudletScheduler for SpaceSharedCloudletScheduler {
    fn advance(&mut self, time: f64) {
        advance_executions(&mut self.running, self.last_update, time);
        self.last_update = self.last_update.max(time);
    }

    fn update_capacity(&mut self, time: f64, mips_share: &[f64]) {
        self.advance(time);
        self.mips_share = mips_share.to_vec();
        self.recalculate();
    }

    fn submit(&mut self, time: f64, mut cloudlet: Cloudlet) -> Result<(), Cloudlet> {
        if cloudlet.pes_number > self.vm_pes {
            return Err(cloudlet);
        }
        self.advance(time);
        cloudlet.status = CloudletStatus::Queued;
        self.waiting.push(CloudletExecution::new(cloudlet));
        self.recalculate();
        Ok(())
    }

    fn cancel(&mut self, time: f64, cloudlet_id: u32) -> Option<Cloudlet> {
        self.advance(time);
        let exec = take_execution(&mut self.running, cloudlet_id)
            .or_else(|| take_execution(&mut self.waiting, cloudlet_id))
            .or_else(|| take_execution(&mut self.paused, cloudlet_id))?;
        self.recalculate();
        let mut cloudlet = exec.cloudlet;
        cloudlet.finish(CloudletStatus::Canceled, time);
        Some(cloudlet)
    }

    fn cancel_all(&mut self, time: f64) -> Vec<Cloudlet> {
        self.advance(time);
        let mut canceled = Vec::new();
        let all = self.running.drain(..).chain(self.waiting.drain(..)).chain(self.paused.drain(..));
        for exec in all {
            let mut cloudlet = exec.cloudlet;
            cloudlet.finish(CloudletStatus::Canceled, time);
            canceled.push(cloudlet);
        }
        canceled
    }

    fn pause(&mut self, time: f64, cloudlet_id: u32) -> bool {
        self.advance(time);
        let exec = take_execution(&mut self.running, cloudlet_id).or_else(|| take_execution(&mut self.waiting, cloudlet_id));
        match exec {
            Some(mut exec) => {
                exec.rate = 0.;
                exec.cloudlet.status = CloudletStatus::Paused;
                self.paused.push(exec);
                self.recalculate();
                true
            }
            None => false,
        }
    }

    fn resume(&mut self, time: f64, cloudlet_id: u32) -> bool {
        self.advance(time);
        match take_execution(&mut self.paused, cloudlet_id) {
            Some(mut exec) => {
                exec.cloudlet.status = CloudletStatus::Queued;
                self.waiting.push(exec);
                self.recalculate();
                true
            }
            None => false,
        }
    }

    fn collect_finished(&mut self, time: f64) -> Vec<Cloudlet> {
        self.advance(time);
        let now = self.last_update;
        let (finished, running): (Vec<_>, Vec<_>) = self.running.drain(..).partition(|exec| exec.is_finished(now));
        self.running = running;
        if finished.is_empty() {
            return Vec::new();
        }
        self.recalculate();
        finished
            .into_iter()
            .map(|exec| {
                let mut cloudlet = exec.cloudlet;
                cloudlet.finish(CloudletStatus::Success, time);
                cloudlet
            })
            .collect()
    }

    fn next_finish_time(&self) -> Option<f64> {
        self.running
            .iter()
            .filter_map(|exec| exec.finish_time(self.last_update))
            .min_by(|a, b| a.total_cmp(b))
    }

    fn allocated_rates(&self) -> Vec<(u32, f64)> {
        self.running.iter().map(|exec| (exec.id(), exec.rate)).collect()
    }

    fn running_count(&self) -> usize {
        self.running.len()
    }

    fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    fn paused_count(&self) -> usize {
        self.paused.len()
    }
}
