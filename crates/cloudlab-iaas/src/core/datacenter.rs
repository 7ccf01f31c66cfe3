//! Datacenter component hosting VMs and executing cloudlets.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use cloudlab_core::cast;
use cloudlab_core::component::Id;
use cloudlab_core::context::SimulationContext;
use cloudlab_core::event::{Event, EventId};
use cloudlab_core::handler::EventHandler;
use cloudlab_core::{log_debug, log_info, log_warn};

use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{cloudlet_scheduler_resolver, CloudletScheduler};
use crate::core::common::AllocationVerdict;
use crate::core::config::SimulationConfig;
use crate::core::error::CloudError;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit};
use crate::core::events::vm::{VmCreateAck, VmCreateFailed, VmCreateRequest, VmDestroyRequest, VmDestroyed};
use crate::core::host::Host;
use crate::core::resource_pool::HostPool;
use crate::core::vm::{VirtualMachine, VmKey, VmStatus};
use crate::core::vm_allocation_policy::VmAllocationPolicy;

#[derive(Serialize, Clone)]
struct VmAllocationRetry {
    vm: VirtualMachine,
    first_attempt: f64,
}

#[derive(Serialize, Clone)]
struct VmProcessingUpdate {
    vm: VmKey,
}

struct VmRuntime {
    vm: VirtualMachine,
    scheduler: Box<dyn CloudletScheduler>,
    pending_update: Option<EventId>,
}

/// Datacenter owns hosts and processes requests from brokers.
///
/// VMs of different brokers may share IDs, so VMs are identified by [`VmKey`].
/// VMs are placed on hosts using the configured allocation policy. Each running VM has its own cloudlet
/// scheduler, and the datacenter keeps exactly one pending processing update event per VM scheduled at the
/// earliest completion time of its cloudlets. The event is rescheduled on every change affecting the VM,
/// including the changes of its capacity share when other VMs are created on or removed from the same host.
pub struct Datacenter {
    pub id: u32,
    characteristics: DatacenterCharacteristics,
    pool: HostPool,
    allocation_policy: Box<dyn VmAllocationPolicy>,
    vms: BTreeMap<VmKey, VmRuntime>,
    vm_costs: BTreeMap<VmKey, f64>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        characteristics: DatacenterCharacteristics,
        pool: HostPool,
        allocation_policy: Box<dyn VmAllocationPolicy>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            characteristics,
            pool,
            allocation_policy,
            vms: BTreeMap::new(),
            vm_costs: BTreeMap::new(),
            ctx,
            sim_config,
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn characteristics(&self) -> &DatacenterCharacteristics {
        &self.characteristics
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.pool.host(host_id)
    }

    pub fn host_ids(&self) -> Vec<u32> {
        self.pool.get_hosts_list()
    }

    /// Returns keys of VMs currently running in the datacenter.
    pub fn vms(&self) -> Vec<VmKey> {
        self.vms.keys().copied().collect()
    }

    pub fn vm_host(&self, vm: VmKey) -> Option<u32> {
        self.pool.host_of_vm(vm)
    }

    /// Returns MIPS currently allocated to the running VM by its host.
    pub fn vm_allocated_mips(&self, vm: VmKey) -> f64 {
        self.pool
            .host_of_vm(vm)
            .and_then(|host_id| self.pool.host(host_id))
            .map(|host| host.total_allocated_mips(vm))
            .unwrap_or(0.)
    }

    /// Returns processing rates of cloudlets running in the VM.
    pub fn cloudlet_rates(&self, vm: VmKey) -> Vec<(u32, f64)> {
        self.vms
            .get(&vm)
            .map(|runtime| runtime.scheduler.allocated_rates())
            .unwrap_or_default()
    }

    /// Returns the accumulated cost of resources used by the VM and its cloudlets.
    pub fn vm_cost(&self, vm: VmKey) -> Option<f64> {
        self.vm_costs.get(&vm).copied()
    }

    pub fn total_cost(&self) -> f64 {
        self.vm_costs.values().sum()
    }

    fn on_vm_create_request(&mut self, vm: VirtualMachine, first_attempt: f64) {
        if self.vms.contains_key(&vm.key()) {
            log_warn!(self.ctx, "vm {} of broker {} is already running", vm.id, vm.broker_id);
            let error = CloudError::InvalidConfiguration(format!("duplicate vm id: {}", vm.id));
            self.ctx.emit(
                VmCreateFailed { vm_id: vm.id, error },
                vm.broker_id,
                self.sim_config.message_delay,
            );
            return;
        }

        if let Some(host_id) = self.allocation_policy.select_host(&vm, &self.pool) {
            self.place_vm(vm, host_id);
            return;
        }

        let time = self.ctx.time();
        let permanent_verdict = self.pool.fits_empty_host(&vm);
        let can_wait = permanent_verdict == AllocationVerdict::Success
            && self.sim_config.vm_allocation_timeout > 0.
            && time + self.sim_config.allocation_retry_period <= first_attempt + self.sim_config.vm_allocation_timeout;
        if can_wait {
            log_debug!(self.ctx, "no free capacity for vm {}, will retry", vm.id);
            self.ctx.emit_self(
                VmAllocationRetry { vm, first_attempt },
                self.sim_config.allocation_retry_period,
            );
            return;
        }

        let verdict = if permanent_verdict != AllocationVerdict::Success {
            permanent_verdict
        } else {
            self.pool.rejection_verdict(&vm)
        };
        log_info!(self.ctx, "failed to create vm {}: {}", vm.id, verdict);
        self.ctx.emit(
            VmCreateFailed {
                vm_id: vm.id,
                error: CloudError::InsufficientCapacity { vm_id: vm.id, verdict },
            },
            vm.broker_id,
            self.sim_config.message_delay,
        );
    }

    fn place_vm(&mut self, mut vm: VirtualMachine, host_id: u32) {
        let verdict = self.pool.allocate(&vm, host_id);
        if verdict != AllocationVerdict::Success {
            log_warn!(self.ctx, "selected host {} cannot accommodate vm {}: {}", host_id, vm.id, verdict);
            self.ctx.emit(
                VmCreateFailed {
                    vm_id: vm.id,
                    error: CloudError::InsufficientCapacity { vm_id: vm.id, verdict },
                },
                vm.broker_id,
                self.sim_config.message_delay,
            );
            return;
        }

        vm.status = VmStatus::Running;
        vm.host_id = Some(host_id);
        vm.datacenter_id = Some(self.id);
        let cost = self.characteristics.memory_cost(vm.ram) + self.characteristics.storage_cost(vm.size);
        *self.vm_costs.entry(vm.key()).or_insert(0.) += cost;
        log_info!(self.ctx, "vm {} is created on host {}", vm.id, host_id);

        let (broker_id, vm_id) = vm.key();
        let scheduler = cloudlet_scheduler_resolver(vm.cloudlet_scheduler, vm.pes_number);
        self.vms.insert(
            (broker_id, vm_id),
            VmRuntime {
                vm,
                scheduler,
                pending_update: None,
            },
        );
        self.update_host_shares(host_id);
        self.ctx
            .emit(VmCreateAck { vm_id, host_id }, broker_id, self.sim_config.message_delay);
    }

    fn on_vm_destroy_request(&mut self, broker_id: Id, vm_id: u32) {
        let key = (broker_id, vm_id);
        let mut runtime = match self.vms.remove(&key) {
            Some(runtime) => runtime,
            None => {
                log_warn!(self.ctx, "cannot destroy unknown vm {}", vm_id);
                return;
            }
        };
        if let Some(event_id) = runtime.pending_update.take() {
            self.ctx.cancel_event(event_id);
        }
        let time = self.ctx.time();
        for cloudlet in runtime.scheduler.cancel_all(time) {
            log_debug!(self.ctx, "cloudlet {} is canceled with vm {}", cloudlet.id, vm_id);
            self.return_cloudlet(cloudlet);
        }
        if let Some(host_id) = self.pool.deallocate(key) {
            self.update_host_shares(host_id);
        }
        log_info!(self.ctx, "vm {} is destroyed", vm_id);
        self.ctx.emit(
            VmDestroyed { vm_id },
            runtime.vm.broker_id,
            self.sim_config.message_delay,
        );
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet) {
        let time = self.ctx.time();
        cloudlet.datacenter_id = Some(self.id);
        cloudlet.submission_time = time;

        let broker_id = cloudlet.broker_id;
        let runtime = match cloudlet.vm_id.and_then(|vm_id| self.vms.get_mut(&(broker_id, vm_id))) {
            Some(runtime) => runtime,
            None => {
                self.fail_cloudlet(cloudlet, "vm is not running");
                return;
            }
        };
        if cloudlet.pes_number > runtime.vm.pes_number {
            self.fail_cloudlet(cloudlet, "not enough vm pes");
            return;
        }

        let vm_id = runtime.vm.id;
        let vm = (broker_id, vm_id);
        let bw_cost = self.characteristics.bw_cost(cloudlet.file_size + cloudlet.output_size);
        cloudlet.cost += bw_cost;
        let cloudlet_id = cloudlet.id;
        match runtime.scheduler.submit(time, cloudlet) {
            Ok(()) => {
                *self.vm_costs.entry(vm).or_insert(0.) += bw_cost;
                log_debug!(self.ctx, "cloudlet {} is submitted to vm {}", cloudlet_id, vm_id);
                self.reschedule(vm);
            }
            Err(mut cloudlet) => {
                cloudlet.cost -= bw_cost;
                self.fail_cloudlet(cloudlet, "rejected by cloudlet scheduler");
            }
        }
    }

    fn on_vm_processing_update(&mut self, vm: VmKey) {
        let time = self.ctx.time();
        let finished = match self.vms.get_mut(&vm) {
            Some(runtime) => {
                runtime.pending_update = None;
                runtime.scheduler.collect_finished(time)
            }
            None => return,
        };
        for cloudlet in finished {
            log_debug!(self.ctx, "cloudlet {} is finished in vm {}", cloudlet.id, vm.1);
            self.return_cloudlet(cloudlet);
        }
        self.reschedule(vm);
    }

    fn on_cloudlet_cancel(&mut self, broker_id: Id, cloudlet_id: u32, vm_id: u32) {
        let time = self.ctx.time();
        let vm = (broker_id, vm_id);
        let canceled = self
            .vms
            .get_mut(&vm)
            .and_then(|runtime| runtime.scheduler.cancel(time, cloudlet_id));
        match canceled {
            Some(cloudlet) => {
                log_debug!(self.ctx, "cloudlet {} is canceled", cloudlet_id);
                self.return_cloudlet(cloudlet);
                self.reschedule(vm);
            }
            None => log_warn!(self.ctx, "cannot cancel cloudlet {} in vm {}", cloudlet_id, vm_id),
        }
    }

    fn on_cloudlet_pause(&mut self, broker_id: Id, cloudlet_id: u32, vm_id: u32) {
        let time = self.ctx.time();
        let vm = (broker_id, vm_id);
        let paused = self
            .vms
            .get_mut(&vm)
            .map(|runtime| runtime.scheduler.pause(time, cloudlet_id))
            .unwrap_or(false);
        if paused {
            log_debug!(self.ctx, "cloudlet {} is paused", cloudlet_id);
            self.reschedule(vm);
        } else {
            log_warn!(self.ctx, "cannot pause cloudlet {} in vm {}", cloudlet_id, vm_id);
        }
    }

    fn on_cloudlet_resume(&mut self, broker_id: Id, cloudlet_id: u32, vm_id: u32) {
        let time = self.ctx.time();
        let vm = (broker_id, vm_id);
        let resumed = self
            .vms
            .get_mut(&vm)
            .map(|runtime| runtime.scheduler.resume(time, cloudlet_id))
            .unwrap_or(false);
        if resumed {
            log_debug!(self.ctx, "cloudlet {} is resumed", cloudlet_id);
            self.reschedule(vm);
        } else {
            log_warn!(self.ctx, "cannot resume cloudlet {} in vm {}", cloudlet_id, vm_id);
        }
    }

    /// Applies new capacity shares to all VMs on the host.
    fn update_host_shares(&mut self, host_id: u32) {
        let time = self.ctx.time();
        let vms = match self.pool.host(host_id) {
            Some(host) => host.vms(),
            None => return,
        };
        for vm in vms {
            let share = self
                .pool
                .host(host_id)
                .map(|host| host.allocated_mips(vm))
                .unwrap_or_default();
            if let Some(runtime) = self.vms.get_mut(&vm) {
                runtime.scheduler.update_capacity(time, &share);
            }
            self.reschedule(vm);
        }
    }

    /// Replaces the pending processing update of the VM with one at the next completion time.
    fn reschedule(&mut self, vm: VmKey) {
        let time = self.ctx.time();
        if let Some(runtime) = self.vms.get_mut(&vm) {
            if let Some(event_id) = runtime.pending_update.take() {
                self.ctx.cancel_event(event_id);
            }
            if let Some(finish_time) = runtime.scheduler.next_finish_time() {
                let delay = (finish_time - time).max(0.);
                runtime.pending_update = Some(self.ctx.emit_self(VmProcessingUpdate { vm }, delay));
            }
        }
    }

    fn fail_cloudlet(&mut self, mut cloudlet: Cloudlet, reason: &str) {
        log_info!(self.ctx, "cloudlet {} failed: {}", cloudlet.id, reason);
        cloudlet.finish(CloudletStatus::Failed, self.ctx.time());
        let broker_id = cloudlet.broker_id;
        self.ctx
            .emit(CloudletReturn { cloudlet }, broker_id, self.sim_config.message_delay);
    }

    /// Charges processing cost and sends the cloudlet back to its broker.
    fn return_cloudlet(&mut self, mut cloudlet: Cloudlet) {
        let cost = self
            .characteristics
            .processing_cost(cloudlet.actual_cpu_time, cloudlet.pes_number);
        cloudlet.cost += cost;
        if let Some(vm_id) = cloudlet.vm_id {
            *self.vm_costs.entry((cloudlet.broker_id, vm_id)).or_insert(0.) += cost;
        }
        let broker_id = cloudlet.broker_id;
        self.ctx
            .emit(CloudletReturn { cloudlet }, broker_id, self.sim_config.message_delay);
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreateRequest { vm } => {
                let time = self.ctx.time();
                self.on_vm_create_request(vm, time);
            }
            VmAllocationRetry { vm, first_attempt } => {
                self.on_vm_create_request(vm, first_attempt);
            }
            VmDestroyRequest { broker_id, vm_id } => {
                self.on_vm_destroy_request(broker_id, vm_id);
            }
            CloudletSubmit { cloudlet } => {
                self.on_cloudlet_submit(cloudlet);
            }
            VmProcessingUpdate { vm } => {
                self.on_vm_processing_update(vm);
            }
            CloudletCancel {
                broker_id,
                cloudlet_id,
                vm_id,
            } => {
                self.on_cloudlet_cancel(broker_id, cloudlet_id, vm_id);
            }
            CloudletPause {
                broker_id,
                cloudlet_id,
                vm_id,
            } => {
                self.on_cloudlet_pause(broker_id, cloudlet_id, vm_id);
            }
            CloudletResume {
                broker_id,
                cloudlet_id,
                vm_id,
            } => {
                self.on_cloudlet_resume(broker_id, cloudlet_id, vm_id);
            }
        })
    }
}
