//! Broker component acting on behalf of a cloud user.

use std::collections::BTreeSet;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;

use cloudlab_core::cast;
use cloudlab_core::context::SimulationContext;
use cloudlab_core::event::Event;
use cloudlab_core::handler::EventHandler;
use cloudlab_core::{log_debug, log_info, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::error::CloudError;
use crate::core::events::cloudlet::{CloudletCancel, CloudletPause, CloudletResume, CloudletReturn, CloudletSubmit};
use crate::core::events::vm::{VmCreateAck, VmCreateFailed, VmCreateRequest, VmDestroyRequest, VmDestroyed};
use crate::core::vm::{VirtualMachine, VmStatus};

#[derive(Serialize, Clone)]
struct ProcessSubmissions {}

#[derive(Serialize, Clone)]
struct CancelCloudlet {
    cloudlet_id: u32,
}

#[derive(Serialize, Clone)]
struct PauseCloudlet {
    cloudlet_id: u32,
}

#[derive(Serialize, Clone)]
struct ResumeCloudlet {
    cloudlet_id: u32,
}

/// Broker submits VMs and cloudlets of a user to datacenters and collects the results.
///
/// Each VM is requested from the known datacenters in order until one of them creates it.
/// Submitted cloudlets are kept until all VM requests are resolved. Then bound cloudlets are sent to
/// their VMs, unbound ones are assigned to the created VMs in round-robin order, and cloudlets which
/// cannot be assigned are failed. After all cloudlets are returned the broker destroys its VMs.
pub struct DatacenterBroker {
    pub id: u32,
    datacenter_ids: Vec<u32>,
    vms: IndexMap<u32, VirtualMachine>,
    vms_to_request: Vec<u32>,
    pending_vm_requests: IndexMap<u32, usize>,
    vm_failures: IndexMap<u32, CloudError>,
    destroying_vms: BTreeSet<u32>,
    cloudlets: IndexMap<u32, Cloudlet>,
    dispatched: IndexMap<u32, (u32, u32)>,
    received: Vec<Cloudlet>,
    next_vm: usize,
    submissions_scheduled: bool,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl DatacenterBroker {
    pub fn new(ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            datacenter_ids: Vec::new(),
            vms: IndexMap::new(),
            vms_to_request: Vec::new(),
            pending_vm_requests: IndexMap::new(),
            vm_failures: IndexMap::new(),
            destroying_vms: BTreeSet::new(),
            cloudlets: IndexMap::new(),
            dispatched: IndexMap::new(),
            received: Vec::new(),
            next_vm: 0,
            submissions_scheduled: false,
            ctx,
            sim_config,
        }
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    /// Adds datacenter to the list of datacenters used for VM creation.
    pub fn add_datacenter(&mut self, datacenter_id: u32) {
        if !self.datacenter_ids.contains(&datacenter_id) {
            self.datacenter_ids.push(datacenter_id);
        }
    }

    /// Submits VMs for creation. VM IDs must be unique within the broker, other brokers may reuse them.
    pub fn submit_vm_list(&mut self, vms: Vec<VirtualMachine>) -> Result<(), CloudError> {
        let mut ids = BTreeSet::new();
        for vm in vms.iter() {
            vm.validate()?;
            if self.vms.contains_key(&vm.id) || !ids.insert(vm.id) {
                return Err(CloudError::InvalidConfiguration(format!("duplicate vm id: {}", vm.id)));
            }
        }
        for mut vm in vms {
            vm.broker_id = self.id;
            vm.status = VmStatus::Created;
            vm.host_id = None;
            vm.datacenter_id = None;
            self.vms_to_request.push(vm.id);
            self.vms.insert(vm.id, vm);
        }
        self.schedule_submissions();
        Ok(())
    }

    /// Submits cloudlets for execution. Cloudlet IDs must be unique within the broker.
    pub fn submit_cloudlet_list(&mut self, cloudlets: Vec<Cloudlet>) -> Result<(), CloudError> {
        let mut ids = BTreeSet::new();
        for cloudlet in cloudlets.iter() {
            cloudlet.validate()?;
            if self.is_known_cloudlet(cloudlet.id) || !ids.insert(cloudlet.id) {
                return Err(CloudError::InvalidConfiguration(format!(
                    "duplicate cloudlet id: {}",
                    cloudlet.id
                )));
            }
        }
        for mut cloudlet in cloudlets {
            cloudlet.broker_id = self.id;
            cloudlet.status = CloudletStatus::Created;
            self.cloudlets.insert(cloudlet.id, cloudlet);
        }
        self.schedule_submissions();
        Ok(())
    }

    /// Binds the submitted cloudlet to the VM, so that it will be executed only there.
    pub fn bind_cloudlet_to_vm(&mut self, cloudlet_id: u32, vm_id: u32) -> Result<(), CloudError> {
        if !self.vms.contains_key(&vm_id) {
            return Err(CloudError::UnknownEntity(format!("vm {}", vm_id)));
        }
        match self.cloudlets.get_mut(&cloudlet_id) {
            Some(cloudlet) => {
                cloudlet.vm_id = Some(vm_id);
                Ok(())
            }
            None => Err(CloudError::UnknownEntity(format!("cloudlet {} awaiting dispatch", cloudlet_id))),
        }
    }

    /// Cancels the cloudlet after the specified delay.
    pub fn cancel_cloudlet(&mut self, cloudlet_id: u32, delay: f64) -> Result<(), CloudError> {
        self.check_known_cloudlet(cloudlet_id)?;
        self.ctx.emit_self(CancelCloudlet { cloudlet_id }, delay);
        Ok(())
    }

    /// Pauses the cloudlet after the specified delay.
    pub fn pause_cloudlet(&mut self, cloudlet_id: u32, delay: f64) -> Result<(), CloudError> {
        self.check_known_cloudlet(cloudlet_id)?;
        self.ctx.emit_self(PauseCloudlet { cloudlet_id }, delay);
        Ok(())
    }

    /// Resumes the paused cloudlet after the specified delay.
    pub fn resume_cloudlet(&mut self, cloudlet_id: u32, delay: f64) -> Result<(), CloudError> {
        self.check_known_cloudlet(cloudlet_id)?;
        self.ctx.emit_self(ResumeCloudlet { cloudlet_id }, delay);
        Ok(())
    }

    /// Returns all submitted VMs in submission order.
    pub fn vm_list(&self) -> Vec<&VirtualMachine> {
        self.vms.values().collect()
    }

    pub fn vm(&self, vm_id: u32) -> Option<&VirtualMachine> {
        self.vms.get(&vm_id)
    }

    /// Returns VMs which were placed on a host (including already destroyed ones).
    pub fn vms_created_list(&self) -> Vec<&VirtualMachine> {
        self.vms.values().filter(|vm| vm.host_id.is_some()).collect()
    }

    /// Returns errors of VMs which could not be created in any datacenter.
    pub fn vm_failures(&self) -> &IndexMap<u32, CloudError> {
        &self.vm_failures
    }

    /// Returns cloudlets in terminal status in the order they were received.
    pub fn cloudlet_received_list(&self) -> &[Cloudlet] {
        &self.received
    }

    /// Returns the number of submitted cloudlets which are not returned yet.
    pub fn unfinished_cloudlet_count(&self) -> usize {
        self.cloudlets.len() + self.dispatched.len()
    }

    fn is_known_cloudlet(&self, cloudlet_id: u32) -> bool {
        self.cloudlets.contains_key(&cloudlet_id)
            || self.dispatched.contains_key(&cloudlet_id)
            || self.received.iter().any(|c| c.id == cloudlet_id)
    }

    fn check_known_cloudlet(&self, cloudlet_id: u32) -> Result<(), CloudError> {
        if self.is_known_cloudlet(cloudlet_id) {
            Ok(())
        } else {
            Err(CloudError::UnknownEntity(format!("cloudlet {}", cloudlet_id)))
        }
    }

    fn schedule_submissions(&mut self) {
        if !self.submissions_scheduled {
            self.submissions_scheduled = true;
            self.ctx.emit_self_now(ProcessSubmissions {});
        }
    }

    fn on_process_submissions(&mut self) {
        self.submissions_scheduled = false;
        let vm_ids: Vec<u32> = self.vms_to_request.drain(..).collect();
        for vm_id in vm_ids {
            self.request_vm(vm_id, 0);
        }
        self.dispatch_cloudlets();
    }

    /// Requests the VM from the datacenter with the given position in the list.
    fn request_vm(&mut self, vm_id: u32, datacenter_idx: usize) {
        let datacenter_id = match self.datacenter_ids.get(datacenter_idx) {
            Some(id) => *id,
            None => {
                log_warn!(self.ctx, "no datacenter to create vm {}", vm_id);
                self.vm_failures.insert(
                    vm_id,
                    CloudError::UnknownEntity("no datacenters available".to_string()),
                );
                return;
            }
        };
        let vm = match self.vms.get(&vm_id) {
            Some(vm) => vm.clone(),
            None => return,
        };
        log_debug!(
            self.ctx,
            "requesting vm {} in {}",
            vm_id,
            self.ctx.lookup_name(datacenter_id).unwrap_or_default()
        );
        self.pending_vm_requests.insert(vm_id, datacenter_idx);
        self.ctx
            .emit(VmCreateRequest { vm }, datacenter_id, self.sim_config.message_delay);
    }

    fn on_vm_create_ack(&mut self, vm_id: u32, host_id: u32, datacenter_id: u32) {
        if self.pending_vm_requests.shift_remove(&vm_id).is_none() {
            return;
        }
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.status = VmStatus::Running;
            vm.host_id = Some(host_id);
            vm.datacenter_id = Some(datacenter_id);
        }
        log_info!(
            self.ctx,
            "vm {} is created in {} on host {}",
            vm_id,
            self.ctx.lookup_name(datacenter_id).unwrap_or_default(),
            host_id
        );
        self.dispatch_cloudlets();
    }

    fn on_vm_create_failed(&mut self, vm_id: u32, error: CloudError) {
        let datacenter_idx = match self.pending_vm_requests.shift_remove(&vm_id) {
            Some(idx) => idx,
            None => return,
        };
        if datacenter_idx + 1 < self.datacenter_ids.len() {
            self.request_vm(vm_id, datacenter_idx + 1);
            return;
        }
        log_warn!(self.ctx, "vm {} is not created: {}", vm_id, error);
        self.vm_failures.insert(vm_id, error);
        self.dispatch_cloudlets();
    }

    fn on_vm_destroyed(&mut self, vm_id: u32) {
        self.destroying_vms.remove(&vm_id);
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.status = VmStatus::Destroyed;
        }
        log_debug!(self.ctx, "vm {} is destroyed", vm_id);
    }

    /// Sends buffered cloudlets to VMs once all VM requests are resolved.
    fn dispatch_cloudlets(&mut self) {
        if self.submissions_scheduled || !self.pending_vm_requests.is_empty() {
            return;
        }
        let targets: Vec<(u32, u32)> = self
            .vms
            .values()
            .filter(|vm| vm.status == VmStatus::Running && !self.destroying_vms.contains(&vm.id))
            .filter_map(|vm| vm.datacenter_id.map(|dc| (vm.id, dc)))
            .collect();

        let cloudlets: Vec<Cloudlet> = self.cloudlets.drain(..).map(|(_, cloudlet)| cloudlet).collect();
        for mut cloudlet in cloudlets {
            let target = match cloudlet.vm_id {
                Some(vm_id) => targets.iter().find(|(id, _)| *id == vm_id).copied(),
                None if !targets.is_empty() => {
                    let target = targets[self.next_vm % targets.len()];
                    self.next_vm += 1;
                    Some(target)
                }
                None => None,
            };
            match target {
                Some((vm_id, datacenter_id)) => {
                    log_debug!(self.ctx, "sending cloudlet {} to vm {}", cloudlet.id, vm_id);
                    cloudlet.vm_id = Some(vm_id);
                    self.dispatched.insert(cloudlet.id, (vm_id, datacenter_id));
                    self.ctx
                        .emit(CloudletSubmit { cloudlet }, datacenter_id, self.sim_config.message_delay);
                }
                None => {
                    log_warn!(self.ctx, "no vm to execute cloudlet {}", cloudlet.id);
                    cloudlet.finish(CloudletStatus::Failed, self.ctx.time());
                    self.received.push(cloudlet);
                }
            }
        }
        self.check_completion();
    }

    fn on_cloudlet_return(&mut self, cloudlet: Cloudlet) {
        self.dispatched.shift_remove(&cloudlet.id);
        log_info!(
            self.ctx,
            "cloudlet {} is returned with status {}",
            cloudlet.id,
            cloudlet.status
        );
        self.received.push(cloudlet);
        self.check_completion();
    }

    /// Destroys the created VMs when there is no more work for them.
    fn check_completion(&mut self) {
        if self.submissions_scheduled
            || !self.pending_vm_requests.is_empty()
            || !self.cloudlets.is_empty()
            || !self.dispatched.is_empty()
        {
            return;
        }
        let to_destroy: Vec<(u32, u32)> = self
            .vms
            .values()
            .filter(|vm| vm.status == VmStatus::Running && !self.destroying_vms.contains(&vm.id))
            .filter_map(|vm| vm.datacenter_id.map(|dc| (vm.id, dc)))
            .collect();
        for (vm_id, datacenter_id) in to_destroy {
            self.destroying_vms.insert(vm_id);
            self.ctx.emit(
                VmDestroyRequest {
                    broker_id: self.id,
                    vm_id,
                },
                datacenter_id,
                self.sim_config.message_delay,
            );
        }
    }

    fn on_cancel_cloudlet(&mut self, cloudlet_id: u32) {
        if let Some(mut cloudlet) = self.cloudlets.shift_remove(&cloudlet_id) {
            cloudlet.finish(CloudletStatus::Canceled, self.ctx.time());
            log_info!(self.ctx, "cloudlet {} is canceled before dispatch", cloudlet_id);
            self.received.push(cloudlet);
            self.check_completion();
        } else if let Some((vm_id, datacenter_id)) = self.dispatched.get(&cloudlet_id).copied() {
            self.ctx.emit(
                CloudletCancel {
                    broker_id: self.id,
                    cloudlet_id,
                    vm_id,
                },
                datacenter_id,
                self.sim_config.message_delay,
            );
        } else {
            log_debug!(self.ctx, "cloudlet {} is already finished", cloudlet_id);
        }
    }

    fn on_pause_cloudlet(&mut self, cloudlet_id: u32) {
        match self.dispatched.get(&cloudlet_id).copied() {
            Some((vm_id, datacenter_id)) => {
                self.ctx.emit(
                    CloudletPause {
                        broker_id: self.id,
                        cloudlet_id,
                        vm_id,
                    },
                    datacenter_id,
                    self.sim_config.message_delay,
                );
            }
            None => log_warn!(self.ctx, "cannot pause cloudlet {} which is not in execution", cloudlet_id),
        }
    }

    fn on_resume_cloudlet(&mut self, cloudlet_id: u32) {
        match self.dispatched.get(&cloudlet_id).copied() {
            Some((vm_id, datacenter_id)) => {
                self.ctx.emit(
                    CloudletResume {
                        broker_id: self.id,
                        cloudlet_id,
                        vm_id,
                    },
                    datacenter_id,
                    self.sim_config.message_delay,
                );
            }
            None => log_warn!(self.ctx, "cannot resume cloudlet {} which is not in execution", cloudlet_id),
        }
    }
}

impl EventHandler for DatacenterBroker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            ProcessSubmissions {} => {
                self.on_process_submissions();
            }
            VmCreateAck { vm_id, host_id } => {
                self.on_vm_create_ack(vm_id, host_id, event.src);
            }
            VmCreateFailed { vm_id, error } => {
                self.on_vm_create_failed(vm_id, error);
            }
            VmDestroyed { vm_id } => {
                self.on_vm_destroyed(vm_id);
            }
            CloudletReturn { cloudlet } => {
                self.on_cloudlet_return(cloudlet);
            }
            CancelCloudlet { cloudlet_id } => {
                self.on_cancel_cloudlet(cloudlet_id);
            }
            PauseCloudlet { cloudlet_id } => {
                self.on_pause_cloudlet(cloudlet_id);
            }
            ResumeCloudlet { cloudlet_id } => {
                self.on_resume_cloudlet(cloudlet_id);
            }
        })
    }
}
