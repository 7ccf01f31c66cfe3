//! Cloud simulation facade.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use cloudlab_core::context::SimulationContext;
use cloudlab_core::simulation::Simulation;
use cloudlab_core::{log_debug, log_info};

use crate::core::broker::DatacenterBroker;
use crate::core::characteristics::DatacenterCharacteristics;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::error::CloudError;
use crate::core::host::Host;
use crate::core::resource_pool::HostPool;
use crate::core::vm_allocation_policy::{allocation_policy_resolver, VmAllocationPolicy};

/// Entry point for building and running the cloud simulation.
pub struct CloudSimulation {
    datacenters: BTreeMap<u32, Rc<RefCell<Datacenter>>>,
    brokers: BTreeMap<u32, Rc<RefCell<DatacenterBroker>>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl CloudSimulation {
    pub fn new(mut sim: Simulation, sim_config: SimulationConfig) -> Self {
        let ctx = sim.create_context("simulation");
        Self {
            datacenters: BTreeMap::new(),
            brokers: BTreeMap::new(),
            sim,
            ctx,
            sim_config: rc!(sim_config),
        }
    }

    /// Creates simulation with datacenters described in the config.
    pub fn from_config(sim_config: SimulationConfig) -> Result<Self, CloudError> {
        sim_config.validate()?;
        let datacenters = sim_config.datacenters.clone();
        let mut cloud_sim = Self::new(Simulation::new(sim_config.seed), sim_config);
        for dc_config in datacenters {
            let mut hosts = Vec::new();
            for host_config in dc_config.hosts.iter() {
                hosts.extend(host_config.build_hosts(hosts.len() as u32)?);
            }
            let policy = allocation_policy_resolver(dc_config.allocation_policy.as_deref().unwrap_or("FirstFit"))?;
            cloud_sim.add_datacenter(&dc_config.name, dc_config.characteristics.clone(), hosts, policy)?;
        }
        Ok(cloud_sim)
    }

    /// Adds datacenter with the specified hosts, returns the datacenter ID.
    pub fn add_datacenter(
        &mut self,
        name: &str,
        characteristics: DatacenterCharacteristics,
        hosts: Vec<Host>,
        allocation_policy: Box<dyn VmAllocationPolicy>,
    ) -> Result<u32, CloudError> {
        self.check_name(name)?;
        characteristics.validate()?;
        if hosts.is_empty() {
            return Err(CloudError::InvalidConfiguration(format!("datacenter {} has no hosts", name)));
        }
        let mut pool = HostPool::new();
        for host in hosts {
            pool.add_host(host)?;
        }

        let datacenter = rc!(refcell!(Datacenter::new(
            characteristics,
            pool,
            allocation_policy,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, datacenter.clone());
        self.datacenters.insert(id, datacenter);
        for broker in self.brokers.values() {
            broker.borrow_mut().add_datacenter(id);
        }
        log_debug!(self.ctx, "added datacenter {} with id {}", name, id);
        Ok(id)
    }

    /// Adds broker which uses all datacenters of the simulation, returns the broker ID.
    pub fn add_broker(&mut self, name: &str) -> Result<u32, CloudError> {
        self.check_name(name)?;
        let broker = rc!(refcell!(DatacenterBroker::new(
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        for datacenter_id in self.datacenters.keys() {
            broker.borrow_mut().add_datacenter(*datacenter_id);
        }
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        log_debug!(self.ctx, "added broker {} with id {}", name, id);
        Ok(id)
    }

    fn check_name(&self, name: &str) -> Result<(), CloudError> {
        if self.sim.lookup_id(name).is_some() {
            return Err(CloudError::InvalidConfiguration(format!(
                "component name is already used: {}",
                name
            )));
        }
        Ok(())
    }

    pub fn broker(&self, broker_id: u32) -> Option<Rc<RefCell<DatacenterBroker>>> {
        self.brokers.get(&broker_id).cloned()
    }

    pub fn datacenter(&self, datacenter_id: u32) -> Option<Rc<RefCell<Datacenter>>> {
        self.datacenters.get(&datacenter_id).cloned()
    }

    /// Runs the simulation until there are no pending events or the configured simulation length is reached.
    ///
    /// Returns the time of the last processed event.
    pub fn run(&mut self) -> Result<f64, CloudError> {
        log_info!(self.ctx, "simulation started");
        if self.sim_config.simulation_length > 0. {
            while let Some(time) = self.sim.next_event_time() {
                if time > self.sim_config.simulation_length {
                    break;
                }
                self.sim.try_step()?;
            }
        } else {
            self.sim.try_step_until_no_events()?;
        }
        log_info!(self.ctx, "simulation finished at {:.3}", self.sim.time());
        Ok(self.sim.time())
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn current_time(&self) -> f64 {
        self.sim.time()
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }
}
