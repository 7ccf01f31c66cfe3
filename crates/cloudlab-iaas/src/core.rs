pub mod broker;
pub mod characteristics;
pub mod cloudlet;
pub mod cloudlet_scheduler;
pub mod cloudlet_schedulers;
pub mod common;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod events;
pub mod host;
pub mod pe;
pub mod provisioner;
pub mod report;
pub mod resource_pool;
pub mod vm;
pub mod vm_allocation_policies;
pub mod vm_allocation_policy;
pub mod vm_scheduler;
pub mod vm_schedulers;
