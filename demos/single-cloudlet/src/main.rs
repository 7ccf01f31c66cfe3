use std::process;

use clap::Parser;

use cloudlab_core::simulation::Simulation;
use cloudlab_iaas::core::characteristics::DatacenterCharacteristics;
use cloudlab_iaas::core::cloudlet::{Cloudlet, UtilizationModel};
use cloudlab_iaas::core::config::SimulationConfig;
use cloudlab_iaas::core::error::CloudError;
use cloudlab_iaas::core::host::Host;
use cloudlab_iaas::core::pe::make_pes;
use cloudlab_iaas::core::report::print_cloudlet_list;
use cloudlab_iaas::core::vm::{CloudletSchedulerKind, VirtualMachine};
use cloudlab_iaas::core::vm_allocation_policy::FirstFit;
use cloudlab_iaas::core::vm_scheduler::vm_scheduler_resolver;
use cloudlab_iaas::simulation::CloudSimulation;

fn init_logger() {
    use env_logger::{Builder, Env};
    use std::io::Write;
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Runs one cloudlet on one VM in a single-host datacenter", long_about = None)]
struct Args {
    /// Path to simulation config replacing the built-in datacenter
    #[clap(short, long)]
    config: Option<String>,
}

fn build_simulation(config: Option<&str>) -> Result<CloudSimulation, CloudError> {
    if let Some(file_name) = config {
        return CloudSimulation::from_config(SimulationConfig::from_file(file_name)?);
    }

    let sim_config = SimulationConfig::default();
    let mut cloud_sim = CloudSimulation::new(Simulation::new(sim_config.seed), sim_config);
    let pes = make_pes(1, 1000.);
    let vm_scheduler = vm_scheduler_resolver("TimeShared", pes.clone())?;
    let host = Host::new(0, pes, 2048, 10000, 1000000, vm_scheduler);
    cloud_sim.add_datacenter(
        "datacenter_0",
        DatacenterCharacteristics::default(),
        vec![host],
        Box::new(FirstFit::new()),
    )?;
    Ok(cloud_sim)
}

fn run(args: Args) -> Result<(), CloudError> {
    let mut cloud_sim = build_simulation(args.config.as_deref())?;
    let broker_id = cloud_sim.add_broker("broker")?;
    let broker = cloud_sim
        .broker(broker_id)
        .ok_or_else(|| CloudError::UnknownEntity(format!("broker {}", broker_id)))?;

    let vm = VirtualMachine::new(0, 1000., 1, 512, 1000, 10000, "Xen", CloudletSchedulerKind::TimeShared);
    broker.borrow_mut().submit_vm_list(vec![vm])?;

    let cloudlet = Cloudlet::new(0, 400000, 1, 300, 300, UtilizationModel::Full);
    broker.borrow_mut().submit_cloudlet_list(vec![cloudlet])?;
    broker.borrow_mut().bind_cloudlet_to_vm(0, 0)?;

    cloud_sim.run()?;
    print_cloudlet_list(broker.borrow().cloudlet_received_list());
    Ok(())
}

fn main() {
    init_logger();
    let args = Args::parse();
    log::info!("Starting CloudSimExample1...");
    if let Err(err) = run(args) {
        log::error!("{}", err);
        process::exit(1);
    }
    log::info!("CloudSimExample1 finished!");
}
