//! Standard simulation events.

// VM EVENTS ///////////////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use cloudlab_core::component::Id;

    use crate::core::error::CloudError;
    use crate::core::vm::VirtualMachine;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: VirtualMachine,
    }

    #[derive(Serialize, Clone)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub host_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmCreateFailed {
        pub vm_id: u32,
        pub error: CloudError,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub broker_id: Id,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyed {
        pub vm_id: u32,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use cloudlab_core::component::Id;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletCancel {
        pub broker_id: Id,
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletPause {
        pub broker_id: Id,
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletResume {
        pub broker_id: Id,
        pub cloudlet_id: u32,
        pub vm_id: u32,
    }
}
