use serde::Serialize;

/// Outcome of checking whether a VM fits on a host.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    NotEnoughPes,
    NotEnoughMips,
    NotEnoughMemory,
    NotEnoughBandwidth,
    NotEnoughStorage,
    HostNotFound,
    Success,
}

impl std::fmt::Display for AllocationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let msg = match self {
            AllocationVerdict::NotEnoughPes => "not enough pes",
            AllocationVerdict::NotEnoughMips => "not enough mips",
            AllocationVerdict::NotEnoughMemory => "not enough memory",
            AllocationVerdict::NotEnoughBandwidth => "not enough bandwidth",
            AllocationVerdict::NotEnoughStorage => "not enough storage",
            AllocationVerdict::HostNotFound => "host not found",
            AllocationVerdict::Success => "success",
        };
        write!(f, "{}", msg)
    }
}
