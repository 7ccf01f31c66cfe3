use serde::{Deserialize, Serialize};

/// Processing element (CPU core) of a physical host with fixed MIPS rating.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProcessingElement {
    pub id: u32,
    pub mips: f64,
}

impl ProcessingElement {
    pub fn new(id: u32, mips: f64) -> Self {
        Self { id, mips }
    }
}

/// Creates `count` identical processing elements numbered from zero.
pub fn make_pes(count: u32, mips: f64) -> Vec<ProcessingElement> {
    (0..count).map(|id| ProcessingElement::new(id, mips)).collect()
}
