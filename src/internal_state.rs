use serde::{Deserialize, Serialize};

/// Snapshot of the bus controller registers for debuggers and front ends.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct InternalState {
    // interrupt latch
    pub irq_pending: u8,
    pub irq_enabled: u8,
    pub irq_vector: u8,
    pub irq_line: bool,

    // touchpad ports $1C-$1E and the last sample
    pub touchpad_control: [u8; 3],
    pub touchpad_x: u8,
    pub touchpad_y: u8,

    pub speech_control: u8,
    pub ppi_control: u8,
}

impl InternalState {
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub trait ReportState {
    fn report_state(&self) -> InternalState;
}
