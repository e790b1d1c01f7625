use serde::{Deserialize, Serialize};
use tracing::trace;

/// Host side of the uPD7759 speech chip.
///
/// Sample decoding lives outside the bus. The bus drives the data port and
/// the /MD and bank lines (through the 315-5201 at port $0B) and the host
/// reports the BUSY and DRQ outputs back.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Upd7759 {
    port: u8,
    port_writes: usize,
    md: bool,
    rom_bank: u8,
    busy: bool,
}

impl Default for Upd7759 {
    fn default() -> Self {
        Self {
            port: 0,
            port_writes: 0,
            md: true,
            rom_bank: 0,
            // BUSY is active low
            busy: true,
        }
    }
}

impl Upd7759 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn port_w(&mut self, data: u8) {
        trace!("[SPEECH] Port <- {:02X}", data);
        self.port = data;
        self.port_writes += 1;
    }

    pub fn md_w(&mut self, state: bool) {
        self.md = state;
    }

    pub fn set_rom_bank(&mut self, bank: u8) {
        self.rom_bank = bank;
    }

    pub fn set_busy(&mut self, state: bool) {
        self.busy = state;
    }

    pub fn busy_r(&self) -> bool {
        self.busy
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn port_writes(&self) -> usize {
        self.port_writes
    }

    pub fn md(&self) -> bool {
        self.md
    }

    pub fn rom_bank(&self) -> u8 {
        self.rom_bank
    }
}
