use serde::{Deserialize, Serialize};
use tracing::trace;

/// Board lines wired to the 8255 ports.
pub trait PpiPorts {
    fn port_a_in(&mut self) -> u8;
    fn port_b_in(&mut self) -> u8;
    fn port_c_in(&mut self) -> u8;
    fn port_c_out(&mut self, data: u8);
}

/// 8255 programmable peripheral interface, mode 0 only.
///
/// Offsets 0-2 are ports A, B and C, offset 3 the control word. Ports set as
/// inputs read the board lines, outputs read back their latch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Ppi {
    register_a: u8,
    register_b: u8,
    register_c: u8,
    control: u8,
}

impl Ppi {
    pub fn new() -> Self {
        Ppi::default()
    }

    pub fn reset(&mut self) {
        *self = Ppi::default();
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    fn port_a_input(&self) -> bool {
        self.control & 0x10 != 0
    }

    fn port_b_input(&self) -> bool {
        self.control & 0x02 != 0
    }

    fn port_c_upper_input(&self) -> bool {
        self.control & 0x08 != 0
    }

    fn port_c_lower_input(&self) -> bool {
        self.control & 0x01 != 0
    }

    pub fn read(&mut self, offset: u8, ports: &mut dyn PpiPorts) -> u8 {
        let data = match offset & 0x03 {
            0 => {
                if self.port_a_input() {
                    ports.port_a_in()
                } else {
                    self.register_a
                }
            }
            1 => {
                if self.port_b_input() {
                    ports.port_b_in()
                } else {
                    self.register_b
                }
            }
            2 => {
                let input = ports.port_c_in();
                let mut data = self.register_c;
                if self.port_c_upper_input() {
                    data = (data & 0x0f) | (input & 0xf0);
                }
                if self.port_c_lower_input() {
                    data = (data & 0xf0) | (input & 0x0f);
                }
                data
            }
            _ => 0xff,
        };

        trace!("[PPI] [RD] [{}] = {:02X}", offset & 0x03, data);
        data
    }

    pub fn write(&mut self, offset: u8, value: u8, ports: &mut dyn PpiPorts) {
        trace!("[PPI] [WR] [{}] = {:02X}", offset & 0x03, value);
        match offset & 0x03 {
            0 => self.register_a = value,
            1 => self.register_b = value,
            2 => {
                self.register_c = value;
                ports.port_c_out(self.register_c);
            }
            _ => {
                if value & 0x80 != 0 {
                    // mode set, clears all output latches
                    self.control = value;
                    self.register_a = 0;
                    self.register_b = 0;
                    self.register_c = 0;
                    if value & 0x64 != 0 {
                        tracing::debug!("[PPI] Unsupported mode {:02X}, treating as mode 0", value);
                    }
                    ports.port_c_out(self.register_c);
                } else {
                    let bit = (value & 0x0e) >> 1;
                    if (value & 0x01) == 0 {
                        self.register_c &= !(1 << bit);
                    } else {
                        self.register_c |= 1 << bit;
                    }
                    ports.port_c_out(self.register_c);
                }
            }
        }
    }
}

impl Default for Ppi {
    fn default() -> Self {
        Ppi {
            register_a: 0,
            register_b: 0,
            register_c: 0,
            // all ports input after reset
            control: 0x9b,
        }
    }
}
