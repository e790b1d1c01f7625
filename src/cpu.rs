use tracing::trace;

use crate::{bus::Bus, error::BusError, error::InterruptError};

/// What the V20 sees of the board: the 20-bit memory space, the I/O ports
/// and the INTA cycle.
pub trait CpuIo {
    fn read_byte(&mut self, address: u32) -> u8;
    fn write_byte(&mut self, address: u32, value: u8);
    fn port_in(&mut self, port: u16) -> u8;
    fn port_out(&mut self, port: u16, value: u8);
    fn irq_acknowledge(&mut self) -> Result<u8, InterruptError>;
}

/// Instruction core plugged into the machine.
pub trait Cpu {
    /// Executes one instruction and returns the cycles it took.
    fn step(&mut self, io: &mut dyn CpuIo) -> Result<u32, BusError>;

    /// Level of the INT input.
    fn set_irq_line(&mut self, asserted: bool);

    fn reset(&mut self);
}

impl CpuIo for Bus {
    fn read_byte(&mut self, address: u32) -> u8 {
        Bus::read_byte(self, address)
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        Bus::write_byte(self, address, value)
    }

    // nothing answers above $FF
    fn port_in(&mut self, port: u16) -> u8 {
        match u8::try_from(port) {
            Ok(port) => self.input(port),
            Err(_) => {
                trace!("[BUS] Invalid port {:04X} read", port);
                0xff
            }
        }
    }

    fn port_out(&mut self, port: u16, value: u8) {
        match u8::try_from(port) {
            Ok(port) => self.output(port, value),
            Err(_) => trace!("[BUS] Invalid port {:04X} write = {:02X}", port, value),
        }
    }

    fn irq_acknowledge(&mut self) -> Result<u8, InterruptError> {
        self.acknowledge()
    }
}
