use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::BusError;

pub const RAM_SIZE: usize = 0x20000;
pub const BIOS_BASE: u32 = 0xc0000;
pub const BIOS_SIZE: usize = 0x40000;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Ram {
    pub data: Vec<u8>,
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    pub fn new() -> Self {
        Ram {
            data: vec![0; RAM_SIZE],
        }
    }

    pub fn read(&self, address: u32) -> u8 {
        self.data[address as usize & (RAM_SIZE - 1)]
    }

    pub fn write(&mut self, address: u32, value: u8) {
        self.data[address as usize & (RAM_SIZE - 1)] = value;
    }
}

/// System ROM at $C0000-$FFFFF (MPR-7689 plus the E000 and F000 EPROMs).
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Clone)]
pub struct Bios {
    pub data: Vec<u8>,
}

impl Bios {
    /// Images shorter than the window are mirrored, so a 64 KiB dump of the
    /// F000 EPROM alone still puts the reset vector in place.
    pub fn new(rom: &[u8]) -> Result<Self, BusError> {
        if rom.len() > BIOS_SIZE {
            return Err(BusError::ImageTooLarge {
                region: "bios",
                size: rom.len(),
                capacity: BIOS_SIZE,
            });
        }

        Ok(Bios { data: rom.to_vec() })
    }

    pub fn read(&self, offset: u32) -> u8 {
        if self.data.is_empty() {
            return 0xff;
        }
        self.data[offset as usize % self.data.len()]
    }

    pub fn write(&mut self, offset: u32, _value: u8) {
        trace!("Attempt to write to ROM address {:#07X}", BIOS_BASE + offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_wraps_at_128k() {
        let mut ram = Ram::new();
        ram.write(0x1ffff, 0x42);
        assert_eq!(ram.read(0x1ffff), 0x42);
        assert_eq!(ram.read(0x3ffff), 0x42);
    }

    #[test]
    fn test_bios_mirrors_and_ignores_writes() {
        let mut rom = vec![0u8; 0x10000];
        rom[0xfff0] = 0xea;
        let mut bios = Bios::new(&rom).unwrap();

        assert_eq!(bios.read(0x3fff0), 0xea);
        bios.write(0x3fff0, 0x00);
        assert_eq!(bios.read(0x3fff0), 0xea);
    }

    #[test]
    fn test_empty_bios_floats_high() {
        assert_eq!(Bios::default().read(0), 0xff);
    }
}
