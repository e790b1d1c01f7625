use serde::{Deserialize, Serialize};
use tracing::trace;

/// SN76489A register file. Write-only, single port ($0C).
///
/// Registers 0/2/4 are tone periods (10 bits), 6 the noise control and the
/// odd registers the channel attenuations.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Sn76489 {
    registers: [u16; 8],
    latched_register: u8,
    last_write: u8,
}

impl Sn76489 {
    pub fn new() -> Self {
        Self {
            // all channels silent
            registers: [0, 0x0f, 0, 0x0f, 0, 0x0f, 0, 0x0f],
            latched_register: 0,
            last_write: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn register(&self, reg: usize) -> u16 {
        self.registers[reg & 0x07]
    }

    pub fn last_write(&self) -> u8 {
        self.last_write
    }

    pub fn write(&mut self, data: u8) {
        self.last_write = data;

        if data & 0x80 != 0 {
            self.latched_register = (data >> 4) & 0x07;
            let reg = self.latched_register as usize;
            self.registers[reg] = match reg {
                0 | 2 | 4 => (self.registers[reg] & 0x3f0) | (data & 0x0f) as u16,
                6 => (data & 0x07) as u16,
                _ => (data & 0x0f) as u16,
            };
        } else {
            let reg = self.latched_register as usize;
            self.registers[reg] = match reg {
                0 | 2 | 4 => (self.registers[reg] & 0x00f) | (((data & 0x3f) as u16) << 4),
                6 => (data & 0x07) as u16,
                _ => (data & 0x0f) as u16,
            };
        }

        trace!(
            "[PSG] Writing {:02X}, register {} = {:03X}",
            data,
            self.latched_register,
            self.registers[self.latched_register as usize]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_latch_and_data() {
        let mut psg = Sn76489::new();
        psg.write(0x8e);
        psg.write(0x0f);
        assert_eq!(psg.register(0), 0x0fe);

        psg.write(0xa5);
        assert_eq!(psg.register(2), 0x005);
        assert_eq!(psg.register(0), 0x0fe);
    }

    #[test]
    fn test_attenuation() {
        let mut psg = Sn76489::new();
        assert_eq!(psg.register(1), 0x0f);

        psg.write(0x90);
        assert_eq!(psg.register(1), 0x00);
        psg.write(0x03);
        assert_eq!(psg.register(1), 0x03);
        assert_eq!(psg.last_write(), 0x03);
    }
}
