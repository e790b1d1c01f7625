use derivative::Derivative;
use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;
use tracing::{trace, warn};

pub const VRAM_SIZE: usize = 0x10000;
const REGISTER_COUNT: u8 = 47;

/// V9938 CPU interface: ports $00-$03 and the INT output.
///
/// Only the register side is modelled; display generation is the host's
/// business. The vertical interrupt flag (S#0 bit 7) is raised by
/// [`V9938::set_vblank`] and cleared by reading S#0.
#[derive(Derivative, Clone, Serialize, Deserialize, PartialEq)]
#[derivative(Debug)]
pub struct V9938 {
    #[derivative(Debug = "ignore")]
    pub vram: Vec<u8>,
    #[serde(with = "BigArray")]
    pub registers: [u8; 64],
    pub palette: [u16; 16],
    data_pre_read: u8,
    address: u32,
    first_write: Option<u8>,
    palette_first_write: Option<u8>,
    f: bool,
    vblank: bool,
}

impl Default for V9938 {
    fn default() -> Self {
        Self::new()
    }
}

impl V9938 {
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            registers: [0; 64],
            palette: [0; 16],
            data_pre_read: 0,
            address: 0,
            first_write: None,
            palette_first_write: None,
            f: false,
            vblank: false,
        }
    }

    pub fn reset(&mut self) {
        self.registers = [0; 64];
        self.palette = [0; 16];
        self.data_pre_read = 0;
        self.address = 0;
        self.first_write = None;
        self.palette_first_write = None;
        self.f = false;
        self.vblank = false;
    }

    pub fn int_line(&self) -> bool {
        self.f && self.registers[1] & 0x20 != 0
    }

    pub fn set_vblank(&mut self, active: bool) {
        self.vblank = active;
        if active {
            self.f = true;
            trace!("[VDP] Vertical interrupt flag set");
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    fn address_wrapping_inc(&mut self) {
        self.address = (self.address + 1) & 0x1ffff;
        self.registers[14] = ((self.address >> 14) & 0x07) as u8;
    }

    fn vram_index(&self) -> usize {
        self.address as usize & (VRAM_SIZE - 1)
    }

    fn read_data(&mut self) -> u8 {
        self.first_write = None;
        let data = self.data_pre_read;
        self.data_pre_read = self.vram[self.vram_index()];
        self.address_wrapping_inc();
        data
    }

    fn write_data(&mut self, data: u8) {
        self.first_write = None;
        let index = self.vram_index();
        self.vram[index] = data;
        self.data_pre_read = data;
        self.address_wrapping_inc();
    }

    fn read_status(&mut self) -> u8 {
        self.first_write = None;
        match self.registers[15] & 0x0f {
            0 => {
                let mut res = 0x00;
                if self.f {
                    res |= 0x80;
                    self.f = false;
                }
                res
            }
            // S#1: V9938 identification 0, no light pen
            1 => 0x00,
            2 => {
                let mut res = 0x8c;
                if self.vblank {
                    res |= 0x40;
                }
                res
            }
            _ => 0x00,
        }
    }

    fn write_control(&mut self, val: u8) {
        let Some(data_first_write) = self.first_write.take() else {
            self.first_write = Some(val);
            return;
        };

        if val & 0x80 != 0 {
            self.write_register(val & 0x3f, data_first_write);
        } else {
            self.address = ((self.registers[14] as u32 & 0x07) << 14)
                | ((val as u32 & 0x3f) << 8)
                | data_first_write as u32;
            if val & 0x40 == 0 {
                self.data_pre_read = self.vram[self.vram_index()];
                self.address_wrapping_inc();
            }
        }
    }

    fn write_palette(&mut self, val: u8) {
        let Some(red_blue) = self.palette_first_write.take() else {
            self.palette_first_write = Some(val);
            return;
        };

        let index = (self.registers[16] & 0x0f) as usize;
        self.palette[index] = ((val as u16 & 0x07) << 8) | red_blue as u16 & 0x77;
        self.registers[16] = (self.registers[16] + 1) & 0x0f;
    }

    fn write_indirect(&mut self, val: u8) {
        let reg = self.registers[17] & 0x3f;
        if reg != 17 {
            self.write_register(reg, val);
        }
        if self.registers[17] & 0x80 == 0 {
            self.registers[17] = (self.registers[17] & 0xc0) | ((reg + 1) & 0x3f);
        }
    }

    fn write_register(&mut self, reg: u8, value: u8) {
        if reg >= REGISTER_COUNT {
            warn!("[VDP] Write to invalid register R#{} = {:02X}", reg, value);
            return;
        }

        trace!("[VDP] R#{} = {:02X}", reg, value);
        self.registers[reg as usize] = value;
        match reg {
            14 => {
                self.address = (self.address & 0x3fff) | ((value as u32 & 0x07) << 14);
            }
            16 => self.palette_first_write = None,
            _ => {}
        }
    }

    pub fn read(&mut self, port: u8) -> u8 {
        match port & 0x03 {
            0 => self.read_data(),
            1 => self.read_status(),
            _ => 0xff,
        }
    }

    pub fn write(&mut self, port: u8, data: u8) {
        match port & 0x03 {
            0 => self.write_data(data),
            1 => self.write_control(data),
            2 => self.write_palette(data),
            _ => self.write_indirect(data),
        }
    }
}
