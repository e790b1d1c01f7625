use std::{
    fmt::{self, Debug},
    fs::File,
    io::Read,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::error::BusError;

pub const CARD_SIZE: usize = 0x20000;

/// Device plugged into the 60-pin expansion connector.
///
/// The connector exposes two memory windows ($20000-$3FFFF and
/// $80000-$8FFFF) and I/O ports $20-$3F. Offsets are relative to the window
/// start; unimplemented accesses float high.
pub trait ExpansionDevice: Debug {
    fn name(&self) -> &str;

    fn read_lo(&mut self, _offset: u32) -> u8 {
        0xff
    }

    fn write_lo(&mut self, _offset: u32, _data: u8) {}

    fn read_hi(&mut self, _offset: u32) -> u8 {
        0xff
    }

    fn write_hi(&mut self, _offset: u32, _data: u8) {}

    fn read_io(&mut self, _offset: u8) -> u8 {
        0xff
    }

    fn write_io(&mut self, _offset: u8, _data: u8) {}
}

#[derive(Debug, Default)]
pub enum ExpansionSlot {
    #[default]
    Empty,
    Device(Box<dyn ExpansionDevice>),
}

impl fmt::Display for ExpansionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionSlot::Empty => write!(f, "Empty"),
            ExpansionSlot::Device(device) => write!(f, "{}", device.name()),
        }
    }
}

impl ExpansionSlot {
    pub fn read_lo(&mut self, offset: u32) -> u8 {
        match self {
            ExpansionSlot::Empty => 0xff,
            ExpansionSlot::Device(device) => device.read_lo(offset),
        }
    }

    pub fn write_lo(&mut self, offset: u32, data: u8) {
        if let ExpansionSlot::Device(device) = self {
            device.write_lo(offset, data);
        }
    }

    pub fn read_hi(&mut self, offset: u32) -> u8 {
        match self {
            ExpansionSlot::Empty => 0xff,
            ExpansionSlot::Device(device) => device.read_hi(offset),
        }
    }

    pub fn write_hi(&mut self, offset: u32, data: u8) {
        if let ExpansionSlot::Device(device) = self {
            device.write_hi(offset, data);
        }
    }

    pub fn read_io(&mut self, offset: u8) -> u8 {
        match self {
            ExpansionSlot::Empty => 0xff,
            ExpansionSlot::Device(device) => device.read_io(offset & 0x1f),
        }
    }

    pub fn write_io(&mut self, offset: u8, data: u8) {
        if let ExpansionSlot::Device(device) = self {
            device.write_io(offset & 0x1f, data);
        }
    }
}

/// Sega My Card slot, mapped at $A0000-$BFFFF.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Clone)]
pub enum CardSlot {
    #[default]
    Empty,
    Rom(RomCard),
}

impl fmt::Display for CardSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardSlot::Empty => write!(f, "Empty"),
            CardSlot::Rom(card) => write!(
                f,
                "ROM path={:?} size={:#07X}",
                card.rom_path,
                card.data.len()
            ),
        }
    }
}

impl CardSlot {
    pub fn read_cart(&self, offset: u32) -> u8 {
        match self {
            CardSlot::Empty => 0xff,
            CardSlot::Rom(card) => card.read(offset),
        }
    }

    pub fn write_cart(&mut self, offset: u32, data: u8) {
        if let CardSlot::Rom(_) = self {
            tracing::trace!("[CARD] Ignored write {:05X} = {:02X}", offset, data);
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq, Clone)]
pub struct RomCard {
    pub rom_path: Option<PathBuf>,
    pub data: Vec<u8>,
}

impl RomCard {
    pub fn new(rom: &[u8]) -> Result<Self, BusError> {
        if rom.len() > CARD_SIZE {
            return Err(BusError::ImageTooLarge {
                region: "card",
                size: rom.len(),
                capacity: CARD_SIZE,
            });
        }

        Ok(RomCard {
            rom_path: None,
            data: rom.to_vec(),
        })
    }

    pub fn load(rom_path: PathBuf) -> anyhow::Result<Self> {
        let mut file = File::open(&rom_path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;

        let mut card = Self::new(&buffer)?;
        card.rom_path = Some(rom_path);

        Ok(card)
    }

    /// Small cards are mirrored across the window.
    pub fn read(&self, offset: u32) -> u8 {
        if self.data.is_empty() {
            return 0xff;
        }
        self.data[offset as usize % self.data.len()]
    }
}
