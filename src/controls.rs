use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Joypad unit and the trigger button beside the touch panel.
///
/// All buttons are active low on the 8255: a pressed button reads as 0.
#[derive(Debug, Clone)]
pub struct Controls {
    pressed: HashSet<Button>,
    mappings: Vec<Mapping>,
    mic_sensor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Pl,
    Pr,
    Grey,
}

impl Button {
    // (port, bit): port 4 is 8255 port A, port 5 feeds port B bit 0
    fn line(self) -> (u8, u8) {
        match self {
            Button::Up => (4, 0),
            Button::Down => (4, 1),
            Button::Left => (4, 2),
            Button::Right => (4, 3),
            Button::Pl => (4, 4),
            Button::Pr => (4, 5),
            Button::Grey => (5, 0),
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Controls::default()
    }

    pub fn key_down(&mut self, key: &str) {
        if let Some(mapping) = self.mappings.iter().find(|m| m.key == key) {
            self.pressed.insert(mapping.button);
        }
    }

    pub fn key_up(&mut self, key: &str) {
        if let Some(mapping) = self.mappings.iter().find(|m| m.key == key) {
            self.pressed.remove(&mapping.button);
        }
    }

    pub fn press(&mut self, button: Button) {
        self.pressed.insert(button);
    }

    pub fn release(&mut self, button: Button) {
        self.pressed.remove(&button);
    }

    /// Microphone sensor, 1 = sound detected.
    pub fn set_mic_sensor(&mut self, active: bool) {
        self.mic_sensor = active;
    }

    fn port(&self, port: u8) -> u8 {
        let mut ret = 0xff;
        for button in &self.pressed {
            let (button_port, bit) = button.line();
            if button_port == port {
                ret &= !(1 << bit);
            }
        }
        ret
    }

    /// PORT4: joypad directions and PL/PR in bits 0-5, mic sensor in bit 7.
    /// Bit 6 belongs to the speech chip and is filled in by the bus.
    pub fn port4(&self) -> u8 {
        let mut data = self.port(4);
        if !self.mic_sensor {
            data &= !0x80;
        }
        data
    }

    pub fn port5(&self) -> u8 {
        self.port(5)
    }
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            pressed: HashSet::new(),
            mappings: default_mapping().to_vec(),
            mic_sensor: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mapping {
    key: String,
    button: Button,
}

impl Mapping {
    pub fn new(key: &str, button: Button) -> Self {
        Mapping {
            key: key.to_string(),
            button,
        }
    }
}

fn default_mapping() -> [Mapping; 7] {
    [
        Mapping::new("ArrowUp", Button::Up),
        Mapping::new("ArrowDown", Button::Down),
        Mapping::new("ArrowLeft", Button::Left),
        Mapping::new("ArrowRight", Button::Right),
        Mapping::new("KeyZ", Button::Pl),
        Mapping::new("KeyX", Button::Pr),
        Mapping::new("Space", Button::Grey),
    ]
}
