// +-----------+------------------------------------------------+
// | Range     | Description                                    |
// +-----------+------------------------------------------------+
// | 0x00-0x03 | VDP: Video Display Processor (V9938)           |
// | 0x04-0x07 | PPI: Peripheral Interface (8255)               |
// | 0x08-0x09 | USART: Communications Interface (8251)        |
// | 0x0B      | uPD7759 control (315-5201)                     |
// | 0x0C      | PSG: Programmable Sound Generator (SN76489A)   |
// | 0x14-0x15 | uPD7759 data port                              |
// | 0x16      | IRQ enable                                     |
// | 0x17      | IRQ enable, per source selection               |
// | 0x1C-0x1E | Touchpad                                       |
// | 0x20-0x3F | Expansion slot I/O                             |
// +-----------+------------------------------------------------+
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    controls::Controls,
    error::{BusError, InterruptError},
    interrupt::{InterruptController, InterruptSource},
    internal_state::{InternalState, ReportState},
    machine::Message,
    memory::{Bios, Ram, BIOS_BASE},
    ppi::{Ppi, PpiPorts},
    psg::Sn76489,
    slot::{CardSlot, ExpansionDevice, ExpansionSlot},
    speech::Upd7759,
    touchpad::Touchpad,
    usart::I8251,
    utils::hexdump,
    vdp::V9938,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortWindow {
    Vdp,
    Ppi,
    UsartData,
    UsartControl,
    SpeechControl,
    Psg,
    SpeechPort,
    IrqEnable,
    IrqSelect,
    Touchpad,
    Expansion,
    // write-only ports of unknown function poked by the BIOS
    Unknown,
}

/// I/O port windows, ascending and non-overlapping.
pub const PORT_MAP: [(u8, u8, PortWindow); 14] = [
    (0x00, 0x03, PortWindow::Vdp),
    (0x04, 0x07, PortWindow::Ppi),
    (0x08, 0x08, PortWindow::UsartData),
    (0x09, 0x09, PortWindow::UsartControl),
    (0x0a, 0x0a, PortWindow::Unknown),
    (0x0b, 0x0b, PortWindow::SpeechControl),
    (0x0c, 0x0c, PortWindow::Psg),
    (0x0e, 0x0f, PortWindow::Unknown),
    (0x14, 0x15, PortWindow::SpeechPort),
    (0x16, 0x16, PortWindow::IrqEnable),
    (0x17, 0x17, PortWindow::IrqSelect),
    (0x1c, 0x1e, PortWindow::Touchpad),
    (0x1f, 0x1f, PortWindow::Unknown),
    (0x20, 0x3f, PortWindow::Expansion),
];

pub fn decode_port(port: u8) -> Option<PortWindow> {
    PORT_MAP
        .iter()
        .find(|(start, end, _)| (*start..=*end).contains(&port))
        .map(|(_, _, window)| *window)
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Bus {
    // I/O Devices
    pub vdp: V9938,
    pub ppi: Ppi,
    pub usart: I8251,
    pub psg: Sn76489,
    pub speech: Upd7759,
    pub irq: InterruptController,
    pub touchpad: Touchpad,
    pub controls: Controls,

    pub card: CardSlot,
    pub expansion: ExpansionSlot,

    #[derivative(Debug = "ignore")]
    ram: Ram,
    #[derivative(Debug = "ignore")]
    bios: Bios,

    port_b: u8,
    speech_control: u8,
}

impl Bus {
    pub fn new(queue: Rc<RefCell<VecDeque<Message>>>) -> Self {
        Self {
            vdp: V9938::new(),
            ppi: Ppi::new(),
            usart: I8251::new(),
            psg: Sn76489::new(),
            speech: Upd7759::new(),
            irq: InterruptController::new(queue),
            touchpad: Touchpad::new(),
            controls: Controls::new(),
            card: CardSlot::Empty,
            expansion: ExpansionSlot::Empty,
            ram: Ram::new(),
            bios: Bios::default(),
            port_b: 0x7f,
            speech_control: 0,
        }
    }

    pub fn reset(&mut self) {
        self.vdp.reset();
        self.ppi.reset();
        self.usart.reset();
        self.psg.reset();
        self.speech.reset();
        self.irq.reset();
        self.touchpad.reset();
        self.port_b = 0x7f;
        self.speech_control = 0;
    }

    pub fn load_bios(&mut self, rom: &[u8]) -> Result<(), BusError> {
        self.set_bios(Bios::new(rom)?);
        Ok(())
    }

    pub fn set_bios(&mut self, bios: Bios) {
        info!("[BUS] BIOS {:#07X} bytes", bios.data.len());
        self.bios = bios;
    }

    pub fn insert_card(&mut self, card: CardSlot) {
        info!("[BUS] Card slot: {}", card);
        self.card = card;
    }

    pub fn attach_expansion(&mut self, device: Box<dyn ExpansionDevice>) {
        info!("[BUS] Expansion slot: {}", device.name());
        self.expansion = ExpansionSlot::Device(device);
    }

    pub fn key_down(&mut self, key: &str) {
        self.controls.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.controls.key_up(key);
    }

    pub fn irq_line(&self) -> bool {
        self.irq.line()
    }

    /// CPU interrupt acknowledge cycle.
    pub fn acknowledge(&mut self) -> Result<u8, InterruptError> {
        self.irq.acknowledge()
    }

    /// V9938 INT output changed.
    pub fn vdp_interrupt(&mut self, state: bool) {
        self.irq.signal(InterruptSource::Video, state);
    }

    pub fn vblank(&mut self, active: bool) {
        self.vdp.set_vblank(active);
        self.update_vdp_irq();
    }

    fn update_vdp_irq(&mut self) {
        let state = self.vdp.int_line();
        self.vdp_interrupt(state);
    }

    /// uPD7759 DRQ output. DRQ is active low, the latch sees its inverse.
    pub fn speech_drq(&mut self, state: bool) {
        self.irq.signal(InterruptSource::Speech, !state);
    }

    /// uPD7759 BUSY output. Only visible on 8255 port A; it has no path into
    /// the interrupt latch.
    pub fn speech_busy(&mut self, state: bool) {
        trace!("[SPEECH] Busy line {}", state);
        self.speech.set_busy(state);
    }

    pub fn speech_control(&self) -> u8 {
        self.speech_control
    }

    pub fn input(&mut self, port: u8) -> u8 {
        let Some(window) = decode_port(port) else {
            trace!("[BUS] Invalid port {:02X} read", port);
            return 0xff;
        };

        let data = match window {
            PortWindow::Vdp => {
                let data = self.vdp.read(port);
                self.update_vdp_irq();
                data
            }
            PortWindow::Ppi => {
                let mut lines = BoardLines {
                    controls: &self.controls,
                    touchpad: &mut self.touchpad,
                    speech: &self.speech,
                    port_b: &mut self.port_b,
                };
                self.ppi.read(port, &mut lines)
            }
            PortWindow::UsartData => self.usart.data_r(),
            PortWindow::UsartControl => self.usart.status_r(),
            PortWindow::IrqEnable => self.irq.enabled(),
            PortWindow::Touchpad => self.touchpad.read(port),
            PortWindow::Expansion => self.expansion.read_io(port & 0x1f),
            PortWindow::SpeechControl
            | PortWindow::Psg
            | PortWindow::SpeechPort
            | PortWindow::IrqSelect
            | PortWindow::Unknown => {
                trace!("[BUS] Read from write-only port {:02X}", port);
                0xff
            }
        };

        trace!("[BUS] [RD] [{:02X}] = {:02X}", port, data);
        data
    }

    pub fn output(&mut self, port: u8, data: u8) {
        let Some(window) = decode_port(port) else {
            trace!("[BUS] Invalid port {:02X} write = {:02X}", port, data);
            return;
        };

        trace!("[BUS] [WR] [{:02X}] = {:02X}", port, data);
        match window {
            PortWindow::Vdp => {
                self.vdp.write(port, data);
                self.update_vdp_irq();
            }
            PortWindow::Ppi => {
                let mut lines = BoardLines {
                    controls: &self.controls,
                    touchpad: &mut self.touchpad,
                    speech: &self.speech,
                    port_b: &mut self.port_b,
                };
                self.ppi.write(port, data, &mut lines);
            }
            PortWindow::UsartData => self.usart.data_w(data),
            PortWindow::UsartControl => self.usart.control_w(data),
            PortWindow::SpeechControl => self.write_speech_control(data),
            PortWindow::Psg => self.psg.write(data),
            PortWindow::SpeechPort => self.speech.port_w(data),
            PortWindow::IrqEnable => self.irq.write_enable(data),
            PortWindow::IrqSelect => self.irq.write_select(data),
            PortWindow::Touchpad => self.touchpad.write(port, data),
            PortWindow::Expansion => self.expansion.write_io(port & 0x1f, data),
            PortWindow::Unknown => {
                debug!("[BUS] Write to unknown port {:02X} = {:02X}", port, data);
            }
        }
    }

    fn write_speech_control(&mut self, data: u8) {
        info!("[BUS] I/O Port $0b write: ${:02x}", data);
        self.speech_control = data;

        // bit 0 drives the /MD line
        self.speech.md_w(data & 0x01 == 0);
        // bit 1 selects the sample ROM bank, unconfirmed
        self.speech.set_rom_bank((data & 0x02) >> 1);
    }

    pub fn read_byte(&mut self, addr: u32) -> u8 {
        let addr = addr & 0xfffff;
        match addr {
            0x00000..=0x1ffff => self.ram.read(addr),
            0x20000..=0x3ffff => self.expansion.read_lo(addr - 0x20000),
            0x80000..=0x8ffff => self.expansion.read_hi(addr - 0x80000),
            0xa0000..=0xbffff => self.card.read_cart(addr - 0xa0000),
            0xc0000..=0xfffff => self.bios.read(addr - BIOS_BASE),
            _ => 0xff,
        }
    }

    pub fn write_byte(&mut self, addr: u32, data: u8) {
        let addr = addr & 0xfffff;
        match addr {
            0x00000..=0x1ffff => self.ram.write(addr, data),
            0x20000..=0x3ffff => self.expansion.write_lo(addr - 0x20000, data),
            0x80000..=0x8ffff => self.expansion.write_hi(addr - 0x80000, data),
            0xa0000..=0xbffff => self.card.write_cart(addr - 0xa0000, data),
            0xc0000..=0xfffff => self.bios.write(addr - BIOS_BASE, data),
            _ => trace!("[BUS] Unmapped write {:05X} = {:02X}", addr, data),
        }
    }

    pub fn write_block(&mut self, start_addr: u32, data: &[u8]) {
        let mut addr = start_addr;
        for &byte in data {
            self.write_byte(addr, byte);
            addr = addr.wrapping_add(1);
        }
    }

    pub fn memory_dump(&mut self, start: u32, end: u32) -> String {
        let buffer: Vec<u8> = (start..=end).map(|addr| self.read_byte(addr)).collect();
        hexdump(&buffer, start)
    }
}

impl ReportState for Bus {
    fn report_state(&self) -> InternalState {
        let (touchpad_x, touchpad_y) = self.touchpad.sample();
        InternalState {
            irq_pending: self.irq.pending(),
            irq_enabled: self.irq.enabled(),
            irq_vector: self.irq.vector(),
            irq_line: self.irq.line(),
            touchpad_control: self.touchpad.control(),
            touchpad_x,
            touchpad_y,
            speech_control: self.speech_control,
            ppi_control: self.ppi.control(),
        }
    }
}

// Inputs and outputs of the mainboard 8255
struct BoardLines<'a> {
    controls: &'a Controls,
    touchpad: &'a mut Touchpad,
    speech: &'a Upd7759,
    port_b: &'a mut u8,
}

impl PpiPorts for BoardLines<'_> {
    // 76543210
    // +-------- Microphone sensor (1 = sound enabled)
    //  +------- uPD7759 BUSY
    //   +------ PR trigger (active low)
    //    +----- PL trigger (active low)
    //     +---- Pad right (active low)
    //      +--- Pad left (active low)
    //       +-- Pad down (active low)
    //        +- Pad up (active low)
    fn port_a_in(&mut self) -> u8 {
        (if self.speech.busy_r() { 0x40 } else { 0 }) | (self.controls.port4() & !0x40)
    }

    // 76543210
    // +-------- CN9 Pin 8 (1 - unit is powered??)
    //  +------- Tape head engaged
    //   +------ Tape insertion sensor (0 - tape is inserted, 1 - no tape inserted)
    //    +----- Tape write enable sensor
    //     +---- keyboard connector pin 3
    //      +--- 0 = Touch pad data available
    //       +-- 0 = Touch pad pressed
    //        +- Trigger button near touch panel (active low)
    fn port_b_in(&mut self) -> u8 {
        *self.port_b = (*self.port_b & 0xf8) | (self.controls.port5() & 0x01);
        *self.port_b |= self.touchpad.status();

        // bit 5 always reads as tape inserted
        *self.port_b & 0xdf
    }

    // upper nibble: keyboard connector pins 5, 8, 2, 1
    fn port_c_in(&mut self) -> u8 {
        0xf0
    }

    fn port_c_out(&mut self, data: u8) {
        info!("[PPI] Port C write: {:02x}", data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus() -> Bus {
        Bus::new(Rc::new(RefCell::new(VecDeque::new())))
    }

    #[test]
    fn test_port_map_is_ordered() {
        for pair in PORT_MAP.windows(2) {
            let (_, end, _) = pair[0];
            let (start, _, _) = pair[1];
            assert!(end < start, "{:02X} overlaps {:02X}", end, start);
        }
        for (start, end, _) in PORT_MAP {
            assert!(start <= end);
        }
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_port(0x02), Some(PortWindow::Vdp));
        assert_eq!(decode_port(0x07), Some(PortWindow::Ppi));
        assert_eq!(decode_port(0x0c), Some(PortWindow::Psg));
        assert_eq!(decode_port(0x0d), None);
        assert_eq!(decode_port(0x15), Some(PortWindow::SpeechPort));
        assert_eq!(decode_port(0x1e), Some(PortWindow::Touchpad));
        assert_eq!(decode_port(0x1f), Some(PortWindow::Unknown));
        assert_eq!(decode_port(0x3f), Some(PortWindow::Expansion));
        assert_eq!(decode_port(0x40), None);
        assert_eq!(decode_port(0xff), None);
    }

    #[test]
    fn test_port_b_idle() {
        let mut bus = bus();
        // scanning off: data not available, not pressed
        assert_eq!(bus.input(0x05), 0x5b);
    }

    #[test]
    fn test_port_b_touchpad() {
        let mut bus = bus();
        bus.output(0x1d, 0x01);
        assert_eq!(bus.input(0x05), 0x5f);

        bus.touchpad.touch(0, 0);
        assert_eq!(bus.input(0x05), 0x5d);
        assert_eq!(bus.input(0x1e), 5);
        bus.output(0x1c, 0x01);
        assert_eq!(bus.input(0x1e), 6);
    }

    #[test]
    fn test_port_b_grey_button() {
        let mut bus = bus();
        bus.key_down("Space");
        assert_eq!(bus.input(0x05), 0x5a);
    }

    #[test]
    fn test_port_a_busy_and_joypad() {
        let mut bus = bus();
        assert_eq!(bus.input(0x04), 0xff);

        bus.speech_busy(false);
        bus.key_down("ArrowUp");
        assert_eq!(bus.input(0x04), 0xbe);
    }

    #[test]
    fn test_speech_control_lines() {
        let mut bus = bus();
        bus.output(0x0b, 0x01);
        assert!(!bus.speech.md());
        assert_eq!(bus.speech.rom_bank(), 0);

        bus.output(0x0b, 0x02);
        assert!(bus.speech.md());
        assert_eq!(bus.speech.rom_bank(), 1);
        assert_eq!(bus.speech_control(), 0x02);
    }

    #[test]
    fn test_memory_map() {
        let mut bus = bus();
        bus.load_bios(&[0x90; 0x40000]).unwrap();

        bus.write_byte(0x1fffe, 0x12);
        assert_eq!(bus.read_byte(0x1fffe), 0x12);
        assert_eq!(bus.read_byte(0x40000), 0xff);
        assert_eq!(bus.read_byte(0xa0000), 0xff);
        assert_eq!(bus.read_byte(0xffff0), 0x90);

        bus.write_byte(0xffff0, 0x00);
        assert_eq!(bus.read_byte(0xffff0), 0x90);
    }

    #[test]
    fn test_reset_restores_power_on_state() {
        let mut bus = bus();
        bus.output(0x16, 0xff);
        bus.output(0x1d, 0x01);
        bus.output(0x0b, 0x03);
        bus.speech_drq(false);

        bus.reset();
        let state = bus.report_state();
        assert_eq!(state.irq_enabled, 0);
        assert_eq!(state.irq_pending, 0);
        assert_eq!(state.touchpad_control, [0, 0, 0]);
        assert_eq!(state.speech_control, 0);
        assert_eq!(state.ppi_control, 0x9b);
    }
}
