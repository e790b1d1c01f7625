pub mod bus;
pub mod clock;
pub mod config;
pub mod controls;
pub mod cpu;
pub mod error;
pub mod internal_state;
pub mod interrupt;
pub mod logging;
pub mod machine;
pub mod memory;
pub mod ppi;
pub mod psg;
pub mod slot;
pub mod speech;
pub mod touchpad;
pub mod usart;
pub mod utils;
pub mod vdp;

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

pub use bus::{decode_port, Bus, PortWindow, PORT_MAP};
pub use config::MachineConfig;
pub use cpu::{Cpu, CpuIo};
pub use error::{BusError, InterruptError};
pub use internal_state::{InternalState, ReportState};
pub use interrupt::{InterruptController, InterruptSource};
pub use machine::{Machine, MachineBuilder, Message};
pub use touchpad::Touchpad;
pub use utils::hexdump;
use wasm_bindgen::prelude::*;

/// Bus controller exposed to a JavaScript front end that brings its own CPU.
#[wasm_bindgen(js_name = Bus)]
pub struct JsBus {
    bus: Bus,
    seen_transitions: u64,
}

#[wasm_bindgen(js_class = Bus)]
impl JsBus {
    #[wasm_bindgen(constructor)]
    pub fn new(bios: &[u8]) -> Result<JsBus, JsValue> {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();

        // no run loop here; the front end polls the line instead
        let mut bus = Bus::new(Rc::new(RefCell::new(VecDeque::new())));
        bus.load_bios(bios).map_err(to_js_error)?;

        Ok(Self {
            bus,
            seen_transitions: 0,
        })
    }

    #[wasm_bindgen(js_name = insertCard)]
    pub fn insert_card(&mut self, rom: &[u8]) -> Result<(), JsValue> {
        let card = slot::RomCard::new(rom).map_err(to_js_error)?;
        self.bus.insert_card(slot::CardSlot::Rom(card));
        Ok(())
    }

    pub fn reset(&mut self) {
        self.bus.reset();
    }

    #[wasm_bindgen(js_name = portIn)]
    pub fn port_in(&mut self, port: u8) -> u8 {
        self.bus.input(port)
    }

    #[wasm_bindgen(js_name = portOut)]
    pub fn port_out(&mut self, port: u8, data: u8) {
        self.bus.output(port, data);
    }

    #[wasm_bindgen(js_name = readByte)]
    pub fn read_byte(&mut self, address: u32) -> u8 {
        self.bus.read_byte(address)
    }

    #[wasm_bindgen(js_name = writeByte)]
    pub fn write_byte(&mut self, address: u32, data: u8) {
        self.bus.write_byte(address, data);
    }

    /// Returns the vector for the INTA cycle, throws if nothing is pending.
    pub fn acknowledge(&mut self) -> Result<u8, JsValue> {
        self.bus.acknowledge().map_err(to_js_error)
    }

    #[wasm_bindgen(getter = irqLine)]
    pub fn irq_line(&self) -> bool {
        self.bus.irq_line()
    }

    /// Number of line transitions since the last call. The front end uses it
    /// to spot a pulse that rose and fell between two polls.
    #[wasm_bindgen(js_name = takeIrqChanges)]
    pub fn take_irq_changes(&mut self) -> u32 {
        let transitions = self.bus.irq.transitions();
        let changes = transitions.wrapping_sub(self.seen_transitions);
        self.seen_transitions = transitions;
        u32::try_from(changes).unwrap_or(u32::MAX)
    }

    pub fn vblank(&mut self, active: bool) {
        self.bus.vblank(active);
    }

    #[wasm_bindgen(js_name = speechDrq)]
    pub fn speech_drq(&mut self, state: bool) {
        self.bus.speech_drq(state);
    }

    #[wasm_bindgen(js_name = speechBusy)]
    pub fn speech_busy(&mut self, state: bool) {
        self.bus.speech_busy(state);
    }

    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, key: &str) {
        self.bus.key_down(key);
    }

    #[wasm_bindgen(js_name = keyUp)]
    pub fn key_up(&mut self, key: &str) {
        self.bus.key_up(key);
    }

    pub fn touch(&mut self, column: usize, row: usize) {
        self.bus.touchpad.touch(column, row);
    }

    pub fn release(&mut self, column: usize, row: usize) {
        self.bus.touchpad.release(column, row);
    }

    #[wasm_bindgen(js_name = releaseAll)]
    pub fn release_all(&mut self) {
        self.bus.touchpad.release_all();
    }

    #[wasm_bindgen(js_name = setRow)]
    pub fn set_row(&mut self, row: usize, columns: u32) {
        self.bus.touchpad.set_row(row, columns);
    }

    pub fn state(&self) -> Result<String, JsValue> {
        self.bus.report_state().to_json().map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = memoryDump)]
    pub fn memory_dump(&mut self, start: u32, end: u32) -> String {
        self.bus.memory_dump(start, end)
    }
}

fn to_js_error(err: impl ToString) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}
