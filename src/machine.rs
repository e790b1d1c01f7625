use std::{cell::RefCell, collections::VecDeque, fs, path::PathBuf, rc::Rc};

use anyhow::{bail, Context};
use tracing::{error, info, trace};

use crate::{
    bus::Bus,
    clock::{Clock, ClockEvent, CPU_CYCLES_PER_SCANLINE, SCANLINES_PER_FRAME},
    cpu::Cpu,
    internal_state::{InternalState, ReportState},
    memory::Bios,
    slot::{CardSlot, ExpansionDevice, RomCard},
};

/// Board events posted by the bus for the machine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    IrqAsserted,
    IrqCleared,
}

pub struct Machine<C: Cpu> {
    pub bus: Bus,
    pub cpu: C,
    pub queue: Rc<RefCell<VecDeque<Message>>>,
    pub clock: Clock,
    pub cycles: usize,
    pub frame_ready: bool,
    stopped: bool,
}

impl<C: Cpu> Machine<C> {
    pub fn new(cpu: C) -> Self {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let bus = Bus::new(queue.clone());

        Self {
            bus,
            cpu,
            queue,
            clock: Clock::new(),
            cycles: 0,
            frame_ready: false,
            stopped: false,
        }
    }

    pub fn reset(&mut self) {
        info!("[Machine] Reset");
        self.bus.reset();
        self.cpu.reset();
        self.clock.reset();
        self.cycles = 0;
        self.frame_ready = false;
        self.stopped = false;
        self.queue.borrow_mut().clear();
        self.cpu.set_irq_line(self.bus.irq_line());
    }

    pub fn get_cycles(&self) -> usize {
        self.cycles
    }

    /// Set once an instruction failed; only `reset` clears it.
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    /// Executes a single instruction and returns its cycle count.
    pub fn step(&mut self) -> anyhow::Result<u32> {
        if self.stopped {
            bail!("machine stopped after a fatal bus error, reset required");
        }

        self.process_messages();

        let cycles_taken = match self.cpu.step(&mut self.bus) {
            Ok(cycles) => cycles,
            Err(err) => {
                error!("[Machine] Stopping at cycle {}: {}", self.cycles, err);
                self.stopped = true;
                return Err(err).context(format!("cpu step at cycle {}", self.cycles));
            }
        };

        let events = self.clock.tick(cycles_taken);
        if !events.is_empty() {
            self.handle_clock_events(events);
        }

        // line changes from this instruction reach the CPU before the next one
        self.process_messages();

        self.cycles += cycles_taken as usize;
        Ok(cycles_taken)
    }

    pub fn step_for(&mut self, n: usize) -> anyhow::Result<()> {
        let mut cycles_executed = 0;
        while cycles_executed < n {
            cycles_executed += self.step()? as usize;
        }
        Ok(())
    }

    pub fn step_frame(&mut self) -> anyhow::Result<()> {
        self.frame_ready = false;
        let cycles_per_frame = (SCANLINES_PER_FRAME * CPU_CYCLES_PER_SCANLINE) as usize;
        let target_cycles = self.cycles + cycles_per_frame;

        while self.cycles < target_cycles {
            self.step()?;
        }

        self.frame_ready = true;
        Ok(())
    }

    pub fn is_frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn get_frame_progress(&self) -> f64 {
        self.clock.frame_progress()
    }

    pub fn memory_dump(&mut self, start: u32, end: u32) -> String {
        self.bus.memory_dump(start, end)
    }

    fn process_messages(&mut self) {
        while let Some(message) = self.queue.borrow_mut().pop_front() {
            trace!("[Machine] {:?}", message);
            match message {
                Message::IrqAsserted => self.cpu.set_irq_line(true),
                Message::IrqCleared => self.cpu.set_irq_line(false),
            }
        }
    }

    fn handle_clock_events(&mut self, events: Vec<ClockEvent>) {
        for event in events {
            match event {
                ClockEvent::VBlankStart => self.bus.vblank(true),
                ClockEvent::VBlankEnd => self.bus.vblank(false),
                ClockEvent::FrameEnd => {
                    self.frame_ready = true;
                    trace!(
                        "Frame {} completed, total cycles: {}",
                        self.clock.frame_count(),
                        self.clock.total_cycles()
                    );
                }
            }
        }
    }
}

impl<C: Cpu> ReportState for Machine<C> {
    fn report_state(&self) -> InternalState {
        self.bus.report_state()
    }
}

/// Assembles a machine from ROM images and an optional expansion device.
#[derive(Default)]
pub struct MachineBuilder {
    bios: Option<Bios>,
    card: CardSlot,
    expansion: Option<Box<dyn ExpansionDevice>>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bios(mut self, rom: &[u8]) -> anyhow::Result<Self> {
        self.bios = Some(Bios::new(rom)?);
        Ok(self)
    }

    pub fn bios_file(self, path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let rom = fs::read(&path).with_context(|| format!("reading BIOS {}", path.display()))?;
        self.bios(&rom)
    }

    pub fn card(mut self, rom: &[u8]) -> anyhow::Result<Self> {
        self.card = CardSlot::Rom(RomCard::new(rom)?);
        Ok(self)
    }

    pub fn card_file(mut self, path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let card =
            RomCard::load(path.clone()).with_context(|| format!("reading card {}", path.display()))?;
        self.card = CardSlot::Rom(card);
        Ok(self)
    }

    pub fn expansion(mut self, device: Box<dyn ExpansionDevice>) -> Self {
        self.expansion = Some(device);
        self
    }

    pub fn build<C: Cpu>(self, cpu: C) -> anyhow::Result<Machine<C>> {
        let Some(bios) = self.bios else {
            bail!("MachineBuilder: no BIOS image");
        };

        let mut machine = Machine::new(cpu);
        machine.bus.set_bios(bios);
        machine.bus.insert_card(self.card);
        if let Some(device) = self.expansion {
            machine.bus.attach_expansion(device);
        }
        machine.reset();

        Ok(machine)
    }
}
