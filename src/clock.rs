/// V20 against NTSC V9938 timing
pub const CPU_CLOCK_HZ: u32 = 5_000_000; // 20 MHz / 4
pub const SCANLINES_PER_FRAME: u32 = 262;
pub const CPU_CYCLES_PER_SCANLINE: u32 = 318;
pub const ACTIVE_DISPLAY_LINES: u32 = 212;
pub const VBLANK_START_LINE: u32 = 212;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    VBlankStart,
    VBlankEnd,
    FrameEnd,
}

/// Beam position derived from executed CPU cycles.
#[derive(Debug, Default)]
pub struct Clock {
    total_cycles: u64,

    /// Current scanline (0-261)
    current_scanline: u32,

    /// Cycles within current scanline
    scanline_cycle: u32,

    frame_count: u64,
    vblank_active: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the clock by the specified number of CPU cycles
    pub fn tick(&mut self, cycles: u32) -> Vec<ClockEvent> {
        let mut triggered_events = Vec::new();

        self.total_cycles += cycles as u64;
        self.scanline_cycle += cycles;

        while self.scanline_cycle >= CPU_CYCLES_PER_SCANLINE {
            self.scanline_cycle -= CPU_CYCLES_PER_SCANLINE;
            self.current_scanline += 1;

            if self.current_scanline == VBLANK_START_LINE {
                self.vblank_active = true;
                triggered_events.push(ClockEvent::VBlankStart);
            }

            if self.current_scanline >= SCANLINES_PER_FRAME {
                self.current_scanline = 0;
                self.frame_count += 1;
                self.vblank_active = false;
                triggered_events.push(ClockEvent::VBlankEnd);
                triggered_events.push(ClockEvent::FrameEnd);
            }
        }

        triggered_events
    }

    pub fn current_scanline(&self) -> u32 {
        self.current_scanline
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn is_vblank(&self) -> bool {
        self.vblank_active
    }

    pub fn frame_progress(&self) -> f64 {
        let frame_cycles = (SCANLINES_PER_FRAME * CPU_CYCLES_PER_SCANLINE) as f64;
        let elapsed = (self.current_scanline * CPU_CYCLES_PER_SCANLINE + self.scanline_cycle) as f64;
        elapsed / frame_cycles
    }
}
