use serde::{Deserialize, Serialize};
use tracing::trace;

pub const TOUCHPAD_ROWS: usize = 20;
pub const TOUCHPAD_COLUMNS: usize = 24;

// Pixel position of each sensor column / row
const TP_X: [u8; TOUCHPAD_COLUMNS] = [
    5, 15, 26, 37, 47, 58, 69, 79, 90, 101, 111, 122, 133, 143, 154, 165, 175, 186, 197, 207, 218,
    229, 239, 250,
];

const TP_Y: [u8; TOUCHPAD_ROWS] = [
    6, 18, 31, 44, 57, 70, 82, 95, 108, 121, 134, 146, 159, 172, 185, 198, 210, 223, 236, 249,
];

const COLUMN_MASK: u32 = (1 << TOUCHPAD_COLUMNS) - 1;

/// Pressure pad emulated as a 24x20 matrix of buttons.
///
/// Ports $1C-$1E. $1C bit 0 selects which coordinate $1E returns (1 = Y),
/// $1D bit 0 enables scanning (reported through 8255 port B), $1E writes are
/// latched but have no known function.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Touchpad {
    rows: [u32; TOUCHPAD_ROWS],
    port_1c: u8,
    port_1d: u8,
    port_1e: u8,
    x: u8,
    y: u8,
}

impl Touchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the control latches and samples. The sensor rows are host input
    /// and survive a reset.
    pub fn reset(&mut self) {
        self.port_1c = 0;
        self.port_1d = 0;
        self.port_1e = 0;
        self.x = 0;
        self.y = 0;
    }

    pub fn touch(&mut self, column: usize, row: usize) {
        if column < TOUCHPAD_COLUMNS && row < TOUCHPAD_ROWS {
            self.rows[row] |= 1 << column;
        }
    }

    pub fn release(&mut self, column: usize, row: usize) {
        if column < TOUCHPAD_COLUMNS && row < TOUCHPAD_ROWS {
            self.rows[row] &= !(1 << column);
        }
    }

    pub fn release_all(&mut self) {
        self.rows = [0; TOUCHPAD_ROWS];
    }

    pub fn set_row(&mut self, row: usize, columns: u32) {
        if row < TOUCHPAD_ROWS {
            self.rows[row] = columns & COLUMN_MASK;
        }
    }

    pub fn row(&self, row: usize) -> u32 {
        self.rows.get(row).copied().unwrap_or(0)
    }

    /// Scans the matrix and latches the first touched cell as (x, y).
    ///
    /// Rows are scanned top to bottom and columns left to right, so with
    /// several cells touched the top-left one wins. When nothing is touched
    /// the previous sample is kept.
    pub fn is_pressed(&mut self) -> bool {
        for (row, &columns) in self.rows.iter().enumerate() {
            let columns = columns & COLUMN_MASK;
            if columns == 0 {
                continue;
            }

            let column = columns.trailing_zeros() as usize;
            self.x = TP_X[column];
            self.y = TP_Y[row];
            trace!(
                "[TOUCHPAD] Pressed at column {} row {} ({}, {})",
                column,
                row,
                self.x,
                self.y
            );
            return true;
        }

        false
    }

    pub fn scan_enabled(&self) -> bool {
        self.port_1d & 0x01 != 0
    }

    pub fn y_selected(&self) -> bool {
        self.port_1c & 0x01 != 0
    }

    pub fn sample(&self) -> (u8, u8) {
        (self.x, self.y)
    }

    pub fn control(&self) -> [u8; 3] {
        [self.port_1c, self.port_1d, self.port_1e]
    }

    /// Touchpad bits of 8255 port B, active low: bit 2 clear = data
    /// available, bit 1 clear = pressed.
    pub fn status(&mut self) -> u8 {
        if self.scan_enabled() {
            let mut status = 0x04;
            if !self.is_pressed() {
                status |= 0x02;
            }
            status
        } else {
            0x02
        }
    }

    pub fn read(&self, port: u8) -> u8 {
        match port {
            0x1e => {
                if self.y_selected() {
                    self.y
                } else {
                    self.x
                }
            }
            _ => 0xff,
        }
    }

    pub fn write(&mut self, port: u8, data: u8) {
        trace!("[TOUCHPAD] [{:02X}] <- {:02X}", port, data);
        match port {
            0x1c => self.port_1c = data,
            0x1d => self.port_1d = data,
            0x1e => self.port_1e = data,
            _ => {}
        }
    }
}
