use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

const STATUS_TXRDY: u8 = 0x01;
const STATUS_RXRDY: u8 = 0x02;
const STATUS_TXEMPTY: u8 = 0x04;

/// Transmitted bytes kept until the host takes them; older ones are dropped.
pub const TX_LOG_LIMIT: usize = 0x1000;

/// 8251 USART register interface at ports $08 (data) and $09
/// (status/control). Nothing is attached to the serial lines: transmitted
/// bytes complete immediately and received bytes come from the host.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct I8251 {
    mode: u8,
    command: u8,
    expect_mode: bool,
    rx_data: u8,
    rx_ready: bool,
    transmitted: Vec<u8>,
}

impl Default for I8251 {
    fn default() -> Self {
        Self {
            mode: 0,
            command: 0,
            expect_mode: true,
            rx_data: 0,
            rx_ready: false,
            transmitted: Vec::new(),
        }
    }
}

impl I8251 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn data_r(&mut self) -> u8 {
        self.rx_ready = false;
        trace!("[USART] Data -> {:02X}", self.rx_data);
        self.rx_data
    }

    pub fn data_w(&mut self, data: u8) {
        debug!("[USART] Transmit {:02X}", data);
        if self.transmitted.len() >= TX_LOG_LIMIT {
            self.transmitted.remove(0);
        }
        self.transmitted.push(data);
    }

    pub fn status_r(&self) -> u8 {
        let mut status = STATUS_TXRDY | STATUS_TXEMPTY;
        if self.rx_ready {
            status |= STATUS_RXRDY;
        }
        status
    }

    pub fn control_w(&mut self, data: u8) {
        if self.expect_mode {
            trace!("[USART] Mode <- {:02X}", data);
            self.mode = data;
            self.expect_mode = false;
            return;
        }

        trace!("[USART] Command <- {:02X}", data);
        if data & 0x40 != 0 {
            // internal reset, next control write is a mode word
            self.command = 0;
            self.expect_mode = true;
        } else {
            self.command = data;
        }
    }

    /// Host delivers a byte on the receive line.
    pub fn receive(&mut self, data: u8) {
        self.rx_data = data;
        self.rx_ready = true;
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn transmitted(&self) -> &[u8] {
        &self.transmitted
    }

    pub fn take_transmitted(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.transmitted)
    }
}
