use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use derivative::Derivative;
use serde::{Deserialize, Serialize};
use tracing::{error, trace};

use crate::{error::InterruptError, machine::Message};

pub const VECTOR_V9938: u8 = 0xf8;
pub const VECTOR_I8251_SEND: u8 = 0xf9;
pub const VECTOR_I8251_RECEIVE: u8 = 0xfa;
pub const VECTOR_UPD7759: u8 = 0xfb;

pub const IRQ_V9938: u8 = 0x01;
pub const IRQ_UPD7759: u8 = 0x08;

/// Peripherals wired to the interrupt latch, in acknowledge priority order.
///
/// The 8251 send/receive vectors exist in the vector table but the USART has
/// no line into the latch, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptSource {
    Video,
    Speech,
}

impl InterruptSource {
    pub const PRIORITY: [InterruptSource; 2] = [InterruptSource::Video, InterruptSource::Speech];

    pub fn mask(self) -> u8 {
        match self {
            InterruptSource::Video => IRQ_V9938,
            InterruptSource::Speech => IRQ_UPD7759,
        }
    }

    pub fn vector(self) -> u8 {
        match self {
            InterruptSource::Video => VECTOR_V9938,
            InterruptSource::Speech => VECTOR_UPD7759,
        }
    }

    fn index(self) -> usize {
        match self {
            InterruptSource::Video => 0,
            InterruptSource::Speech => 1,
        }
    }
}

/// Edge-triggered interrupt latch with the port $16/$17 enable register.
///
/// Sources report raw levels; only a not-asserted to asserted transition
/// sets a pending bit. The CPU line is asserted while `pending & enabled` is
/// non-zero. Each change is posted to the machine queue; a change that undoes
/// the one still waiting in the queue removes it instead, so an undrained
/// queue never holds more than one message. `transitions` counts every
/// change.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct InterruptController {
    #[derivative(Debug = "ignore")]
    queue: Rc<RefCell<VecDeque<Message>>>,
    pending: u8,
    enabled: u8,
    vector: u8,
    previous: [bool; 2],
    line: bool,
    transitions: u64,
}

impl InterruptController {
    pub fn new(queue: Rc<RefCell<VecDeque<Message>>>) -> Self {
        Self {
            queue,
            pending: 0,
            enabled: 0,
            vector: 0,
            previous: [false; 2],
            line: false,
            transitions: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pending = 0;
        self.enabled = 0;
        self.vector = 0;
        self.previous = [false; 2];
        self.update_line();
    }

    pub fn pending(&self) -> u8 {
        self.pending
    }

    pub fn enabled(&self) -> u8 {
        self.enabled
    }

    /// Last vector handed to the CPU.
    pub fn vector(&self) -> u8 {
        self.vector
    }

    pub fn line(&self) -> bool {
        self.line
    }

    /// Line changes since power on, wrapping.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn signal(&mut self, source: InterruptSource, asserted: bool) {
        let previous = &mut self.previous[source.index()];
        if asserted && !*previous {
            trace!("[IRQ] {:?} edge, pending {:02X}", source, self.pending);
            self.pending |= source.mask();
        }
        *previous = asserted;

        self.update_line();
    }

    // I/O port $16
    pub fn write_enable(&mut self, data: u8) {
        trace!("[IRQ] Enable <- {:02X}", data);
        self.enabled = data;
        self.update_line();
    }

    // I/O port $17, 0000pppv: set or clear enable bit p
    pub fn write_select(&mut self, data: u8) {
        let pin = (data >> 1) & 0x07;
        if data & 0x01 != 0 {
            self.enabled |= 1 << pin;
        } else {
            self.enabled &= !(1 << pin);
        }
        trace!("[IRQ] Select <- {:02X}, enable {:02X}", data, self.enabled);
        self.update_line();
    }

    pub fn acknowledge(&mut self) -> Result<u8, InterruptError> {
        let active = self.pending & self.enabled;

        let Some(source) = InterruptSource::PRIORITY
            .into_iter()
            .find(|source| active & source.mask() != 0)
        else {
            let (pending, enabled) = (self.pending, self.enabled);
            let err = if active != 0 {
                InterruptError::UnknownInterrupt { pending, enabled }
            } else {
                InterruptError::NoPendingInterrupt { pending, enabled }
            };
            error!("[IRQ] {}", err);
            return Err(err);
        };

        self.pending &= !source.mask();
        self.vector = source.vector();
        trace!("[IRQ] Acknowledge {:?}, vector {:02X}", source, self.vector);

        self.update_line();
        Ok(self.vector)
    }

    fn update_line(&mut self) {
        let line = self.pending & self.enabled != 0;
        if line == self.line {
            return;
        }

        self.line = line;
        self.transitions = self.transitions.wrapping_add(1);
        trace!("[IRQ] Line {}", if line { "ON" } else { "OFF" });

        let (message, undone) = if line {
            (Message::IrqAsserted, Message::IrqCleared)
        } else {
            (Message::IrqCleared, Message::IrqAsserted)
        };
        let mut queue = self.queue.borrow_mut();
        if queue.back() == Some(&undone) {
            queue.pop_back();
        } else {
            queue.push_back(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> InterruptController {
        InterruptController::new(Rc::new(RefCell::new(VecDeque::new())))
    }

    #[test]
    fn test_rising_edge_sets_pending() {
        let mut irq = controller();

        irq.signal(InterruptSource::Video, false);
        assert_eq!(irq.pending(), 0);

        irq.signal(InterruptSource::Video, true);
        assert_eq!(irq.pending(), IRQ_V9938);

        irq.signal(InterruptSource::Video, false);
        assert_eq!(irq.pending(), IRQ_V9938);
    }

    #[test]
    fn test_held_level_does_not_retrigger() {
        let mut irq = controller();
        irq.write_enable(IRQ_V9938);

        irq.signal(InterruptSource::Video, true);
        assert_eq!(irq.acknowledge(), Ok(VECTOR_V9938));

        irq.signal(InterruptSource::Video, true);
        assert_eq!(irq.pending(), 0);
        assert!(!irq.line());

        irq.signal(InterruptSource::Video, false);
        irq.signal(InterruptSource::Video, true);
        assert_eq!(irq.pending(), IRQ_V9938);
        assert!(irq.line());
    }

    #[test]
    fn test_enable_after_pending_raises_line() {
        let mut irq = controller();

        irq.signal(InterruptSource::Speech, true);
        assert!(!irq.line());

        irq.write_enable(IRQ_UPD7759);
        assert!(irq.line());
    }

    #[test]
    fn test_unrelated_enable_bits_keep_line() {
        let mut irq = controller();
        irq.write_enable(IRQ_V9938);
        irq.signal(InterruptSource::Video, true);
        assert!(irq.line());

        for data in [0x02, 0x04, 0x0c, 0x0e, 0x03, 0x0d] {
            irq.write_select(data);
            assert!(irq.line(), "select {:02X} changed the line", data);
        }

        irq.write_select(0x00);
        assert!(!irq.line());
    }

    #[test]
    fn test_select_converges_with_enable() {
        // eigogam2 style: clear everything, then set pins 0, 1 and 3
        let mut by_select = controller();
        by_select.write_enable(0xff);
        for pin in 0..8 {
            by_select.write_select(pin << 1);
        }
        for data in [0x01, 0x03, 0x07] {
            by_select.write_select(data);
        }

        let mut by_enable = controller();
        by_enable.write_enable(0b0000_1011);

        assert_eq!(by_select.enabled(), 0b0000_1011);
        assert_eq!(by_select.enabled(), by_enable.enabled());

        by_enable.write_select(0x0f);
        by_select.write_enable(0b1000_1011);
        assert_eq!(by_select.enabled(), by_enable.enabled());
    }

    #[test]
    fn test_video_has_priority() {
        let mut irq = controller();
        irq.write_enable(IRQ_V9938 | IRQ_UPD7759);

        irq.signal(InterruptSource::Speech, true);
        irq.signal(InterruptSource::Video, true);

        assert_eq!(irq.acknowledge(), Ok(VECTOR_V9938));
        assert!(irq.line());
        assert_eq!(irq.acknowledge(), Ok(VECTOR_UPD7759));
        assert!(!irq.line());
        assert_eq!(irq.vector(), VECTOR_UPD7759);
    }

    #[test]
    fn test_acknowledge_without_pending_is_fatal() {
        let mut irq = controller();
        irq.signal(InterruptSource::Speech, true);

        assert_eq!(
            irq.acknowledge(),
            Err(InterruptError::NoPendingInterrupt {
                pending: IRQ_UPD7759,
                enabled: 0
            })
        );
        assert_eq!(irq.pending(), IRQ_UPD7759);
    }

    #[test]
    fn test_acknowledge_unwired_source_is_fatal() {
        let mut irq = controller();
        irq.pending = 0x02;
        irq.write_enable(0x02);
        assert!(irq.line());

        assert_eq!(
            irq.acknowledge(),
            Err(InterruptError::UnknownInterrupt {
                pending: 0x02,
                enabled: 0x02
            })
        );
    }

    #[test]
    fn test_line_changes_are_queued() {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut irq = InterruptController::new(queue.clone());

        irq.write_enable(IRQ_V9938);
        irq.signal(InterruptSource::Video, true);
        assert_eq!(queue.borrow_mut().pop_front(), Some(Message::IrqAsserted));

        irq.signal(InterruptSource::Video, false);
        irq.acknowledge().unwrap();
        let messages: Vec<_> = queue.borrow_mut().drain(..).collect();
        assert_eq!(messages, vec![Message::IrqCleared]);
        assert_eq!(irq.transitions(), 2);
    }

    #[test]
    fn test_undrained_pulses_collapse() {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let mut irq = InterruptController::new(queue.clone());
        irq.write_enable(IRQ_UPD7759);

        for _ in 0..1000 {
            irq.signal(InterruptSource::Speech, true);
            irq.signal(InterruptSource::Speech, false);
            irq.acknowledge().unwrap();
        }

        assert!(queue.borrow().is_empty());
        assert_eq!(irq.transitions(), 2000);

        irq.signal(InterruptSource::Speech, true);
        assert_eq!(queue.borrow().len(), 1);
        assert_eq!(queue.borrow().back(), Some(&Message::IrqAsserted));
    }

    #[test]
    fn test_reset_clears_masks_and_levels() {
        let mut irq = controller();
        irq.write_enable(0xff);
        irq.signal(InterruptSource::Video, true);
        irq.reset();

        assert_eq!((irq.pending(), irq.enabled(), irq.vector()), (0, 0, 0));
        assert!(!irq.line());

        // previous level forgotten: holding the line high counts as a new edge
        irq.signal(InterruptSource::Video, true);
        assert_eq!(irq.pending(), IRQ_V9938);
    }
}
