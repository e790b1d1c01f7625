// Bus controller error types

use thiserror::Error;

/// Interrupt acknowledge failures.
///
/// Both variants mean the bus controller logic is broken: the CPU only
/// acknowledges while the interrupt line is asserted, and the line is only
/// asserted while a wired source is pending and enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterruptError {
    #[error("irq acknowledged but no irq active or enabled: ${pending:02X} active, ${enabled:02X} enabled")]
    NoPendingInterrupt { pending: u8, enabled: u8 },

    #[error("unknown irq triggered: ${pending:02X} active, ${enabled:02X} enabled")]
    UnknownInterrupt { pending: u8, enabled: u8 },
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Interrupt(#[from] InterruptError),

    #[error("{region} image is {size:#X} bytes, window holds {capacity:#X}")]
    ImageTooLarge {
        region: &'static str,
        size: usize,
        capacity: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_names_masks() {
        let err = InterruptError::NoPendingInterrupt {
            pending: 0x08,
            enabled: 0x01,
        };
        assert_eq!(
            err.to_string(),
            "irq acknowledged but no irq active or enabled: $08 active, $01 enabled"
        );

        let err: BusError = InterruptError::UnknownInterrupt {
            pending: 0x02,
            enabled: 0x02,
        }
        .into();
        assert!(err.to_string().contains("$02 active"));
    }
}
