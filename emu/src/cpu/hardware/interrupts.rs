use serde::{Deserialize, Serialize};

/// The five interrupt sources, in fixed service priority order
/// (lowest bit first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank,
    LcdStat,
    Timer,
    Serial,
    Joypad,
}

impl Interrupt {
    /// Priority order used for service selection.
    pub const PRIORITY: [Self; 5] = [
        Self::VBlank,
        Self::LcdStat,
        Self::Timer,
        Self::Serial,
        Self::Joypad,
    ];

    /// Bit position in the enabled/pending masks.
    #[must_use]
    pub const fn mask(self) -> u8 {
        match self {
            Self::VBlank => 0x01,
            Self::LcdStat => 0x02,
            Self::Timer => 0x04,
            Self::Serial => 0x08,
            Self::Joypad => 0x10,
        }
    }

    /// Fixed handler address jumped to when this interrupt is serviced.
    #[must_use]
    pub const fn vector(self) -> u16 {
        match self {
            Self::VBlank => 0x40,
            Self::LcdStat => 0x48,
            Self::Timer => 0x50,
            Self::Serial => 0x58,
            Self::Joypad => 0x60,
        }
    }
}

/// The enabled/pending bitmask pair: `enabled` is memory-mapped at
/// 0xFFFF, `pending` at 0xFF0F. Any component that detects an
/// interrupt-worthy event sets a pending bit; the CPU consumes them once
/// per step.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Interrupts {
    pub enabled: u8,
    pub pending: u8,
}

impl Interrupts {
    pub const fn request(&mut self, interrupt: Interrupt) {
        self.pending |= interrupt.mask();
    }

    /// True when at least one enabled interrupt is pending. This is also
    /// the HALT wake condition, independent of the master latch.
    #[must_use]
    pub const fn any_ready(&self) -> bool {
        self.pending & self.enabled != 0
    }

    /// The highest-priority interrupt that is both pending and enabled.
    #[must_use]
    pub fn next_ready(&self) -> Option<Interrupt> {
        let fired = self.pending & self.enabled;
        Interrupt::PRIORITY
            .into_iter()
            .find(|interrupt| fired & interrupt.mask() != 0)
    }

    /// Clears the pending bit of a serviced interrupt.
    pub const fn acknowledge(&mut self, interrupt: Interrupt) {
        self.pending &= !interrupt.mask();
    }
}

#[cfg(test)]
mod tests {
    use super::{Interrupt, Interrupts};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_priority_selection() {
        let mut interrupts = Interrupts::default();
        interrupts.enabled = 0x1F;
        interrupts.request(Interrupt::Joypad);
        interrupts.request(Interrupt::Timer);

        assert_eq!(interrupts.next_ready(), Some(Interrupt::Timer));

        interrupts.acknowledge(Interrupt::Timer);
        assert_eq!(interrupts.next_ready(), Some(Interrupt::Joypad));
    }

    #[test]
    fn test_disabled_interrupts_are_not_ready() {
        let mut interrupts = Interrupts::default();
        interrupts.request(Interrupt::VBlank);

        assert!(!interrupts.any_ready());
        assert_eq!(interrupts.next_ready(), None);

        interrupts.enabled = Interrupt::VBlank.mask();
        assert!(interrupts.any_ready());
    }

    #[test]
    fn test_vectors() {
        assert_eq!(Interrupt::VBlank.vector(), 0x40);
        assert_eq!(Interrupt::Joypad.vector(), 0x60);
    }
}
