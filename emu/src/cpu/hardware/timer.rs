use serde::{Deserialize, Serialize};

/// TIMA step thresholds in internal ticks, indexed by the clock select
/// bits of TAC (4096 Hz, 262144 Hz, 65536 Hz, 16384 Hz).
const STEP_THRESHOLDS: [u32; 4] = [64, 1, 4, 16];

/// The divider/timer block at 0xFF04..=0xFF07.
///
/// One internal tick is four machine cycles. DIV advances every 16
/// internal ticks no matter what; TIMA advances every `STEP_THRESHOLDS`
/// ticks when TAC bit 2 is set, and reloads from TMA on overflow while
/// raising the timer interrupt.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Timer {
    divider: u8,
    counter: u8,
    modulus: u8,
    control: u8,

    /// Machine cycles not yet converted into internal ticks.
    acc: u32,
    /// Internal ticks since the last TIMA step.
    main: u32,
    /// Internal ticks since the last DIV increment.
    div_acc: u32,
}

impl Timer {
    /// Advances the block by `m_cycles` machine cycles. Returns true when
    /// TIMA overflowed and the timer interrupt must be requested.
    pub fn tick(&mut self, m_cycles: u32) -> bool {
        let mut overflowed = false;

        self.acc += m_cycles;
        while self.acc >= 4 {
            self.acc -= 4;

            self.div_acc += 1;
            if self.div_acc == 16 {
                self.div_acc = 0;
                self.divider = self.divider.wrapping_add(1);
            }

            if self.control & 0x04 != 0 {
                self.main += 1;
                let threshold = STEP_THRESHOLDS[(self.control & 0x03) as usize];
                if self.main >= threshold {
                    self.main = 0;

                    let (next, carry) = self.counter.overflowing_add(1);
                    self.counter = if carry { self.modulus } else { next };
                    overflowed |= carry;
                }
            }
        }

        overflowed
    }

    #[must_use]
    pub const fn read(&self, address: u16) -> u8 {
        match address {
            0xFF04 => self.divider,
            0xFF05 => self.counter,
            0xFF06 => self.modulus,
            0xFF07 => self.control,
            _ => 0xFF,
        }
    }

    pub const fn write(&mut self, address: u16, value: u8) {
        match address {
            // Any write clears DIV regardless of the value.
            0xFF04 => {
                self.divider = 0;
                self.div_acc = 0;
            }
            0xFF05 => self.counter = value,
            0xFF06 => self.modulus = value,
            0xFF07 => self.control = value & 0x07,
            _ => {}
        }
    }
}
