use serde::{Deserialize, Serialize};

/// Link-port stub at 0xFF01 (SB) and 0xFF02 (SC).
///
/// No peer is attached, so a transfer started with SC bit 7 completes
/// immediately against an open line: SB reads back 0xFF and the serial
/// interrupt is requested.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Serial {
    data: u8,
    control: u8,
}

impl Serial {
    #[must_use]
    pub const fn read(&self, address: u16) -> u8 {
        match address {
            0xFF01 => self.data,
            0xFF02 => self.control,
            _ => 0xFF,
        }
    }

    /// Returns true when a transfer completed and the serial interrupt
    /// must be requested.
    pub fn write(&mut self, address: u16, value: u8) -> bool {
        match address {
            0xFF01 => {
                self.data = value;
                false
            }
            0xFF02 => {
                self.control = value;
                if value & 0x80 != 0 {
                    logger::log(format!("serial out: 0x{:02X}", self.data));

                    self.data = 0xFF;
                    self.control &= !0x80;
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Serial;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transfer_against_open_line() {
        let mut serial = Serial::default();
        assert!(!serial.write(0xFF01, 0x42));
        assert_eq!(serial.read(0xFF01), 0x42);

        assert!(serial.write(0xFF02, 0x81));
        assert_eq!(serial.read(0xFF01), 0xFF);
        assert_eq!(serial.read(0xFF02), 0x01);
    }

    #[test]
    fn test_write_without_start_bit() {
        let mut serial = Serial::default();
        assert!(!serial.write(0xFF02, 0x01));
        assert_eq!(serial.read(0xFF02), 0x01);
    }
}
