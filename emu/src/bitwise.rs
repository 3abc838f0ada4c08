use std::ops::RangeInclusive;

/// Helper methods to manipulate bits. Bit indices run lsb to msb
/// (right to left).
pub trait Bits: Copy {
    fn is_bit_on(self, bit_idx: u8) -> bool;

    fn is_bit_off(self, bit_idx: u8) -> bool {
        !self.is_bit_on(bit_idx)
    }

    fn get_bit(self, bit_idx: u8) -> bool {
        self.is_bit_on(bit_idx)
    }

    fn set_bit_on(&mut self, bit_idx: u8);
    fn set_bit_off(&mut self, bit_idx: u8);

    fn set_bit(&mut self, bit_idx: u8, value: bool) {
        if value {
            self.set_bit_on(bit_idx);
        } else {
            self.set_bit_off(bit_idx);
        }
    }

    /// Extracts the inclusive range of bits, shifted down to position 0.
    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self;
}

macro_rules! impl_bits {
    ($($t:ty),*) => {$(
        impl Bits for $t {
            fn is_bit_on(self, bit_idx: u8) -> bool {
                debug_assert!((bit_idx as usize) < <$t>::BITS as usize);
                self & (1 << bit_idx) != 0
            }

            fn set_bit_on(&mut self, bit_idx: u8) {
                debug_assert!((bit_idx as usize) < <$t>::BITS as usize);
                *self |= 1 << bit_idx;
            }

            fn set_bit_off(&mut self, bit_idx: u8) {
                debug_assert!((bit_idx as usize) < <$t>::BITS as usize);
                *self &= !(1 << bit_idx);
            }

            fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self {
                let start = *bits_range.start();
                let end = *bits_range.end();
                debug_assert!(start <= end && (end as usize) < <$t>::BITS as usize);

                let mask = if end - start + 1 == <$t>::BITS as u8 {
                    <$t>::MAX
                } else {
                    (1 << (end - start + 1)) - 1
                };

                (self >> start) & mask
            }
        }
    )*};
}

impl_bits!(u8, u16);

#[cfg(test)]
mod tests {
    use super::Bits;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_bit_on() {
        let b = 0b1001_0110_u8;
        assert!(b.is_bit_on(1));
        assert!(b.is_bit_on(7));
        assert!(b.is_bit_off(0));
        assert!(b.is_bit_off(6));
    }

    #[test]
    fn test_set_bit() {
        let mut b = 0b0000_0000_u8;
        b.set_bit_on(4);
        assert_eq!(b, 0b0001_0000);

        b.set_bit(4, false);
        b.set_bit(0, true);
        assert_eq!(b, 0b0000_0001);
    }

    #[test]
    fn test_get_bits() {
        let w = 0b1010_1100_0101_0011_u16;
        assert_eq!(w.get_bits(0..=3), 0b0011);
        assert_eq!(w.get_bits(12..=15), 0b1010);
        assert_eq!(w.get_bits(0..=15), w);

        let b = 0b1110_0100_u8;
        assert_eq!(b.get_bits(2..=4), 0b001);
        assert_eq!(b.get_bits(5..=7), 0b111);
    }
}
