use serde::{Deserialize, Serialize};

/// An 8x8 block of 2-bit color indices, decoded from the planar video
/// RAM layout so scanline rendering never touches raw bit planes.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Tile {
    rows: [[u8; 8]; 8],
}

impl Tile {
    /// Re-decodes one row from its two backing bytes: the first byte
    /// holds the low bit of each pixel, the second the high bit, with
    /// pixel 0 in bit 7.
    pub fn update_row(&mut self, row: usize, low: u8, high: u8) {
        debug_assert!(row < 8);

        for (pixel, slot) in self.rows[row].iter_mut().enumerate() {
            let bit = 7 - pixel;
            *slot = ((low >> bit) & 1) | (((high >> bit) & 1) << 1);
        }
    }

    #[must_use]
    pub const fn color_index(&self, row: usize, column: usize) -> u8 {
        self.rows[row][column]
    }
}

#[cfg(test)]
mod tests {
    use super::Tile;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_decode() {
        let mut tile = Tile::default();
        // Pixel indices 0..8: 0b01, 0b10, 0b11, 0b00, ...
        tile.update_row(2, 0b1010_0000, 0b0110_0000);

        assert_eq!(tile.color_index(2, 0), 1);
        assert_eq!(tile.color_index(2, 1), 2);
        assert_eq!(tile.color_index(2, 2), 3);
        assert_eq!(tile.color_index(2, 3), 0);

        // Other rows untouched.
        assert_eq!(tile.color_index(3, 0), 0);
    }
}
