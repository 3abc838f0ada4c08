use serde::{Deserialize, Serialize};

/// One decoded OAM entry. Coordinates are kept in screen space (the
/// raw bytes carry a +16/+8 offset so sprites can slide in from the
/// top-left edge), so they can be negative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObjectAttributes {
    pub y: i16,
    pub x: i16,
    pub tile: u8,
    flags: u8,
}

impl Default for ObjectAttributes {
    fn default() -> Self {
        Self {
            y: -16,
            x: -8,
            tile: 0,
            flags: 0,
        }
    }
}

impl ObjectAttributes {
    /// Applies one raw OAM byte write; `field` is the low two bits of
    /// the OAM address.
    pub const fn update(&mut self, field: u16, value: u8) {
        match field {
            0 => self.y = value as i16 - 16,
            1 => self.x = value as i16 - 8,
            2 => self.tile = value,
            _ => self.flags = value,
        }
    }

    /// True when the sprite hides behind non-zero background pixels.
    #[must_use]
    pub const fn behind_background(&self) -> bool {
        self.flags & 0x80 != 0
    }

    #[must_use]
    pub const fn y_flip(&self) -> bool {
        self.flags & 0x40 != 0
    }

    #[must_use]
    pub const fn x_flip(&self) -> bool {
        self.flags & 0x20 != 0
    }

    /// Selects OBP1 over OBP0.
    #[must_use]
    pub const fn uses_second_palette(&self) -> bool {
        self.flags & 0x10 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectAttributes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_field_updates() {
        let mut object = ObjectAttributes::default();
        object.update(0, 16);
        object.update(1, 8);
        object.update(2, 0x42);
        object.update(3, 0xB0);

        assert_eq!(object.y, 0);
        assert_eq!(object.x, 0);
        assert_eq!(object.tile, 0x42);
        assert!(object.behind_background());
        assert!(!object.y_flip());
        assert!(object.x_flip());
        assert!(object.uses_second_palette());
    }

    #[test]
    fn test_offscreen_default() {
        let object = ObjectAttributes::default();
        assert_eq!(object.y, -16);
        assert_eq!(object.x, -8);
    }
}
