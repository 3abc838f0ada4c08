use std::{error::Error, fmt, fs::File, io::Read};

/// Offset of the ASCII game title inside the header.
const TITLE_RANGE: std::ops::Range<usize> = 0x134..0x142;

/// ROM size category byte.
const ROM_SIZE_OFFSET: usize = 0x148;

/// External RAM size category byte.
const RAM_SIZE_OFFSET: usize = 0x149;

/// A header is only fully present when the image reaches past the
/// entry point at 0x150.
const MIN_ROM_LEN: usize = 0x150;

/// ROM size category as encoded in header byte 0x148.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomSize {
    Rom256KBit = 0x00,
    Rom512KBit = 0x01,
    Rom1MBit = 0x02,
    Rom2MBit = 0x03,
    Rom4MBit = 0x04,
    Rom8MBit = 0x05,
    Rom16MBit = 0x06,
    Rom9MBit = 0x52,
    Rom10MBit = 0x53,
    Rom12MBit = 0x54,
}

impl RomSize {
    fn from_code(code: u8) -> Result<Self, Box<dyn Error>> {
        Ok(match code {
            0x00 => Self::Rom256KBit,
            0x01 => Self::Rom512KBit,
            0x02 => Self::Rom1MBit,
            0x03 => Self::Rom2MBit,
            0x04 => Self::Rom4MBit,
            0x05 => Self::Rom8MBit,
            0x06 => Self::Rom16MBit,
            0x52 => Self::Rom9MBit,
            0x53 => Self::Rom10MBit,
            0x54 => Self::Rom12MBit,
            _ => return Err(format!("Unknown ROM size code 0x{code:02X}").into()),
        })
    }
}

/// Header information of a loaded ROM image.
///
/// Only the fields the core actually consults are decoded; the checksum is
/// not verified (the reference accepts any image that is long enough).
pub struct Cartridge {
    game_title: String,
    rom_size: RomSize,
    ram_size_code: u8,
}

impl Cartridge {
    /// Decodes and validates the header of `data`.
    ///
    /// # Errors
    ///
    /// Fails when the image is shorter than the header or carries an
    /// unknown ROM size code, so the machine never starts on a truncated
    /// image (a read past the image bounds later would be a programming
    /// error, not an emulated fault).
    pub fn new(data: &[u8]) -> Result<Self, Box<dyn Error>> {
        if data.len() < MIN_ROM_LEN {
            return Err(format!(
                "ROM image too short: {} bytes, header needs {MIN_ROM_LEN}",
                data.len()
            )
            .into());
        }

        let game_title = into_ascii_str(&data[TITLE_RANGE])?;
        let rom_size = RomSize::from_code(data[ROM_SIZE_OFFSET])?;
        let ram_size_code = data[RAM_SIZE_OFFSET];

        Ok(Self {
            game_title,
            rom_size,
            ram_size_code,
        })
    }

    /// Reads a ROM image from disk and decodes its header.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures and every [`Cartridge::new`] failure.
    pub fn from_file(path: &str) -> Result<(Self, Vec<u8>), Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let cartridge = Self::new(&data)?;

        Ok((cartridge, data))
    }

    pub fn game_title(&self) -> &str {
        self.game_title.as_str()
    }

    pub const fn rom_size(&self) -> RomSize {
        self.rom_size
    }

    /// Raw external-RAM size category from header byte 0x149.
    pub const fn ram_size_code(&self) -> u8 {
        self.ram_size_code
    }
}

impl fmt::Display for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, RAM code 0x{:02X})",
            self.game_title, self.rom_size, self.ram_size_code
        )
    }
}

fn into_ascii_str(data: &[u8]) -> Result<String, Box<dyn Error>> {
    let string = String::from_utf8(data.into())?;

    for chr in string.chars() {
        if !chr.is_ascii() {
            return Err("Not a valid ASCII sequence".into());
        }
    }

    // Titles shorter than the field are zero padded.
    Ok(string.trim_end_matches('\0').to_string())
}

#[cfg(test)]
mod tests {
    use super::{Cartridge, RomSize};
    use pretty_assertions::assert_eq;

    fn rom_with_title(title: &str) -> Vec<u8> {
        let mut data = vec![0_u8; 0x8000];
        data[0x134..0x134 + title.len()].copy_from_slice(title.as_bytes());
        data
    }

    #[test]
    fn test_header_decode() {
        let mut data = rom_with_title("TESTROM");
        data[0x148] = 0x01;
        data[0x149] = 0x02;

        let cartridge = Cartridge::new(&data).unwrap();
        assert_eq!(cartridge.game_title(), "TESTROM");
        assert_eq!(cartridge.rom_size(), RomSize::Rom512KBit);
        assert_eq!(cartridge.ram_size_code(), 0x02);
    }

    #[test]
    fn test_short_image_is_rejected() {
        let data = vec![0_u8; 0x100];
        assert!(Cartridge::new(&data).is_err());
    }

    #[test]
    fn test_unknown_rom_size_is_rejected() {
        let mut data = rom_with_title("BADSIZE");
        data[0x148] = 0x42;
        assert!(Cartridge::new(&data).is_err());
    }
}
