//! Save-state container framing.
//!
//! The body is a little-endian concatenation of component sub-states in
//! construction order, optionally followed by a screenshot payload; a
//! fixed-size trailer header closes the file so a reader can validate the
//! container before touching any emulator state.

use std::fmt;
use std::io;

use glint_core::core::state::{StateReader, StateWriter};

pub const SAVESTATE_MAGIC: u32 = u32::from_le_bytes(*b"GLYX");
pub const SAVESTATE_VERSION: u32 = 1;

/// magic + version + size + timestamp + rom_name + rom_crc +
/// screenshot {size,w,h} + emu_build.
pub const HEADER_SIZE: usize = 4 + 4 + 4 + 8 + 32 + 4 + 4 + 4 + 4 + 32;

#[derive(Debug)]
pub enum StateError {
    /// No cartridge loaded; there is nothing to snapshot or restore into.
    NotReady,
    Io(io::Error),
    BadMagic(u32),
    Version { expected: u32, got: u32 },
    /// Header-declared size disagrees with the actual data length.
    Size { expected: u32, got: u32 },
    /// The state belongs to a different cartridge.
    RomCrc { expected: u32, got: u32 },
    /// Body ended before all component state was restored.
    Truncated,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "no media loaded"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::BadMagic(magic) => write!(f, "bad save-state magic 0x{magic:08X}"),
            Self::Version { expected, got } => {
                write!(f, "save-state version {got}, expected {expected}")
            }
            Self::Size { expected, got } => {
                write!(f, "save-state size {got}, header says {expected}")
            }
            Self::RomCrc { expected, got } => {
                write!(f, "save-state ROM crc {got:08X}, running ROM is {expected:08X}")
            }
            Self::Truncated => write!(f, "save-state body truncated"),
        }
    }
}

impl std::error::Error for StateError {}

impl From<io::Error> for StateError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

pub struct Header {
    pub magic: u32,
    pub version: u32,
    pub size: u32,
    pub timestamp: i64,
    pub rom_name: [u8; 32],
    pub rom_crc: u32,
    pub screenshot_size: u32,
    pub screenshot_width: u32,
    pub screenshot_height: u32,
    pub emu_build: [u8; 32],
}

impl Header {
    pub fn write(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.u32(self.magic)?;
        w.u32(self.version)?;
        w.u32(self.size)?;
        w.i64(self.timestamp)?;
        w.bytes(&self.rom_name)?;
        w.u32(self.rom_crc)?;
        w.u32(self.screenshot_size)?;
        w.u32(self.screenshot_width)?;
        w.u32(self.screenshot_height)?;
        w.bytes(&self.emu_build)?;
        Ok(())
    }

    /// Parse the trailer from the end of a state image.
    pub fn parse(data: &[u8]) -> Result<Self, StateError> {
        if data.len() < HEADER_SIZE {
            return Err(StateError::Truncated);
        }

        let mut cursor = io::Cursor::new(&data[data.len() - HEADER_SIZE..]);
        let mut r = StateReader::new(&mut cursor);

        let mut header = Header {
            magic: r.u32()?,
            version: r.u32()?,
            size: r.u32()?,
            timestamp: r.i64()?,
            rom_name: [0; 32],
            rom_crc: 0,
            screenshot_size: 0,
            screenshot_width: 0,
            screenshot_height: 0,
            emu_build: [0; 32],
        };
        r.bytes(&mut header.rom_name)?;
        header.rom_crc = r.u32()?;
        header.screenshot_size = r.u32()?;
        header.screenshot_width = r.u32()?;
        header.screenshot_height = r.u32()?;
        r.bytes(&mut header.emu_build)?;

        if header.magic != SAVESTATE_MAGIC {
            return Err(StateError::BadMagic(header.magic));
        }
        if header.version != SAVESTATE_VERSION {
            return Err(StateError::Version {
                expected: SAVESTATE_VERSION,
                got: header.version,
            });
        }

        Ok(header)
    }
}

/// Fixed-width ASCII field, NUL padded and truncated to fit.
pub fn ascii_fixed<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = value.as_bytes();
    let len = bytes.len().min(N - 1);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(size: u32) -> Header {
        Header {
            magic: SAVESTATE_MAGIC,
            version: SAVESTATE_VERSION,
            size,
            timestamp: 1_700_000_000,
            rom_name: ascii_fixed("game.lnx"),
            rom_crc: 0xDEAD_BEEF,
            screenshot_size: 0,
            screenshot_width: 0,
            screenshot_height: 0,
            emu_build: ascii_fixed("0.1.0"),
        }
    }

    #[test]
    fn header_roundtrip() {
        let mut data = vec![0u8; 16]; // fake body
        let header = sample_header(16 + HEADER_SIZE as u32);
        let mut trailer = Vec::new();
        {
            let mut w = StateWriter::new(&mut trailer);
            header.write(&mut w).unwrap();
        }
        assert_eq!(trailer.len(), HEADER_SIZE);
        data.extend_from_slice(&trailer);

        let parsed = Header::parse(&data).unwrap();
        assert_eq!(parsed.size, header.size);
        assert_eq!(parsed.rom_crc, 0xDEAD_BEEF);
        assert_eq!(&parsed.rom_name[..8], b"game.lnx");
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0] = 0x12;
        assert!(matches!(Header::parse(&data), Err(StateError::BadMagic(_))));
    }

    #[test]
    fn short_data_is_truncated() {
        assert!(matches!(
            Header::parse(&[0u8; 10]),
            Err(StateError::Truncated)
        ));
    }
}
