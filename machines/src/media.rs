//! Cartridge and BIOS container.
//!
//! Accepts the three image flavors found in the wild (the 64-byte LYNX
//! header, the BS93/BLL homebrew header, and headerless dumps), optionally
//! wrapped in a zip archive, and wires the bank images into the cart
//! shift-register hardware.

use std::fmt;
use std::io::{self, Cursor, Read};
use std::path::Path;

use glint_core::device::cart::Cart;
use glint_core::device::eeprom93cxx::EepromKind;
use glint_core::device::lcd::Rotation;

/// Fingerprint of the only production boot ROM.
const BIOS_SIZE: usize = 512;
const BIOS_MD5: &str = "fcd403db69f54290b51035d82f835e7b";
const BIOS_CRC: u32 = 0x0D97_3C9D;

const LYNX_HEADER_SIZE: usize = 64;
const LYNX_MAGIC: &[u8; 4] = b"LYNX";
/// BLL homebrew header: 0x80 0x08, load address, size, "BS93".
const BS93_HEADER_SIZE: usize = 10;
const BS93_MAGIC: &[u8; 4] = b"BS93";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Each bank holds up to 256 pages of the header-declared page size.
const PAGES_PER_BANK: u32 = 256;

const VALID_EXTENSIONS: [&str; 4] = ["lnx", "lyx", "o", "bin"];

// ---------------------------------------------------------------------------
// CRC-32 (reflected polynomial 0xEDB88320), shared by cart identification
// and the save-state ROM check.
// ---------------------------------------------------------------------------

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

pub(crate) fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    crc ^ 0xFFFF_FFFF
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum MediaError {
    /// Underlying I/O error (file not found, permission denied, ...).
    Io(io::Error),
    /// Zero-length image.
    Empty,
    /// Extension is none of .lnx/.lyx/.o/.bin.
    BadExtension(String),
    /// No recognizable header and no extension to fall back on.
    UnknownFormat,
    /// Header fields are inconsistent with the image size.
    BadHeader(&'static str),
    /// Zip container problems (corrupt archive, no cartridge inside).
    Zip(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Empty => write!(f, "empty ROM image"),
            Self::BadExtension(ext) => write!(f, "unsupported file extension: {ext}"),
            Self::UnknownFormat => write!(f, "unrecognized ROM format"),
            Self::BadHeader(what) => write!(f, "bad cartridge header: {what}"),
            Self::Zip(what) => write!(f, "zip error: {what}"),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<io::Error> for MediaError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BiosState {
    Missing,
    Invalid,
    Valid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaType {
    Lynx,
    Homebrew,
}

pub struct Media {
    cart: Cart,
    rom: Vec<u8>,
    rom_size: usize,
    crc: u32,
    ready: bool,

    bios: [u8; BIOS_SIZE],
    bios_loaded: bool,
    bios_valid: bool,

    file_name: String,
    header_name: String,
    manufacturer: String,

    media_type: MediaType,
    homebrew_boot_address: u16,

    rotation: Rotation,
    forced_rotation: Option<Rotation>,
    eeprom_descriptor: u8,
    audin: bool,
}

impl Media {
    pub fn new() -> Self {
        Self {
            cart: Cart::new(),
            rom: Vec::new(),
            rom_size: 0,
            crc: 0,
            ready: false,
            bios: [0; BIOS_SIZE],
            bios_loaded: false,
            bios_valid: false,
            file_name: String::new(),
            header_name: String::new(),
            manufacturer: String::new(),
            media_type: MediaType::Lynx,
            homebrew_boot_address: 0,
            rotation: Rotation::None,
            forced_rotation: None,
            eeprom_descriptor: 0,
            audin: false,
        }
    }

    pub fn reset(&mut self) {
        self.cart.reset();
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_bios_loaded(&self) -> bool {
        self.bios_loaded
    }

    pub fn is_bios_valid(&self) -> bool {
        self.bios_valid
    }

    pub fn bios(&self) -> &[u8; BIOS_SIZE] {
        &self.bios
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn homebrew_boot_address(&self) -> u16 {
        self.homebrew_boot_address
    }

    /// Effective rotation: a host override wins over the cart header.
    pub fn rotation(&self) -> Rotation {
        self.forced_rotation.unwrap_or(self.rotation)
    }

    pub fn force_rotation(&mut self, rotation: Option<Rotation>) {
        self.forced_rotation = rotation;
    }

    pub fn eeprom_kind(&self) -> EepromKind {
        EepromKind::from_descriptor(self.eeprom_descriptor)
    }

    pub fn eeprom_is_8bit(&self) -> bool {
        self.eeprom_descriptor & 0x80 != 0
    }

    pub fn audin(&self) -> bool {
        self.audin
    }

    pub fn load_bios_from_file(&mut self, path: &Path) -> BiosState {
        match std::fs::read(path) {
            Ok(data) => self.load_bios(&data),
            Err(e) => {
                log::warn!("failed to read BIOS {}: {e}", path.display());
                self.bios_loaded = false;
                self.bios_valid = false;
                BiosState::Missing
            }
        }
    }

    /// Install a boot ROM. Any 512-byte image is accepted and flagged; only
    /// the production ROM is reported valid.
    pub fn load_bios(&mut self, data: &[u8]) -> BiosState {
        if data.len() != BIOS_SIZE {
            log::warn!("BIOS must be exactly {BIOS_SIZE} bytes, got {}", data.len());
            self.bios_loaded = false;
            self.bios_valid = false;
            return BiosState::Missing;
        }

        self.bios.copy_from_slice(data);
        self.bios_loaded = true;

        let md5 = format!("{:x}", md5::compute(data));
        self.bios_valid = md5 == BIOS_MD5 && crc32(data) == BIOS_CRC;

        if self.bios_valid {
            BiosState::Valid
        } else {
            log::warn!("unknown BIOS image (md5 {md5}), loading anyway");
            BiosState::Invalid
        }
    }

    pub fn load_from_file(&mut self, path: &Path) -> Result<(), MediaError> {
        let data = std::fs::read(path)?;
        self.load_from_buffer(&data, path.to_string_lossy().as_ref())
    }

    pub fn load_from_buffer(&mut self, buffer: &[u8], path: &str) -> Result<(), MediaError> {
        self.ready = false;

        if buffer.is_empty() {
            return Err(MediaError::Empty);
        }

        let (file_name, extension) = split_path(path);

        if buffer.len() >= 4 && &buffer[..4] == ZIP_MAGIC {
            let (inner, inner_name) = extract_from_zip(buffer)?;
            return self.load_from_buffer(&inner, &inner_name);
        }

        if !extension.is_empty() && !VALID_EXTENSIONS.contains(&extension.as_str()) {
            return Err(MediaError::BadExtension(extension));
        }

        self.file_name = file_name;
        self.crc = crc32(buffer);

        if buffer.len() >= LYNX_HEADER_SIZE && &buffer[..4] == LYNX_MAGIC {
            self.parse_lynx(buffer)?;
        } else if buffer.len() > BS93_HEADER_SIZE && &buffer[6..10] == BS93_MAGIC {
            self.parse_bs93(buffer)?;
        } else if matches!(extension.as_str(), "lnx" | "lyx" | "bin") {
            // Headerless dump: synthesize a single-bank layout.
            self.default_lynx(buffer);
        } else {
            return Err(MediaError::UnknownFormat);
        }

        self.ready = true;
        log::info!(
            "loaded {} ({} bytes, crc {:08X})",
            self.file_name,
            self.rom_size,
            self.crc
        );
        Ok(())
    }

    fn parse_lynx(&mut self, buffer: &[u8]) -> Result<(), MediaError> {
        let bank0_page_size = u16::from_le_bytes([buffer[4], buffer[5]]) as u32;
        let bank1_page_size = u16::from_le_bytes([buffer[6], buffer[7]]) as u32;
        let version = u16::from_le_bytes([buffer[8], buffer[9]]);

        if bank0_page_size == 0 {
            return Err(MediaError::BadHeader("bank 0 page size is zero"));
        }

        self.header_name = ascii_field(&buffer[10..42]);
        self.manufacturer = ascii_field(&buffer[42..58]);
        self.rotation = match buffer[58] {
            1 => Rotation::Left,
            2 => Rotation::Right,
            _ => Rotation::None,
        };
        self.audin = buffer[59] != 0;
        self.eeprom_descriptor = buffer[60];

        let content = &buffer[LYNX_HEADER_SIZE..];
        let bank0_size = (bank0_page_size * PAGES_PER_BANK) as usize;
        let bank0_end = bank0_size.min(content.len());
        let bank0 = content[..bank0_end].to_vec();
        let bank1 = if bank1_page_size != 0 && content.len() > bank0_size {
            content[bank0_size..].to_vec()
        } else {
            Vec::new()
        };

        log::debug!(
            "LYNX header v{version}: '{}' by '{}', pages {bank0_page_size}/{bank1_page_size}",
            self.header_name,
            self.manufacturer
        );

        self.rom = content.to_vec();
        self.rom_size = content.len();
        self.media_type = MediaType::Lynx;
        self.cart.load_banks(bank0, bank0_page_size, bank1, bank1_page_size);
        Ok(())
    }

    fn parse_bs93(&mut self, buffer: &[u8]) -> Result<(), MediaError> {
        let load_address = u16::from_be_bytes([buffer[2], buffer[3]]);
        let size = u16::from_be_bytes([buffer[4], buffer[5]]) as usize;
        let payload = &buffer[BS93_HEADER_SIZE..];

        if payload.is_empty() {
            return Err(MediaError::BadHeader("homebrew image has no payload"));
        }

        log::debug!("BS93 header: load {load_address:04X}, size {size:04X}");

        self.rom = payload.to_vec();
        self.rom_size = payload.len();
        self.media_type = MediaType::Homebrew;
        self.homebrew_boot_address = load_address;
        self.rotation = Rotation::None;
        self.audin = false;
        self.eeprom_descriptor = 0;
        self.cart.load_banks(Vec::new(), 0, Vec::new(), 0);
        Ok(())
    }

    fn default_lynx(&mut self, buffer: &[u8]) {
        // 256 pages over the whole image, rounded up to a power of two.
        let page_size = ((buffer.len() as u32).div_ceil(PAGES_PER_BANK)).next_power_of_two();

        log::debug!("headerless image, assuming page size {page_size}");

        self.header_name = self.file_name.clone();
        self.manufacturer = String::new();
        self.rotation = Rotation::None;
        self.audin = false;
        self.eeprom_descriptor = 0;
        self.rom = buffer.to_vec();
        self.rom_size = buffer.len();
        self.media_type = MediaType::Lynx;
        self.cart.load_banks(buffer.to_vec(), page_size, Vec::new(), 0);
    }
}

impl Default for Media {
    fn default() -> Self {
        Self::new()
    }
}

fn split_path(path: &str) -> (String, String) {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    (file_name, extension)
}

fn ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim().to_string()
}

/// Pull the first cartridge image out of a zip archive.
fn extract_from_zip(buffer: &[u8]) -> Result<(Vec<u8>, String), MediaError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(buffer)).map_err(|e| MediaError::Zip(e.to_string()))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| MediaError::Zip(e.to_string()))?;
        if !file.is_file() {
            continue;
        }

        let name = file.name().to_string();
        let (_, extension) = split_path(&name);
        if VALID_EXTENSIONS.contains(&extension.as_str()) {
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| MediaError::Zip(e.to_string()))?;
            return Ok((data, name));
        }
    }

    Err(MediaError::Zip("no cartridge image in archive".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn lynx_image(bank0_pages: &[u8], page_size: u16) -> Vec<u8> {
        let mut image = vec![0u8; LYNX_HEADER_SIZE];
        image[..4].copy_from_slice(LYNX_MAGIC);
        image[4..6].copy_from_slice(&page_size.to_le_bytes());
        image[8..10].copy_from_slice(&1u16.to_le_bytes());
        image[10..14].copy_from_slice(b"Test");
        image[58] = 0; // no rotation
        image.extend_from_slice(bank0_pages);
        image
    }

    #[test]
    fn crc32_canonical_vector() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn rejects_empty_buffer() {
        let mut media = Media::new();
        assert!(matches!(
            media.load_from_buffer(&[], "x.lnx"),
            Err(MediaError::Empty)
        ));
        assert!(!media.is_ready());
    }

    #[test]
    fn rejects_unknown_extension() {
        let mut media = Media::new();
        let result = media.load_from_buffer(&[0u8; 16], "notes.txt");
        assert!(matches!(result, Err(MediaError::BadExtension(_))));
    }

    #[test]
    fn parses_lynx_header() {
        let bank = vec![0xA5u8; 1024];
        let image = lynx_image(&bank, 1024);
        let mut media = Media::new();
        media.load_from_buffer(&image, "game.lnx").unwrap();
        assert!(media.is_ready());
        assert_eq!(media.header_name(), "Test");
        assert_eq!(media.media_type(), MediaType::Lynx);
        assert_eq!(media.cart().page_size(0), 1024);
    }

    #[test]
    fn parses_bs93_header() {
        let mut image = vec![0x80, 0x08];
        image.extend_from_slice(&0x0200u16.to_be_bytes());
        image.extend_from_slice(&4u16.to_be_bytes());
        image.extend_from_slice(BS93_MAGIC);
        image.extend_from_slice(&[0xA9, 0x42, 0x80, 0xFE]);

        let mut media = Media::new();
        media.load_from_buffer(&image, "demo.o").unwrap();
        assert_eq!(media.media_type(), MediaType::Homebrew);
        assert_eq!(media.homebrew_boot_address(), 0x0200);
        assert_eq!(media.rom(), &[0xA9, 0x42, 0x80, 0xFE]);
    }

    #[test]
    fn bios_must_be_512_bytes() {
        let mut media = Media::new();
        assert_eq!(media.load_bios(&[0u8; 100]), BiosState::Missing);
        assert!(!media.is_bios_loaded());

        // Wrong content still loads, but is flagged.
        assert_eq!(media.load_bios(&[0u8; 512]), BiosState::Invalid);
        assert!(media.is_bios_loaded());
        assert!(!media.is_bios_valid());
    }

    #[test]
    fn forced_rotation_overrides_header() {
        let image = lynx_image(&[0u8; 64], 64);
        let mut media = Media::new();
        media.load_from_buffer(&image, "game.lnx").unwrap();
        assert_eq!(media.rotation(), Rotation::None);
        media.force_rotation(Some(Rotation::Left));
        assert_eq!(media.rotation(), Rotation::Left);
    }
}
