use log::{info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Size of the cartridge window at 0xF000.
pub const ROM_SIZE: usize = 4096;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("unable to read cartridge: {0}")]
    Io(#[from] std::io::Error),
    #[error("cartridge image of {0} bytes exceeds the 4 KiB window")]
    Oversized(usize),
}

/// A raw, headerless cartridge image filling the 4 KiB window. 2 KiB images
/// appear in both halves, the way the unconnected address line mirrors them
/// on the real bus.
pub struct Cartridge {
    rom: [u8; ROM_SIZE],
}

impl Cartridge {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let mut fh = File::open(path.as_ref())?;

        let mut data = vec![];
        let bytes = fh.read_to_end(&mut data)?;
        info!("ROM: {} ({} bytes)", path.as_ref().display(), bytes);

        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() > ROM_SIZE {
            return Err(CartridgeError::Oversized(data.len()));
        }

        let mut rom = [0; ROM_SIZE];
        match data.len() {
            0x800 => {
                rom[..0x800].copy_from_slice(data);
                rom[0x800..].copy_from_slice(data);
            }
            len => {
                if len != ROM_SIZE {
                    warn!("unusual cartridge size: {} bytes", len);
                }
                rom[..len].copy_from_slice(data);
            }
        }

        Ok(Self { rom })
    }

    /// Little-endian reset vector from the top of the window.
    pub fn reset_vector(&self) -> u16 {
        (self.rom[0xFFD] as u16) << 8 | self.rom[0xFFC] as u16
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.rom[offset & 0xfff]
    }

    pub fn write(&mut self, offset: usize, val: u8) {
        self.rom[offset & 0xfff] = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_kib_image_loads_contiguously() {
        let mut image = vec![0u8; ROM_SIZE];
        image[0] = 0xA9;
        image[0xFFC] = 0x00;
        image[0xFFD] = 0xF1;
        let cart = Cartridge::from_bytes(&image).unwrap();
        assert_eq!(cart.read(0), 0xA9);
        assert_eq!(cart.reset_vector(), 0xF100);
    }

    #[test]
    fn two_kib_image_mirrors_into_both_halves() {
        let mut image = vec![0u8; 0x800];
        image[0] = 0x42;
        image[0x7FC] = 0x00;
        image[0x7FD] = 0xF8;
        let cart = Cartridge::from_bytes(&image).unwrap();
        assert_eq!(cart.read(0x000), 0x42);
        assert_eq!(cart.read(0x800), 0x42);
        // The reset vector lands at the top of the window via the mirror.
        assert_eq!(cart.reset_vector(), 0xF800);
    }

    #[test]
    fn oversized_image_is_rejected() {
        let image = vec![0u8; ROM_SIZE + 1];
        assert!(matches!(
            Cartridge::from_bytes(&image),
            Err(CartridgeError::Oversized(_))
        ));
    }

    #[test]
    fn short_image_loads_at_the_window_base() {
        let cart = Cartridge::from_bytes(&[0xA9, 0x42, 0x85, 0x80]).unwrap();
        assert_eq!(cart.read(0), 0xA9);
        assert_eq!(cart.read(3), 0x80);
        // An empty vector clamps to the start of the cartridge in the CPU.
        assert_eq!(cart.reset_vector(), 0x0000);
    }
}
