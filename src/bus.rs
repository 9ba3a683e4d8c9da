use crate::cartridge::Cartridge;
use crate::memory::{MemoryRegion, Operation};
use crate::{SharedRiot, SharedTia};
use log::{error, trace};

pub trait Bus {
    fn read(&mut self, _address: u16) -> u8 {
        0
    }
    fn write(&mut self, _address: u16, _val: u8) {}
}

/// The console's address space: the cartridge window plus the TIA and PIA
/// register banks. Strobe side effects ride the register dispatch; an access
/// that decodes to no register is logged and otherwise ignored.
pub(crate) struct AtariBus {
    cartridge: Cartridge,
    tia: SharedTia,
    riot: SharedRiot,
}

impl AtariBus {
    pub fn new(tia: SharedTia, riot: SharedRiot, cartridge: Cartridge) -> Self {
        Self {
            cartridge,
            tia,
            riot,
        }
    }
}

impl Bus for AtariBus {
    fn read(&mut self, address: u16) -> u8 {
        match MemoryRegion::decode(address, Operation::Read) {
            Ok(MemoryRegion::Cartridge(offset)) => self.cartridge.read(offset),
            Ok(MemoryRegion::PiaRam(offset)) => self.riot.borrow().ram_read(offset),
            Ok(MemoryRegion::PiaIo(reg)) => self.riot.borrow_mut().read(reg),
            Ok(MemoryRegion::TiaRead(reg)) => self.tia.borrow_mut().read(reg),
            Ok(_) => unreachable!(),
            Err(e) => {
                error!("{}", e);
                0
            }
        }
    }

    fn write(&mut self, address: u16, val: u8) {
        match MemoryRegion::decode(address, Operation::Write) {
            Ok(MemoryRegion::Cartridge(offset)) => self.cartridge.write(offset, val),
            Ok(MemoryRegion::PiaRam(offset)) => self.riot.borrow_mut().ram_write(offset, val),
            Ok(MemoryRegion::PiaIo(reg)) => {
                if reg.is_strobe() {
                    trace!("strobe {:?} <- {:#04x}", reg, val);
                }
                self.riot.borrow_mut().write(reg, val)
            }
            Ok(MemoryRegion::TiaWrite(reg)) => {
                if reg.is_strobe() {
                    trace!("strobe {:?}", reg);
                }
                self.tia.borrow_mut().write(reg, val)
            }
            Ok(_) => unreachable!(),
            Err(e) => error!("{}", e),
        }
    }
}
