//! The Lynx system bus: RAM, MAPCTL paging, and all chip-to-chip wiring.
//!
//! Everything except the CPU lives here, so the CPU can execute against
//! `&mut LynxBus` while the bus arbitrates MMIO between Suzy, Mikey, the
//! cartridge shifter, the EEPROM and the LCD pipeline. Cross-chip side
//! effects (SYSCTL1 -> cart strobe, IODAT -> cart data bit + EEPROM pins,
//! palette writes -> LCD, timer 0 -> line timing) are wired at this level.

use glint_core::core::cycles::{CYCLES_CART_READ, CYCLES_SUZY_READ};
use glint_core::core::{Bus, BusMaster, CycleBank, InterruptState};
use glint_core::device::lcd::LcdScreen;
use glint_core::device::mikey::{
    self, MIKEY_AUDIN, MIKEY_BLUEREDF, MIKEY_GREEN0, MIKEY_IODAT, MIKEY_SYSCTL1, Mikey,
};
use glint_core::device::suzy::{SUZY_RCART0, SUZY_RCART1, SUZY_SPRGO, Suzy};
use glint_core::device::Eeprom93cxx;

use crate::media::Media;

use super::memory::{MAPCTL_ADDRESS, MemoryMap, PageTarget};

pub struct LynxBus {
    pub memory: MemoryMap,
    pub suzy: Suzy,
    pub mikey: Mikey,
    pub lcd: LcdScreen,
    pub media: Media,
    pub eeprom: Eeprom93cxx,
    pub cycles: CycleBank,
}

impl LynxBus {
    pub fn new() -> Self {
        Self {
            memory: MemoryMap::new(),
            suzy: Suzy::new(),
            mikey: Mikey::new(),
            lcd: LcdScreen::new(),
            media: Media::new(),
            eeprom: Eeprom93cxx::none(),
            cycles: CycleBank::new(),
        }
    }

    /// One scheduler slice: Suzy's math countdown, then Mikey's lattice and
    /// the LCD pacing. Returns true when the frame completed.
    pub fn clock_chips(&mut self, ticks: u32) -> bool {
        self.suzy.clock(ticks);
        self.mikey
            .clock(ticks, &self.memory.ram()[..], &mut self.lcd, &mut self.cycles)
    }

    fn suzy_read(&mut self, master: BusMaster, address: u16) -> u8 {
        match address {
            SUZY_RCART0 => {
                if master == BusMaster::Debug {
                    self.media.cart().peek_bank0()
                } else {
                    self.cycles.inject(CYCLES_CART_READ);
                    self.media.cart_mut().read_bank0()
                }
            }
            SUZY_RCART1 => {
                if master == BusMaster::Debug {
                    self.media.cart().peek_bank1()
                } else {
                    self.cycles.inject(CYCLES_CART_READ);
                    self.media.cart_mut().read_bank1()
                }
            }
            _ => {
                if master == BusMaster::Cpu {
                    self.cycles.inject(CYCLES_SUZY_READ);
                }
                self.suzy.read(address)
            }
        }
    }

    fn suzy_write(&mut self, address: u16, value: u8) {
        match address {
            SUZY_RCART0 => self.media.cart_mut().write_bank0(value),
            SUZY_RCART1 => self.media.cart_mut().write_bank1(value),
            SUZY_SPRGO => {
                self.suzy.write(address, value);
                if value & 0x01 != 0 {
                    // The sprite engine runs to completion here; no CPU
                    // instruction observes an intermediate VRAM state.
                    self.suzy.sprites_go(self.memory.ram_mut(), &mut self.cycles);
                }
            }
            _ => self.suzy.write(address, value),
        }
    }

    fn mikey_read(&mut self, master: BusMaster, address: u16) -> u8 {
        match address {
            // The EEPROM's serial output is sampled through AUDIN.
            MIKEY_AUDIN if self.eeprom.is_available() => {
                if self.eeprom.output_bit() { 0x80 } else { 0x00 }
            }
            _ if master == BusMaster::Debug => self.mikey.peek(address),
            _ => self.mikey.read(address),
        }
    }

    fn mikey_write(&mut self, address: u16, value: u8) {
        match address {
            MIKEY_SYSCTL1 => {
                self.media.cart_mut().set_strobe(value & 0x01 != 0);
                self.mikey.write(address, value);
            }
            MIKEY_IODAT => {
                self.media.cart_mut().set_addr_bit(value & 0x02 != 0);

                // EEPROM pins: CS on bit 2 (when driven), CLK bit 1, DI bit 0.
                let iodir = self.mikey.iodir();
                let cs = value & 0x04 != 0 && iodir & 0x04 != 0;
                let clk = value & 0x02 != 0;
                let di = value & 0x01 != 0;
                self.eeprom.set_lines(cs, clk, di);

                self.mikey.write(address, value);
            }
            mikey::MIKEY_TIM0BKUP..=mikey::MIKEY_TIM0CTLA => {
                self.mikey.write(address, value);
                self.lcd.configure_line_timing(
                    self.mikey.timers[0].backup,
                    self.mikey.timers[0].period_cycles,
                );
            }
            MIKEY_GREEN0..=MIKEY_BLUEREDF => {
                self.mikey.write(address, value);
                let index = (address & 0xF) as usize;
                self.lcd
                    .update_palette(index, self.mikey.host_palette_entry(index));
            }
            _ => self.mikey.write(address, value),
        }
    }

    fn last_page_read(&mut self, master: BusMaster, address: u16) -> u8 {
        if address < 0xFFF8 {
            if self.memory.bios_visible() {
                self.media.bios()[(address & 0x1FF) as usize]
            } else {
                self.memory.ram()[address as usize]
            }
        } else if address > MAPCTL_ADDRESS {
            if self.memory.vectors_visible() {
                self.media.bios()[(address & 0x1FF) as usize]
            } else {
                self.memory.ram()[address as usize]
            }
        } else {
            // $FFF8: documented unused byte, behaves as RAM.
            if master == BusMaster::Cpu {
                log::debug!("read from $FFF8");
            }
            self.memory.ram()[address as usize]
        }
    }
}

impl Default for LynxBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for LynxBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, master: BusMaster, address: u16) -> u8 {
        if address == MAPCTL_ADDRESS {
            return self.memory.mapctl();
        }

        let page = (address >> 8) as u8;
        match self.memory.target(page) {
            PageTarget::Ram => self.memory.ram()[address as usize],
            PageTarget::Suzy => self.suzy_read(master, address),
            PageTarget::Mikey => self.mikey_read(master, address),
            PageTarget::Bios => self.media.bios()[(address & 0x1FF) as usize],
            PageTarget::LastPage => self.last_page_read(master, address),
        }
    }

    fn write(&mut self, master: BusMaster, address: u16, value: u8) {
        if address == MAPCTL_ADDRESS {
            self.memory.set_mapctl(value);
            return;
        }

        let page = (address >> 8) as u8;
        match self.memory.target(page) {
            PageTarget::Suzy => self.suzy_write(address, value),
            PageTarget::Mikey => self.mikey_write(address, value),
            PageTarget::LastPage => {
                if address == 0xFFF8 && master == BusMaster::Cpu {
                    log::debug!("write {value:02X} to $FFF8");
                }
                self.memory.ram_mut()[address as usize] = value;
            }
            // BIOS is ROM: writes fall through to the RAM underneath.
            PageTarget::Ram | PageTarget::Bios => {
                self.memory.ram_mut()[address as usize] = value;
            }
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: false,
            irq: self.mikey.irq_line(),
        }
    }
}
