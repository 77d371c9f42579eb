//! The Lynx machine: construction, wiring, the per-frame drive loop, save
//! states and the debug surface.

mod audio;
mod bus;
mod input;
mod memory;
mod savestate;

pub use audio::{AUDIO_BUFFER_SIZE, AudioOut};
pub use bus::LynxBus;
pub use input::{Input, Key};
pub use memory::{MAPCTL_ADDRESS, MemoryMap, PageTarget, RAM_SIZE};
pub use savestate::{HEADER_SIZE, Header, SAVESTATE_MAGIC, SAVESTATE_VERSION, StateError};

use std::path::Path;

use glint_core::core::state::{StateReader, StateWriter};
use glint_core::core::{Bus, BusMaster};
use glint_core::cpu::M65C02;
use glint_core::device::Eeprom93cxx;
use glint_core::device::lcd::{PixelFormat, SCREEN_HEIGHT, SCREEN_WIDTH};
use glint_core::device::mikey;

pub use crate::media::BiosState;
use crate::media::MediaType;

/// Soft cap on one frame's run time: 90 000 CPU cycles at the master-clock
/// scaling, roughly two worst-case frames. A frame that runs longer without
/// reaching vblank is broken out of and logged.
const FRAME_TICK_LIMIT: u32 = 90_000 * glint_core::core::cycles::CYCLES_TICK_FACTOR;

#[derive(Default, Clone, Copy)]
pub struct DebugRun {
    pub step_debugger: bool,
    pub stop_on_breakpoint: bool,
    pub stop_on_run_to_breakpoint: bool,
    pub stop_on_irq: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct RuntimeInfo {
    pub screen_width: u32,
    pub screen_height: u32,
    pub frame_time_ms: f32,
}

pub struct LynxSystem {
    cpu: M65C02,
    bus: LynxBus,
    input: Input,
    audio_out: AudioOut,
    paused: bool,
    clock: u64,
}

impl LynxSystem {
    pub fn new(pixel_format: PixelFormat) -> Self {
        let mut system = Self {
            cpu: M65C02::new(),
            bus: LynxBus::new(),
            input: Input::new(),
            audio_out: AudioOut::new(),
            paused: false,
            clock: 0,
        };
        system.bus.lcd.init(pixel_format);
        system
    }

    // ---- Media ----

    pub fn load_rom_from_file(&mut self, path: &Path) -> bool {
        match self.bus.media.load_from_file(path) {
            Ok(()) => {
                self.after_rom_load();
                true
            }
            Err(e) => {
                log::error!("failed to load ROM {}: {e}", path.display());
                false
            }
        }
    }

    pub fn load_rom_from_buffer(&mut self, buffer: &[u8], name: &str) -> bool {
        match self.bus.media.load_from_buffer(buffer, name) {
            Ok(()) => {
                self.after_rom_load();
                true
            }
            Err(e) => {
                log::error!("failed to load ROM {name}: {e}");
                false
            }
        }
    }

    fn after_rom_load(&mut self) {
        self.bus.eeprom = Eeprom93cxx::new(
            self.bus.media.eeprom_kind(),
            self.bus.media.eeprom_is_8bit(),
        );
        #[cfg(feature = "disassembler")]
        self.cpu.reset_disasm_records();
        self.reset(false);
    }

    pub fn load_bios(&mut self, path: &Path) -> BiosState {
        self.bus.media.load_bios_from_file(path)
    }

    pub fn load_bios_from_buffer(&mut self, data: &[u8]) -> BiosState {
        self.bus.media.load_bios(data)
    }

    // ---- Input ----

    pub fn key_pressed(&mut self, key: Key) {
        let rotation = self.bus.media.rotation();
        self.input.key_pressed(key, rotation);
        self.latch_input();
    }

    pub fn key_released(&mut self, key: Key) {
        let rotation = self.bus.media.rotation();
        self.input.key_released(key, rotation);
        self.latch_input();
    }

    fn latch_input(&mut self) {
        self.bus.suzy.joystick = self.input.joystick();
        self.bus.suzy.switches = self.input.switches();
    }

    // ---- Control ----

    pub fn pause(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("core {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Reset to power-on state. Works with a cartridge, or with only a boot
    /// ROM installed (the console boots to its insert-game screen).
    pub fn reset_rom(&mut self, preserve_ram: bool) {
        if !self.bus.media.is_ready() && !self.bus.media.is_bios_loaded() {
            return;
        }
        log::info!("system reset");
        self.reset(preserve_ram);
    }

    fn reset(&mut self, preserve_ram: bool) {
        self.clock = 0;
        self.paused = false;

        self.bus.cycles.reset();
        self.bus.suzy.reset();
        self.bus.mikey.reset();
        self.bus.lcd.reset();
        self.bus.memory.reset(preserve_ram);
        self.bus.media.reset();
        self.bus.eeprom.reset();
        self.audio_out.reset();
        self.input.reset();
        self.latch_input();

        self.bus.lcd.configure_line_timing(
            self.bus.mikey.timers[0].backup,
            self.bus.mikey.timers[0].period_cycles,
        );

        // Color registers come up all ones.
        for address in mikey::MIKEY_GREEN0..=mikey::MIKEY_BLUEREDF {
            self.bus.write(BusMaster::Cpu, address, 0xFF);
        }

        self.cpu.reset(&mut self.bus);

        if self.bus.media.media_type() == MediaType::Homebrew {
            self.prepare_homebrew();
        }
    }

    /// BS93 images bypass the cart shifter: the payload is copied straight
    /// into RAM (wrapping at the top) and the machine is pre-configured the
    /// way the boot ROM would leave it.
    fn prepare_homebrew(&mut self) {
        let boot_address = self.bus.media.homebrew_boot_address();
        let rom = self.bus.media.rom().to_vec();
        if rom.is_empty() {
            return;
        }

        let ram = self.bus.memory.ram_mut();
        ram.fill(0);

        let start = boot_address as usize;
        let first = rom.len().min(RAM_SIZE - start);
        ram[start..start + first].copy_from_slice(&rom[..first]);
        let left = rom.len() - first;
        if left > 0 {
            let wrapped = left.min(RAM_SIZE);
            ram[..wrapped].copy_from_slice(&rom[first..first + wrapped]);
        }

        self.cpu.pc = boot_address;

        // Display timing the boot ROM would have programmed.
        self.bus.write(BusMaster::Cpu, 0xFD00, 0x9E); // TIM0BKUP
        self.bus.write(BusMaster::Cpu, 0xFD01, 0x18); // TIM0CTLA: enable+reload
        self.bus.write(BusMaster::Cpu, 0xFD08, 0x68); // TIM2BKUP = 104
        self.bus.write(BusMaster::Cpu, 0xFD09, 0x1F); // TIM2CTLA: linked
        self.bus.write(BusMaster::Cpu, 0xFD92, 0x09); // DISPCTL: DMA on, 4bpp
        self.bus.cycles.reset();

        #[cfg(feature = "disassembler")]
        self.cpu.disassemble_next_opcode(&mut self.bus);
    }

    // ---- The drive loop ----

    /// Execute until the next vertical blank (or a debug stop), translating
    /// the finished frame into `frame_buffer` and draining the frame's
    /// audio into `sample_buffer`. Returns true when a breakpoint stopped
    /// the run.
    pub fn run_to_vblank(
        &mut self,
        frame_buffer: &mut [u8],
        sample_buffer: &mut [i16],
        sample_count: &mut u32,
        debug: Option<&DebugRun>,
    ) -> bool {
        *sample_count = 0;

        if self.paused {
            return false;
        }
        if !self.bus.media.is_bios_loaded() {
            self.bus.lcd.render_no_bios(frame_buffer);
            return false;
        }

        self.latch_input();

        #[cfg(feature = "disassembler")]
        if let Some(d) = debug {
            self.cpu.enable_breakpoints(d.stop_on_breakpoint, d.stop_on_irq);
        }
        #[cfg(not(feature = "disassembler"))]
        let _ = debug;

        let mut stop = false;
        let mut breakpoint_hit = false;
        let mut frame_ticks: u32 = 0;

        while !stop {
            self.cpu
                .set_page_mode_enabled(self.bus.memory.page_mode_enabled());

            let mut ticks = self.cpu.step(&mut self.bus);
            ticks += self.bus.cycles.consume();

            if self.bus.mikey.take_sleep_request() {
                self.cpu.halt(true);
            }

            stop = self.bus.clock_chips(ticks);
            self.audio_out.clock(ticks, &self.bus.mikey);

            self.clock += ticks as u64;
            frame_ticks += ticks;
            if frame_ticks > FRAME_TICK_LIMIT {
                log::warn!("frame exceeded {FRAME_TICK_LIMIT} ticks without vblank");
                stop = true;
            }

            #[cfg(feature = "disassembler")]
            if let Some(d) = debug {
                if d.step_debugger {
                    stop = true;
                }
                if self.cpu.breakpoint_hit() {
                    stop = true;
                    breakpoint_hit = true;
                }
                if d.stop_on_run_to_breakpoint && self.cpu.run_to_breakpoint_hit() {
                    stop = true;
                    breakpoint_hit = true;
                }
            }
        }

        let rotation = self.bus.media.rotation();
        self.bus.lcd.end_frame(frame_buffer, rotation);
        self.audio_out.end_frame(sample_buffer, sample_count);

        breakpoint_hit
    }

    pub fn runtime_info(&self) -> RuntimeInfo {
        let t0 = &self.bus.mikey.timers[0];
        let t2 = &self.bus.mikey.timers[2];

        let tick_us =
            glint_core::device::mikey::TIMER_PERIOD_US[(t0.control_a & 0x07) as usize] as f32;
        let frame_time_ms =
            ((t0.backup as f32 + 1.0) * tick_us * (t2.backup as f32 + 1.0)) / 1000.0;

        RuntimeInfo {
            screen_width: SCREEN_WIDTH as u32,
            screen_height: SCREEN_HEIGHT as u32,
            frame_time_ms: frame_time_ms.clamp(12.5, 20.0),
        }
    }

    // ---- Save states ----

    /// Serialize the whole machine. Returns the number of bytes written.
    pub fn save_state(&mut self, out: &mut Vec<u8>, screenshot: bool) -> Result<usize, StateError> {
        if !self.bus.media.is_ready() {
            return Err(StateError::NotReady);
        }

        let start = out.len();
        {
            let mut w = StateWriter::new(out);
            w.u64(self.clock)?;
            self.bus.memory.save_state(&mut w)?;
            self.cpu.save_state(&mut w)?;
            self.bus.suzy.save_state(&mut w)?;
            self.bus.mikey.save_state(&mut w)?;
            self.bus.lcd.save_state(&mut w)?;
            self.bus.media.cart().save_state(&mut w)?;
            self.bus.eeprom.save_state(&mut w)?;
            self.input.save_state(&mut w)?;
        }

        let (screenshot_size, screenshot_width, screenshot_height) = if screenshot {
            let bpp = self.bus.lcd.pixel_format().bytes_per_pixel();
            let mut shot = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT * bpp];
            let rotation = self.bus.media.rotation();
            self.bus.lcd.end_frame(&mut shot, rotation);
            let (w, h) = match rotation {
                glint_core::device::lcd::Rotation::None => (SCREEN_WIDTH, SCREEN_HEIGHT),
                _ => (SCREEN_HEIGHT, SCREEN_WIDTH),
            };
            out.extend_from_slice(&shot);
            (shot.len() as u32, w as u32, h as u32)
        } else {
            (0, 0, 0)
        };

        let total = (out.len() - start + HEADER_SIZE) as u32;
        let header = Header {
            magic: SAVESTATE_MAGIC,
            version: SAVESTATE_VERSION,
            size: total,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0),
            rom_name: savestate::ascii_fixed(self.bus.media.file_name()),
            rom_crc: self.bus.media.crc(),
            screenshot_size,
            screenshot_width,
            screenshot_height,
            emu_build: savestate::ascii_fixed(env!("CARGO_PKG_VERSION")),
        };

        let mut w = StateWriter::new(out);
        header.write(&mut w)?;

        Ok(total as usize)
    }

    /// Restore a snapshot. The container is fully validated before any
    /// component state is touched; on error the running state is unchanged.
    pub fn load_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        if !self.bus.media.is_ready() {
            return Err(StateError::NotReady);
        }

        let header = Header::parse(data)?;

        if header.size as usize != data.len() {
            return Err(StateError::Size {
                expected: header.size,
                got: data.len() as u32,
            });
        }
        if header.rom_crc != self.bus.media.crc() {
            return Err(StateError::RomCrc {
                expected: self.bus.media.crc(),
                got: header.rom_crc,
            });
        }

        let body_len = data
            .len()
            .checked_sub(HEADER_SIZE + header.screenshot_size as usize)
            .ok_or(StateError::Truncated)?;

        let mut cursor = std::io::Cursor::new(&data[..body_len]);
        let mut r = StateReader::new(&mut cursor);

        let result: std::io::Result<()> = (|| {
            self.clock = r.u64()?;
            self.bus.memory.load_state(&mut r)?;
            self.cpu.load_state(&mut r)?;
            self.bus.suzy.load_state(&mut r)?;
            self.bus.mikey.load_state(&mut r)?;
            self.bus.lcd.load_state(&mut r)?;
            self.bus.media.cart_mut().load_state(&mut r)?;
            self.bus.eeprom.load_state(&mut r)?;
            self.input.load_state(&mut r)?;
            Ok(())
        })();
        result.map_err(|_| StateError::Truncated)?;

        self.cpu
            .set_page_mode_enabled(self.bus.memory.page_mode_enabled());
        self.bus.lcd.configure_line_timing(
            self.bus.mikey.timers[0].backup,
            self.bus.mikey.timers[0].period_cycles,
        );

        Ok(())
    }

    pub fn save_state_to_file(&mut self, path: &Path, screenshot: bool) -> Result<usize, StateError> {
        let mut data = Vec::new();
        let size = self.save_state(&mut data, screenshot)?;
        std::fs::write(path, &data)?;
        log::info!("saved state to {} ({size} bytes)", path.display());
        Ok(size)
    }

    pub fn load_state_from_file(&mut self, path: &Path) -> Result<(), StateError> {
        let data = std::fs::read(path)?;
        self.load_state(&data)
    }

    /// Read back only a state file's trailer header.
    pub fn read_state_header(path: &Path) -> Result<Header, StateError> {
        let data = std::fs::read(path)?;
        Header::parse(&data)
    }

    // ---- Debug / component access ----

    pub fn cpu(&self) -> &M65C02 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut M65C02 {
        &mut self.cpu
    }

    pub fn bus(&self) -> &LynxBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut LynxBus {
        &mut self.bus
    }

    pub fn audio_out_mut(&mut self) -> &mut AudioOut {
        &mut self.audio_out
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }
}
