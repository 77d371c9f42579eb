use glint_core::core::{Bus, BusMaster};
use glint_core::device::lcd::PixelFormat;
use glint_machines::lynx::{DebugRun, Key, LynxSystem};

mod common;
use common::{booted_system, bs93_cart, frame_buffer_len, lynx_cart, run_one_frame};

// =============================================================================
// Empty boot: BIOS only, display DMA off
// =============================================================================

#[test]
fn test_empty_boot_produces_black_frames() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut fb = vec![0xA5u8; frame_buffer_len(PixelFormat::Rgb565)];

    let mut last_clock = system.clock();
    for frame in 0..60 {
        let (_samples, hit) = run_one_frame(&mut system, &mut fb);
        assert!(!hit, "frame {frame} reported a breakpoint");

        // DISPCTL.0 is clear, so every line was blanked to zero.
        assert!(
            fb.iter().all(|&b| b == 0),
            "frame {frame} was not black"
        );

        // No IRQ source fired: the boot program enables none.
        assert_eq!(system.bus().mikey.irq_pending(), 0, "frame {frame}");

        // The frame ended on vblank, not on the safety cap.
        let delta = (system.clock() - last_clock) as u32;
        assert!(
            delta < 300_000,
            "frame {frame} consumed {delta} ticks"
        );
        last_clock = system.clock();
    }
}

#[test]
fn test_frames_produce_audio_samples() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];

    run_one_frame(&mut system, &mut fb); // first frame settles timing
    let (samples, _) = run_one_frame(&mut system, &mut fb);

    // ~16.7 ms at 44.1 kHz stereo is about 1470 interleaved samples.
    assert!(
        (1200..=1800).contains(&samples),
        "got {samples} samples"
    );
}

#[test]
fn test_paused_core_does_nothing() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];

    system.pause(true);
    let clock = system.clock();
    let (samples, hit) = run_one_frame(&mut system, &mut fb);
    assert!(!hit);
    assert_eq!(samples, 0);
    assert_eq!(system.clock(), clock);

    system.pause(false);
    run_one_frame(&mut system, &mut fb);
    assert!(system.clock() > clock);
}

#[test]
fn test_missing_bios_renders_placeholder() {
    let mut system = LynxSystem::new(PixelFormat::Rgb565);
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];

    let (samples, hit) = run_one_frame(&mut system, &mut fb);
    assert!(!hit);
    assert_eq!(samples, 0);
    // The placeholder screen is not black.
    assert!(fb.iter().any(|&b| b != 0));
}

// =============================================================================
// Homebrew boot
// =============================================================================

#[test]
fn test_homebrew_boots_at_load_address() {
    let mut system = booted_system(PixelFormat::Rgb565);
    // Payload: spin in place.
    let image = bs93_cart(0x0200, &[0x80, 0xFE]);
    assert!(system.load_rom_from_buffer(&image, "demo.o"));

    assert_eq!(system.cpu().pc, 0x0200);
    // The boot preparation programmed the display the way the ROM would.
    assert_eq!(system.bus().mikey.dispctl(), 0x09);
    assert_eq!(system.bus().mikey.timers[0].backup, 0x9E);
    assert_eq!(system.bus().mikey.timers[2].backup, 0x68);
}

#[test]
fn test_homebrew_frame_shows_palette_zero() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let image = bs93_cart(0x0200, &[0x80, 0xFE]);
    assert!(system.load_rom_from_buffer(&image, "demo.o"));

    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);
    run_one_frame(&mut system, &mut fb);

    // Display DMA is on over zeroed RAM: every pen is 0, and the reset
    // palette maps color 0 to all-ones (white in RGB565).
    assert!(fb.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_runtime_info_reflects_display_timers() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let info = system.runtime_info();
    assert_eq!(info.screen_width, 160);
    assert_eq!(info.screen_height, 102);
    // (0x9E + 1) us per line x 105 lines = 16.695 ms.
    assert!((info.frame_time_ms - 16.695).abs() < 0.01);
}

// =============================================================================
// Input
// =============================================================================

#[test]
fn test_pause_key_reaches_switches_register() {
    let mut system = booted_system(PixelFormat::Rgb565);
    system.key_pressed(Key::Pause);
    assert_eq!(system.bus().suzy.switches & 0x01, 0x01);
    system.key_released(Key::Pause);
    assert_eq!(system.bus().suzy.switches & 0x01, 0x00);
}

#[test]
fn test_rotation_is_applied_from_cart_header() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut image = lynx_cart(&[0u8; 256], 256);
    image[58] = 1; // rotate left
    assert!(system.load_rom_from_buffer(&image, "rot.lnx"));

    system.key_pressed(Key::Up);
    // Up is remapped to the rotated right.
    assert_eq!(system.bus().suzy.joystick, 0x10);
}

// =============================================================================
// Cartridge access through Suzy's ports
// =============================================================================

fn select_cart_page(system: &mut LynxSystem, page: u8) {
    let bus = system.bus_mut();
    for bit in (0..8).rev() {
        let data = if page & (1 << bit) != 0 { 0x02 } else { 0x00 };
        bus.write(BusMaster::Cpu, 0xFD87, 0x00); // strobe low
        bus.write(BusMaster::Cpu, 0xFD8B, data); // address bit on IODAT.1
        bus.write(BusMaster::Cpu, 0xFD87, 0x01); // strobe high: shift
    }
    bus.write(BusMaster::Cpu, 0xFD87, 0x00);
}

#[test]
fn test_cart_reads_walk_the_selected_page() {
    let mut system = booted_system(PixelFormat::Rgb565);

    // Bank 0: 256 pages of 4 bytes, each page stamped with its number.
    let mut bank0 = vec![0u8; 1024];
    for (i, byte) in bank0.iter_mut().enumerate() {
        *byte = (i / 4) as u8;
    }
    let image = lynx_cart(&bank0, 4);
    assert!(system.load_rom_from_buffer(&image, "pages.lnx"));

    select_cart_page(&mut system, 3);
    let bus = system.bus_mut();
    assert_eq!(bus.read(BusMaster::Cpu, 0xFCB2), 3);
    assert_eq!(bus.read(BusMaster::Cpu, 0xFCB2), 3);
    // Each read cost cart-access cycles.
    assert!(bus.cycles.consume() >= 6);
    // The offset counter advanced twice.
    assert_eq!(bus.media.cart().page_offset(), 2);

    // Debugger reads do not advance it.
    let _ = bus.read(BusMaster::Debug, 0xFCB2);
    assert_eq!(bus.media.cart().page_offset(), 2);
}

// =============================================================================
// EEPROM through the I/O port
// =============================================================================

struct EepromDriver;

impl EepromDriver {
    /// CS on IODAT.2, CLK on IODAT.1, DI on IODAT.0.
    fn clock_bit(system: &mut LynxSystem, bit: bool) {
        let di = bit as u8;
        let bus = system.bus_mut();
        bus.write(BusMaster::Cpu, 0xFD8B, 0x04 | di);
        bus.write(BusMaster::Cpu, 0xFD8B, 0x04 | 0x02 | di);
    }

    fn send_bits(system: &mut LynxSystem, value: u32, count: u32) {
        for i in (0..count).rev() {
            Self::clock_bit(system, value & (1 << i) != 0);
        }
    }

    fn start(system: &mut LynxSystem) {
        let bus = system.bus_mut();
        bus.write(BusMaster::Cpu, 0xFD8B, 0x00); // CS low
        bus.write(BusMaster::Cpu, 0xFD8B, 0x04); // CS high
        Self::clock_bit(system, true); // start bit
    }

    fn read_do(system: &mut LynxSystem) -> bool {
        system.bus_mut().read(BusMaster::Cpu, 0xFD86) & 0x80 != 0
    }
}

#[test]
fn test_eeprom_wired_through_iodat_and_audin() {
    let mut system = booted_system(PixelFormat::Rgb565);

    // Cart header byte 60 requests a 93C46.
    let mut image = lynx_cart(&[0u8; 256], 256);
    image[60] = 0x01;
    assert!(system.load_rom_from_buffer(&image, "eeprom.lnx"));
    assert!(system.bus().eeprom.is_available());

    // All I/O port pins driven.
    system.bus_mut().write(BusMaster::Cpu, 0xFD8A, 0xFF);

    // EWEN: 00 + address top bits 11.
    EepromDriver::start(&mut system);
    EepromDriver::send_bits(&mut system, 0b00, 2);
    EepromDriver::send_bits(&mut system, 0b11 << 4, 6);

    // WRITE word 5 = 0xBEEF.
    EepromDriver::start(&mut system);
    EepromDriver::send_bits(&mut system, 0b01, 2);
    EepromDriver::send_bits(&mut system, 5, 6);
    EepromDriver::send_bits(&mut system, 0xBEEF, 16);
    assert!(system.bus().eeprom.is_dirty());

    // READ word 5 back through AUDIN.
    EepromDriver::start(&mut system);
    EepromDriver::send_bits(&mut system, 0b10, 2);
    EepromDriver::send_bits(&mut system, 5, 6);
    assert!(!EepromDriver::read_do(&mut system)); // dummy zero
    let mut value = 0u16;
    for _ in 0..16 {
        EepromDriver::clock_bit(&mut system, false);
        value = (value << 1) | EepromDriver::read_do(&mut system) as u16;
    }
    assert_eq!(value, 0xBEEF);
}

// =============================================================================
// Debugger surface
// =============================================================================

#[cfg(feature = "disassembler")]
#[test]
fn test_breakpoint_stops_run_to_vblank() {
    let mut system = booted_system(PixelFormat::Rgb565);

    // The boot program parks in a two-byte spin at $FE1A.
    system.cpu_mut().add_breakpoint(0xFE1A);

    let debug = DebugRun {
        stop_on_breakpoint: true,
        ..Default::default()
    };
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    let mut samples = [0i16; 4096];
    let mut count = 0;
    let hit = system.run_to_vblank(&mut fb, &mut samples, &mut count, Some(&debug));

    assert!(hit);
    assert_eq!(system.cpu().pc, 0xFE1A);
    // Far less than a frame elapsed.
    assert!(system.clock() < 10_000);
}

#[cfg(feature = "disassembler")]
#[test]
fn test_single_step_debug_run() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let debug = DebugRun {
        step_debugger: true,
        ..Default::default()
    };
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    let mut samples = [0i16; 4096];
    let mut count = 0;

    let pc = system.cpu().pc;
    let hit = system.run_to_vblank(&mut fb, &mut samples, &mut count, Some(&debug));
    assert!(!hit);
    // Exactly one instruction executed (LDA #$9E is two bytes).
    assert_eq!(system.cpu().pc, pc + 2);
}

#[cfg(feature = "disassembler")]
#[test]
fn test_disassembly_records_cover_boot_code() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let record = system.cpu().disasm_record(0xFE00).expect("no record");
    assert_eq!(record.name, "LDA #$9E");
    assert_eq!(record.size, 2);

    let spin = system.cpu().disasm_record(0xFE1A).expect("no spin record");
    assert_eq!(spin.name, "BRA $FE1A");
    assert!(spin.jump);
    assert_eq!(spin.jump_address, 0xFE1A);
}
