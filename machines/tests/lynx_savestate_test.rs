use glint_core::core::{Bus, BusMaster};
use glint_core::device::lcd::PixelFormat;
use glint_machines::lynx::{HEADER_SIZE, StateError};

mod common;
use common::{booted_system, bs93_cart, frame_buffer_len, run_one_frame};

fn system_with_cart() -> glint_machines::lynx::LynxSystem {
    let mut system = booted_system(PixelFormat::Rgb565);
    let image = bs93_cart(0x0200, &[0x80, 0xFE]);
    assert!(system.load_rom_from_buffer(&image, "demo.o"));
    system
}

/// Strip the header timestamp (written at save time) before comparing two
/// state images byte-for-byte.
fn without_timestamp(data: &[u8]) -> Vec<u8> {
    let mut copy = data.to_vec();
    let header_start = copy.len() - HEADER_SIZE;
    copy[header_start + 12..header_start + 20].fill(0);
    copy
}

#[test]
fn test_save_load_save_is_byte_identical() {
    let mut system = system_with_cart();
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    for _ in 0..3 {
        run_one_frame(&mut system, &mut fb);
    }

    let mut first = Vec::new();
    let size = system.save_state(&mut first, false).unwrap();
    assert_eq!(size, first.len());

    // Saving an untouched machine twice produces the same bytes.
    let mut again = Vec::new();
    system.save_state(&mut again, false).unwrap();
    assert_eq!(without_timestamp(&first), without_timestamp(&again));

    // Load then save: still identical.
    system.load_state(&first).unwrap();
    let mut after_load = Vec::new();
    system.save_state(&mut after_load, false).unwrap();
    assert_eq!(without_timestamp(&first), without_timestamp(&after_load));
}

#[test]
fn test_load_restores_machine_state() {
    let mut system = system_with_cart();
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let mut snapshot = Vec::new();
    system.save_state(&mut snapshot, false).unwrap();
    let clock = system.clock();
    let pc = system.cpu().pc;

    // Diverge: run more frames and scribble on RAM.
    for _ in 0..2 {
        run_one_frame(&mut system, &mut fb);
    }
    system.bus_mut().write(BusMaster::Cpu, 0x3000, 0xDD);
    assert_ne!(system.clock(), clock);

    system.load_state(&snapshot).unwrap();
    assert_eq!(system.clock(), clock);
    assert_eq!(system.cpu().pc, pc);
    assert_eq!(system.bus_mut().read(BusMaster::Cpu, 0x3000), 0x00);
}

#[test]
fn test_resumed_run_is_deterministic() {
    let mut system = system_with_cart();
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let mut snapshot = Vec::new();
    system.save_state(&mut snapshot, false).unwrap();

    // Run one frame from the snapshot, twice; both runs must agree.
    run_one_frame(&mut system, &mut fb);
    let mut first_run = Vec::new();
    system.save_state(&mut first_run, false).unwrap();

    system.load_state(&snapshot).unwrap();
    run_one_frame(&mut system, &mut fb);
    let mut second_run = Vec::new();
    system.save_state(&mut second_run, false).unwrap();

    assert_eq!(without_timestamp(&first_run), without_timestamp(&second_run));
}

#[test]
fn test_screenshot_payload_is_framed() {
    let mut system = system_with_cart();
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let mut plain = Vec::new();
    system.save_state(&mut plain, false).unwrap();
    let mut with_shot = Vec::new();
    system.save_state(&mut with_shot, true).unwrap();

    assert_eq!(
        with_shot.len(),
        plain.len() + frame_buffer_len(PixelFormat::Rgb565)
    );
    // The snapshot still loads with the screenshot in place.
    system.load_state(&with_shot).unwrap();
}

// =============================================================================
// Container validation
// =============================================================================

#[test]
fn test_rejects_bad_magic() {
    let mut system = system_with_cart();
    let mut data = Vec::new();
    system.save_state(&mut data, false).unwrap();

    let header_start = data.len() - HEADER_SIZE;
    data[header_start] ^= 0xFF;
    assert!(matches!(
        system.load_state(&data),
        Err(StateError::BadMagic(_))
    ));
}

#[test]
fn test_rejects_version_mismatch() {
    let mut system = system_with_cart();
    let mut data = Vec::new();
    system.save_state(&mut data, false).unwrap();

    let header_start = data.len() - HEADER_SIZE;
    data[header_start + 4] = 0x7F;
    assert!(matches!(
        system.load_state(&data),
        Err(StateError::Version { .. })
    ));
}

#[test]
fn test_rejects_size_mismatch() {
    let mut system = system_with_cart();
    let mut data = Vec::new();
    system.save_state(&mut data, false).unwrap();

    data.splice(0..0, [0u8; 4]); // prepend garbage: header no longer agrees
    assert!(matches!(system.load_state(&data), Err(StateError::Size { .. })));
}

#[test]
fn test_rejects_foreign_rom() {
    let mut system = system_with_cart();
    let mut data = Vec::new();
    system.save_state(&mut data, false).unwrap();

    // A different cartridge is now loaded: the CRC check must refuse.
    let other = bs93_cart(0x0300, &[0xEA, 0x80, 0xFD]);
    assert!(system.load_rom_from_buffer(&other, "other.o"));
    assert!(matches!(
        system.load_state(&data),
        Err(StateError::RomCrc { .. })
    ));
}

#[test]
fn test_failed_load_keeps_current_state() {
    let mut system = system_with_cart();
    let mut fb = vec![0u8; frame_buffer_len(PixelFormat::Rgb565)];
    run_one_frame(&mut system, &mut fb);

    let mut good = Vec::new();
    system.save_state(&mut good, false).unwrap();

    let mut bad = good.clone();
    let header_start = bad.len() - HEADER_SIZE;
    bad[header_start] ^= 0xFF;
    assert!(system.load_state(&bad).is_err());

    // The machine still serializes to the same image.
    let mut after = Vec::new();
    system.save_state(&mut after, false).unwrap();
    assert_eq!(without_timestamp(&good), without_timestamp(&after));
}

#[test]
fn test_save_without_media_refuses() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let mut data = Vec::new();
    assert!(matches!(
        system.save_state(&mut data, false),
        Err(StateError::NotReady)
    ));
}
