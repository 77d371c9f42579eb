#![allow(dead_code)]

use glint_core::device::lcd::{PixelFormat, SCREEN_HEIGHT, SCREEN_WIDTH};
use glint_machines::lynx::{Key, LynxSystem};

/// A stand-in boot ROM: programs the display timers the way the production
/// ROM does (timer 0 backup $9E at 1 MHz, timer 2 counting 105 lines), then
/// spins. The content is not the production image, so the core flags it
/// Invalid but loads it.
pub fn test_bios() -> Vec<u8> {
    let mut bios = vec![0u8; 512];
    #[rustfmt::skip]
    let program: &[u8] = &[
        0xA9, 0x9E,             // LDA #$9E
        0x8D, 0x00, 0xFD,       // STA TIM0BKUP
        0x8D, 0x02, 0xFD,       // STA TIM0CNT
        0xA9, 0x18,             // LDA #$18 (enable + reload, 1 MHz)
        0x8D, 0x01, 0xFD,       // STA TIM0CTLA
        0xA9, 0x68,             // LDA #$68 (104)
        0x8D, 0x08, 0xFD,       // STA TIM2BKUP
        0x8D, 0x0A, 0xFD,       // STA TIM2CNT
        0xA9, 0x1F,             // LDA #$1F (enable + reload, linked)
        0x8D, 0x09, 0xFD,       // STA TIM2CTLA
        0x80, 0xFE,             // spin: BRA spin
    ];
    bios[..program.len()].copy_from_slice(program);

    // Vectors: everything lands at the entry point ($FE00).
    bios[0x1FA] = 0x00; // NMI
    bios[0x1FB] = 0xFE;
    bios[0x1FC] = 0x00; // RESET
    bios[0x1FD] = 0xFE;
    bios[0x1FE] = 0x00; // IRQ
    bios[0x1FF] = 0xFE;
    bios
}

/// Minimal LYNX-headed cartridge image around the given bank-0 payload.
pub fn lynx_cart(bank0: &[u8], page_size: u16) -> Vec<u8> {
    let mut image = vec![0u8; 64];
    image[..4].copy_from_slice(b"LYNX");
    image[4..6].copy_from_slice(&page_size.to_le_bytes());
    image[8..10].copy_from_slice(&1u16.to_le_bytes());
    image[10..18].copy_from_slice(b"TESTCART");
    image.extend_from_slice(bank0);
    image
}

/// BS93 homebrew image: the payload is copied to `load_address` and the CPU
/// starts there.
pub fn bs93_cart(load_address: u16, payload: &[u8]) -> Vec<u8> {
    let mut image = vec![0x80, 0x08];
    image.extend_from_slice(&load_address.to_be_bytes());
    image.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    image.extend_from_slice(b"BS93");
    image.extend_from_slice(payload);
    image
}

/// A booted system: test BIOS installed, reset done, ready to run frames.
/// Run with `RUST_LOG=debug` to watch the MMIO traffic.
pub fn booted_system(pixel_format: PixelFormat) -> LynxSystem {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut system = LynxSystem::new(pixel_format);
    system.load_bios_from_buffer(&test_bios());
    system.reset_rom(false);
    system
}

pub fn frame_buffer_len(pixel_format: PixelFormat) -> usize {
    SCREEN_WIDTH * SCREEN_HEIGHT * pixel_format.bytes_per_pixel()
}

pub fn run_one_frame(system: &mut LynxSystem, fb: &mut [u8]) -> (u32, bool) {
    let mut samples = [0i16; 4096];
    let mut sample_count = 0;
    let hit = system.run_to_vblank(fb, &mut samples, &mut sample_count, None);
    (sample_count, hit)
}

/// Press-and-release helper for input tests.
pub fn tap(system: &mut LynxSystem, key: Key) {
    system.key_pressed(key);
    system.key_released(key);
}
