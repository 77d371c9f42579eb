use glint_core::core::{Bus, BusMaster};
use glint_core::device::lcd::PixelFormat;
use glint_machines::lynx::MAPCTL_ADDRESS;

mod common;
use common::{booted_system, test_bios};

const CPU: BusMaster = BusMaster::Cpu;

// =============================================================================
// MAPCTL
// =============================================================================

#[test]
fn test_mapctl_roundtrip() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();

    for value in [0x00u8, 0x01, 0x0F, 0x80, 0xFF] {
        bus.write(CPU, MAPCTL_ADDRESS, value);
        assert_eq!(bus.read(CPU, MAPCTL_ADDRESS), value, "value {value:02X}");
    }
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
}

#[test]
fn test_mapctl_reachable_with_everything_hidden() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();

    bus.write(CPU, MAPCTL_ADDRESS, 0x0F);
    // $FFF9 still answers as MAPCTL, not RAM.
    assert_eq!(bus.read(CPU, MAPCTL_ADDRESS), 0x0F);
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
    assert_eq!(bus.read(CPU, MAPCTL_ADDRESS), 0x00);
}

// =============================================================================
// Visibility redirection
// =============================================================================

#[test]
fn test_suzy_page_redirects_to_ram_when_hidden() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();

    // Visible: reads hit Suzy (TMPADR register, not RAM).
    bus.write(CPU, 0xFC00, 0x55);
    assert_eq!(bus.read(CPU, 0xFC00), 0x55);

    // Writes to the visible page never landed in RAM...
    bus.write(CPU, MAPCTL_ADDRESS, 0x01);
    let ram_byte = bus.read(CPU, 0xFC00);
    // ...so hidden reads see whatever RAM holds, and writes land in RAM.
    bus.write(CPU, 0xFC00, ram_byte.wrapping_add(1));
    assert_eq!(bus.read(CPU, 0xFC00), ram_byte.wrapping_add(1));

    // Back to visible: the Suzy register survived untouched.
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
    assert_eq!(bus.read(CPU, 0xFC00), 0x55);
}

#[test]
fn test_bios_reads_overlay_ram_writes_fall_through() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();
    let bios = test_bios();

    // Visible BIOS read.
    assert_eq!(bus.read(CPU, 0xFE00), bios[0]);

    // A write goes to the RAM underneath without disturbing the overlay.
    bus.write(CPU, 0xFE00, 0x77);
    assert_eq!(bus.read(CPU, 0xFE00), bios[0]);

    // Hide the BIOS: the RAM byte appears.
    bus.write(CPU, MAPCTL_ADDRESS, 0x04);
    assert_eq!(bus.read(CPU, 0xFE00), 0x77);
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
}

#[test]
fn test_vector_visibility_is_separate_from_bios() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();
    let bios = test_bios();

    // Vectors visible: $FFFC reads the BIOS reset vector.
    assert_eq!(bus.read(CPU, 0xFFFC), bios[0x1FC]);

    // Hide only the vectors (bit 3); BIOS at $FE00 stays visible.
    bus.write(CPU, 0xFFFC, 0x12); // lands in RAM
    bus.write(CPU, MAPCTL_ADDRESS, 0x08);
    assert_eq!(bus.read(CPU, 0xFFFC), 0x12);
    assert_eq!(bus.read(CPU, 0xFE00), bios[0]);
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
}

#[test]
fn test_fff8_behaves_as_ram() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();

    bus.write(CPU, 0xFFF8, 0xA5);
    assert_eq!(bus.read(CPU, 0xFFF8), 0xA5);
}

#[test]
fn test_last_page_below_fff8_follows_bios_bit() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();
    let bios = test_bios();

    // $FF00 maps into the second half of the 512-byte BIOS.
    assert_eq!(bus.read(CPU, 0xFF00), bios[0x100]);

    bus.write(CPU, 0xFF00, 0x3C);
    bus.write(CPU, MAPCTL_ADDRESS, 0x04);
    assert_eq!(bus.read(CPU, 0xFF00), 0x3C);
    bus.write(CPU, MAPCTL_ADDRESS, 0x00);
}

// =============================================================================
// Chip access through the map
// =============================================================================

#[test]
fn test_mikey_palette_visible_through_map() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();

    bus.write(CPU, 0xFDA0, 0x0A); // GREEN0
    bus.write(CPU, 0xFDB0, 0x5B); // BLUERED0
    assert_eq!(bus.read(CPU, 0xFDA0), 0x0A);
    assert_eq!(bus.read(CPU, 0xFDB0), 0x5B);

    // The host palette entry fuses the pair: (G << 8) | (B << 4) | R.
    assert_eq!(bus.mikey.host_palette_entry(0), 0x0A5B);
}

#[test]
fn test_suzy_read_charges_bus_cycles() {
    let mut system = booted_system(PixelFormat::Rgb565);
    let bus = system.bus_mut();
    bus.cycles.consume();

    let _ = bus.read(CPU, 0xFC00);
    assert_eq!(bus.cycles.consume(), 3);

    // Mikey accesses are free.
    let _ = bus.read(CPU, 0xFD00);
    assert_eq!(bus.cycles.consume(), 0);

    // Debugger traffic is free everywhere.
    let _ = bus.read(BusMaster::Debug, 0xFC00);
    assert_eq!(bus.cycles.consume(), 0);
}

#[test]
fn test_joystick_register_reflects_input() {
    let mut system = booted_system(PixelFormat::Rgb565);
    system.key_pressed(glint_machines::lynx::Key::A);

    let bus = system.bus_mut();
    assert_eq!(bus.read(CPU, 0xFCB0) & 0x01, 0x01);

    system.key_released(glint_machines::lynx::Key::A);
    let bus = system.bus_mut();
    assert_eq!(bus.read(CPU, 0xFCB0) & 0x01, 0x00);
}
