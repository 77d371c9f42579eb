use glint_core::cpu::M65C02;
use glint_core::cpu::m65c02::{OPCODE_SIZES, OPCODE_TICKS};

mod common;
use common::TestBus;

fn cpu_at(bus: &mut TestBus, addr: u16, program: &[u8]) -> M65C02 {
    bus.load(addr, program);
    let mut cpu = M65C02::new();
    cpu.pc = addr;
    cpu.p = 0x24;
    cpu.s = 0xFF;
    cpu
}

#[test]
fn test_base_cycles_scale_by_tick_factor() {
    let cases: &[(&[u8], u8)] = &[
        (&[0xEA], 0xEA),             // NOP
        (&[0xA9, 0x01], 0xA9),       // LDA #
        (&[0xAD, 0x00, 0x30], 0xAD), // LDA abs
        (&[0x48], 0x48),             // PHA
        (&[0x4C, 0x00, 0x03], 0x4C), // JMP abs
    ];

    for &(program, opcode) in cases {
        let mut bus = TestBus::new();
        let mut cpu = cpu_at(&mut bus, 0x0200, program);
        let ticks = cpu.step(&mut bus);
        assert_eq!(
            ticks,
            OPCODE_TICKS[opcode as usize] as u32 * 5,
            "opcode {opcode:02X}"
        );
    }
}

#[test]
fn test_total_ticks_is_monotone() {
    let mut bus = TestBus::new();
    let mut cpu = cpu_at(&mut bus, 0x0200, &[0xEA; 16]);
    let mut total = 0;
    for _ in 0..16 {
        total += cpu.step(&mut bus) as u64;
        assert_eq!(cpu.total_ticks(), total);
        assert_eq!(cpu.last_ticks() as u64, 10);
    }
}

// =============================================================================
// Page-mode fetch discount
// =============================================================================

#[test]
fn test_page_mode_discount_on_sequential_fetches() {
    let mut bus = TestBus::new();
    // Two NOPs at a non-aligned offset inside one page.
    let mut cpu = cpu_at(&mut bus, 0x0201, &[0xEA, 0xEA]);
    cpu.set_page_mode_enabled(true);

    // First fetch opens the stream; no discount yet.
    let first = cpu.step(&mut bus);
    assert_eq!(first, 10);

    // Second fetch is sequential at offset & 0x0F != 0: one tick cheaper.
    let second = cpu.step(&mut bus);
    assert_eq!(second, 9);
}

#[test]
fn test_page_mode_no_discount_at_aligned_offset() {
    let mut bus = TestBus::new();
    let mut cpu = cpu_at(&mut bus, 0x020E, &[0xEA, 0xEA, 0xEA]);
    cpu.set_page_mode_enabled(true);

    cpu.step(&mut bus); // opens stream, fetch at $020E
    let at_0f = cpu.step(&mut bus); // fetch at $020F: discounted
    assert_eq!(at_0f, 9);
    let at_10 = cpu.step(&mut bus); // fetch at $0210: aligned, full price
    assert_eq!(at_10, 10);
}

#[test]
fn test_data_access_closes_the_stream() {
    let mut bus = TestBus::new();
    // LDA $30 at $0201, then NOP at $0203.
    let mut cpu = cpu_at(&mut bus, 0x0201, &[0xA5, 0x30, 0xEA]);
    cpu.set_page_mode_enabled(true);

    cpu.step(&mut bus);
    // The zero-page data read closed the stream; the following fetch opens
    // a new one and pays full price.
    let ticks = cpu.step(&mut bus);
    assert_eq!(ticks, 10);
}

#[test]
fn test_page_mode_disabled_by_default() {
    let mut bus = TestBus::new();
    let mut cpu = cpu_at(&mut bus, 0x0201, &[0xEA, 0xEA]);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 10);
}

#[test]
fn test_operand_fetches_earn_discounts() {
    let mut bus = TestBus::new();
    // NOP opens the stream, then LDA # with both bytes off-aligned.
    let mut cpu = cpu_at(&mut bus, 0x0201, &[0xEA, 0xA9, 0x55]);
    cpu.set_page_mode_enabled(true);
    cpu.step(&mut bus);
    // Opcode fetch at $0202 and operand at $0203: two discounts.
    let ticks = cpu.step(&mut bus);
    assert_eq!(ticks, 2 * 5 - 2);
    assert_eq!(cpu.a, 0x55);
}

#[test]
fn test_sizes_table_matches_documented_lengths() {
    // Spot checks against well-known encodings.
    assert_eq!(OPCODE_SIZES[0xEA], 1); // NOP
    assert_eq!(OPCODE_SIZES[0xA9], 2); // LDA #
    assert_eq!(OPCODE_SIZES[0xAD], 3); // LDA abs
    assert_eq!(OPCODE_SIZES[0x0F], 3); // BBR0 zp,rel
    assert_eq!(OPCODE_SIZES[0x20], 3); // JSR
}
