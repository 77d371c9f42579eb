//! Mikey: timers, audio, interrupt controller, UART, display control and
//! the color DAC.
//!
//! # Register map ($FD00-$FDBF)
//!
//! | Range       | Block                                   |
//! |-------------|-----------------------------------------|
//! | $FD00-$FD1F | 8 timers x {BKUP, CTLA, CNT, CTLB}      |
//! | $FD20-$FD3F | 4 audio channels x 8 registers          |
//! | $FD40-$FD50 | attenuation, pan, stereo                |
//! | $FD80-$FD81 | INTRST / INTSET                         |
//! | $FD84-$FD97 | system control, I/O port, UART, display |
//! | $FDA0-$FDBF | GREEN / BLUERED palette registers       |

mod audio;
mod serialize;
mod timers;
mod uart;

pub use audio::AudioChannel;
pub use timers::Timer;
pub use uart::Uart;

use crate::core::CycleBank;
use crate::device::lcd::LcdScreen;

pub const MIKEY_TIM0BKUP: u16 = 0xFD00;
pub const MIKEY_TIM0CTLA: u16 = 0xFD01;
pub const MIKEY_TIM2BKUP: u16 = 0xFD08;
pub const MIKEY_TIM4CTLA: u16 = 0xFD11;
pub const MIKEY_TIM7CTLB: u16 = 0xFD1F;
pub const MIKEY_AUD0VOL: u16 = 0xFD20;
pub const MIKEY_AUD3MISC: u16 = 0xFD3F;
pub const MIKEY_ATTEN_A: u16 = 0xFD40;
pub const MIKEY_ATTEN_B: u16 = 0xFD41;
pub const MIKEY_ATTEN_C: u16 = 0xFD42;
pub const MIKEY_ATTEN_D: u16 = 0xFD43;
pub const MIKEY_MPAN: u16 = 0xFD44;
pub const MIKEY_MSTEREO: u16 = 0xFD50;
pub const MIKEY_INTRST: u16 = 0xFD80;
pub const MIKEY_INTSET: u16 = 0xFD81;
pub const MIKEY_MAGRDY0: u16 = 0xFD84;
pub const MIKEY_MAGRDY1: u16 = 0xFD85;
pub const MIKEY_AUDIN: u16 = 0xFD86;
pub const MIKEY_SYSCTL1: u16 = 0xFD87;
pub const MIKEY_MIKEYHREV: u16 = 0xFD88;
pub const MIKEY_MIKEYSREV: u16 = 0xFD89;
pub const MIKEY_IODIR: u16 = 0xFD8A;
pub const MIKEY_IODAT: u16 = 0xFD8B;
pub const MIKEY_SERCTL: u16 = 0xFD8C;
pub const MIKEY_SERDAT: u16 = 0xFD8D;
pub const MIKEY_SDONEACK: u16 = 0xFD90;
pub const MIKEY_CPUSLEEP: u16 = 0xFD91;
pub const MIKEY_DISPCTL: u16 = 0xFD92;
pub const MIKEY_PBKUP: u16 = 0xFD93;
pub const MIKEY_DISPADRL: u16 = 0xFD94;
pub const MIKEY_DISPADRH: u16 = 0xFD95;
pub const MIKEY_MTEST0: u16 = 0xFD9C;
pub const MIKEY_MTEST1: u16 = 0xFD9D;
pub const MIKEY_MTEST2: u16 = 0xFD9E;
pub const MIKEY_GREEN0: u16 = 0xFDA0;
pub const MIKEY_BLUERED0: u16 = 0xFDB0;
pub const MIKEY_BLUEREDF: u16 = 0xFDBF;

/// Prescaler index 0..6 -> period in master-clock cycles; 7 means linked.
pub const TIMER_PERIOD_CYCLES: [u32; 8] = [16, 32, 64, 128, 256, 512, 1024, 0];
/// Prescaler index 0..6 -> period in microseconds (for frame-time math).
pub const TIMER_PERIOD_US: [u32; 8] = [1, 2, 4, 8, 16, 32, 64, 0];

/// Countdown chain: timer N's borrow-out clocks `TIMER_FORWARD_LINKS[N]`.
/// -1 routes timer 4 to the UART and timer 6 nowhere; 8 is audio stage 0.
pub const TIMER_FORWARD_LINKS: [i32; 8] = [2, 3, 4, 5, -1, 7, -1, 8];
/// Audio stage N's borrow-out clocks stage N+1; -1 wraps back to timer 1.
pub const AUDIO_FORWARD_LINKS: [i32; 4] = [1, 2, 3, -1];
/// Who clocks a linked audio stage (for the mix cutoff); -1 is timer 7.
pub const AUDIO_BACKWARD_LINKS: [i32; 4] = [-1, 0, 1, 2];

/// Bit of `irq_pending` owned by the UART (timer 4 has no IRQ of its own).
const IRQ_UART_BIT: u8 = 4;

#[derive(Default, Clone, Copy)]
pub struct Color {
    pub green: u8,
    pub bluered: u8,
}

pub struct Mikey {
    pub timers: [Timer; 8],
    pub audio: [AudioChannel; 4],
    colors: [Color; 16],

    pub atten_a: u8,
    pub atten_b: u8,
    pub atten_c: u8,
    pub atten_d: u8,
    pub mpan: u8,
    pub mstereo: u8,

    sysctl1: u8,
    iodir: u8,
    iodat: u8,
    sdoneack: u8,
    cpusleep: u8,
    dispctl: u8,
    pbkup: u8,
    dispadr: crate::device::U16Reg,

    irq_pending: u8,
    irq_mask: u8,

    frame_ready: bool,
    render_line: u32,
    dispadr_latch: u16,
    rest: bool,

    pub uart: Uart,

    /// CPUSLEEP was written; the board picks this up and halts the CPU.
    sleep_requested: bool,

    debug_cycles: u32,
}

impl Mikey {
    pub fn new() -> Self {
        Self {
            timers: Default::default(),
            audio: Default::default(),
            colors: Default::default(),
            atten_a: 0,
            atten_b: 0,
            atten_c: 0,
            atten_d: 0,
            mpan: 0,
            mstereo: 0,
            sysctl1: 0,
            iodir: 0,
            iodat: 0,
            sdoneack: 0,
            cpusleep: 0,
            dispctl: 0,
            pbkup: 0,
            dispadr: Default::default(),
            irq_pending: 0,
            irq_mask: 0,
            frame_ready: false,
            render_line: 0,
            dispadr_latch: 0,
            rest: false,
            uart: Uart::new(),
            sleep_requested: false,
            debug_cycles: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advance Mikey by `cycles` master-clock ticks. Returns true exactly
    /// once per frame, on the tick where timer 2 latched end-of-frame.
    pub fn clock(
        &mut self,
        cycles: u32,
        ram: &[u8],
        lcd: &mut LcdScreen,
        bank: &mut CycleBank,
    ) -> bool {
        self.debug_cycles += cycles;

        lcd.update(cycles, ram, self.dispctl & 0x01 != 0, bank);
        self.update_timers(cycles, ram, lcd, bank);
        self.update_audio(cycles);

        let ret = self.frame_ready;
        if self.frame_ready {
            self.frame_ready = false;
            log::trace!("frame ready after {} cycles", self.debug_cycles);
            self.debug_cycles = 0;
        }
        ret
    }

    /// Level of the CPU IRQ line.
    pub fn irq_line(&self) -> bool {
        (self.irq_pending & self.irq_mask) != 0 || self.irq_pending & (1 << IRQ_UART_BIT) != 0
    }

    pub fn irq_pending(&self) -> u8 {
        self.irq_pending
    }

    pub fn dispctl(&self) -> u8 {
        self.dispctl
    }

    pub fn render_line(&self) -> u32 {
        self.render_line
    }

    pub fn dispadr_latch(&self) -> u16 {
        self.dispadr_latch
    }

    /// Edge-consumed by the board to put the CPU to sleep.
    pub fn take_sleep_request(&mut self) -> bool {
        std::mem::take(&mut self.sleep_requested)
    }

    fn relevel_uart_irq(&mut self) {
        if self.uart.irq_level() {
            self.irq_pending |= 1 << IRQ_UART_BIT;
        } else {
            self.irq_pending &= !(1 << IRQ_UART_BIT);
        }
    }

    pub fn read(&mut self, address: u16) -> u8 {
        match address {
            MIKEY_SERCTL => {
                let v = self.uart.read_control();
                self.relevel_uart_irq();
                v
            }
            MIKEY_SERDAT => {
                let v = self.uart.read_data();
                self.relevel_uart_irq();
                v
            }
            _ => self.peek(address),
        }
    }

    /// Side-effect-free read; also what the debugger sees.
    pub fn peek(&self, address: u16) -> u8 {
        if address < MIKEY_AUD0VOL {
            self.read_timer(address)
        } else if address < MIKEY_ATTEN_A {
            self.read_audio(address)
        } else if address <= MIKEY_MSTEREO {
            self.read_audio_extra(address)
        } else if (MIKEY_GREEN0..=MIKEY_BLUEREDF).contains(&address) {
            self.read_color(address)
        } else {
            match address {
                MIKEY_INTRST | MIKEY_INTSET => self.irq_pending,
                MIKEY_MAGRDY0 | MIKEY_MAGRDY1 => 0x00,
                MIKEY_AUDIN => 0x80,
                MIKEY_SYSCTL1 => 0xFF,
                MIKEY_MIKEYHREV => 0x01,
                MIKEY_MIKEYSREV => 0xFF,
                MIKEY_IODIR => 0xFF,
                MIKEY_IODAT => self.read_iodat(),
                MIKEY_SERCTL => self.uart.read_control(),
                MIKEY_SERDAT => self.uart.peek_data(),
                MIKEY_SDONEACK | MIKEY_CPUSLEEP | MIKEY_DISPCTL | MIKEY_PBKUP
                | MIKEY_DISPADRL | MIKEY_DISPADRH => {
                    log::debug!("read from write-only Mikey register {address:04X}");
                    0xFF
                }
                MIKEY_MTEST0 | MIKEY_MTEST1 | MIKEY_MTEST2 => 0xFF,
                _ => {
                    log::debug!("unhandled Mikey read at {address:04X}");
                    0xFF
                }
            }
        }
    }

    pub fn write(&mut self, address: u16, value: u8) {
        if address < MIKEY_AUD0VOL {
            self.write_timer(address, value);
        } else if address < MIKEY_ATTEN_A {
            self.write_audio(address, value);
        } else if address <= MIKEY_MSTEREO {
            self.write_audio_extra(address, value);
        } else if (MIKEY_GREEN0..=MIKEY_BLUEREDF).contains(&address) {
            self.write_color(address, value);
        } else {
            match address {
                MIKEY_INTRST => {
                    self.irq_pending &= !value;
                    // A still-asserted UART condition re-raises its bit.
                    self.relevel_uart_irq();
                }
                MIKEY_INTSET => self.irq_pending |= value,
                MIKEY_MAGRDY0 | MIKEY_MAGRDY1 | MIKEY_AUDIN => {
                    log::debug!("ignored write {value:02X} to {address:04X}");
                }
                MIKEY_SYSCTL1 => self.sysctl1 = value,
                MIKEY_MIKEYHREV | MIKEY_MIKEYSREV => {
                    log::debug!("ignored write {value:02X} to read-only {address:04X}");
                }
                MIKEY_IODIR => self.iodir = value,
                MIKEY_IODAT => self.iodat = value,
                MIKEY_SERCTL => {
                    self.uart.write_control(value);
                    self.relevel_uart_irq();
                }
                MIKEY_SERDAT => {
                    self.uart.write_data(value);
                    self.relevel_uart_irq();
                }
                MIKEY_SDONEACK => self.sdoneack = value,
                MIKEY_CPUSLEEP => {
                    self.cpusleep = value;
                    self.sleep_requested = true;
                }
                MIKEY_DISPCTL => self.dispctl = value,
                MIKEY_PBKUP => self.pbkup = value,
                MIKEY_DISPADRL => self.dispadr.write_low(value),
                MIKEY_DISPADRH => self.dispadr.write_high(value),
                MIKEY_MTEST0 | MIKEY_MTEST1 | MIKEY_MTEST2 => {
                    log::debug!("ignored write {value:02X} to test register {address:04X}");
                }
                _ => {
                    log::debug!("unhandled Mikey write {value:02X} at {address:04X}");
                }
            }
        }
    }

    /// I/O port input mux: driven outputs read back their latch; bit 3 is
    /// gated by the REST signal, bit 2 (cart sense) always reads high.
    fn read_iodat(&self) -> u8 {
        let mut ret = 0x00;
        for bit in [0u8, 1, 2, 4] {
            if self.iodir & (1 << bit) != 0 && self.iodat & (1 << bit) != 0 {
                ret |= 1 << bit;
            }
        }
        if self.iodir & 0x08 != 0 && self.iodat & 0x08 != 0 && self.rest {
            ret |= 0x08;
        }
        ret | 0x04
    }

    pub fn sysctl1(&self) -> u8 {
        self.sysctl1
    }

    pub fn iodir(&self) -> u8 {
        self.iodir
    }

    pub fn iodat(&self) -> u8 {
        self.iodat
    }

    // ---- Color DAC ----

    fn read_color(&self, address: u16) -> u8 {
        let index = (address & 0xF) as usize;
        if address < MIKEY_BLUERED0 {
            self.colors[index].green
        } else {
            self.colors[index].bluered
        }
    }

    fn write_color(&mut self, address: u16, value: u8) {
        let index = (address & 0xF) as usize;
        if address < MIKEY_BLUERED0 {
            self.colors[index].green = value;
        } else {
            self.colors[index].bluered = value;
        }
    }

    /// 12-bit host palette entry: (G << 8) | (B << 4) | R.
    pub fn host_palette_entry(&self, index: usize) -> u16 {
        let color = &self.colors[index];
        (((color.green & 0x0F) as u16) << 8) | (color.bluered as u16)
    }
}

impl Default for Mikey {
    fn default() -> Self {
        Self::new()
    }
}
