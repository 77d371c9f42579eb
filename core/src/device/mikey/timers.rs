//! The eight-stage timer side of the countdown lattice.
//!
//! Timer 0 paces horizontal blank, timer 2 vertical blank, timer 4 the UART
//! baud clock. A timer with prescaler index 7 is clocked by its
//! predecessor's borrow-out instead of the free-running prescaler.

use super::{
    MIKEY_TIM0BKUP, Mikey, TIMER_FORWARD_LINKS, TIMER_PERIOD_CYCLES,
};
use crate::core::CycleBank;
use crate::device::lcd::{LcdScreen, SCREEN_HEIGHT};

// control_a bits
const CTLA_IRQ_ENABLE: u8 = 0x80;
const CTLA_RESET_DONE: u8 = 0x40;
const CTLA_RELOAD: u8 = 0x10;
const CTLA_ENABLE: u8 = 0x08;
const CTLA_PRESCALER_MASK: u8 = 0x07;

// control_b bits
const CTLB_DONE: u8 = 0x08;
const CTLB_LAST_CLOCK: u8 = 0x04;
const CTLB_BORROW_IN: u8 = 0x02;
const CTLB_BORROW_OUT: u8 = 0x01;
/// Hardware-owned control_b bits a CPU write cannot touch.
const CTLB_WRITE_PRESERVED: u8 = 0x16;

#[derive(Clone, Copy, Debug)]
pub struct Timer {
    pub backup: u8,
    pub control_a: u8,
    pub counter: u8,
    pub control_b: u8,

    pub accum_cycles: u32,
    pub period_cycles: u32,
    pub pending_ticks: u32,
}

impl Default for Timer {
    fn default() -> Self {
        Self {
            backup: 0,
            control_a: 0,
            counter: 0,
            control_b: 0,
            accum_cycles: 0,
            period_cycles: TIMER_PERIOD_CYCLES[0],
            pending_ticks: 0,
        }
    }
}

impl Timer {
    pub fn enabled(&self) -> bool {
        self.control_a & CTLA_ENABLE != 0
    }

    pub fn one_shot(&self) -> bool {
        self.control_a & CTLA_RELOAD == 0
    }

    pub fn done(&self) -> bool {
        self.control_b & CTLB_DONE != 0
    }

    pub fn prescaler(&self) -> u8 {
        self.control_a & CTLA_PRESCALER_MASK
    }
}

impl Mikey {
    pub(super) fn read_timer(&self, address: u16) -> u8 {
        let reg = address & 3;
        let i = ((address - MIKEY_TIM0BKUP) >> 2) as usize & 7;
        let t = &self.timers[i];

        match reg {
            0 => t.backup,
            1 => t.control_a,
            2 => t.counter,
            _ => t.control_b,
        }
    }

    pub(super) fn write_timer(&mut self, address: u16, value: u8) {
        let reg = address & 3;
        let i = ((address - MIKEY_TIM0BKUP) >> 2) as usize & 7;
        let t = &mut self.timers[i];

        match reg {
            0 => t.backup = value,
            1 => {
                let old_control_a = t.control_a;
                t.control_a = value;
                t.period_cycles = TIMER_PERIOD_CYCLES[(value & CTLA_PRESCALER_MASK) as usize];

                // Re-sync only when the clock source changes or counting is
                // enabled from disabled; a plain IRQ-enable rewrite must not
                // slip the phase.
                let prescaler_changed =
                    old_control_a & CTLA_PRESCALER_MASK != value & CTLA_PRESCALER_MASK;
                let enable_rising =
                    old_control_a & CTLA_ENABLE == 0 && value & CTLA_ENABLE != 0;
                if prescaler_changed || enable_rising {
                    t.accum_cycles = 0;
                    t.pending_ticks = 0;
                }

                if value & CTLA_IRQ_ENABLE != 0 {
                    self.irq_mask |= 1 << i;
                } else {
                    self.irq_mask &= !(1 << i);
                }

                // RESET TIMER DONE is level-triggered.
                if value & CTLA_RESET_DONE != 0 {
                    self.timers[i].control_b &= !CTLB_DONE;
                }
            }
            2 => {
                t.counter = value;
                t.accum_cycles = 0;
                t.pending_ticks = 0;
            }
            _ => {
                t.control_b = (t.control_b & CTLB_WRITE_PRESERVED) | (value & !CTLB_WRITE_PRESERVED);
            }
        }
    }

    pub(super) fn update_timers(
        &mut self,
        cycles: u32,
        ram: &[u8],
        lcd: &mut LcdScreen,
        bank: &mut CycleBank,
    ) {
        for i in 0..8 {
            if !self.timers[i].enabled() {
                continue;
            }

            // Transient status bits are rebuilt on every update.
            self.timers[i].control_b &= !(CTLB_BORROW_OUT | CTLB_BORROW_IN | CTLB_LAST_CLOCK);

            if self.timers[i].control_a & CTLA_RESET_DONE != 0 {
                self.timers[i].control_b &= !CTLB_DONE;
            }

            let one_shot = self.timers[i].one_shot();
            if one_shot && self.timers[i].done() {
                continue;
            }

            let link = TIMER_FORWARD_LINKS[i];

            let mut tick;
            if self.timers[i].period_cycles == 0 {
                // Linked: consume the ticks queued by the predecessor.
                tick = self.timers[i].pending_ticks;
                self.timers[i].pending_ticks = 0;
            } else {
                let t = &mut self.timers[i];
                t.accum_cycles += cycles;
                tick = t.accum_cycles / t.period_cycles;
                t.accum_cycles -= tick * t.period_cycles;
            }

            if tick > 0 {
                self.timers[i].control_b |= CTLB_BORROW_IN;
            }

            while tick > 0 {
                tick -= 1;

                if self.timers[i].counter > 0 {
                    self.timers[i].counter -= 1;
                    if self.timers[i].counter == 0 {
                        self.timers[i].control_b |= CTLB_LAST_CLOCK;
                    }
                    continue;
                }

                // Borrow out on the tick after last-clock.
                self.timers[i].control_b |= CTLB_BORROW_OUT;

                match link {
                    0..=7 => {
                        let l = link as usize;
                        self.timers[l].pending_ticks += 1;
                        self.timers[l].control_b |= CTLB_BORROW_IN;
                    }
                    8 => {
                        self.audio[0].pending_ticks += 1;
                        self.audio[0].other |= CTLB_BORROW_IN;
                    }
                    _ => {
                        if i == 4 {
                            self.uart.baud_tick();
                        }
                    }
                }

                if !one_shot {
                    self.timers[i].counter = self.timers[i].backup;
                }

                self.timers[i].control_b |= CTLB_DONE;

                // IRQ on borrow, except timer 4 whose slot belongs to the UART.
                if self.timers[i].control_a & CTLA_IRQ_ENABLE != 0 && i != 4 {
                    self.irq_pending |= 1 << i;
                }

                if i == 0 {
                    self.horizontal_blank(ram, lcd, bank);
                } else if i == 2 {
                    self.vertical_blank();
                }

                if one_shot && self.timers[i].done() {
                    break;
                }
            }

            if i == 4 {
                self.relevel_uart_irq();
            }
        }
    }

    /// Timer 0 borrow: advance to the next scan line. The line number is
    /// derived from timer 2's countdown, which still holds the previous
    /// line's value at this point.
    fn horizontal_blank(&mut self, ram: &[u8], lcd: &mut LcdScreen, bank: &mut CycleBank) {
        let t2_counter = self.timers[2].counter;
        let t2_backup = self.timers[2].backup;
        let line = 101 - t2_counter as i32;

        if (0..SCREEN_HEIGHT as i32).contains(&line) {
            lcd.set_vblank(false);
            if self.dispctl & 0x01 != 0 {
                if line == 0 {
                    lcd.first_dma(self.dispadr_latch, ram, bank);
                }
                lcd.reset_line(line as u32);
            } else {
                lcd.blank_line(line as u32, bank);
            }
        } else {
            lcd.set_vblank(true);
        }

        // Typically end of hcount 104.
        if t2_counter == t2_backup {
            self.rest = false;
        }
        // Typically end of hcount 103, start of the 3rd vblank line.
        else if t2_counter == t2_backup.wrapping_sub(1) {
            self.dispadr_latch = self.dispadr.value() & 0xFFFC;
        }
        // Typically end of hcount 101.
        else if t2_counter == t2_backup.wrapping_sub(3) {
            self.rest = true;
        }

        // End of the last vblank line.
        if t2_counter == t2_backup.wrapping_sub(2) {
            self.render_line = 0;
        } else {
            self.render_line += 1;
        }
    }

    /// Timer 2 borrow: the frame is complete.
    fn vertical_blank(&mut self) {
        self.frame_ready = true;
        self.render_line = 0;
    }
}
