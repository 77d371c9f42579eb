//! The four audio channels: the back half of the countdown lattice.
//!
//! Each channel is a timer whose borrow-out clocks a 12-bit LFSR instead of
//! raising an IRQ. The LFSR's input bit selects between +volume and -volume
//! (or, in integrate mode, adds it into a clamped accumulator). Channel 3's
//! borrow-out links back to timer 1, closing the twelve-stage chain.

use super::{AUDIO_BACKWARD_LINKS, AUDIO_FORWARD_LINKS, MIKEY_AUD0VOL, Mikey, TIMER_PERIOD_CYCLES};

// control bits (mirror timer control_a, plus integrate)
const CTL_FEEDBACK7: u8 = 0x80;
const CTL_RESET_DONE: u8 = 0x40;
const CTL_INTEGRATE: u8 = 0x20;
const CTL_RELOAD: u8 = 0x10;
const CTL_ENABLE: u8 = 0x08;
const CTL_PRESCALER_MASK: u8 = 0x07;

// "other" register transient bits (mirror timer control_b)
const OTHER_DONE: u8 = 0x08;
const OTHER_LAST_CLOCK: u8 = 0x04;
const OTHER_BORROW_IN: u8 = 0x02;
const OTHER_BORROW_OUT: u8 = 0x01;

/// A channel whose full period is shorter than this many master-clock
/// cycles is running above the audible band; the mixer mutes it.
const MIX_CUTOFF_CYCLES: u32 = 32;

#[derive(Clone, Copy, Debug)]
pub struct AudioChannel {
    pub volume: u8,
    pub feedback: u8,
    pub output: i8,
    pub lfsr_low: u8,
    pub backup: u8,
    pub control: u8,
    pub counter: u8,
    pub other: u8,

    pub accum_cycles: u32,
    pub period_cycles: u32,
    pub pending_ticks: u32,
    pub lfsr: u16,
    pub taps_mask: u16,
    pub mix: bool,
}

impl Default for AudioChannel {
    fn default() -> Self {
        Self {
            volume: 0,
            feedback: 0,
            output: 0,
            lfsr_low: 0,
            backup: 0,
            control: 0,
            counter: 0,
            other: 0,
            accum_cycles: 0,
            period_cycles: TIMER_PERIOD_CYCLES[0],
            pending_ticks: 0,
            lfsr: 0,
            taps_mask: 0,
            mix: false,
        }
    }
}

impl AudioChannel {
    pub fn enabled(&self) -> bool {
        self.control & CTL_ENABLE != 0
    }

    pub fn one_shot(&self) -> bool {
        self.control & CTL_RELOAD == 0
    }

    pub fn done(&self) -> bool {
        self.other & OTHER_DONE != 0
    }

    /// Taps mask over the 12-bit LFSR:
    /// `feedback[5:0] | feedback[7:6] << 10 | control[7] << 7`.
    fn rebuild_taps_mask(&mut self) {
        let mut mask = (self.feedback & 0x3F) as u16;
        mask |= ((self.feedback & 0xC0) as u16) << 4;
        mask |= (self.control & CTL_FEEDBACK7) as u16;
        self.taps_mask = mask;
    }

    /// The 12-bit LFSR is reassembled from its CPU-visible halves:
    /// low 8 bits in `lfsr_low`, high 4 bits in `other[7:4]`.
    fn rebuild_lfsr(&mut self) {
        let mut lfsr = self.lfsr_low as u16;
        lfsr |= ((self.other & 0xF0) as u16) << 4;
        self.lfsr = lfsr;
    }

    fn advance_lfsr(&mut self) {
        let vol = self.volume as i8;
        let taps = self.lfsr & self.taps_mask;
        let xor_bit = (taps.count_ones() & 1) as u8;
        let data_in = xor_bit ^ 1;

        self.lfsr = ((self.lfsr << 1) & 0x0FFE) | data_in as u16;

        if self.control & CTL_INTEGRATE != 0 {
            let delta = if data_in != 0 { vol as i32 } else { -(vol as i32) };
            self.output = (self.output as i32 + delta).clamp(-128, 127) as i8;
        } else {
            let v = if data_in != 0 { vol as i32 } else { -(vol as i32) };
            self.output = v.clamp(-128, 127) as i8;
        }

        self.lfsr_low = (self.lfsr & 0x00FF) as u8;
        self.other = (self.other & 0x0F) | (((self.lfsr >> 4) & 0xF0) as u8);
    }
}

impl Mikey {
    pub(super) fn read_audio(&self, address: u16) -> u8 {
        let reg = address & 7;
        let i = ((address - MIKEY_AUD0VOL) >> 3) as usize & 3;
        let c = &self.audio[i];

        match reg {
            0 => c.volume,
            1 => c.feedback,
            2 => c.output as u8,
            3 => c.lfsr_low,
            4 => c.backup,
            5 => c.control,
            6 => c.counter,
            _ => c.other,
        }
    }

    pub(super) fn write_audio(&mut self, address: u16, value: u8) {
        let reg = address & 7;
        let i = ((address - MIKEY_AUD0VOL) >> 3) as usize & 3;
        let c = &mut self.audio[i];

        match reg {
            0 => c.volume = value,
            1 => {
                c.feedback = value;
                c.rebuild_taps_mask();
            }
            2 => c.output = value as i8,
            3 => {
                c.lfsr_low = value;
                c.rebuild_lfsr();
            }
            4 => {
                c.backup = value;
                self.calculate_cutoff(i);
            }
            5 => {
                let old_control = c.control;
                c.control = value;
                c.period_cycles = TIMER_PERIOD_CYCLES[(value & CTL_PRESCALER_MASK) as usize];

                let prescaler_changed =
                    old_control & CTL_PRESCALER_MASK != value & CTL_PRESCALER_MASK;
                let enable_rising = old_control & CTL_ENABLE == 0 && value & CTL_ENABLE != 0;
                if prescaler_changed || enable_rising {
                    c.accum_cycles = 0;
                    c.pending_ticks = 0;
                }

                if value & CTL_RESET_DONE != 0 {
                    c.other &= !OTHER_DONE;
                }

                c.rebuild_taps_mask();

                if prescaler_changed || enable_rising {
                    self.calculate_cutoff(i);
                }
            }
            6 => {
                c.counter = value;
                c.accum_cycles = 0;
                c.pending_ticks = 0;
            }
            _ => {
                c.other = value;
                c.rebuild_lfsr();
            }
        }
    }

    pub(super) fn read_audio_extra(&self, address: u16) -> u8 {
        match address {
            super::MIKEY_ATTEN_A => self.atten_a,
            super::MIKEY_ATTEN_B => self.atten_b,
            super::MIKEY_ATTEN_C => self.atten_c,
            super::MIKEY_ATTEN_D => self.atten_d,
            super::MIKEY_MPAN => self.mpan,
            super::MIKEY_MSTEREO => self.mstereo,
            _ => {
                log::debug!("unhandled audio-extra read at {address:04X}");
                0xFF
            }
        }
    }

    pub(super) fn write_audio_extra(&mut self, address: u16, value: u8) {
        match address {
            super::MIKEY_ATTEN_A => self.atten_a = value,
            super::MIKEY_ATTEN_B => self.atten_b = value,
            super::MIKEY_ATTEN_C => self.atten_c = value,
            super::MIKEY_ATTEN_D => self.atten_d = value,
            super::MIKEY_MPAN => self.mpan = value,
            super::MIKEY_MSTEREO => self.mstereo = value,
            _ => {
                log::debug!("unhandled audio-extra write {value:02X} at {address:04X}");
            }
        }
    }

    /// A channel clocked faster than the cutoff produces only ultrasonic
    /// flips; flag it so the mixer leaves it out.
    fn calculate_cutoff(&mut self, channel: usize) {
        let c = &self.audio[channel];

        let cycles = if c.period_cycles != 0 {
            (c.backup as u32 + 1) * c.period_cycles
        } else {
            let upstream = match AUDIO_BACKWARD_LINKS[channel] {
                link @ 0.. => {
                    let up = &self.audio[link as usize];
                    (up.backup as u32 + 1) * up.period_cycles
                }
                _ => {
                    let t7 = &self.timers[7];
                    (t7.backup as u32 + 1) * t7.period_cycles
                }
            };
            upstream * (c.backup as u32 + 1)
        };

        self.audio[channel].mix = cycles >= MIX_CUTOFF_CYCLES;
    }

    pub(super) fn update_audio(&mut self, cycles: u32) {
        for i in 0..4 {
            if !self.audio[i].enabled() {
                continue;
            }

            self.audio[i].other &= !(OTHER_BORROW_OUT | OTHER_BORROW_IN | OTHER_LAST_CLOCK);

            if self.audio[i].control & CTL_RESET_DONE != 0 {
                self.audio[i].other &= !OTHER_DONE;
            }

            let one_shot = self.audio[i].one_shot();
            if one_shot && self.audio[i].done() {
                continue;
            }

            let link = AUDIO_FORWARD_LINKS[i];

            let mut tick;
            if self.audio[i].period_cycles == 0 {
                tick = self.audio[i].pending_ticks;
                self.audio[i].pending_ticks = 0;
            } else {
                let c = &mut self.audio[i];
                c.accum_cycles += cycles;
                tick = c.accum_cycles / c.period_cycles;
                c.accum_cycles -= tick * c.period_cycles;
            }

            if tick > 0 {
                self.audio[i].other |= OTHER_BORROW_IN;
            }

            while tick > 0 {
                tick -= 1;

                if self.audio[i].counter > 0 {
                    self.audio[i].counter -= 1;
                    if self.audio[i].counter == 0 {
                        self.audio[i].other |= OTHER_LAST_CLOCK;
                    }
                    continue;
                }

                self.audio[i].other |= OTHER_BORROW_OUT;

                match link {
                    0.. => {
                        let l = link as usize;
                        self.audio[l].pending_ticks += 1;
                        self.audio[l].other |= OTHER_BORROW_IN;
                    }
                    _ => {
                        // Channel 3 links back to timer 1.
                        self.timers[1].pending_ticks += 1;
                        self.timers[1].control_b |= 0x02;
                    }
                }

                if !one_shot {
                    self.audio[i].counter = self.audio[i].backup;
                }

                self.audio[i].other |= OTHER_DONE;

                self.audio[i].advance_lfsr();

                if one_shot && self.audio[i].done() {
                    break;
                }
            }
        }
    }
}
