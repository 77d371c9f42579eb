use std::io;

use super::Mikey;
use crate::core::state::{StateReader, StateWriter};

impl Mikey {
    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        for t in &self.timers {
            w.u8(t.backup)?;
            w.u8(t.control_a)?;
            w.u8(t.counter)?;
            w.u8(t.control_b)?;
            w.u32(t.accum_cycles)?;
            w.u32(t.period_cycles)?;
            w.u32(t.pending_ticks)?;
        }

        for c in &self.audio {
            w.u8(c.volume)?;
            w.u8(c.feedback)?;
            w.i8(c.output)?;
            w.u8(c.lfsr_low)?;
            w.u8(c.backup)?;
            w.u8(c.control)?;
            w.u8(c.counter)?;
            w.u8(c.other)?;
            w.u32(c.accum_cycles)?;
            w.u32(c.period_cycles)?;
            w.u32(c.pending_ticks)?;
            w.u16(c.lfsr)?;
            w.u16(c.taps_mask)?;
            w.bool(c.mix)?;
        }

        for color in &self.colors {
            w.u8(color.green)?;
            w.u8(color.bluered)?;
        }

        w.u8(self.atten_a)?;
        w.u8(self.atten_b)?;
        w.u8(self.atten_c)?;
        w.u8(self.atten_d)?;
        w.u8(self.mpan)?;
        w.u8(self.mstereo)?;

        w.u8(self.sysctl1)?;
        w.u8(self.iodir)?;
        w.u8(self.iodat)?;
        w.u8(self.sdoneack)?;
        w.u8(self.cpusleep)?;
        w.u8(self.dispctl)?;
        w.u8(self.pbkup)?;
        w.u16(self.dispadr.value())?;

        w.u8(self.irq_pending)?;
        w.u8(self.irq_mask)?;
        w.bool(self.frame_ready)?;
        w.u32(self.render_line)?;
        w.u16(self.dispadr_latch)?;
        w.bool(self.rest)?;

        self.uart.save_state(w)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        for t in self.timers.iter_mut() {
            t.backup = r.u8()?;
            t.control_a = r.u8()?;
            t.counter = r.u8()?;
            t.control_b = r.u8()?;
            t.accum_cycles = r.u32()?;
            t.period_cycles = r.u32()?;
            t.pending_ticks = r.u32()?;
        }

        for c in self.audio.iter_mut() {
            c.volume = r.u8()?;
            c.feedback = r.u8()?;
            c.output = r.i8()?;
            c.lfsr_low = r.u8()?;
            c.backup = r.u8()?;
            c.control = r.u8()?;
            c.counter = r.u8()?;
            c.other = r.u8()?;
            c.accum_cycles = r.u32()?;
            c.period_cycles = r.u32()?;
            c.pending_ticks = r.u32()?;
            c.lfsr = r.u16()?;
            c.taps_mask = r.u16()?;
            c.mix = r.bool()?;
        }

        for color in self.colors.iter_mut() {
            color.green = r.u8()?;
            color.bluered = r.u8()?;
        }

        self.atten_a = r.u8()?;
        self.atten_b = r.u8()?;
        self.atten_c = r.u8()?;
        self.atten_d = r.u8()?;
        self.mpan = r.u8()?;
        self.mstereo = r.u8()?;

        self.sysctl1 = r.u8()?;
        self.iodir = r.u8()?;
        self.iodat = r.u8()?;
        self.sdoneack = r.u8()?;
        self.cpusleep = r.u8()?;
        self.dispctl = r.u8()?;
        self.pbkup = r.u8()?;
        self.dispadr.set_value(r.u16()?);

        self.irq_pending = r.u8()?;
        self.irq_mask = r.u8()?;
        self.frame_ready = r.bool()?;
        self.render_line = r.u32()?;
        self.dispadr_latch = r.u16()?;
        self.rest = r.bool()?;

        self.uart.load_state(r)?;
        Ok(())
    }
}
