use std::io;

use super::M65C02;
use crate::core::state::{StateReader, StateWriter};

impl M65C02 {
    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.u8(self.a)?;
        w.u8(self.x)?;
        w.u8(self.y)?;
        w.u8(self.s)?;
        w.u8(self.p)?;
        w.u16(self.pc)?;
        w.bool(self.halted)?;
        w.bool(self.irq_asserted)?;
        w.bool(self.irq_pending)?;
        w.bool(self.nmi_pending)?;
        w.bool(self.nmi_previous)?;
        w.bool(self.stream_open)?;
        w.u64(self.total_ticks)?;
        w.u32(self.last_ticks)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        self.a = r.u8()?;
        self.x = r.u8()?;
        self.y = r.u8()?;
        self.s = r.u8()?;
        self.p = r.u8()?;
        self.pc = r.u16()?;
        self.halted = r.bool()?;
        self.irq_asserted = r.bool()?;
        self.irq_pending = r.bool()?;
        self.nmi_pending = r.bool()?;
        self.nmi_previous = r.bool()?;
        self.stream_open = r.bool()?;
        self.total_ticks = r.u64()?;
        self.last_ticks = r.u32()?;
        Ok(())
    }
}
