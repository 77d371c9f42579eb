use std::io;

use super::Suzy;
use crate::core::state::{StateReader, StateWriter};
use crate::device::U16Reg;

fn write_pair(w: &mut StateWriter<'_>, reg: U16Reg) -> io::Result<()> {
    w.u16(reg.value())
}

fn read_pair(r: &mut StateReader<'_>, reg: &mut U16Reg) -> io::Result<()> {
    reg.set_value(r.u16()?);
    Ok(())
}

impl Suzy {
    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        for reg in [
            self.tmpadr,
            self.tiltacum,
            self.hoff,
            self.voff,
            self.vidbas,
            self.collbas,
            self.vidadr,
            self.colladr,
            self.scbnext,
            self.sprdline,
            self.hposstrt,
            self.vposstrt,
            self.sprhsiz,
            self.sprvsiz,
            self.stretch,
            self.tilt,
            self.sprdoff,
            self.sprvpos,
            self.colloff,
            self.vsizacum,
            self.hsizoff,
            self.vsizoff,
            self.scbadr,
            self.procadr,
        ] {
            write_pair(w, reg)?;
        }

        w.bytes(&[
            self.mathd, self.mathc, self.mathb, self.matha, self.mathp, self.mathn, self.mathh,
            self.mathg, self.mathf, self.mathe, self.mathm, self.mathl, self.mathk, self.mathj,
        ])?;

        w.bytes(&[
            self.sprctl0,
            self.sprctl1,
            self.sprcoll,
            self.sprinit,
            self.suzybusen,
            self.sprgo,
        ])?;

        w.bool(self.sign_math)?;
        w.bool(self.accumulate)?;
        w.bool(self.no_collide)?;
        w.bool(self.vstretch)?;
        w.bool(self.lefthand)?;
        w.bool(self.sprite_stop)?;

        w.u32(self.math_busy_cycles)?;
        w.bool(self.mathbit)?;
        w.bool(self.last_carry)?;
        w.i8(self.sign_ab)?;
        w.i8(self.sign_cd)?;

        w.u8(self.joystick)?;
        w.u8(self.switches)?;
        w.bytes(&self.pen_map)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        for reg in [
            &mut self.tmpadr,
            &mut self.tiltacum,
            &mut self.hoff,
            &mut self.voff,
            &mut self.vidbas,
            &mut self.collbas,
            &mut self.vidadr,
            &mut self.colladr,
            &mut self.scbnext,
            &mut self.sprdline,
            &mut self.hposstrt,
            &mut self.vposstrt,
            &mut self.sprhsiz,
            &mut self.sprvsiz,
            &mut self.stretch,
            &mut self.tilt,
            &mut self.sprdoff,
            &mut self.sprvpos,
            &mut self.colloff,
            &mut self.vsizacum,
            &mut self.hsizoff,
            &mut self.vsizoff,
            &mut self.scbadr,
            &mut self.procadr,
        ] {
            read_pair(r, reg)?;
        }

        let mut math = [0u8; 14];
        r.bytes(&mut math)?;
        [
            self.mathd, self.mathc, self.mathb, self.matha, self.mathp, self.mathn, self.mathh,
            self.mathg, self.mathf, self.mathe, self.mathm, self.mathl, self.mathk, self.mathj,
        ] = math;

        let mut control = [0u8; 6];
        r.bytes(&mut control)?;
        [
            self.sprctl0,
            self.sprctl1,
            self.sprcoll,
            self.sprinit,
            self.suzybusen,
            self.sprgo,
        ] = control;

        self.sign_math = r.bool()?;
        self.accumulate = r.bool()?;
        self.no_collide = r.bool()?;
        self.vstretch = r.bool()?;
        self.lefthand = r.bool()?;
        self.sprite_stop = r.bool()?;

        self.math_busy_cycles = r.u32()?;
        self.mathbit = r.bool()?;
        self.last_carry = r.bool()?;
        self.sign_ab = r.i8()?;
        self.sign_cd = r.i8()?;

        self.joystick = r.u8()?;
        self.switches = r.u8()?;
        r.bytes(&mut self.pen_map)?;
        Ok(())
    }
}
