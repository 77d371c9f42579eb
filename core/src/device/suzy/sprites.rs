//! The sprite engine.
//!
//! `sprites_go` runs the entire SCB list to completion inside the SPRGO
//! write. Pixel streams are line-packed: each line record starts with the
//! byte distance to the next record (0 ends the sprite, 1 ends the current
//! quadrant) and the payload is read MSB-first through a bit-serial shift
//! register, either as raw pens or as {literal,count} packets.

use super::{QuadDir, Suzy};
use crate::core::CycleBank;
use crate::core::cycles::CYCLES_SUZY_READ;
use crate::device::lcd::{SCREEN_HEIGHT, SCREEN_WIDTH};

// SPRCTL0: bpp[7:6], hflip[5], vflip[4], type[2:0]
const SPRCTL0_HFLIP: u8 = 0x20;
const SPRCTL0_VFLIP: u8 = 0x10;

// SPRCTL1: literal[7], reload depth[5:4], reuse palette[3], skip[2],
// start up[1], start left[0]
const SPRCTL1_LITERAL: u8 = 0x80;
const SPRCTL1_REUSE_PALETTE: u8 = 0x08;
const SPRCTL1_SKIP: u8 = 0x04;

// SPRCOLL: bit 5 disables collision for this sprite, low nibble is the
// collision number deposited into the collision buffer.
const SPRCOLL_DISABLE: u8 = 0x20;
const SPRCOLL_NUMBER_MASK: u8 = 0x0F;

// Sprite types, SPRCTL0[2:0].
const TYPE_BACKGROUND: u8 = 0;
const TYPE_BACKNONCOLL: u8 = 1;
const TYPE_BOUNDARYSHADOW: u8 = 2;
const TYPE_BOUNDARY: u8 = 3;
const TYPE_NONCOLL: u8 = 5;
const TYPE_XOR: u8 = 6;

/// Malformed lists have no terminator; stop after this many SCBs.
const SCB_WALK_LIMIT: u32 = 1024;

const BYTES_PER_VRAM_LINE: u16 = (SCREEN_WIDTH / 2) as u16;

/// Direction table indexed by [start quadrant][flip bits][quadrant step].
///
/// Drawing starts in the SCB's start quadrant and rotates through the fixed
/// sequence SE, NE, NW, SW; the flip bits mirror the whole pattern.
pub(super) fn compute_quad_lut() -> [[[QuadDir; 4]; 4]; 4] {
    // dx/dy per quadrant in drawing order: SE, NE, NW, SW.
    const BASE: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

    let mut lut = [[[QuadDir::default(); 4]; 4]; 4];
    for start_bits in 0..4usize {
        let start_left = start_bits & 1 != 0;
        let start_up = start_bits & 2 != 0;
        let start_index = match (start_left, start_up) {
            (false, false) => 0, // SE
            (false, true) => 1,  // NE
            (true, true) => 2,   // NW
            (true, false) => 3,  // SW
        };

        for flip in 0..4usize {
            let vflip = flip & 1 != 0;
            let hflip = flip & 2 != 0;

            for step in 0..4usize {
                let (mut dx, mut dy) = BASE[(start_index + step) % 4];
                if hflip {
                    dx = -dx;
                }
                if vflip {
                    dy = -dy;
                }
                lut[start_bits][flip][step] = QuadDir { dx, dy };
            }
        }
    }
    lut
}

impl Suzy {
    /// Walk the SCB list and render every sprite, then clear SPRGO bit 0
    /// and charge the consumed bus cycles.
    pub fn sprites_go(&mut self, ram: &mut [u8; 0x10000], bank: &mut CycleBank) {
        self.mem_accesses = 0;

        let mut scb = self.scbnext.value();
        let mut walked = 0;

        while scb & 0xFF00 != 0 {
            walked += 1;
            if walked > SCB_WALK_LIMIT {
                log::warn!("sprite list did not terminate, stopping at {scb:04X}");
                break;
            }

            self.scbadr.set_value(scb);
            self.sprctl0 = self.blit_read(ram, scb);
            self.sprctl1 = self.blit_read(ram, scb.wrapping_add(1));
            self.sprcoll = self.blit_read(ram, scb.wrapping_add(2));
            let next = self.blit_read_word(ram, scb.wrapping_add(3));
            self.scbnext.set_value(next);

            if self.sprctl1 & SPRCTL1_SKIP == 0 {
                self.load_scb_fields(ram, scb);
                self.render_sprite(ram);
            }

            scb = next;
        }

        self.sprgo &= !0x01;
        bank.inject(self.mem_accesses * CYCLES_SUZY_READ);
    }

    fn load_scb_fields(&mut self, ram: &[u8; 0x10000], scb: u16) {
        let data_ptr = self.blit_read_word(ram, scb.wrapping_add(5));
        self.sprdline.set_value(data_ptr);
        let hpos = self.blit_read_word(ram, scb.wrapping_add(7));
        self.hposstrt.set_value(hpos);
        let vpos = self.blit_read_word(ram, scb.wrapping_add(9));
        self.vposstrt.set_value(vpos);

        let reload_depth = (self.sprctl1 >> 4) & 0x03;
        let mut pen_base = scb.wrapping_add(11);

        if reload_depth >= 1 {
            let hsiz = self.blit_read_word(ram, scb.wrapping_add(11));
            self.sprhsiz.set_value(hsiz);
            let vsiz = self.blit_read_word(ram, scb.wrapping_add(13));
            self.sprvsiz.set_value(vsiz);
            pen_base = scb.wrapping_add(15);
        }
        if reload_depth >= 2 {
            let stretch = self.blit_read_word(ram, scb.wrapping_add(15));
            self.stretch.set_value(stretch);
            pen_base = scb.wrapping_add(17);
        }
        if reload_depth == 3 {
            let tilt = self.blit_read_word(ram, scb.wrapping_add(17));
            self.tilt.set_value(tilt);
            pen_base = scb.wrapping_add(19);
        }

        if self.sprctl1 & SPRCTL1_REUSE_PALETTE == 0 {
            for i in 0..8u16 {
                let byte = self.blit_read(ram, pen_base.wrapping_add(i));
                self.pen_map[(i as usize) << 1] = byte >> 4;
                self.pen_map[((i as usize) << 1) + 1] = byte & 0x0F;
            }
        }
    }

    fn render_sprite(&mut self, ram: &mut [u8; 0x10000]) {
        let sprctl0 = self.sprctl0;
        let sprctl1 = self.sprctl1;

        let bpp = ((sprctl0 >> 6) & 0x03) as u32 + 1;
        let literal_only = sprctl1 & SPRCTL1_LITERAL != 0;
        let sprite_type = sprctl0 & 0x07;
        let start_quad = (sprctl1 & 0x03) as usize;
        let flip = {
            let vflip = sprctl0 & SPRCTL0_VFLIP != 0;
            let hflip = sprctl0 & SPRCTL0_HFLIP != 0;
            (vflip as usize) | ((hflip as usize) << 1)
        };

        let hpos = self.hposstrt.value() as i32;
        let vpos = self.vposstrt.value() as i32;
        self.sprvpos.set_value(vpos as u16);
        self.tiltacum.set_value(0);

        let mut collision_seen: u8 = 0;
        let mut collided = false;
        let mut data_ptr = self.sprdline.value();

        'quadrants: for step in 0..4 {
            let dir = self.quad_lut[start_quad][flip][step];
            let (dx, dy) = (dir.dx, dir.dy);

            let mut cur_y = if dy < 0 { vpos - 1 } else { vpos };
            self.vsizacum.set_value(self.vsizoff.value() & 0x00FF);

            loop {
                let offset = self.blit_read(ram, data_ptr);
                self.sprdoff.set_value(offset as u16);

                if offset == 0 {
                    // End of sprite.
                    break 'quadrants;
                }
                if offset == 1 {
                    // End of quadrant.
                    data_ptr = data_ptr.wrapping_add(1);
                    self.sprdline.set_value(data_ptr);
                    break;
                }

                let data_begin = data_ptr.wrapping_add(1);
                let data_end = data_ptr.wrapping_add(offset as u16);

                // Vertical scale: integer carries out of the accumulator
                // become screen rows for this source line.
                let vacc = self.vsizacum.value() as u32 + self.sprvsiz.value() as u32;
                let repeats = vacc >> 8;
                self.vsizacum.set_value((vacc & 0xFF) as u16);

                for _ in 0..repeats {
                    let tilt_shift = (self.tiltacum.value() as i16 >> 8) as i32;
                    let x0 = if dx < 0 { hpos - 1 } else { hpos } + tilt_shift;

                    self.draw_line(
                        ram,
                        data_begin,
                        data_end,
                        x0,
                        cur_y,
                        dx,
                        bpp,
                        literal_only,
                        sprite_type,
                        &mut collision_seen,
                        &mut collided,
                    );

                    cur_y += dy;

                    let tiltacum = self.tiltacum.value().wrapping_add(self.tilt.value());
                    self.tiltacum.set_value(tiltacum);
                }

                // Stretch grows the horizontal multiplier per source line;
                // with VStretch set it grows the vertical one too.
                let hsiz = self.sprhsiz.value().wrapping_add(self.stretch.value());
                self.sprhsiz.set_value(hsiz);
                if self.vstretch {
                    let vsiz = self.sprvsiz.value().wrapping_add(self.stretch.value());
                    self.sprvsiz.set_value(vsiz);
                }

                data_ptr = data_end;
                self.sprdline.set_value(data_ptr);
            }
        }

        if collided {
            let depository = self.scbadr.value().wrapping_add(self.colloff.value());
            self.blit_write(ram, depository, collision_seen);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_line(
        &mut self,
        ram: &mut [u8; 0x10000],
        data_begin: u16,
        data_end: u16,
        x0: i32,
        y: i32,
        dx: i32,
        bpp: u32,
        literal_only: bool,
        sprite_type: u8,
        collision_seen: &mut u8,
        collided: &mut bool,
    ) {
        self.shift_reset(ram, data_begin);
        let mut x = x0;
        let mut hsizacum = (self.hsizoff.value() & 0x00FF) as u32;
        let hsiz = self.sprhsiz.value() as u32;

        let mut emit = |suzy: &mut Self, ram: &mut [u8; 0x10000], pen: u8| {
            hsizacum += hsiz;
            let mut width = hsizacum >> 8;
            hsizacum &= 0xFF;
            while width > 0 {
                suzy.draw_pixel(ram, x, y, pen, sprite_type, collision_seen, collided);
                x += dx;
                width -= 1;
            }
        };

        if literal_only {
            while self.shift_addr < data_end {
                let index = self.shift_get_bits(ram, bpp, data_end);
                let pen = self.pen_map[(index & 0x0F) as usize];
                emit(self, ram, pen);
            }
        } else {
            while self.shift_addr < data_end {
                // A zero 5-bit header terminates the line early.
                if self.shift_peek5(ram, data_end) == 0 {
                    let _ = self.shift_get_bits(ram, 5, data_end);
                    break;
                }

                let is_literal = self.shift_get_bits(ram, 1, data_end) != 0;
                let count = self.shift_get_bits(ram, 4, data_end) + 1;

                if is_literal {
                    for _ in 0..count {
                        let index = self.shift_get_bits(ram, bpp, data_end);
                        let pen = self.pen_map[(index & 0x0F) as usize];
                        emit(self, ram, pen);
                    }
                } else {
                    let index = self.shift_get_bits(ram, bpp, data_end);
                    let pen = self.pen_map[(index & 0x0F) as usize];
                    for _ in 0..count {
                        emit(self, ram, pen);
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_pixel(
        &mut self,
        ram: &mut [u8; 0x10000],
        x: i32,
        y: i32,
        pen: u8,
        sprite_type: u8,
        collision_seen: &mut u8,
        collided: &mut bool,
    ) {
        if pen_is_transparent(pen, sprite_type) {
            return;
        }

        // HOFF/VOFF locate the visible window in world coordinates.
        let eff_x = x - self.hoff.value() as i32;
        let eff_y = y - self.voff.value() as i32;
        if !(0..SCREEN_WIDTH as i32).contains(&eff_x)
            || !(0..SCREEN_HEIGHT as i32).contains(&eff_y)
        {
            return;
        }

        let line_offset = (eff_y as u16) * BYTES_PER_VRAM_LINE + (eff_x as u16 >> 1);
        let high_nibble = eff_x & 1 == 0;

        let vid_addr = self.vidbas.value().wrapping_add(line_offset);
        self.vidadr.set_value(vid_addr);
        let old = self.blit_read(ram, vid_addr);
        let new = if sprite_type == TYPE_XOR {
            if high_nibble {
                old ^ (pen << 4)
            } else {
                old ^ (pen & 0x0F)
            }
        } else if high_nibble {
            (old & 0x0F) | (pen << 4)
        } else {
            (old & 0xF0) | (pen & 0x0F)
        };
        self.blit_write(ram, vid_addr, new);

        if self.collision_enabled() && type_collides(sprite_type) {
            let coll_addr = self.collbas.value().wrapping_add(line_offset);
            self.colladr.set_value(coll_addr);

            let old = self.blit_read(ram, coll_addr);
            let old_nibble = if high_nibble { old >> 4 } else { old & 0x0F };
            let number = self.sprcoll & SPRCOLL_NUMBER_MASK;
            let new_nibble = old_nibble.max(number);
            let new = if high_nibble {
                (old & 0x0F) | (new_nibble << 4)
            } else {
                (old & 0xF0) | new_nibble
            };
            self.blit_write(ram, coll_addr, new);

            *collided = true;
            if old_nibble > 0 {
                *collision_seen = (*collision_seen).max(old_nibble);
            }
        }
    }

    fn collision_enabled(&self) -> bool {
        !self.no_collide && self.sprcoll & SPRCOLL_DISABLE == 0
    }

    // ---- Blit RAM port (every access is a counted bus cycle) ----

    fn blit_read(&mut self, ram: &[u8; 0x10000], address: u16) -> u8 {
        self.mem_accesses += 1;
        ram[address as usize]
    }

    fn blit_read_word(&mut self, ram: &[u8; 0x10000], address: u16) -> u16 {
        let low = self.blit_read(ram, address);
        let high = self.blit_read(ram, address.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    fn blit_write(&mut self, ram: &mut [u8; 0x10000], address: u16, value: u8) {
        self.mem_accesses += 1;
        ram[address as usize] = value;
    }

    // ---- Bit-serial shift register ----

    fn shift_reset(&mut self, ram: &[u8; 0x10000], address: u16) {
        self.shift_addr = address;
        self.shift_cur = self.blit_read(ram, address);
        self.shift_bit = 7;
    }

    /// Read `n` bits MSB-first, clamping at `stop_addr`.
    fn shift_get_bits(&mut self, ram: &[u8; 0x10000], mut n: u32, stop_addr: u16) -> u32 {
        let mut value = 0;

        while n > 0 {
            if self.shift_bit < 0 {
                self.shift_addr = self.shift_addr.wrapping_add(1);
                if self.shift_addr >= stop_addr {
                    // Further reads would overrun the line record.
                    break;
                }
                self.shift_cur = self.blit_read(ram, self.shift_addr);
                self.shift_bit = 7;
            }

            value = (value << 1) | ((self.shift_cur >> self.shift_bit) & 1) as u32;
            self.shift_bit -= 1;
            n -= 1;
        }

        value
    }

    /// Look at the next 5 bits without consuming them.
    fn shift_peek5(&mut self, ram: &[u8; 0x10000], stop_addr: u16) -> u32 {
        let saved_addr = self.shift_addr;
        let saved_cur = self.shift_cur;
        let saved_bit = self.shift_bit;

        let value = self.shift_get_bits(ram, 5, stop_addr);

        self.shift_addr = saved_addr;
        self.shift_cur = saved_cur;
        self.shift_bit = saved_bit;

        value
    }
}

/// Which pens never reach the screen, per sprite type.
fn pen_is_transparent(pen: u8, sprite_type: u8) -> bool {
    let pen = pen & 0x0F;
    match sprite_type {
        TYPE_BACKGROUND | TYPE_BACKNONCOLL => false,
        TYPE_BOUNDARYSHADOW => pen == 0 || pen == 0x0E || pen == 0x0F,
        TYPE_BOUNDARY => pen == 0 || pen == 0x0F,
        _ => pen == 0,
    }
}

/// Which sprite types participate in collision detection.
fn type_collides(sprite_type: u8) -> bool {
    !matches!(sprite_type, TYPE_BACKNONCOLL | TYPE_NONCOLL)
}
