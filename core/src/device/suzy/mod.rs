//! Suzy: hardware math unit, sprite engine, cartridge read ports and the
//! joystick/switch aggregation registers.
//!
//! The sprite engine is atomic: the whole SCB list renders inside the SPRGO
//! write, and the bus cycles it consumed are charged to the cycle bank
//! afterwards. The math unit is asynchronous: results appear immediately but
//! SPRSYS reports busy until the modeled completion time has elapsed.

mod math;
mod serialize;
mod sprites;

use crate::device::U16Reg;

pub const SUZY_TMPADRL: u16 = 0xFC00;
pub const SUZY_TMPADRH: u16 = 0xFC01;
pub const SUZY_TILTACUML: u16 = 0xFC02;
pub const SUZY_TILTACUMH: u16 = 0xFC03;
pub const SUZY_HOFFL: u16 = 0xFC04;
pub const SUZY_HOFFH: u16 = 0xFC05;
pub const SUZY_VOFFL: u16 = 0xFC06;
pub const SUZY_VOFFH: u16 = 0xFC07;
pub const SUZY_VIDBASL: u16 = 0xFC08;
pub const SUZY_VIDBASH: u16 = 0xFC09;
pub const SUZY_COLLBASL: u16 = 0xFC0A;
pub const SUZY_COLLBASH: u16 = 0xFC0B;
pub const SUZY_VIDADRL: u16 = 0xFC0C;
pub const SUZY_VIDADRH: u16 = 0xFC0D;
pub const SUZY_COLLADRL: u16 = 0xFC0E;
pub const SUZY_COLLADRH: u16 = 0xFC0F;
pub const SUZY_SCBNEXTL: u16 = 0xFC10;
pub const SUZY_SCBNEXTH: u16 = 0xFC11;
pub const SUZY_SPRDLINEL: u16 = 0xFC12;
pub const SUZY_SPRDLINEH: u16 = 0xFC13;
pub const SUZY_HPOSSTRTL: u16 = 0xFC14;
pub const SUZY_HPOSSTRTH: u16 = 0xFC15;
pub const SUZY_VPOSSTRTL: u16 = 0xFC16;
pub const SUZY_VPOSSTRTH: u16 = 0xFC17;
pub const SUZY_SPRHSIZL: u16 = 0xFC18;
pub const SUZY_SPRHSIZH: u16 = 0xFC19;
pub const SUZY_SPRVSIZL: u16 = 0xFC1A;
pub const SUZY_SPRVSIZH: u16 = 0xFC1B;
pub const SUZY_STRETCHL: u16 = 0xFC1C;
pub const SUZY_STRETCHH: u16 = 0xFC1D;
pub const SUZY_TILTL: u16 = 0xFC1E;
pub const SUZY_TILTH: u16 = 0xFC1F;
pub const SUZY_SPRDOFFL: u16 = 0xFC20;
pub const SUZY_SPRDOFFH: u16 = 0xFC21;
pub const SUZY_SPRVPOSL: u16 = 0xFC22;
pub const SUZY_SPRVPOSH: u16 = 0xFC23;
pub const SUZY_COLLOFFL: u16 = 0xFC24;
pub const SUZY_COLLOFFH: u16 = 0xFC25;
pub const SUZY_VSIZACUML: u16 = 0xFC26;
pub const SUZY_VSIZACUMH: u16 = 0xFC27;
pub const SUZY_HSIZOFFL: u16 = 0xFC28;
pub const SUZY_HSIZOFFH: u16 = 0xFC29;
pub const SUZY_VSIZOFFL: u16 = 0xFC2A;
pub const SUZY_VSIZOFFH: u16 = 0xFC2B;
pub const SUZY_SCBADRL: u16 = 0xFC2C;
pub const SUZY_SCBADRH: u16 = 0xFC2D;
pub const SUZY_PROCADRL: u16 = 0xFC2E;
pub const SUZY_PROCADRH: u16 = 0xFC2F;
pub const SUZY_MATHD: u16 = 0xFC52;
pub const SUZY_MATHC: u16 = 0xFC53;
pub const SUZY_MATHB: u16 = 0xFC54;
pub const SUZY_MATHA: u16 = 0xFC55;
pub const SUZY_MATHP: u16 = 0xFC56;
pub const SUZY_MATHN: u16 = 0xFC57;
pub const SUZY_MATHH: u16 = 0xFC60;
pub const SUZY_MATHG: u16 = 0xFC61;
pub const SUZY_MATHF: u16 = 0xFC62;
pub const SUZY_MATHE: u16 = 0xFC63;
pub const SUZY_MATHM: u16 = 0xFC6C;
pub const SUZY_MATHL: u16 = 0xFC6D;
pub const SUZY_MATHK: u16 = 0xFC6E;
pub const SUZY_MATHJ: u16 = 0xFC6F;
pub const SUZY_SPRCTL0: u16 = 0xFC80;
pub const SUZY_SPRCTL1: u16 = 0xFC81;
pub const SUZY_SPRCOLL: u16 = 0xFC82;
pub const SUZY_SPRINIT: u16 = 0xFC83;
pub const SUZY_SUZYHREV: u16 = 0xFC88;
pub const SUZY_SUZYSREV: u16 = 0xFC89;
pub const SUZY_SUZYBUSEN: u16 = 0xFC90;
pub const SUZY_SPRGO: u16 = 0xFC91;
pub const SUZY_SPRSYS: u16 = 0xFC92;
pub const SUZY_JOYSTICK: u16 = 0xFCB0;
pub const SUZY_SWITCHES: u16 = 0xFCB1;
pub const SUZY_RCART0: u16 = 0xFCB2;
pub const SUZY_RCART1: u16 = 0xFCB3;
pub const SUZY_LEDS: u16 = 0xFCC0;
pub const SUZY_PPORTSTAT: u16 = 0xFCC2;
pub const SUZY_PPORTDATA: u16 = 0xFCC3;
pub const SUZY_HOWIE: u16 = 0xFCC4;

/// Per-quadrant pixel step directions.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuadDir {
    pub dx: i32,
    pub dy: i32,
}

pub struct Suzy {
    // Sprite engine register file (byte pairs)
    pub tmpadr: U16Reg,
    pub tiltacum: U16Reg,
    pub hoff: U16Reg,
    pub voff: U16Reg,
    pub vidbas: U16Reg,
    pub collbas: U16Reg,
    pub vidadr: U16Reg,
    pub colladr: U16Reg,
    pub scbnext: U16Reg,
    pub sprdline: U16Reg,
    pub hposstrt: U16Reg,
    pub vposstrt: U16Reg,
    pub sprhsiz: U16Reg,
    pub sprvsiz: U16Reg,
    pub stretch: U16Reg,
    pub tilt: U16Reg,
    pub sprdoff: U16Reg,
    pub sprvpos: U16Reg,
    pub colloff: U16Reg,
    pub vsizacum: U16Reg,
    pub hsizoff: U16Reg,
    pub vsizoff: U16Reg,
    pub scbadr: U16Reg,
    pub procadr: U16Reg,

    // Math file
    pub mathd: u8,
    pub mathc: u8,
    pub mathb: u8,
    pub matha: u8,
    pub mathp: u8,
    pub mathn: u8,
    pub mathh: u8,
    pub mathg: u8,
    pub mathf: u8,
    pub mathe: u8,
    pub mathm: u8,
    pub mathl: u8,
    pub mathk: u8,
    pub mathj: u8,

    pub sprctl0: u8,
    pub sprctl1: u8,
    pub sprcoll: u8,
    pub sprinit: u8,
    pub suzybusen: u8,
    pub sprgo: u8,

    // SPRSYS write latches
    pub(crate) sign_math: bool,
    pub(crate) accumulate: bool,
    pub(crate) no_collide: bool,
    pub(crate) vstretch: bool,
    pub(crate) lefthand: bool,
    pub(crate) sprite_stop: bool,

    // Math unit runtime
    pub(crate) math_busy_cycles: u32,
    pub(crate) mathbit: bool,
    pub(crate) last_carry: bool,
    pub(crate) sign_ab: i8,
    pub(crate) sign_cd: i8,

    // Input aggregation (latched by the board)
    pub joystick: u8,
    pub switches: u8,

    pub(crate) pen_map: [u8; 16],
    pub(crate) quad_lut: [[[QuadDir; 4]; 4]; 4],

    // Bit-serial stream reader
    pub(crate) shift_addr: u16,
    pub(crate) shift_cur: u8,
    pub(crate) shift_bit: i32,

    /// RAM accesses made by the last blit, converted to bus cycles.
    pub(crate) mem_accesses: u32,
}

impl Suzy {
    pub fn new() -> Self {
        Self {
            tmpadr: Default::default(),
            tiltacum: Default::default(),
            hoff: Default::default(),
            voff: Default::default(),
            vidbas: Default::default(),
            collbas: Default::default(),
            vidadr: Default::default(),
            colladr: Default::default(),
            scbnext: Default::default(),
            sprdline: Default::default(),
            hposstrt: Default::default(),
            vposstrt: Default::default(),
            sprhsiz: Default::default(),
            sprvsiz: Default::default(),
            stretch: Default::default(),
            tilt: Default::default(),
            sprdoff: Default::default(),
            sprvpos: Default::default(),
            colloff: Default::default(),
            vsizacum: Default::default(),
            hsizoff: Default::default(),
            vsizoff: Default::default(),
            scbadr: Default::default(),
            procadr: Default::default(),
            mathd: 0,
            mathc: 0,
            mathb: 0,
            matha: 0,
            mathp: 0,
            mathn: 0,
            mathh: 0,
            mathg: 0,
            mathf: 0,
            mathe: 0,
            mathm: 0,
            mathl: 0,
            mathk: 0,
            mathj: 0,
            sprctl0: 0,
            sprctl1: 0,
            sprcoll: 0,
            sprinit: 0,
            suzybusen: 0,
            sprgo: 0,
            sign_math: false,
            accumulate: false,
            no_collide: false,
            vstretch: false,
            lefthand: false,
            sprite_stop: false,
            math_busy_cycles: 0,
            mathbit: false,
            last_carry: false,
            sign_ab: 1,
            sign_cd: 1,
            joystick: 0,
            switches: 0,
            pen_map: [0; 16],
            quad_lut: sprites::compute_quad_lut(),
            shift_addr: 0,
            shift_cur: 0,
            shift_bit: 0,
            mem_accesses: 0,
        }
    }

    pub fn reset(&mut self) {
        let joystick = self.joystick;
        let switches = self.switches;
        *self = Self::new();
        self.joystick = joystick;
        self.switches = switches;
    }

    /// Count down the math unit's completion timer.
    pub fn clock(&mut self, cycles: u32) {
        self.math_busy_cycles = self.math_busy_cycles.saturating_sub(cycles);
    }

    pub fn math_busy(&self) -> bool {
        self.math_busy_cycles > 0
    }

    pub fn read(&self, address: u16) -> u8 {
        match address {
            SUZY_TMPADRL => self.tmpadr.low,
            SUZY_TMPADRH => self.tmpadr.high,
            SUZY_TILTACUML => self.tiltacum.low,
            SUZY_TILTACUMH => self.tiltacum.high,
            SUZY_HOFFL => self.hoff.low,
            SUZY_HOFFH => self.hoff.high,
            SUZY_VOFFL => self.voff.low,
            SUZY_VOFFH => self.voff.high,
            SUZY_VIDBASL => self.vidbas.low,
            SUZY_VIDBASH => self.vidbas.high,
            SUZY_COLLBASL => self.collbas.low,
            SUZY_COLLBASH => self.collbas.high,
            SUZY_VIDADRL => self.vidadr.low,
            SUZY_VIDADRH => self.vidadr.high,
            SUZY_COLLADRL => self.colladr.low,
            SUZY_COLLADRH => self.colladr.high,
            SUZY_SCBNEXTL => self.scbnext.low,
            SUZY_SCBNEXTH => self.scbnext.high,
            SUZY_SPRDLINEL => self.sprdline.low,
            SUZY_SPRDLINEH => self.sprdline.high,
            SUZY_HPOSSTRTL => self.hposstrt.low,
            SUZY_HPOSSTRTH => self.hposstrt.high,
            SUZY_VPOSSTRTL => self.vposstrt.low,
            SUZY_VPOSSTRTH => self.vposstrt.high,
            SUZY_SPRHSIZL => self.sprhsiz.low,
            SUZY_SPRHSIZH => self.sprhsiz.high,
            SUZY_SPRVSIZL => self.sprvsiz.low,
            SUZY_SPRVSIZH => self.sprvsiz.high,
            SUZY_STRETCHL => self.stretch.low,
            SUZY_STRETCHH => self.stretch.high,
            SUZY_TILTL => self.tilt.low,
            SUZY_TILTH => self.tilt.high,
            SUZY_SPRDOFFL => self.sprdoff.low,
            SUZY_SPRDOFFH => self.sprdoff.high,
            SUZY_SPRVPOSL => self.sprvpos.low,
            SUZY_SPRVPOSH => self.sprvpos.high,
            SUZY_COLLOFFL => self.colloff.low,
            SUZY_COLLOFFH => self.colloff.high,
            SUZY_VSIZACUML => self.vsizacum.low,
            SUZY_VSIZACUMH => self.vsizacum.high,
            SUZY_HSIZOFFL => self.hsizoff.low,
            SUZY_HSIZOFFH => self.hsizoff.high,
            SUZY_VSIZOFFL => self.vsizoff.low,
            SUZY_VSIZOFFH => self.vsizoff.high,
            SUZY_SCBADRL => self.scbadr.low,
            SUZY_SCBADRH => self.scbadr.high,
            SUZY_PROCADRL => self.procadr.low,
            SUZY_PROCADRH => self.procadr.high,
            SUZY_MATHD => self.mathd,
            SUZY_MATHC => self.mathc,
            SUZY_MATHB => self.mathb,
            SUZY_MATHA => self.matha,
            SUZY_MATHP => self.mathp,
            SUZY_MATHN => self.mathn,
            SUZY_MATHH => self.mathh,
            SUZY_MATHG => self.mathg,
            SUZY_MATHF => self.mathf,
            SUZY_MATHE => self.mathe,
            SUZY_MATHM => self.mathm,
            SUZY_MATHL => self.mathl,
            SUZY_MATHK => self.mathk,
            SUZY_MATHJ => self.mathj,
            SUZY_SPRCTL0 | SUZY_SPRCTL1 | SUZY_SPRCOLL | SUZY_SPRINIT | SUZY_SUZYBUSEN
            | SUZY_SPRGO => {
                log::debug!("read from write-only Suzy register {address:04X}");
                0xFF
            }
            SUZY_SUZYHREV => 0x01,
            SUZY_SUZYSREV => 0xFF,
            SUZY_SPRSYS => self.read_sprsys(),
            SUZY_JOYSTICK => self.joystick,
            SUZY_SWITCHES => self.switches,
            // RCART0/RCART1 are wired to the cartridge by the board.
            SUZY_LEDS | SUZY_PPORTSTAT | SUZY_PPORTDATA | SUZY_HOWIE => 0xFF,
            _ => {
                log::debug!("unhandled Suzy read at {address:04X}");
                0xFF
            }
        }
    }

    /// Register writes with no blit/cart side effects. SPRGO is handled by
    /// the board, which owns the RAM the sprite engine renders into.
    pub fn write(&mut self, address: u16, value: u8) {
        match address {
            SUZY_TMPADRL => self.tmpadr.write_low(value),
            SUZY_TMPADRH => self.tmpadr.write_high(value),
            SUZY_TILTACUML => self.tiltacum.write_low(value),
            SUZY_TILTACUMH => self.tiltacum.write_high(value),
            SUZY_HOFFL => self.hoff.write_low(value),
            SUZY_HOFFH => self.hoff.write_high(value),
            SUZY_VOFFL => self.voff.write_low(value),
            SUZY_VOFFH => self.voff.write_high(value),
            SUZY_VIDBASL => self.vidbas.write_low(value),
            SUZY_VIDBASH => self.vidbas.write_high(value),
            SUZY_COLLBASL => self.collbas.write_low(value),
            SUZY_COLLBASH => self.collbas.write_high(value),
            SUZY_VIDADRL => self.vidadr.write_low(value),
            SUZY_VIDADRH => self.vidadr.write_high(value),
            SUZY_COLLADRL => self.colladr.write_low(value),
            SUZY_COLLADRH => self.colladr.write_high(value),
            SUZY_SCBNEXTL => self.scbnext.write_low(value),
            SUZY_SCBNEXTH => self.scbnext.write_high(value),
            SUZY_SPRDLINEL => self.sprdline.write_low(value),
            SUZY_SPRDLINEH => self.sprdline.write_high(value),
            SUZY_HPOSSTRTL => self.hposstrt.write_low(value),
            SUZY_HPOSSTRTH => self.hposstrt.write_high(value),
            SUZY_VPOSSTRTL => self.vposstrt.write_low(value),
            SUZY_VPOSSTRTH => self.vposstrt.write_high(value),
            SUZY_SPRHSIZL => self.sprhsiz.write_low(value),
            SUZY_SPRHSIZH => self.sprhsiz.write_high(value),
            SUZY_SPRVSIZL => self.sprvsiz.write_low(value),
            SUZY_SPRVSIZH => self.sprvsiz.write_high(value),
            SUZY_STRETCHL => self.stretch.write_low(value),
            SUZY_STRETCHH => self.stretch.write_high(value),
            SUZY_TILTL => self.tilt.write_low(value),
            SUZY_TILTH => self.tilt.write_high(value),
            SUZY_SPRDOFFL => self.sprdoff.write_low(value),
            SUZY_SPRDOFFH => self.sprdoff.write_high(value),
            SUZY_SPRVPOSL => self.sprvpos.write_low(value),
            SUZY_SPRVPOSH => self.sprvpos.write_high(value),
            SUZY_COLLOFFL => self.colloff.write_low(value),
            SUZY_COLLOFFH => self.colloff.write_high(value),
            SUZY_VSIZACUML => self.vsizacum.write_low(value),
            SUZY_VSIZACUMH => self.vsizacum.write_high(value),
            SUZY_HSIZOFFL => self.hsizoff.write_low(value),
            SUZY_HSIZOFFH => self.hsizoff.write_high(value),
            SUZY_VSIZOFFL => self.vsizoff.write_low(value),
            SUZY_VSIZOFFH => self.vsizoff.write_high(value),
            SUZY_SCBADRL => self.scbadr.write_low(value),
            SUZY_SCBADRH => self.scbadr.write_high(value),
            SUZY_PROCADRL => self.procadr.write_low(value),
            SUZY_PROCADRH => self.procadr.write_high(value),
            SUZY_MATHD => {
                // Writing the first byte of a pair clears its partner.
                self.mathd = value;
                self.mathc = 0;
            }
            SUZY_MATHC => {
                self.mathc = value;
                if self.sign_math {
                    self.capture_sign_cd();
                }
            }
            SUZY_MATHB => {
                self.mathb = value;
                self.matha = 0;
            }
            SUZY_MATHA => {
                self.matha = value;
                if self.sign_math {
                    self.capture_sign_ab();
                }
                self.multiply();
            }
            SUZY_MATHP => {
                self.mathp = value;
                self.mathn = 0;
                self.divide();
            }
            SUZY_MATHN => {
                self.mathn = value;
                self.divide();
            }
            SUZY_MATHH => {
                self.mathh = value;
                self.mathg = 0;
            }
            SUZY_MATHG => self.mathg = value,
            SUZY_MATHF => {
                self.mathf = value;
                self.mathe = 0;
            }
            SUZY_MATHE => {
                self.mathe = value;
                self.divide();
            }
            SUZY_MATHM => {
                self.mathm = value;
                self.mathl = 0;
            }
            SUZY_MATHL => self.mathl = value,
            SUZY_MATHK => {
                self.mathk = value;
                self.mathj = 0;
            }
            SUZY_MATHJ => self.mathj = value,
            SUZY_SPRCTL0 => self.sprctl0 = value,
            SUZY_SPRCTL1 => self.sprctl1 = value,
            SUZY_SPRCOLL => self.sprcoll = value,
            SUZY_SPRINIT => self.sprinit = value,
            SUZY_SUZYHREV | SUZY_SUZYSREV => {
                log::debug!("ignored write {value:02X} to read-only {address:04X}");
            }
            SUZY_SUZYBUSEN => self.suzybusen = value,
            SUZY_SPRGO => self.sprgo = value,
            SUZY_SPRSYS => self.write_sprsys(value),
            SUZY_JOYSTICK | SUZY_SWITCHES => {
                log::debug!("ignored write {value:02X} to read-only {address:04X}");
            }
            SUZY_LEDS | SUZY_PPORTSTAT | SUZY_PPORTDATA | SUZY_HOWIE => {
                log::debug!("ignored write {value:02X} to unused {address:04X}");
            }
            _ => {
                log::debug!("unhandled Suzy write {value:02X} at {address:04X}");
            }
        }
    }

    fn read_sprsys(&self) -> u8 {
        let mut value = 0;
        if self.math_busy() {
            value |= 0x80;
        }
        if self.mathbit {
            value |= 0x40;
        }
        if self.last_carry {
            value |= 0x20;
        }
        if self.vstretch {
            value |= 0x10;
        }
        if self.lefthand {
            value |= 0x08;
        }
        if self.sprite_stop {
            value |= 0x02;
        }
        value
    }

    fn write_sprsys(&mut self, value: u8) {
        self.sign_math = value & 0x80 != 0;
        self.accumulate = value & 0x40 != 0;
        self.no_collide = value & 0x20 != 0;
        self.vstretch = value & 0x10 != 0;
        self.lefthand = value & 0x08 != 0;
        self.sprite_stop = value & 0x02 != 0;
    }
}

impl Default for Suzy {
    fn default() -> Self {
        Self::new()
    }
}
