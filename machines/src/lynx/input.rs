//! Logical key set and the JOYSTICK/SWITCHES byte aggregation.

use std::io;

use glint_core::core::state::{StateReader, StateWriter};
use glint_core::device::lcd::Rotation;

/// JOYSTICK register bits.
const JOY_UP: u8 = 0x80;
const JOY_DOWN: u8 = 0x40;
const JOY_LEFT: u8 = 0x20;
const JOY_RIGHT: u8 = 0x10;
const JOY_OPTION1: u8 = 0x08;
const JOY_OPTION2: u8 = 0x04;
const JOY_B: u8 = 0x02;
const JOY_A: u8 = 0x01;

/// SWITCHES register bits.
const SWITCH_PAUSE: u8 = 0x01;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    Option1,
    Option2,
    Pause,
}

#[derive(Default)]
pub struct Input {
    joystick: u8,
    switches: u8,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.joystick = 0;
        self.switches = 0;
    }

    pub fn key_pressed(&mut self, key: Key, rotation: Rotation) {
        self.apply(key, rotation, true);
    }

    pub fn key_released(&mut self, key: Key, rotation: Rotation) {
        self.apply(key, rotation, false);
    }

    pub fn joystick(&self) -> u8 {
        self.joystick
    }

    pub fn switches(&self) -> u8 {
        self.switches
    }

    fn apply(&mut self, key: Key, rotation: Rotation, pressed: bool) {
        let key = map_directional(key, rotation);
        match key {
            Key::Pause => set_bit(&mut self.switches, SWITCH_PAUSE, pressed),
            Key::Up => set_bit(&mut self.joystick, JOY_UP, pressed),
            Key::Down => set_bit(&mut self.joystick, JOY_DOWN, pressed),
            Key::Left => set_bit(&mut self.joystick, JOY_LEFT, pressed),
            Key::Right => set_bit(&mut self.joystick, JOY_RIGHT, pressed),
            Key::Option1 => set_bit(&mut self.joystick, JOY_OPTION1, pressed),
            Key::Option2 => set_bit(&mut self.joystick, JOY_OPTION2, pressed),
            Key::A => set_bit(&mut self.joystick, JOY_A, pressed),
            Key::B => set_bit(&mut self.joystick, JOY_B, pressed),
        }
    }

    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.u8(self.joystick)?;
        w.u8(self.switches)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        self.joystick = r.u8()?;
        self.switches = r.u8()?;
        Ok(())
    }
}

fn set_bit(reg: &mut u8, bit: u8, pressed: bool) {
    if pressed {
        *reg |= bit;
    } else {
        *reg &= !bit;
    }
}

/// Remap the directional pad so "up" on the physical pad stays "up" on a
/// rotated screen.
fn map_directional(key: Key, rotation: Rotation) -> Key {
    match rotation {
        Rotation::None => key,
        Rotation::Left => match key {
            Key::Up => Key::Right,
            Key::Right => Key::Down,
            Key::Down => Key::Left,
            Key::Left => Key::Up,
            other => other,
        },
        Rotation::Right => match key {
            Key::Up => Key::Left,
            Key::Left => Key::Down,
            Key::Down => Key::Right,
            Key::Right => Key::Up,
            other => other,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_toggle_bits() {
        let mut input = Input::new();
        input.key_pressed(Key::A, Rotation::None);
        input.key_pressed(Key::Up, Rotation::None);
        assert_eq!(input.joystick(), JOY_A | JOY_UP);
        input.key_released(Key::A, Rotation::None);
        assert_eq!(input.joystick(), JOY_UP);
    }

    #[test]
    fn pause_lives_in_switches() {
        let mut input = Input::new();
        input.key_pressed(Key::Pause, Rotation::None);
        assert_eq!(input.switches(), SWITCH_PAUSE);
        assert_eq!(input.joystick(), 0);
    }

    #[test]
    fn rotation_remaps_directions() {
        let mut input = Input::new();
        input.key_pressed(Key::Up, Rotation::Left);
        assert_eq!(input.joystick(), JOY_RIGHT);
        input.key_released(Key::Up, Rotation::Left);
        assert_eq!(input.joystick(), 0);

        input.key_pressed(Key::Up, Rotation::Right);
        assert_eq!(input.joystick(), JOY_LEFT);
    }

    #[test]
    fn buttons_ignore_rotation() {
        let mut input = Input::new();
        input.key_pressed(Key::A, Rotation::Left);
        assert_eq!(input.joystick(), JOY_A);
    }
}
