//! Audio output stage.
//!
//! Mikey's four channel DACs update at timer resolution; this stage samples
//! them every clock slice, applies the attenuation/pan/stereo registers and
//! the per-channel ultrasonic cutoff, runs a one-pole low-pass, and
//! Bresenham-downsamples the 16 MHz stream to interleaved stereo 44.1 kHz.

use glint_core::device::Mikey;

const MASTER_CLOCK_HZ: u64 = 16_000_000;
const OUTPUT_SAMPLE_RATE: u64 = 44_100;

/// Upper bound on samples produced per frame (one frame is under 20 ms).
pub const AUDIO_BUFFER_SIZE: usize = 4096;

/// One-pole low-pass coefficient in Q15 (~4 kHz at 44.1 kHz).
const LPF_ALPHA_Q15: i32 = 0x4000;

pub struct AudioOut {
    mute: bool,
    channel_mute: [bool; 4],

    sample_accum: [i64; 2],
    sample_count: u32,
    sample_phase: u64,

    lpf: [i32; 2],

    buffer: Vec<i16>,
}

impl AudioOut {
    pub fn new() -> Self {
        Self {
            mute: false,
            channel_mute: [false; 4],
            sample_accum: [0; 2],
            sample_count: 0,
            sample_phase: 0,
            lpf: [0; 2],
            buffer: Vec::with_capacity(AUDIO_BUFFER_SIZE),
        }
    }

    pub fn reset(&mut self) {
        self.sample_accum = [0; 2];
        self.sample_count = 0;
        self.sample_phase = 0;
        self.lpf = [0; 2];
        self.buffer.clear();
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if channel < 4 {
            self.channel_mute[channel] = mute;
        }
    }

    /// Advance by one scheduler slice. The channel outputs are constant
    /// within a slice, so the box filter integrates them in one step.
    pub fn clock(&mut self, ticks: u32, mikey: &Mikey) {
        let (left, right) = self.mix(mikey);

        self.sample_accum[0] += left as i64 * ticks as i64;
        self.sample_accum[1] += right as i64 * ticks as i64;
        self.sample_count += ticks;
        self.sample_phase += OUTPUT_SAMPLE_RATE * ticks as u64;

        while self.sample_phase >= MASTER_CLOCK_HZ {
            self.sample_phase -= MASTER_CLOCK_HZ;

            if self.buffer.len() + 2 <= AUDIO_BUFFER_SIZE && self.sample_count > 0 {
                let count = self.sample_count as i64;
                for side in 0..2 {
                    let mean = (self.sample_accum[side] / count) as i32;
                    // One-pole low-pass to tame the square-ish channel edges.
                    self.lpf[side] += (LPF_ALPHA_Q15 * (mean - self.lpf[side])) >> 15;
                    self.buffer.push(self.lpf[side].clamp(-32768, 32767) as i16);
                }
            }

            self.sample_accum = [0; 2];
            self.sample_count = 0;
        }
    }

    /// Mix the four channel DACs into 16-bit left/right levels.
    fn mix(&self, mikey: &Mikey) -> (i32, i32) {
        if self.mute {
            return (0, 0);
        }

        let attenuation = [mikey.atten_a, mikey.atten_b, mikey.atten_c, mikey.atten_d];
        let mut left = 0i32;
        let mut right = 0i32;

        for (channel, atten) in attenuation.iter().enumerate() {
            if self.channel_mute[channel] || !mikey.audio[channel].enabled() {
                continue;
            }
            // Channels running above the audible band only produce DC.
            if !mikey.audio[channel].mix {
                continue;
            }

            let sample = mikey.audio[channel].output as i32;

            // MSTEREO: low nibble disables the right side per channel, high
            // nibble the left (1 = off). MPAN selects attenuated panning.
            let right_on = mikey.mstereo & (1 << channel) == 0;
            let left_on = mikey.mstereo & (1 << (channel + 4)) == 0;
            let pan_right = mikey.mpan & (1 << channel) != 0;
            let pan_left = mikey.mpan & (1 << (channel + 4)) != 0;

            if left_on {
                let gain = if pan_left { (atten >> 4) as i32 } else { 15 };
                left += sample * gain;
            }
            if right_on {
                let gain = if pan_right { (atten & 0x0F) as i32 } else { 15 };
                right += sample * gain;
            }
        }

        // Four channels x |127| x gain 15 fits comfortably in i16 with a
        // x4 headroom scale.
        (left * 4, right * 4)
    }

    /// Drain the frame's samples into the caller's interleaved buffer.
    pub fn end_frame(&mut self, out: &mut [i16], sample_count: &mut u32) {
        let n = out.len().min(self.buffer.len());
        out[..n].copy_from_slice(&self.buffer[..n]);
        *sample_count = n as u32;
        self.buffer.clear();
    }
}

impl Default for AudioOut {
    fn default() -> Self {
        Self::new()
    }
}
