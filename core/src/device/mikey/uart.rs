//! ComLynx UART.
//!
//! Bit timing comes from timer 4: every borrow-out of the baud timer is one
//! bit cell. Frames are 11 bits: start, 8 data (LSB first on the wire),
//! parity (or the selected mark), stop. The serial bus is a party line, so
//! a completed transmit frame is also delivered to the receiver; a host
//! transport can inject remote bytes through the receive ring.
//!
//! # SERCTL
//!
//! | Bit | Write        | Read                 |
//! |-----|--------------|----------------------|
//! | 7   | TXINTEN      | TXRDY                |
//! | 6   | RXINTEN      | RXRDY                |
//! | 5   | -            | TXEMPTY              |
//! | 4   | PAREN        | PARERR               |
//! | 3   | RESETERR     | OVERRUN              |
//! | 2   | TXOPEN       | FRAMERR              |
//! | 1   | TXBRK        | RXBRK                |
//! | 0   | PAREVEN      | PARBIT               |

use std::collections::VecDeque;
use std::io;

use crate::core::state::{StateReader, StateWriter};

const SERCTL_TXINTEN: u8 = 0x80;
const SERCTL_RXINTEN: u8 = 0x40;
const SERCTL_PAREN: u8 = 0x10;
const SERCTL_RESETERR: u8 = 0x08;
const SERCTL_TXBRK: u8 = 0x02;
const SERCTL_PAREVEN: u8 = 0x01;

const STATUS_TXRDY: u8 = 0x80;
const STATUS_RXRDY: u8 = 0x40;
const STATUS_TXEMPTY: u8 = 0x20;
const STATUS_PARERR: u8 = 0x10;
const STATUS_OVERRUN: u8 = 0x08;
const STATUS_FRAMERR: u8 = 0x04;
const STATUS_RXBRK: u8 = 0x02;
const STATUS_PARBIT: u8 = 0x01;

/// start + 8 data + parity/mark + stop.
const FRAME_BITS: u32 = 11;

/// Host-injected bytes waiting for bit time, bounded like a real FIFO.
const RX_RING_CAPACITY: usize = 64;

pub struct Uart {
    control: u8,

    tx_holding: Option<u8>,
    tx_shift: Option<u8>,
    tx_bits_left: u32,

    rx_data: u8,
    rx_ready: bool,
    rx_ring: VecDeque<u8>,

    par_err: bool,
    ovr_err: bool,
    fram_err: bool,
    rx_brk: bool,
    par_bit: bool,
}

impl Uart {
    pub fn new() -> Self {
        Self {
            control: 0,
            tx_holding: None,
            tx_shift: None,
            tx_bits_left: 0,
            rx_data: 0,
            rx_ready: false,
            rx_ring: VecDeque::new(),
            par_err: false,
            ovr_err: false,
            fram_err: false,
            rx_brk: false,
            par_bit: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn write_control(&mut self, value: u8) {
        self.control = value;
        if value & SERCTL_RESETERR != 0 {
            self.par_err = false;
            self.ovr_err = false;
            self.fram_err = false;
            self.rx_brk = false;
        }
    }

    pub fn read_control(&self) -> u8 {
        let mut status = 0;
        if self.tx_holding.is_none() {
            status |= STATUS_TXRDY;
        }
        if self.rx_ready {
            status |= STATUS_RXRDY;
        }
        if self.tx_holding.is_none() && self.tx_shift.is_none() {
            status |= STATUS_TXEMPTY;
        }
        if self.par_err {
            status |= STATUS_PARERR;
        }
        if self.ovr_err {
            status |= STATUS_OVERRUN;
        }
        if self.fram_err {
            status |= STATUS_FRAMERR;
        }
        if self.rx_brk {
            status |= STATUS_RXBRK;
        }
        if self.par_bit {
            status |= STATUS_PARBIT;
        }
        status
    }

    pub fn write_data(&mut self, value: u8) {
        if self.tx_holding.is_some() {
            log::debug!("SERDAT write {value:02X} overruns the holding register");
        }
        self.tx_holding = Some(value);
        self.pump_tx();
    }

    /// Consume the received byte.
    pub fn read_data(&mut self) -> u8 {
        self.rx_ready = false;
        self.rx_data
    }

    /// Debugger view of SERDAT: no consumption.
    pub fn peek_data(&self) -> u8 {
        self.rx_data
    }

    /// Host transport: queue a remote byte for delivery at bit time.
    pub fn inject_rx(&mut self, value: u8) {
        if self.rx_ring.len() < RX_RING_CAPACITY {
            self.rx_ring.push_back(value);
        } else {
            log::warn!("UART receive ring full, dropping byte {value:02X}");
        }
    }

    pub fn irq_level(&self) -> bool {
        (self.control & SERCTL_TXINTEN != 0 && self.tx_holding.is_none())
            || (self.control & SERCTL_RXINTEN != 0 && self.rx_ready)
    }

    /// One borrow-out of timer 4 = one bit cell.
    pub fn baud_tick(&mut self) {
        if self.tx_bits_left > 0 {
            self.tx_bits_left -= 1;
            if self.tx_bits_left == 0 {
                let sent = self.tx_shift.take();
                if self.control & SERCTL_TXBRK != 0 {
                    // A break floods the line: receiver sees a framing error.
                    self.deliver_break();
                } else if let Some(byte) = sent {
                    // Party line: the transmitter always hears itself.
                    self.deliver_rx(byte);
                } else {
                    self.drain_ring();
                }
                self.pump_tx();
            }
            return;
        }

        // Line idle: remote traffic gets its bit time now.
        if !self.rx_ring.is_empty() {
            self.tx_bits_left = FRAME_BITS;
        }
    }

    fn pump_tx(&mut self) {
        if self.tx_shift.is_none()
            && let Some(byte) = self.tx_holding.take()
        {
            self.tx_shift = Some(byte);
            self.tx_bits_left = FRAME_BITS;
        }
    }

    fn deliver_rx(&mut self, byte: u8) {
        if self.rx_ready {
            self.ovr_err = true;
        }
        self.rx_data = byte;
        self.rx_ready = true;
        self.par_bit = self.compute_parity(byte);
    }

    fn deliver_break(&mut self) {
        self.fram_err = true;
        self.rx_brk = true;
        self.rx_data = 0;
        self.rx_ready = true;
    }

    /// The ninth bit: real parity when PAREN is set, otherwise the PAREVEN
    /// mark level.
    fn compute_parity(&self, byte: u8) -> bool {
        if self.control & SERCTL_PAREN != 0 {
            let ones = byte.count_ones() & 1 != 0;
            if self.control & SERCTL_PAREVEN != 0 {
                ones
            } else {
                !ones
            }
        } else {
            self.control & SERCTL_PAREVEN != 0
        }
    }

    fn drain_ring(&mut self) {
        if let Some(byte) = self.rx_ring.pop_front() {
            self.deliver_rx(byte);
        }
    }

    pub fn save_state(&self, w: &mut StateWriter<'_>) -> io::Result<()> {
        w.u8(self.control)?;
        w.u8(self.tx_holding.unwrap_or(0))?;
        w.bool(self.tx_holding.is_some())?;
        w.u8(self.tx_shift.unwrap_or(0))?;
        w.bool(self.tx_shift.is_some())?;
        w.u32(self.tx_bits_left)?;
        w.u8(self.rx_data)?;
        w.bool(self.rx_ready)?;
        w.bool(self.par_err)?;
        w.bool(self.ovr_err)?;
        w.bool(self.fram_err)?;
        w.bool(self.rx_brk)?;
        w.bool(self.par_bit)?;
        Ok(())
    }

    pub fn load_state(&mut self, r: &mut StateReader<'_>) -> io::Result<()> {
        self.control = r.u8()?;
        let holding = r.u8()?;
        self.tx_holding = r.bool()?.then_some(holding);
        let shift = r.u8()?;
        self.tx_shift = r.bool()?.then_some(shift);
        self.tx_bits_left = r.u32()?;
        self.rx_data = r.u8()?;
        self.rx_ready = r.bool()?;
        self.par_err = r.bool()?;
        self.ovr_err = r.bool()?;
        self.fram_err = r.bool()?;
        self.rx_brk = r.bool()?;
        self.par_bit = r.bool()?;
        self.rx_ring.clear();
        Ok(())
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_bits(uart: &mut Uart, bits: u32) {
        for _ in 0..bits {
            uart.baud_tick();
        }
    }

    #[test]
    fn tx_frame_loops_back_to_rx() {
        let mut uart = Uart::new();
        uart.write_data(0x5A);
        assert_eq!(uart.read_control() & STATUS_TXRDY, STATUS_TXRDY);
        run_bits(&mut uart, FRAME_BITS);
        assert_eq!(uart.read_control() & STATUS_RXRDY, STATUS_RXRDY);
        assert_eq!(uart.read_data(), 0x5A);
        assert_eq!(uart.read_control() & STATUS_RXRDY, 0);
    }

    #[test]
    fn holding_register_buffers_one_byte() {
        let mut uart = Uart::new();
        uart.write_data(0x11);
        uart.write_data(0x22);
        // Holding full until the shifter finishes the first frame.
        assert_eq!(uart.read_control() & STATUS_TXRDY, 0);
        run_bits(&mut uart, FRAME_BITS);
        assert_eq!(uart.read_data(), 0x11);
        run_bits(&mut uart, FRAME_BITS);
        assert_eq!(uart.read_data(), 0x22);
        assert_eq!(uart.read_control() & STATUS_TXEMPTY, STATUS_TXEMPTY);
    }

    #[test]
    fn unread_byte_sets_overrun() {
        let mut uart = Uart::new();
        uart.write_data(0xAA);
        run_bits(&mut uart, FRAME_BITS);
        uart.write_data(0xBB);
        run_bits(&mut uart, FRAME_BITS);
        let status = uart.read_control();
        assert_eq!(status & STATUS_OVERRUN, STATUS_OVERRUN);
        assert_eq!(uart.read_data(), 0xBB);
    }

    #[test]
    fn reseterr_clears_error_flags() {
        let mut uart = Uart::new();
        uart.write_data(0xAA);
        run_bits(&mut uart, FRAME_BITS);
        uart.write_data(0xBB);
        run_bits(&mut uart, FRAME_BITS);
        uart.write_control(SERCTL_RESETERR);
        assert_eq!(uart.read_control() & STATUS_OVERRUN, 0);
    }

    #[test]
    fn break_raises_framing_error() {
        let mut uart = Uart::new();
        uart.write_control(SERCTL_TXBRK);
        uart.write_data(0x00);
        run_bits(&mut uart, FRAME_BITS);
        let status = uart.read_control();
        assert_eq!(status & STATUS_FRAMERR, STATUS_FRAMERR);
        assert_eq!(status & STATUS_RXBRK, STATUS_RXBRK);
    }

    #[test]
    fn injected_bytes_arrive_at_bit_time() {
        let mut uart = Uart::new();
        uart.inject_rx(0x42);
        // Nothing before a full frame of bit cells has elapsed.
        assert_eq!(uart.read_control() & STATUS_RXRDY, 0);
        run_bits(&mut uart, FRAME_BITS + 1);
        assert_eq!(uart.read_data(), 0x42);
    }

    #[test]
    fn irq_levels_follow_enables() {
        let mut uart = Uart::new();
        assert!(!uart.irq_level());
        uart.write_control(SERCTL_TXINTEN);
        assert!(uart.irq_level()); // TX holding empty
        uart.write_data(0x01);
        assert!(!uart.irq_level());
    }

    #[test]
    fn even_parity_bit() {
        let mut uart = Uart::new();
        uart.write_control(SERCTL_PAREN | SERCTL_PAREVEN);
        uart.write_data(0x03); // two bits set -> even parity bit clear
        run_bits(&mut uart, FRAME_BITS);
        assert_eq!(uart.read_control() & STATUS_PARBIT, 0);
    }
}
