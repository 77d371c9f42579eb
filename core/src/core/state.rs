//! Little-endian save-state primitives.
//!
//! Every component serializes its fields through these wrappers so the
//! on-disk byte order is fixed regardless of the host. Readers surface
//! truncation as `io::Error`; callers validate the container before any
//! component state is touched.

use std::io::{self, Read, Write};

pub struct StateWriter<'a> {
    w: &'a mut dyn Write,
    written: usize,
}

impl<'a> StateWriter<'a> {
    pub fn new(w: &'a mut dyn Write) -> Self {
        Self { w, written: 0 }
    }

    pub fn bytes_written(&self) -> usize {
        self.written
    }

    pub fn u8(&mut self, value: u8) -> io::Result<()> {
        self.bytes(&[value])
    }

    pub fn i8(&mut self, value: i8) -> io::Result<()> {
        self.bytes(&[value as u8])
    }

    pub fn bool(&mut self, value: bool) -> io::Result<()> {
        self.u8(value as u8)
    }

    pub fn u16(&mut self, value: u16) -> io::Result<()> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u32(&mut self, value: u32) -> io::Result<()> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn u64(&mut self, value: u64) -> io::Result<()> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn i64(&mut self, value: i64) -> io::Result<()> {
        self.bytes(&value.to_le_bytes())
    }

    pub fn bytes(&mut self, value: &[u8]) -> io::Result<()> {
        self.w.write_all(value)?;
        self.written += value.len();
        Ok(())
    }
}

pub struct StateReader<'a> {
    r: &'a mut dyn Read,
}

impl<'a> StateReader<'a> {
    pub fn new(r: &'a mut dyn Read) -> Self {
        Self { r }
    }

    pub fn u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.r.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn i8(&mut self) -> io::Result<i8> {
        Ok(self.u8()? as i8)
    }

    pub fn bool(&mut self) -> io::Result<bool> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.r.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.r.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn u64(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.r.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn i64(&mut self) -> io::Result<i64> {
        let mut buf = [0u8; 8];
        self.r.read_exact(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    pub fn bytes(&mut self, out: &mut [u8]) -> io::Result<()> {
        self.r.read_exact(out)
    }
}
