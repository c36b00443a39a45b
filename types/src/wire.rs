//! Byte-level helpers for the fixed-layout wire and disk codecs.
//!
//! Multi-byte integers are big-endian unless a field is explicitly historic
//! little-endian (vote sequence, bulk-pull count).

use thiserror::Error;

/// Returned when a decoder runs past the end of its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unexpected end of stream")]
pub struct WireError;

/// Cursor over a borrowed byte slice.
pub struct BufReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BufReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let b = *self.data.get(self.pos).ok_or(WireError)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        if self.remaining() < N {
            return Err(WireError);
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }
}

/// Append-only writer methods for `Vec<u8>` buffers.
pub trait WriteExt {
    fn put_u8(&mut self, v: u8);
    fn put_u16_be(&mut self, v: u16);
    fn put_u32_be(&mut self, v: u32);
    fn put_u32_le(&mut self, v: u32);
    fn put_u64_be(&mut self, v: u64);
    fn put_u64_le(&mut self, v: u64);
    fn put_bytes(&mut self, v: &[u8]);
}

impl WriteExt for Vec<u8> {
    fn put_u8(&mut self, v: u8) {
        self.push(v);
    }

    fn put_u16_be(&mut self, v: u16) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u32_be(&mut self, v: u32) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u32_le(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u64_be(&mut self, v: u64) {
        self.extend_from_slice(&v.to_be_bytes());
    }

    fn put_u64_le(&mut self, v: u64) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put_bytes(&mut self, v: &[u8]) {
        self.extend_from_slice(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_integers() {
        let mut buf = Vec::new();
        buf.put_u8(7);
        buf.put_u16_be(0x0102);
        buf.put_u64_be(0x1122334455667788);
        buf.put_u64_le(0x1122334455667788);

        let mut r = BufReader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_u16_be().unwrap(), 0x0102);
        assert_eq!(r.read_u64_be().unwrap(), 0x1122334455667788);
        assert_eq!(r.read_u64_le().unwrap(), 0x1122334455667788);
        assert!(r.is_empty());
    }

    #[test]
    fn short_read_errors() {
        let mut r = BufReader::new(&[1, 2, 3]);
        assert_eq!(r.read_u32_be(), Err(WireError));
        // Position is unchanged on failure.
        assert_eq!(r.remaining(), 3);
    }
}
