//! Minimal BCS (Binary Canonical Serialization) writer
//!
//! Covers the subset needed for entry-function transactions: fixed bytes,
//! little-endian integers, ULEB128 lengths and variant tags.

#[derive(Debug, Default)]
pub struct BcsWriter {
    buf: Vec<u8>,
}

impl BcsWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_uleb128(&mut self, mut value: u64) -> &mut Self {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
        self
    }

    /// Enum variant index
    pub fn write_variant(&mut self, index: u32) -> &mut Self {
        self.write_uleb128(u64::from(index))
    }

    /// Raw bytes with no length prefix (fixed-size arrays)
    pub fn write_fixed(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// `vector<u8>`: length prefix then bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_uleb128(bytes.len() as u64);
        self.write_fixed(bytes)
    }

    pub fn write_str(&mut self, value: &str) -> &mut Self {
        self.write_bytes(value.as_bytes())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// BCS encoding of a single `u64`
pub fn u64_bytes(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}
