//! LEB128 varints, bit compatible with the classic `uvarint` / zig-zag `varint` encodings.

/// Longest encoding of a u64.
const MAX_LEN: usize = 10;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    #[error("unexpected end of varint stream at byte {0}")]
    Truncated(usize),
    #[error("varint at byte {0} overflows 64 bits")]
    Overflow(usize),
}

pub fn write_uvarint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

pub fn write_varint(out: &mut Vec<u8>, value: i64) {
    // Zig-zag so small negatives stay small.
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    write_uvarint(out, zigzag);
}

/// Cursor over a varint stream.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}
impl<'a> Reader<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }
    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.pos.min(self.bytes.len())..]
    }
    pub fn read_uvarint(&mut self) -> Result<u64, VarintError> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        for i in 0..MAX_LEN {
            let Some(&byte) = self.bytes.get(start + i) else {
                return Err(VarintError::Truncated(start));
            };
            if i == MAX_LEN - 1 && byte > 1 {
                return Err(VarintError::Overflow(start));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte < 0x80 {
                self.pos = start + i + 1;
                return Ok(value);
            }
            shift += 7;
        }
        Err(VarintError::Overflow(start))
    }
    pub fn read_varint(&mut self) -> Result<i64, VarintError> {
        let zigzag = self.read_uvarint()?;
        Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn known_bytes() {
        let mut out = vec![];
        write_uvarint(&mut out, 300);
        assert_eq!(out, [0xAC, 0x02]);

        out.clear();
        write_uvarint(&mut out, 0xFFFF);
        assert_eq!(out, [0xFF, 0xFF, 0x03]);

        out.clear();
        write_varint(&mut out, -1);
        write_varint(&mut out, 1);
        write_varint(&mut out, -64);
        assert_eq!(out, [0x01, 0x02, 0x7F]);
    }
    #[test]
    fn mixed_stream() {
        let mut out = vec![];
        write_varint(&mut out, -5);
        write_uvarint(&mut out, u64::MAX);
        write_varint(&mut out, i64::MIN);

        let mut reader = Reader::new(&out);
        assert_eq!(reader.read_varint(), Ok(-5));
        assert_eq!(reader.read_uvarint(), Ok(u64::MAX));
        assert_eq!(reader.read_varint(), Ok(i64::MIN));
        assert!(reader.is_empty());
    }
    #[test]
    fn truncated() {
        let mut reader = Reader::new(&[0x80, 0x80]);
        assert_eq!(reader.read_uvarint(), Err(VarintError::Truncated(0)));
        // A failed read doesn't consume.
        assert_eq!(reader.remaining().len(), 2);
    }
    #[test]
    fn overflow() {
        let bytes = [0xFF; 11];
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.read_uvarint(), Err(VarintError::Overflow(0)));
    }
}
