//! Big-endian cursor over class file bytes

use crate::error::{Result, ScanError};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

pub struct ClassReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

fn truncated(_: std::io::Error) -> ScanError {
    ScanError::parse("", "unexpected end of class data")
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(truncated)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<BigEndian>().map_err(truncated)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<BigEndian>().map_err(truncated)
    }

    pub fn i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<BigEndian>().map_err(truncated)
    }

    pub fn i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<BigEndian>().map_err(truncated)
    }

    pub fn f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<BigEndian>().map_err(truncated)
    }

    pub fn f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<BigEndian>().map_err(truncated)
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(ScanError::parse(
                "",
                format!(
                    "need {} bytes at offset {} but only {} remain",
                    len,
                    self.position(),
                    self.remaining()
                ),
            ));
        }
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian_values() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0x7F];
        let mut reader = ClassReader::new(&data);
        assert_eq!(reader.u32().unwrap(), 0xCAFE_BABE);
        assert_eq!(reader.u16().unwrap(), 52);
        assert_eq!(reader.u8().unwrap(), 0x7F);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_truncated_read_is_parse_error() {
        let data = [0x00];
        let mut reader = ClassReader::new(&data);
        assert!(matches!(reader.u16(), Err(ScanError::Parse { .. })));
        assert!(reader.bytes(4).is_err());
    }
}
