//! Little-endian cursor over a LERC blob

use crate::{DataType, LercError, Result};

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The unread part of the data
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        if count > self.remaining() {
            return Err(LercError::UnexpectedEof);
        }

        self.pos += count;
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(LercError::UnexpectedEof);
        }

        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads a single value stored with the given data type
    pub fn read_value(&mut self, data_type: DataType) -> Result<f64> {
        Ok(match data_type {
            DataType::Char => self.read_u8()? as i8 as f64,
            DataType::Byte => self.read_u8()? as f64,
            DataType::Short => self.read_i16()? as f64,
            DataType::UShort => self.read_u16()? as f64,
            DataType::Int => self.read_i32()? as f64,
            DataType::UInt => self.read_u32()? as f64,
            DataType::Float => self.read_f32()? as f64,
            DataType::Double => self.read_f64()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_little_endian_values() -> Result<()> {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xFF];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8()?, 0x01);
        assert_eq!(reader.read_u16()?, 0x1234);
        assert_eq!(reader.read_u32()?, 0x12345678);
        assert_eq!(reader.read_value(DataType::Char)?, -1.0);
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.read_u8(), Err(LercError::UnexpectedEof));
        Ok(())
    }

    #[test]
    fn skip_past_end_fails() {
        let data = [0u8; 4];
        let mut reader = ByteReader::new(&data);
        assert!(reader.skip(3).is_ok());
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.skip(2), Err(LercError::UnexpectedEof));
        assert_eq!(reader.rest(), &[0]);
    }
}
