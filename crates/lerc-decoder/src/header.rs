use crate::{LercError, Result, reader::ByteReader};

pub const FILE_KEY: &[u8] = b"Lerc2 ";
pub const MAX_VERSION: i32 = 6;
/// Largest raster (4096 x 4096) accepted, the header of a blob of a few bytes can claim any size
pub const MAX_PIXEL_COUNT: i64 = 1 << 24;

/// Key, version and checksum precede the checksummed part of the blob
const CHECKSUM_START: usize = FILE_KEY.len() + 4 + 4;

/// Pixel data types of a LERC2 blob, the discriminants are the on-disk codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DataType {
    Char = 0,
    Byte = 1,
    Short = 2,
    UShort = 3,
    Int = 4,
    UInt = 5,
    Float = 6,
    Double = 7,
}

impl DataType {
    pub fn from_code(code: i32) -> Option<DataType> {
        match code {
            0 => Some(DataType::Char),
            1 => Some(DataType::Byte),
            2 => Some(DataType::Short),
            3 => Some(DataType::UShort),
            4 => Some(DataType::Int),
            5 => Some(DataType::UInt),
            6 => Some(DataType::Float),
            7 => Some(DataType::Double),
            _ => None,
        }
    }

    pub const fn size(self) -> usize {
        match self {
            DataType::Char | DataType::Byte => 1,
            DataType::Short | DataType::UShort => 2,
            DataType::Int | DataType::UInt | DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, DataType::Float | DataType::Double)
    }

    /// The type a tile offset is stored with, given the reduction code of the tile header
    pub(crate) fn reduced(self, code: u8) -> Result<DataType> {
        let code = code as i32;
        let reduced = match self {
            DataType::Short | DataType::Int => self as i32 - code,
            DataType::UShort | DataType::UInt => self as i32 - 2 * code,
            DataType::Float => match code {
                0 => DataType::Float as i32,
                1 => DataType::Short as i32,
                _ => DataType::Byte as i32,
            },
            DataType::Double => match code {
                0 => DataType::Double as i32,
                _ => DataType::Double as i32 - 2 * code + 1,
            },
            DataType::Char | DataType::Byte => self as i32,
        };

        DataType::from_code(reduced).ok_or_else(|| LercError::InvalidData(format!("Invalid type reduction code {code} for {self:?}")))
    }

    /// Converts a decoded value to the integer range of the data type
    pub(crate) fn cast(self, value: f64) -> i64 {
        match self {
            DataType::Char => value as i8 as i64,
            DataType::Byte => value as u8 as i64,
            DataType::Short => value as i16 as i64,
            DataType::UShort => value as u16 as i64,
            DataType::Int => value as i32 as i64,
            DataType::UInt => value as u32 as i64,
            DataType::Float | DataType::Double => value as i64,
        }
    }

    /// Wraps an integer into the range of the data type (two's complement overflow)
    pub(crate) fn wrap(self, value: i64) -> i64 {
        match self {
            DataType::Char => value as i8 as i64,
            DataType::Byte => value as u8 as i64,
            DataType::Short => value as i16 as i64,
            DataType::UShort => value as u16 as i64,
            DataType::Int => value as i32 as i64,
            DataType::UInt => value as u32 as i64,
            DataType::Float | DataType::Double => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderInfo {
    pub version: i32,
    pub checksum: u32,
    pub rows: i32,
    pub cols: i32,
    pub depth: i32,
    pub valid_pixel_count: i32,
    pub micro_block_size: i32,
    pub blob_size: i32,
    pub blobs_more: i32,
    pub pass_no_data: bool,
    pub is_int: bool,
    pub data_type: DataType,
    pub max_z_error: f64,
    pub z_min: f64,
    pub z_max: f64,
    pub no_data: Option<f64>,
}

impl HeaderInfo {
    /// Parses the header at the start of the data
    pub fn parse(data: &[u8]) -> Result<HeaderInfo> {
        HeaderInfo::read(&mut ByteReader::new(data))
    }

    pub(crate) fn read(reader: &mut ByteReader) -> Result<HeaderInfo> {
        let key = reader.read_bytes(FILE_KEY.len()).map_err(|_| LercError::InvalidHeader("Blob too small".into()))?;
        if key != FILE_KEY {
            return Err(LercError::InvalidHeader("Not a Lerc2 blob".into()));
        }

        let version = reader.read_i32()?;
        if !(1..=MAX_VERSION).contains(&version) {
            return Err(LercError::UnsupportedVersion(version));
        }

        let checksum = if version >= 3 { reader.read_u32()? } else { 0 };

        let int_count = match version {
            1..=3 => 6,
            4 | 5 => 7,
            _ => 8,
        };

        let mut ints = [0i32; 8];
        for value in ints.iter_mut().take(int_count) {
            *value = reader.read_i32()?;
        }

        let mut ints = ints.into_iter();
        let mut next = || ints.next().unwrap_or_default();
        let rows = next();
        let cols = next();
        let depth = if version >= 4 { next() } else { 1 };
        let valid_pixel_count = next();
        let micro_block_size = next();
        let blob_size = next();
        let type_code = next();
        let blobs_more = if version >= 6 { next() } else { 0 };

        let (pass_no_data, is_int) = if version >= 6 {
            let flags = reader.read_bytes(4)?;
            (flags[0] != 0, flags[1] != 0)
        } else {
            (false, false)
        };

        let max_z_error = reader.read_f64()?;
        let z_min = reader.read_f64()?;
        let z_max = reader.read_f64()?;
        let no_data = if version >= 6 {
            let no_data = reader.read_f64()?;
            let _no_data_orig = reader.read_f64()?;
            pass_no_data.then_some(no_data)
        } else {
            None
        };

        let data_type =
            DataType::from_code(type_code).ok_or_else(|| LercError::InvalidHeader(format!("Invalid data type code {type_code}")))?;

        if rows <= 0 || cols <= 0 || depth <= 0 || micro_block_size <= 0 || blob_size <= 0 || max_z_error < 0.0 {
            return Err(LercError::InvalidHeader(format!(
                "Invalid dimensions (rows {rows}, cols {cols}, depth {depth}, block size {micro_block_size}, blob size {blob_size})"
            )));
        }

        if rows as i64 * cols as i64 > MAX_PIXEL_COUNT {
            return Err(LercError::InvalidHeader(format!(
                "Raster of {cols}x{rows} exceeds the maximum of {MAX_PIXEL_COUNT} pixels"
            )));
        }

        if valid_pixel_count < 0 || valid_pixel_count as i64 > rows as i64 * cols as i64 {
            return Err(LercError::InvalidHeader(format!("Invalid number of valid pixels: {valid_pixel_count}")));
        }

        Ok(HeaderInfo {
            version,
            checksum,
            rows,
            cols,
            depth,
            valid_pixel_count,
            micro_block_size,
            blob_size,
            blobs_more,
            pass_no_data,
            is_int,
            data_type,
            max_z_error,
            z_min,
            z_max,
            no_data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn blob_size(&self) -> usize {
        self.blob_size as usize
    }

    /// Byte and Char data encoded losslessly can be Huffman coded
    pub(crate) fn huffman_allowed(&self) -> bool {
        self.version >= 2 && matches!(self.data_type, DataType::Byte | DataType::Char) && self.max_z_error == 0.5
    }

    /// Verifies the Fletcher32 checksum of the blob (versions 3 and up)
    pub(crate) fn verify_checksum(&self, blob: &[u8]) -> Result<()> {
        if self.version < 3 {
            return Ok(());
        }

        if blob.len() < self.blob_size() || self.blob_size() < CHECKSUM_START {
            return Err(LercError::InvalidData(format!(
                "Blob size {} does not match the available data ({})",
                self.blob_size,
                blob.len()
            )));
        }

        let computed = fletcher32(&blob[CHECKSUM_START..self.blob_size()]);
        if computed != self.checksum {
            return Err(LercError::ChecksumMismatch {
                expected: self.checksum,
                computed,
            });
        }

        Ok(())
    }
}

/// Fletcher32 checksum over big-endian 16-bit words, an odd trailing byte is the high byte of a last word
pub fn fletcher32(data: &[u8]) -> u32 {
    let mut sum1: u32 = 0xffff;
    let mut sum2: u32 = 0xffff;

    let words = data.chunks_exact(2);
    let odd_byte = words.remainder().first().copied();

    // 359 words is the largest block that can not overflow the sums
    let words: Vec<&[u8]> = words.collect();
    for block in words.chunks(359) {
        for word in block {
            sum1 += ((word[0] as u32) << 8) | word[1] as u32;
            sum2 += sum1;
        }

        sum1 = (sum1 & 0xffff) + (sum1 >> 16);
        sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    }

    if let Some(byte) = odd_byte {
        sum1 += (byte as u32) << 8;
        sum2 += sum1;
    }

    sum1 = (sum1 & 0xffff) + (sum1 >> 16);
    sum2 = (sum2 & 0xffff) + (sum2 >> 16);

    (sum2 << 16) | sum1
}

/// Counts the bands in the blob, every band is a complete Lerc2 blob
pub(crate) fn count_bands(data: &[u8]) -> Result<(usize, usize)> {
    let mut offset = 0;
    let mut bands = 0;
    while offset < data.len() {
        let rest = &data[offset..];
        if !rest.starts_with(FILE_KEY) {
            break;
        }

        let header = HeaderInfo::parse(rest)?;
        if header.blob_size() > rest.len() {
            return Err(LercError::InvalidData(format!("Band {bands} is truncated")));
        }

        offset += header.blob_size();
        bands += 1;
    }

    Ok((bands, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fletcher32_known_values() {
        assert_eq!(fletcher32(&[]), 0xffffffff);
        assert_eq!(fletcher32(&[0x01, 0x02]), 0x01020102);
        // odd length, the last byte counts as the high byte of a word
        assert_eq!(fletcher32(&[0x01]), fletcher32(&[0x01, 0x00]));
    }

    #[test]
    fn type_reduction() -> Result<()> {
        assert_eq!(DataType::Int.reduced(0)?, DataType::Int);
        assert_eq!(DataType::Int.reduced(1)?, DataType::UShort);
        assert_eq!(DataType::Int.reduced(2)?, DataType::Short);
        assert_eq!(DataType::UInt.reduced(1)?, DataType::UShort);
        assert_eq!(DataType::UInt.reduced(2)?, DataType::Byte);
        assert_eq!(DataType::Byte.reduced(3)?, DataType::Byte);
        assert_eq!(DataType::Double.reduced(1)?, DataType::Float);
        assert_eq!(DataType::Double.reduced(3)?, DataType::Short);
        assert!(DataType::Short.reduced(3).is_err());
        Ok(())
    }

    #[test]
    fn cast_and_wrap() {
        assert_eq!(DataType::Byte.wrap(257), 1);
        assert_eq!(DataType::Char.wrap(128), -128);
        assert_eq!(DataType::UShort.cast(65535.0), 65535);
        assert_eq!(DataType::Short.cast(-3.0), -3);
    }

    #[test]
    fn reject_invalid_key() {
        assert!(matches!(HeaderInfo::parse(b"Lerc1 abcdefgh"), Err(LercError::InvalidHeader(_))));
        assert!(matches!(HeaderInfo::parse(b"Ler"), Err(LercError::InvalidHeader(_))));
    }

    #[test]
    fn reject_unsupported_version() {
        let mut blob = FILE_KEY.to_vec();
        blob.extend_from_slice(&7i32.to_le_bytes());
        assert_eq!(HeaderInfo::parse(&blob), Err(LercError::UnsupportedVersion(7)));
    }
}
