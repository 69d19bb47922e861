//! Validity mask of a LERC2 band, stored run length encoded

use crate::{LercError, Result, reader::ByteReader};

const END_OF_RUNS: i16 = i16::MIN;

/// One bit per pixel, the most significant bit of the first byte is the first pixel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask {
    bits: Vec<u8>,
    len: usize,
}

impl BitMask {
    pub fn new(len: usize, valid: bool) -> Self {
        let fill = if valid { 0xff } else { 0x00 };
        BitMask {
            bits: vec![fill; len.div_ceil(8)],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        index < self.len && self.bits[index >> 3] & (0x80 >> (index & 7)) != 0
    }

    pub fn set_valid(&mut self, index: usize, valid: bool) {
        if index >= self.len {
            return;
        }

        let bit = 0x80 >> (index & 7);
        if valid {
            self.bits[index >> 3] |= bit;
        } else {
            self.bits[index >> 3] &= !bit;
        }
    }

    pub fn count_valid(&self) -> usize {
        (0..self.len).filter(|&i| self.is_valid(i)).count()
    }

    pub fn to_vec(&self) -> Vec<bool> {
        (0..self.len).map(|i| self.is_valid(i)).collect()
    }

    /// Reads the mask section of a band header
    ///
    /// The mask section is only used when some, but not all, pixels are valid.
    pub(crate) fn read(reader: &mut ByteReader, pixel_count: usize, valid_pixel_count: usize) -> Result<BitMask> {
        let mask_size = reader.read_i32()?;
        if mask_size < 0 {
            return Err(LercError::InvalidMask(format!("Invalid mask size {mask_size}")));
        }

        if valid_pixel_count == 0 {
            reader.skip(mask_size as usize)?;
            return Ok(BitMask::new(pixel_count, false));
        }

        if valid_pixel_count == pixel_count {
            reader.skip(mask_size as usize)?;
            return Ok(BitMask::new(pixel_count, true));
        }

        if mask_size == 0 {
            return Err(LercError::InvalidMask("Missing mask for a partially valid band".into()));
        }

        let encoded = reader.read_bytes(mask_size as usize)?;
        let mut mask = BitMask::new(pixel_count, false);
        rle_decode(encoded, &mut mask.bits)?;

        let valid = mask.count_valid();
        if valid != valid_pixel_count {
            return Err(LercError::InvalidMask(format!(
                "Mask has {valid} valid pixels, header expects {valid_pixel_count}"
            )));
        }

        Ok(mask)
    }
}

/// Decodes the byte run length encoding used for masks
///
/// Every run starts with a little-endian i16 count: a positive count is followed by that many literal bytes,
/// otherwise the next byte is repeated `-count` times. `i16::MIN` terminates the stream.
pub(crate) fn rle_decode(src: &[u8], dst: &mut [u8]) -> Result<()> {
    let mut reader = ByteReader::new(src);
    let mut out = 0;

    loop {
        let count = reader.read_i16().map_err(|_| LercError::Rle("Missing end marker".into()))?;
        if count == END_OF_RUNS {
            break;
        }

        let run = count.unsigned_abs() as usize;
        if out + run > dst.len() {
            return Err(LercError::Rle(format!("Run of {run} bytes exceeds the output size {}", dst.len())));
        }

        if count > 0 {
            let literal = reader.read_bytes(run).map_err(|_| LercError::Rle("Truncated literal run".into()))?;
            dst[out..out + run].copy_from_slice(literal);
        } else {
            let value = reader.read_u8().map_err(|_| LercError::Rle("Truncated repeat run".into()))?;
            dst[out..out + run].fill(value);
        }

        out += run;
    }

    if out != dst.len() {
        return Err(LercError::Rle(format!("Decoded {out} bytes, expected {}", dst.len())));
    }

    Ok(())
}
