//! Unpacking of bit stuffed unsigned integer arrays
//!
//! Layout: a header byte, the element count stored in 1, 2 or 4 bytes and the packed bits.
//! Header byte bits 6-7 select the width of the count (0: 4 bytes, 1: 2 bytes, 2: 1 byte),
//! bit 5 enables the lookup table mode and bits 0-4 hold the number of bits per element.

use crate::{LercError, Result, reader::ByteReader};

const LUT_FLAG: u8 = 1 << 5;

/// Reads a bit stuffed array of at most `max_count` elements
pub(crate) fn decode(reader: &mut ByteReader, max_count: usize, version: i32) -> Result<Vec<u32>> {
    let header = reader.read_u8()?;
    let count = match header >> 6 {
        0 => reader.read_u32()? as usize,
        1 => reader.read_u16()? as usize,
        2 => reader.read_u8()? as usize,
        _ => return Err(LercError::BitStuffer("Invalid element count width".into())),
    };

    if count > max_count {
        return Err(LercError::BitStuffer(format!("Element count {count} exceeds the maximum {max_count}")));
    }

    let num_bits = (header & 31) as u32;
    if header & LUT_FLAG == 0 {
        if num_bits == 0 {
            return Ok(vec![0; count]);
        }

        return unstuff(reader, count, num_bits, version);
    }

    if num_bits == 0 {
        return Err(LercError::BitStuffer("Lookup table with zero bits per value".into()));
    }

    // the lookup table is stored without its implicit leading zero
    let lut_size = reader.read_u8()? as usize;
    if lut_size < 2 {
        return Err(LercError::BitStuffer(format!("Invalid lookup table size {lut_size}")));
    }

    let mut lut = vec![0];
    lut.extend(unstuff(reader, lut_size - 1, num_bits, version)?);

    let index_bits = usize::BITS - (lut_size - 1).leading_zeros();
    let indices = unstuff(reader, count, index_bits, version)?;
    indices
        .into_iter()
        .map(|index| {
            lut.get(index as usize)
                .copied()
                .ok_or_else(|| LercError::BitStuffer(format!("Lookup table index {index} out of range")))
        })
        .collect()
}

/// Bytes of the last 32-bit word that carry no bits
fn tail_bytes_not_needed(count: usize, num_bits: u32) -> usize {
    let tail_bits = (count as u64 * num_bits as u64) & 31;
    let tail_bytes = tail_bits.div_ceil(8) as usize;
    if tail_bytes > 0 { 4 - tail_bytes } else { 0 }
}

/// Reads the packed words, the unused tail bytes of the last word are not stored
fn read_words(reader: &mut ByteReader, count: usize, num_bits: u32) -> Result<Vec<u32>> {
    if num_bits == 0 || num_bits >= 32 {
        return Err(LercError::BitStuffer(format!("Invalid number of bits: {num_bits}")));
    }

    let word_count = (count as u64 * num_bits as u64).div_ceil(32) as usize;
    let byte_count = word_count * 4 - tail_bytes_not_needed(count, num_bits);
    let bytes = reader.read_bytes(byte_count)?;

    Ok(bytes
        .chunks(4)
        .map(|chunk| {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_le_bytes(word)
        })
        .collect())
}

fn unstuff(reader: &mut ByteReader, count: usize, num_bits: u32, version: i32) -> Result<Vec<u32>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    if version >= 3 {
        let words = read_words(reader, count, num_bits)?;
        Ok(unpack_lsb_first(&words, count, num_bits))
    } else {
        let mut words = read_words(reader, count, num_bits)?;
        // older versions align the bytes of the last word to its high end
        if let Some(last) = words.last_mut() {
            let shift = 8 * tail_bytes_not_needed(count, num_bits) as u32;
            *last = last.checked_shl(shift).unwrap_or(0);
        }

        Ok(unpack_msb_first(&words, count, num_bits))
    }
}

/// Values are packed starting at the least significant bit of each word (version 3 and up)
fn unpack_lsb_first(words: &[u32], count: usize, num_bits: u32) -> Vec<u32> {
    let value_mask = (1u64 << num_bits) - 1;
    (0..count)
        .map(|i| {
            let bit = i as u64 * num_bits as u64;
            let index = (bit / 32) as usize;
            let shift = bit % 32;
            let low = words[index] as u64;
            let high = words.get(index + 1).copied().unwrap_or(0) as u64;
            ((((high << 32) | low) >> shift) & value_mask) as u32
        })
        .collect()
}

/// Values are packed starting at the most significant bit of each word (versions 1 and 2)
fn unpack_msb_first(words: &[u32], count: usize, num_bits: u32) -> Vec<u32> {
    let value_mask = (1u64 << num_bits) - 1;
    (0..count)
        .map(|i| {
            let bit = i as u64 * num_bits as u64;
            let index = (bit / 32) as usize;
            let shift = bit % 32;
            let high = words[index] as u64;
            let low = words.get(index + 1).copied().unwrap_or(0) as u64;
            ((((high << 32) | low) >> (64 - shift - num_bits as u64)) & value_mask) as u32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_bytes() {
        assert_eq!(tail_bytes_not_needed(4, 8), 0);
        assert_eq!(tail_bytes_not_needed(3, 8), 1);
        assert_eq!(tail_bytes_not_needed(1, 8), 3);
        assert_eq!(tail_bytes_not_needed(5, 7), 0);
    }

    #[test]
    fn all_zero_values() -> Result<()> {
        let data = [0b1000_0000, 5];
        let values = decode(&mut ByteReader::new(&data), 100, 3)?;
        assert_eq!(values, vec![0; 5]);
        Ok(())
    }

    #[test]
    fn lsb_first_packing() -> Result<()> {
        // 3 values of 4 bits: 0x1, 0x2, 0xF => 0x0F21, 12 bits stored in 2 bytes
        let data = [0b1000_0100, 3, 0x21, 0x0F];
        let mut reader = ByteReader::new(&data);
        assert_eq!(decode(&mut reader, 3, 3)?, vec![1, 2, 15]);
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    #[test]
    fn values_spanning_words() -> Result<()> {
        // 3 values of 20 bits, the second one crosses the word boundary
        let values = [0xABCDEu64, 0x12345, 0xFFFFF];
        let packed = values[0] | values[1] << 20 | values[2] << 40;
        let mut data = vec![0b1000_0000 | 20, 3];
        data.extend_from_slice(&packed.to_le_bytes()[..8]);

        let mut reader = ByteReader::new(&data);
        assert_eq!(decode(&mut reader, 3, 3)?, vec![0xABCDE, 0x12345, 0xFFFFF]);
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    #[test]
    fn msb_first_packing_before_version_3() -> Result<()> {
        // 3 values of 4 bits: 0x1, 0x2, 0xF => bits 0001 0010 1111, stored as the low bytes of the word
        let data = [0b1000_0100, 3, 0xF0, 0x12];
        let mut reader = ByteReader::new(&data);
        assert_eq!(decode(&mut reader, 3, 2)?, vec![1, 2, 15]);
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    #[test]
    fn lookup_table_mode() -> Result<()> {
        // lut [0, 7, 9] (stored as 7, 9 with 4 bits), 4 indices of 2 bits: 1, 2, 0, 2
        let data = [
            0b1010_0100, // 1 byte count, lut, 4 bits
            4,           // element count
            3,           // lut size including the zero
            0x97,        // 7 | 9 << 4
            0b1000_1001, // 1 | 2 << 2 | 0 << 4 | 2 << 6
        ];

        let mut reader = ByteReader::new(&data);
        assert_eq!(decode(&mut reader, 4, 3)?, vec![7, 9, 0, 9]);
        assert_eq!(reader.remaining(), 0);
        Ok(())
    }

    #[test]
    fn too_many_elements() {
        let data = [0b1000_0000, 5];
        assert!(decode(&mut ByteReader::new(&data), 4, 3).is_err());
    }
}
