//! Minimal LERC2 (version 3) writer for integer bands, produces payloads for tests
//!
//! The writer is lossless (max z error 0.5) and only uses the encodings the decoder needs to be tested with:
//! raw values in one sweep or micro block tiles with zero, constant and bit stuffed blocks.

use crate::{DataType, fletcher32, header::FILE_KEY};

const VERSION: i32 = 3;
const BLOB_SIZE_OFFSET: usize = FILE_KEY.len() + 4 + 4 + 4 * 4;
const CHECKSUM_OFFSET: usize = FILE_KEY.len() + 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    OneSweep,
    Tiled,
}

#[derive(Debug, Clone)]
pub struct BlobWriter {
    width: usize,
    height: usize,
    data_type: DataType,
    values: Vec<i64>,
    mask: Option<Vec<bool>>,
    encoding: Encoding,
    micro_block_size: usize,
}

impl BlobWriter {
    /// # Panics
    /// When the number of values does not match the dimensions
    pub fn new(width: usize, height: usize, data_type: DataType, values: Vec<i64>) -> Self {
        assert_eq!(values.len(), width * height, "value count does not match the dimensions");
        BlobWriter {
            width,
            height,
            data_type,
            values,
            mask: None,
            encoding: Encoding::Tiled,
            micro_block_size: 8,
        }
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        assert_eq!(mask.len(), self.values.len(), "mask length does not match the dimensions");
        self.mask = Some(mask);
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_micro_block_size(mut self, size: usize) -> Self {
        self.micro_block_size = size;
        self
    }

    fn is_valid(&self, index: usize) -> bool {
        self.mask.as_ref().is_none_or(|mask| mask[index])
    }

    pub fn encode(&self) -> Vec<u8> {
        let valid: Vec<i64> = (0..self.values.len()).filter(|&i| self.is_valid(i)).map(|i| self.values[i]).collect();
        let z_min = valid.iter().min().copied().unwrap_or(0);
        let z_max = valid.iter().max().copied().unwrap_or(0);

        let mut blob = header(self.width, self.height, valid.len(), self.micro_block_size, self.data_type, z_min, z_max);
        if valid.is_empty() || valid.len() == self.values.len() {
            push_i32(&mut blob, 0);
        } else {
            let mut bits = vec![0u8; self.values.len().div_ceil(8)];
            for index in (0..self.values.len()).filter(|&i| self.is_valid(i)) {
                bits[index >> 3] |= 0x80 >> (index & 7);
            }

            let encoded = rle_encode(&bits);
            push_i32(&mut blob, encoded.len() as i32);
            blob.extend_from_slice(&encoded);
        }

        if !valid.is_empty() && z_min != z_max {
            match self.encoding {
                Encoding::OneSweep => {
                    blob.push(1);
                    for value in valid {
                        push_value(&mut blob, self.data_type, value);
                    }
                }
                Encoding::Tiled => {
                    blob.push(0);
                    if matches!(self.data_type, DataType::Byte | DataType::Char) {
                        // image encode mode: tiling
                        blob.push(0);
                    }
                    self.write_tiles(&mut blob);
                }
            }
        }

        finish(blob)
    }

    fn write_tiles(&self, blob: &mut Vec<u8>) {
        let block = self.micro_block_size;
        for row0 in (0..self.height).step_by(block) {
            for col0 in (0..self.width).step_by(block) {
                let indices: Vec<usize> = (row0..(row0 + block).min(self.height))
                    .flat_map(|row| (col0..(col0 + block).min(self.width)).map(move |col| row * self.width + col))
                    .collect();
                let valid: Vec<i64> = indices.iter().filter(|&&i| self.is_valid(i)).map(|&i| self.values[i]).collect();

                let integrity = (((col0 >> 3) & 15) as u8) << 2;
                let (Some(&min), Some(&max)) = (valid.iter().min(), valid.iter().max()) else {
                    blob.push(2 | integrity);
                    continue;
                };

                if min == max && min == 0 {
                    blob.push(2 | integrity);
                } else if min == max {
                    blob.push(3 | integrity);
                    push_value(blob, self.data_type, min);
                } else {
                    blob.push(1 | integrity);
                    push_value(blob, self.data_type, min);
                    // a fully valid block stores every pixel, so both cases store the valid values in order
                    let quantized: Vec<u32> = valid.iter().map(|v| (v - min) as u32).collect();
                    push_bit_stuffed(blob, &quantized);
                }
            }
        }
    }
}

/// An all valid blob with a custom body following the mask section
pub fn raw_blob(width: usize, height: usize, data_type: DataType, z_min: i64, z_max: i64, body: &[u8]) -> Vec<u8> {
    let mut blob = header(width, height, width * height, 8, data_type, z_min, z_max);
    push_i32(&mut blob, 0);
    blob.extend_from_slice(body);
    finish(blob)
}

/// A blob without valid pixels, the header is all there is
pub fn empty_blob(width: usize, height: usize, data_type: DataType) -> Vec<u8> {
    let mut blob = header(width, height, 0, 8, data_type, 0, 0);
    push_i32(&mut blob, 0);
    finish(blob)
}

fn header(width: usize, height: usize, valid: usize, micro_block_size: usize, data_type: DataType, z_min: i64, z_max: i64) -> Vec<u8> {
    let mut blob = FILE_KEY.to_vec();
    push_i32(&mut blob, VERSION);
    blob.extend_from_slice(&0u32.to_le_bytes());
    for value in [height, width, valid, micro_block_size, 0, data_type as usize] {
        push_i32(&mut blob, value as i32);
    }

    for value in [0.5, z_min as f64, z_max as f64] {
        blob.extend_from_slice(&f64::to_le_bytes(value));
    }

    blob
}

fn finish(mut blob: Vec<u8>) -> Vec<u8> {
    let size = (blob.len() as i32).to_le_bytes();
    blob[BLOB_SIZE_OFFSET..BLOB_SIZE_OFFSET + 4].copy_from_slice(&size);
    let checksum = fletcher32(&blob[CHECKSUM_OFFSET + 4..]).to_le_bytes();
    blob[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum);
    blob
}

fn push_i32(blob: &mut Vec<u8>, value: i32) {
    blob.extend_from_slice(&value.to_le_bytes());
}

fn push_value(blob: &mut Vec<u8>, data_type: DataType, value: i64) {
    match data_type {
        DataType::Char => blob.push(value as i8 as u8),
        DataType::Byte => blob.push(value as u8),
        DataType::Short => blob.extend_from_slice(&(value as i16).to_le_bytes()),
        DataType::UShort => blob.extend_from_slice(&(value as u16).to_le_bytes()),
        DataType::Int => blob.extend_from_slice(&(value as i32).to_le_bytes()),
        DataType::UInt => blob.extend_from_slice(&(value as u32).to_le_bytes()),
        DataType::Float => blob.extend_from_slice(&(value as f32).to_le_bytes()),
        DataType::Double => blob.extend_from_slice(&(value as f64).to_le_bytes()),
    }
}

fn rle_encode(bytes: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::new();
    for chunk in bytes.chunks(i16::MAX as usize) {
        encoded.extend_from_slice(&(chunk.len() as i16).to_le_bytes());
        encoded.extend_from_slice(chunk);
    }
    encoded.extend_from_slice(&i16::MIN.to_le_bytes());
    encoded
}

fn push_bit_stuffed(blob: &mut Vec<u8>, values: &[u32]) {
    let count = values.len();
    let max = values.iter().max().copied().unwrap_or(0);
    let num_bits = u32::BITS - max.leading_zeros();
    assert!(num_bits < 32, "value range too large to bit stuff");

    let (count_width, count_bytes) = match count {
        0..=255 => (2u8, vec![count as u8]),
        256..=65535 => (1u8, (count as u16).to_le_bytes().to_vec()),
        _ => (0u8, (count as u32).to_le_bytes().to_vec()),
    };
    blob.push((count_width << 6) | num_bits as u8);
    blob.extend_from_slice(&count_bytes);
    if num_bits == 0 {
        return;
    }

    let total_bits = count * num_bits as usize;
    let mut words = vec![0u32; total_bits.div_ceil(32)];
    for (i, &value) in values.iter().enumerate() {
        let bit = i * num_bits as usize;
        let (index, shift) = (bit / 32, (bit % 32) as u32);
        words[index] |= value << shift;
        if shift + num_bits > 32 {
            words[index + 1] |= value >> (32 - shift);
        }
    }

    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    blob.extend_from_slice(&bytes[..total_bits.div_ceil(8)]);
}
