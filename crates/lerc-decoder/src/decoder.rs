use crate::{
    DataType, HeaderInfo, LercError, Result, bitstuff,
    huffman::{BitCursor, HuffmanDecoder},
    mask::BitMask,
    reader::ByteReader,
};

const MAX_MICRO_BLOCK_SIZE: i32 = 32;

/// Tile compression modes stored in the low two bits of a tile header
const TILE_RAW: u8 = 0;
const TILE_BIT_STUFFED: u8 = 1;
const TILE_ZERO: u8 = 2;
const TILE_CONSTANT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageEncodeMode {
    Tiling,
    DeltaHuffman,
    Huffman,
}

impl ImageEncodeMode {
    fn from_flag(flag: u8, version: i32) -> Result<Self> {
        match flag {
            0 => Ok(ImageEncodeMode::Tiling),
            1 => Ok(ImageEncodeMode::DeltaHuffman),
            2 if version >= 4 => Ok(ImageEncodeMode::Huffman),
            _ => Err(LercError::InvalidData(format!("Invalid image encode mode {flag} for version {version}"))),
        }
    }
}

/// The first band of a LERC2 blob
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBand {
    pub width: usize,
    pub height: usize,
    pub data_type: DataType,
    /// Row-major pixel values, invalid pixels are 0
    pub pixels: Vec<i64>,
    /// Row-major validity (`true` is valid), `None` when every pixel is valid
    pub mask: Option<Vec<bool>>,
}

impl DecodedBand {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_valid(&self, index: usize) -> bool {
        match &self.mask {
            Some(mask) => mask.get(index).copied().unwrap_or(false),
            None => index < self.pixel_count(),
        }
    }

    pub fn valid_pixel_count(&self) -> usize {
        match &self.mask {
            Some(mask) => mask.iter().filter(|valid| **valid).count(),
            None => self.pixel_count(),
        }
    }
}

struct BandDecoder<'h> {
    header: &'h HeaderInfo,
    mask: BitMask,
    pixels: Vec<i64>,
}

pub(crate) fn decode_band(blob: &[u8]) -> Result<DecodedBand> {
    let mut reader = ByteReader::new(blob);
    let header = HeaderInfo::read(&mut reader)?;
    header.verify_checksum(blob)?;

    if header.depth != 1 {
        return Err(LercError::UnsupportedDepth(header.depth));
    }

    if !header.data_type.is_integer() {
        return Err(LercError::UnsupportedDataType(header.data_type));
    }

    if header.version < 3 && blob.len() < header.blob_size() {
        return Err(LercError::UnexpectedEof);
    }

    let pixel_count = header.pixel_count();
    let valid_pixel_count = header.valid_pixel_count as usize;
    let mask = BitMask::read(&mut reader, pixel_count, valid_pixel_count)?;

    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(pixel_count)
        .map_err(|err| LercError::InvalidHeader(format!("Failed to allocate {pixel_count} pixels: {err}")))?;
    pixels.resize(pixel_count, 0);

    let mut band = BandDecoder {
        header: &header,
        mask,
        pixels,
    };
    band.read_pixels(&mut reader)?;

    log::trace!(
        "Decoded Lerc2 v{} band: {}x{} {:?}, {} valid pixels",
        header.version,
        header.cols,
        header.rows,
        header.data_type,
        valid_pixel_count
    );

    let mask = (valid_pixel_count < pixel_count).then(|| band.mask.to_vec());
    Ok(DecodedBand {
        width: header.cols as usize,
        height: header.rows as usize,
        data_type: header.data_type,
        pixels: band.pixels,
        mask,
    })
}

impl BandDecoder<'_> {
    fn read_pixels(&mut self, reader: &mut ByteReader) -> Result<()> {
        let header = self.header;
        if header.valid_pixel_count == 0 {
            return Ok(());
        }

        if header.z_min == header.z_max {
            self.fill_constant(header.z_min);
            return Ok(());
        }

        if header.version >= 4 {
            // per depth ranges, a single depth is supported
            let z_min = reader.read_value(header.data_type)?;
            let z_max = reader.read_value(header.data_type)?;
            if z_min == z_max {
                self.fill_constant(z_min);
                return Ok(());
            }
        }

        let one_sweep = reader.read_u8()? != 0;
        if one_sweep {
            return self.read_one_sweep(reader);
        }

        if header.huffman_allowed() {
            match ImageEncodeMode::from_flag(reader.read_u8()?, header.version)? {
                ImageEncodeMode::Tiling => {}
                ImageEncodeMode::DeltaHuffman => return self.read_huffman(reader, true),
                ImageEncodeMode::Huffman => return self.read_huffman(reader, false),
            }
        }

        self.read_tiles(reader)
    }

    fn fill_constant(&mut self, value: f64) {
        let value = self.header.data_type.cast(value);
        for (index, pixel) in self.pixels.iter_mut().enumerate() {
            if self.mask.is_valid(index) {
                *pixel = value;
            }
        }
    }

    /// Raw values of the valid pixels
    fn read_one_sweep(&mut self, reader: &mut ByteReader) -> Result<()> {
        let data_type = self.header.data_type;
        for index in 0..self.pixels.len() {
            if self.mask.is_valid(index) {
                self.pixels[index] = data_type.cast(reader.read_value(data_type)?);
            }
        }

        Ok(())
    }

    fn read_huffman(&mut self, reader: &mut ByteReader, delta: bool) -> Result<()> {
        let decoder = HuffmanDecoder::read(reader, self.header.version)?;
        let data_type = self.header.data_type;
        let offset = if data_type == DataType::Char { 128 } else { 0 };
        let width = self.header.cols as usize;

        let mut cursor = BitCursor::new(reader.rest());
        let mut prev = 0i64;
        for index in 0..self.pixels.len() {
            if !self.mask.is_valid(index) {
                continue;
            }

            let value = decoder.decode_symbol(&mut cursor)? as i64 - offset;
            if !delta {
                self.pixels[index] = value;
                continue;
            }

            let (row, col) = (index / width, index % width);
            let predictor = if col > 0 && self.mask.is_valid(index - 1) {
                prev
            } else if row > 0 && self.mask.is_valid(index - width) {
                self.pixels[index - width]
            } else {
                prev
            };

            prev = data_type.wrap(value + predictor);
            self.pixels[index] = prev;
        }

        // the encoder reserves one extra word after the coded data
        let used = cursor.bytes_used() + 4;
        reader.skip(used.min(reader.remaining()))
    }

    fn read_tiles(&mut self, reader: &mut ByteReader) -> Result<()> {
        let block_size = self.header.micro_block_size;
        if block_size > MAX_MICRO_BLOCK_SIZE {
            return Err(LercError::InvalidData(format!("Micro block size {block_size} too large")));
        }

        let block_size = block_size as usize;
        let rows = self.header.rows as usize;
        let cols = self.header.cols as usize;

        for row0 in (0..rows).step_by(block_size) {
            let row1 = (row0 + block_size).min(rows);
            for col0 in (0..cols).step_by(block_size) {
                let col1 = (col0 + block_size).min(cols);
                self.read_tile(reader, row0..row1, col0..col1)?;
            }
        }

        Ok(())
    }

    /// Indices of the valid pixels of a tile in row-major order
    fn valid_tile_indices(&self, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Vec<usize> {
        let width = self.header.cols as usize;
        rows.flat_map(|row| cols.clone().map(move |col| row * width + col))
            .filter(|&index| self.mask.is_valid(index))
            .collect()
    }

    fn read_tile(&mut self, reader: &mut ByteReader, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Result<()> {
        let header = self.header;
        let flags = reader.read_u8()?;

        let pattern = if header.version >= 5 { 14 } else { 15 };
        if (flags >> 2) & pattern != ((cols.start >> 3) as u8) & pattern {
            return Err(LercError::InvalidData(format!("Tile integrity check failed at column {}", cols.start)));
        }

        if header.version >= 5 && flags & 4 != 0 {
            // difference to the previous depth, there is no previous depth for the first one
            return Err(LercError::InvalidData("Difference encoding in the first depth".into()));
        }

        let valid = self.valid_tile_indices(rows.clone(), cols.clone());
        match flags & 3 {
            TILE_ZERO => {
                for index in valid {
                    self.pixels[index] = 0;
                }
            }
            TILE_RAW => {
                for index in valid {
                    self.pixels[index] = header.data_type.cast(reader.read_value(header.data_type)?);
                }
            }
            mode => {
                let offset_type = header.data_type.reduced(flags >> 6)?;
                let offset = reader.read_value(offset_type)?;

                if mode == TILE_CONSTANT {
                    let value = header.data_type.cast(offset);
                    for index in valid {
                        self.pixels[index] = value;
                    }
                    return Ok(());
                }

                if mode != TILE_BIT_STUFFED {
                    return Err(LercError::InvalidData(format!("Invalid tile compression mode {mode}")));
                }

                let tile_size = rows.len() * cols.len();
                let quantized = bitstuff::decode(reader, tile_size, header.version)?;
                let scale = 2.0 * header.max_z_error;
                let dequantize = |q: u32| header.data_type.cast((offset + q as f64 * scale).min(header.z_max));

                if quantized.len() == tile_size {
                    // stored for every pixel of the tile
                    let width = header.cols as usize;
                    let indices = rows.flat_map(|row| cols.clone().map(move |col| row * width + col));
                    for (index, q) in indices.zip(quantized) {
                        self.pixels[index] = dequantize(q);
                    }
                } else {
                    if quantized.len() < valid.len() {
                        return Err(LercError::InvalidData(format!(
                            "Tile holds {} values for {} valid pixels",
                            quantized.len(),
                            valid.len()
                        )));
                    }

                    for (index, q) in valid.into_iter().zip(quantized) {
                        self.pixels[index] = dequantize(q);
                    }
                }
            }
        }

        Ok(())
    }
}
