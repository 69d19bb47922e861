//! Huffman coding of Byte and Char bands
//!
//! Codes are read most significant bit first from little-endian 32-bit words.
//! Short codes are resolved with a lookup table, longer codes walk a tree.

use crate::{LercError, Result, bitstuff, reader::ByteReader};

const MAX_LUT_BITS: u32 = 12;
const MAX_TABLE_SIZE: i32 = 1 << 15;

/// Reads bits most significant bit first from a stream of little-endian 32-bit words
pub(crate) struct BitCursor<'a> {
    data: &'a [u8],
    pos: usize,
    bit_pos: u32,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitCursor { data, pos: 0, bit_pos: 0 }
    }

    fn word(&self, pos: usize) -> Option<u32> {
        let bytes = self.data.get(pos..pos + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// The next `count` bits (1 to 32) without consuming them
    fn peek(&self, count: u32) -> Result<u32> {
        let current = self.word(self.pos).ok_or(LercError::UnexpectedEof)? as u64;
        let next = self.word(self.pos + 4).unwrap_or(0) as u64;
        let bits = (current << 32) | next;
        Ok(((bits << self.bit_pos) >> (64 - count)) as u32)
    }

    fn consume(&mut self, count: u32) {
        self.bit_pos += count;
        self.pos += 4 * (self.bit_pos / 32) as usize;
        self.bit_pos %= 32;
    }

    pub fn read(&mut self, count: u32) -> Result<u32> {
        let value = self.peek(count)?;
        self.consume(count);
        Ok(value)
    }

    /// Bytes used by the stream, a started word counts as used
    pub fn bytes_used(&self) -> usize {
        self.pos + if self.bit_pos > 0 { 4 } else { 0 }
    }
}

#[derive(Debug, Default, Clone)]
struct TreeNode {
    // index 0 is the root, so it doubles as "no child"
    children: [usize; 2],
    symbol: Option<u16>,
}

#[derive(Debug, Clone, Copy)]
struct LutEntry {
    len: u32,
    symbol: u16,
}

#[derive(Debug)]
pub(crate) struct HuffmanDecoder {
    lut: Vec<Option<LutEntry>>,
    lut_bits: u32,
    tree: Vec<TreeNode>,
    tree_skip_bits: u32,
}

impl HuffmanDecoder {
    /// Reads the code table that precedes the Huffman coded data
    pub fn read(reader: &mut ByteReader, version: i32) -> Result<HuffmanDecoder> {
        let table_version = reader.read_i32()?;
        if table_version < 2 {
            return Err(LercError::Huffman(format!("Unsupported code table version {table_version}")));
        }

        let size = reader.read_i32()?;
        let i0 = reader.read_i32()?;
        let i1 = reader.read_i32()?;
        if size <= 0 || size > MAX_TABLE_SIZE || i0 < 0 || i0 >= i1 || i0 >= size || i1 - 1 >= 2 * size {
            return Err(LercError::Huffman(format!("Invalid code table range (size {size}, i0 {i0}, i1 {i1})")));
        }

        // the range may wrap around the end of the table
        let symbols: Vec<usize> = (i0..i1).map(|i| (i % size) as usize).collect();
        let lengths = bitstuff::decode(reader, symbols.len(), version)?;
        if lengths.len() != symbols.len() {
            return Err(LercError::Huffman("Code length count mismatch".into()));
        }

        let mut cursor = BitCursor::new(reader.rest());
        let mut codes = Vec::new();
        for (&symbol, &len) in symbols.iter().zip(&lengths) {
            if len == 0 {
                continue;
            }

            if len > 32 {
                return Err(LercError::Huffman(format!("Invalid code length {len}")));
            }

            codes.push((symbol as u16, len, cursor.read(len)?));
        }

        reader.skip(cursor.bytes_used())?;
        HuffmanDecoder::from_codes(&codes)
    }

    /// Builds the decoder from (symbol, code length, code) triplets
    fn from_codes(codes: &[(u16, u32, u32)]) -> Result<HuffmanDecoder> {
        let max_len = codes
            .iter()
            .map(|&(_, len, _)| len)
            .max()
            .ok_or_else(|| LercError::Huffman("Empty code table".into()))?;

        let lut_bits = max_len.min(MAX_LUT_BITS);
        let mut lut = vec![None; 1 << lut_bits];
        let mut tree_skip_bits = 32;

        for &(symbol, len, code) in codes {
            if len <= lut_bits {
                let first = (code << (lut_bits - len)) as usize;
                let count = 1usize << (lut_bits - len);
                lut[first..first + count].fill(Some(LutEntry { len, symbol }));
            } else {
                let significant_bits = u32::BITS - code.leading_zeros();
                tree_skip_bits = tree_skip_bits.min(len - significant_bits.max(1));
            }
        }

        let mut decoder = HuffmanDecoder {
            lut,
            lut_bits,
            tree: Vec::new(),
            tree_skip_bits: 0,
        };

        if max_len > lut_bits {
            decoder.tree_skip_bits = tree_skip_bits;
            decoder.tree.push(TreeNode::default());
            for &(symbol, len, code) in codes.iter().filter(|(_, len, _)| *len > lut_bits) {
                decoder.insert_tree_code(symbol, len - tree_skip_bits, code);
            }
        }

        Ok(decoder)
    }

    fn insert_tree_code(&mut self, symbol: u16, len: u32, code: u32) {
        let mut node = 0;
        for bit in (0..len).rev() {
            let branch = ((code >> bit) & 1) as usize;
            if self.tree[node].children[branch] == 0 {
                self.tree.push(TreeNode::default());
                let child = self.tree.len() - 1;
                self.tree[node].children[branch] = child;
            }

            node = self.tree[node].children[branch];
        }

        self.tree[node].symbol = Some(symbol);
    }

    pub fn decode_symbol(&self, cursor: &mut BitCursor) -> Result<u16> {
        let prefix = cursor.peek(self.lut_bits)? as usize;
        if let Some(entry) = self.lut[prefix] {
            cursor.consume(entry.len);
            return Ok(entry.symbol);
        }

        if self.tree.is_empty() {
            return Err(LercError::Huffman(format!("Invalid code prefix {prefix:#x}")));
        }

        cursor.consume(self.tree_skip_bits);
        let mut node = 0;
        loop {
            let branch = cursor.read(1)? as usize;
            node = self.tree[node].children[branch];
            if node == 0 {
                return Err(LercError::Huffman("Code not in the decode tree".into()));
            }

            if let Some(symbol) = self.tree[node].symbol {
                return Ok(symbol);
            }
        }
    }
}
