use thiserror::Error;

use crate::DataType;

pub type Result<T> = std::result::Result<T, LercError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LercError {
    #[error("Invalid LERC data: {0}")]
    InvalidData(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Unsupported LERC version: {0}")]
    UnsupportedVersion(i32),
    #[error("Unsupported data type: {0:?}")]
    UnsupportedDataType(DataType),
    #[error("Unsupported pixel depth: {0}")]
    UnsupportedDepth(i32),
    #[error("Checksum mismatch (expected {expected:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { expected: u32, computed: u32 },
    #[error("Invalid mask: {0}")]
    InvalidMask(String),
    #[error("Huffman decoding error: {0}")]
    Huffman(String),
    #[error("RLE decoding error: {0}")]
    Rle(String),
    #[error("Bit stuffer error: {0}")]
    BitStuffer(String),
    #[error("Unexpected end of data")]
    UnexpectedEof,
}
