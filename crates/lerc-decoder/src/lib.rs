//! LERC (Limited Error Raster Compression) decoder in pure Rust
//!
//! Decodes the first band of LERC2 blobs (versions 1 to 6) holding integer data with a single value per pixel,
//! the typical payload of classified raster tiles.
//!
//! # Example
//! ```no_run
//! let lerc_blob: &[u8] = &[/* ... lerc encoded data ... */];
//! let info = lerc_decoder::blob_info(lerc_blob)?;
//! let band = lerc_decoder::decode(lerc_blob)?;
//! assert_eq!(band.pixels.len(), info.width * info.height);
//! # Ok::<(), lerc_decoder::LercError>(())
//! ```

mod bitstuff;
mod decoder;
mod error;
mod header;
mod huffman;
mod mask;
mod reader;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use decoder::DecodedBand;
pub use error::{LercError, Result};
pub use header::{DataType, HeaderInfo, MAX_PIXEL_COUNT, fletcher32};
pub use mask::BitMask;

/// Information about a LERC blob
#[derive(Debug, Clone, PartialEq)]
pub struct BlobInfo {
    /// LERC2 version of the first band
    pub version: i32,
    pub width: usize,
    pub height: usize,
    /// Number of values per pixel
    pub depth: usize,
    pub valid_pixel_count: usize,
    /// Number of consecutive Lerc2 blobs
    pub band_count: usize,
    /// Size in bytes of all the bands
    pub blob_size: usize,
    pub data_type: DataType,
    pub z_min: f64,
    pub z_max: f64,
    pub max_z_error: f64,
}

impl BlobInfo {
    pub fn has_mask(&self) -> bool {
        self.valid_pixel_count < self.width * self.height
    }
}

/// Reads the blob headers without decoding the pixels
pub fn blob_info(data: &[u8]) -> Result<BlobInfo> {
    let header = HeaderInfo::parse(data)?;
    let (band_count, blob_size) = header::count_bands(data)?;

    Ok(BlobInfo {
        version: header.version,
        width: header.cols as usize,
        height: header.rows as usize,
        depth: header.depth as usize,
        valid_pixel_count: header.valid_pixel_count as usize,
        band_count,
        blob_size,
        data_type: header.data_type,
        z_min: header.z_min,
        z_max: header.z_max,
        max_z_error: header.max_z_error,
    })
}

/// Decodes the first band of the blob
///
/// Floating point data and blobs with more than one value per pixel are not supported.
pub fn decode(data: &[u8]) -> Result<DecodedBand> {
    decoder::decode_band(data)
}
