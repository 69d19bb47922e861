use crate::{Error, Result};

/// The first band of a decoded tile payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRaster {
    pub width: usize,
    pub height: usize,
    /// Row-major pixel values
    pub pixels: Vec<i64>,
    /// Row-major validity (`true` is valid), `None` when every pixel is valid
    pub mask: Option<Vec<bool>>,
}

impl DecodedRaster {
    pub fn new(width: usize, height: usize, pixels: Vec<i64>) -> Self {
        DecodedRaster {
            width,
            height,
            pixels,
            mask: None,
        }
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Fails when the pixel values or the mask do not cover the raster dimensions
    pub fn check_shape(&self) -> Result<()> {
        if self.pixel_count() == 0 {
            return Err(Error::UnexpectedPayload(format!("Empty raster ({}x{})", self.width, self.height)));
        }

        if self.pixels.len() != self.pixel_count() {
            return Err(Error::UnexpectedPayload(format!(
                "{} pixel values for a {}x{} raster",
                self.pixels.len(),
                self.width,
                self.height
            )));
        }

        if let Some(mask) = &self.mask
            && mask.len() != self.pixel_count()
        {
            return Err(Error::UnexpectedPayload(format!(
                "Mask of {} values for a {}x{} raster",
                mask.len(),
                self.width,
                self.height
            )));
        }

        Ok(())
    }
}

/// Turns a compressed tile payload into pixel values
pub trait RasterDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedRaster>;
}

/// Decoder for LERC2 encoded tiles
#[derive(Debug, Clone, Copy, Default)]
pub struct LercDecoder;

impl RasterDecoder for LercDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedRaster> {
        let band = lerc_decoder::decode(bytes)?;
        log::trace!(
            "Decoded {}x{} {:?} band ({} valid pixels)",
            band.width,
            band.height,
            band.data_type,
            band.valid_pixel_count()
        );

        Ok(DecodedRaster {
            width: band.width,
            height: band.height,
            pixels: band.pixels,
            mask: band.mask,
        })
    }
}
