use inf::CategoricLegend;

use crate::{DecodedRaster, Result, attributetable::ClassificationTable, bitmap::TileBitmap};

/// Maps every pixel of the raster to the color of its class
///
/// Masked pixels, pixels with a value that is not in the table and pixels of the "No Data" class are transparent,
/// the other pixels get the class color with an alpha of `round(255 * opacity)`.
pub fn colorize(raster: &DecodedRaster, table: &ClassificationTable, opacity: f32) -> Result<TileBitmap> {
    colorize_with_legend(raster, &table.legend(opacity))
}

/// Colorizes with a prepared legend of the classification table
pub fn colorize_with_legend(raster: &DecodedRaster, legend: &CategoricLegend) -> Result<TileBitmap> {
    raster.check_shape()?;

    let colors = legend.apply_to_data(&raster.pixels, raster.mask.as_deref())?;
    TileBitmap::from_colors(raster.width, raster.height, colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, RasterClassAttribute};

    fn land_cover() -> ClassificationTable {
        ClassificationTable::new(vec![
            RasterClassAttribute::new(1, 10, 20, 30, "Forest"),
            RasterClassAttribute::new(2, 0, 0, 0, "No Data"),
        ])
    }

    #[test_log::test]
    fn classify_pixels() -> Result<()> {
        let raster = DecodedRaster::new(3, 1, vec![1, 2, 9]);
        let bitmap = colorize(&raster, &land_cover(), 1.0)?;
        assert_eq!(bitmap.as_rgba_bytes(), &[10, 20, 30, 255, 0, 0, 0, 0, 0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn masked_pixels_are_transparent() -> Result<()> {
        let raster = DecodedRaster::new(2, 2, vec![1, 1, 1, 1]).with_mask(vec![true, false, false, true]);
        let bitmap = colorize(&raster, &land_cover(), 1.0)?;
        assert_eq!(
            bitmap.as_rgba_bytes(),
            &[10, 20, 30, 255, 0, 0, 0, 0, 0, 0, 0, 0, 10, 20, 30, 255]
        );
        Ok(())
    }

    #[test]
    fn opacity_scales_alpha() -> Result<()> {
        let raster = DecodedRaster::new(1, 1, vec![1]);
        assert_eq!(colorize(&raster, &land_cover(), 0.5)?.as_rgba_bytes(), &[10, 20, 30, 128]);
        assert_eq!(colorize(&raster, &land_cover(), 0.0)?.as_rgba_bytes(), &[10, 20, 30, 0]);
        Ok(())
    }

    #[test]
    fn colorize_is_deterministic() -> Result<()> {
        let raster = DecodedRaster::new(4, 2, vec![1, 2, 3, 1, 9, 1, 2, 1]);
        let table = land_cover();
        assert_eq!(colorize(&raster, &table, 0.8)?, colorize(&raster, &table, 0.8)?);
        Ok(())
    }

    #[test]
    fn empty_table_renders_nothing() -> Result<()> {
        let raster = DecodedRaster::new(2, 1, vec![1, 2]);
        let bitmap = colorize(&raster, &ClassificationTable::default(), 1.0)?;
        assert_eq!(bitmap.visible_pixel_count(), 0);
        Ok(())
    }

    #[test]
    fn unexpected_shape() {
        let raster = DecodedRaster::new(3, 3, vec![1, 2, 9]);
        assert!(matches!(colorize(&raster, &land_cover(), 1.0), Err(Error::UnexpectedPayload(_))));
    }
}
