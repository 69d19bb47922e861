use crate::{
    Color, Error, Result,
    color::{self},
    colormapper::CategoricNumeric,
};

/// Options for mapping values that can not be mapped by the legend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct MappingConfig {
    /// The color of the nodata pixels (masked values, values without a category and hidden categories)
    pub nodata_color: Color,
    /// Categories with this name are rendered with the nodata color
    pub nodata_category: Option<String>,
    /// Opacity in the range [0, 1] applied to the colors of the categories
    pub opacity: f32,
}

impl MappingConfig {
    pub fn new(nodata_color: Color, nodata_category: Option<String>, opacity: f32) -> Self {
        MappingConfig {
            nodata_color,
            nodata_category,
            opacity,
        }
    }

    /// The alpha value of a fully opaque category color after applying the opacity
    pub fn alpha(&self) -> u8 {
        apply_opacity(255, self.opacity)
    }

    fn is_nodata_category(&self, category: &LegendCategory) -> bool {
        self.nodata_category.as_deref() == Some(category.name.as_str())
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        MappingConfig {
            nodata_color: color::TRANSPARENT,
            nodata_category: None,
            opacity: 1.0,
        }
    }
}

/// Scales an alpha value with the opacity, the opacity is clamped to [0, 1]
pub fn apply_opacity(alpha: u8, opacity: f32) -> u8 {
    let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
    (alpha as f32 * opacity).round() as u8
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Default, Clone, Debug, PartialEq)]
pub struct LegendCategory {
    pub color: Color,
    pub name: String,
}

impl LegendCategory {
    pub fn new(color: Color, name: impl Into<String>) -> Self {
        LegendCategory { color, name: name.into() }
    }
}

/// Legend for categoric rasters: every category is a single numeric value
#[derive(Clone, Debug)]
pub struct CategoricLegend {
    categories: Vec<(i64, LegendCategory)>,
    mapper: CategoricNumeric,
    mapping_config: MappingConfig,
}

impl Default for CategoricLegend {
    fn default() -> Self {
        CategoricLegend {
            categories: Vec::new(),
            mapper: CategoricNumeric::empty(),
            mapping_config: MappingConfig::default(),
        }
    }
}

impl CategoricLegend {
    /// When a value occurs more than once, the first category is used for the color mapping
    pub fn new(categories: Vec<(i64, LegendCategory)>, mapping_config: MappingConfig) -> Self {
        let mapped_colors = categories.iter().map(|(value, category)| {
            let color = if mapping_config.is_nodata_category(category) {
                mapping_config.nodata_color
            } else {
                category.color.with_alpha(apply_opacity(category.color.a, mapping_config.opacity))
            };

            (*value, color)
        });

        let mapper = CategoricNumeric::new(mapped_colors, mapping_config.nodata_color);
        log::debug!(
            "Categoric legend with {} categories (fast lookup: {})",
            mapper.category_count(),
            mapper.has_fast_lookup()
        );

        CategoricLegend {
            categories,
            mapper,
            mapping_config,
        }
    }

    pub fn mapping_config(&self) -> &MappingConfig {
        &self.mapping_config
    }

    pub fn color_for_value(&self, value: i64) -> Color {
        self.mapper.color_for_value(value)
    }

    /// Maps every value to its color, values with a `false` mask entry get the nodata color
    pub fn apply_to_data(&self, data: &[i64], mask: Option<&[bool]>) -> Result<Vec<Color>> {
        match mask {
            Some(mask) => {
                if mask.len() != data.len() {
                    return Err(Error::InvalidArgument(format!(
                        "Mask length ({}) does not match the data length ({})",
                        mask.len(),
                        data.len()
                    )));
                }

                Ok(data
                    .iter()
                    .zip(mask)
                    .map(|(&value, &valid)| {
                        if valid {
                            self.color_for_value(value)
                        } else {
                            self.mapping_config.nodata_color
                        }
                    })
                    .collect())
            }
            None => Ok(data.iter().map(|&value| self.color_for_value(value)).collect()),
        }
    }

    /// The categories in their original order, duplicates included
    pub fn legend_entries(&self) -> &[(i64, LegendCategory)] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
