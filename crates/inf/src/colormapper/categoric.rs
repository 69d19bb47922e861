use std::collections::HashMap;

use crate::{Color, color};

/// Values in the range [0, MAX_LOOKUP_SIZE] are resolved through a flat table
const MAX_LOOKUP_SIZE: i64 = 512;

/// Categoric numeric color mapper (single numeric value → color)
/// Each value gets its color based on the exact category match,
/// values without a category map to the unmapped color.
#[derive(Default, Clone, Debug)]
pub struct CategoricNumeric {
    categories: HashMap<i64, Color>,
    fast_lookup: Option<Vec<u32>>,
    unmapped: Color,
}

impl CategoricNumeric {
    fn create_fast_lookup(categories: &HashMap<i64, Color>, unmapped: Color) -> Option<Vec<u32>> {
        let min_cat = *categories.keys().min()?;
        let max_cat = *categories.keys().max()?;
        if min_cat < 0 || max_cat > MAX_LOOKUP_SIZE {
            return None;
        }

        let mut lookup = vec![unmapped.to_bits(); (max_cat + 1) as usize];
        for (cat, color) in categories {
            lookup[*cat as usize] = color.to_bits();
        }

        Some(lookup)
    }

    /// The first occurrence of a value wins, later duplicates are ignored
    pub fn new(categories: impl IntoIterator<Item = (i64, Color)>, unmapped: Color) -> Self {
        let mut category_map = HashMap::new();
        for (value, color) in categories {
            category_map.entry(value).or_insert(color);
        }

        let fast_lookup = CategoricNumeric::create_fast_lookup(&category_map, unmapped);
        CategoricNumeric {
            categories: category_map,
            fast_lookup,
            unmapped,
        }
    }

    #[inline]
    pub fn color_for_value(&self, value: i64) -> Color {
        if let Some(lookup) = &self.fast_lookup {
            return usize::try_from(value)
                .ok()
                .and_then(|index| lookup.get(index))
                .map_or(self.unmapped, |bits| Color::from_bits(*bits));
        }

        self.categories.get(&value).copied().unwrap_or(self.unmapped)
    }

    pub fn has_fast_lookup(&self) -> bool {
        self.fast_lookup.is_some()
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn empty() -> Self {
        CategoricNumeric {
            unmapped: color::TRANSPARENT,
            ..Default::default()
        }
    }
}
