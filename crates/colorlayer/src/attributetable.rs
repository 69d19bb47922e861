use std::collections::HashMap;

use inf::{CategoricLegend, Color, LegendCategory, MappingConfig};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    fetch::{self, Fetcher},
};

/// Pixels classified with this class name are not rendered
pub const NO_DATA_CLASS: &str = "No Data";

/// A row of the raster attribute table of an image service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterClassAttribute {
    #[serde(rename = "Value")]
    pub value: i64,
    #[serde(rename = "Red")]
    pub red: u8,
    #[serde(rename = "Green")]
    pub green: u8,
    #[serde(rename = "Blue")]
    pub blue: u8,
    #[serde(rename = "ClassName")]
    pub class_name: String,
}

impl RasterClassAttribute {
    pub fn new(value: i64, red: u8, green: u8, blue: u8, class_name: impl Into<String>) -> Self {
        RasterClassAttribute {
            value,
            red,
            green,
            blue,
            class_name: class_name.into(),
        }
    }

    pub fn color(&self) -> Color {
        Color::rgb(self.red, self.green, self.blue)
    }

    pub fn is_no_data(&self) -> bool {
        self.class_name == NO_DATA_CLASS
    }
}

#[derive(Deserialize)]
struct AttributeTableDocument {
    features: Option<Vec<Option<AttributeTableRecord>>>,
}

#[derive(Deserialize)]
struct AttributeTableRecord {
    #[serde(default)]
    attributes: Option<RecordAttributes>,
}

/// Attributes as served, missing or null colors and class names are tolerated
#[derive(Deserialize)]
struct RecordAttributes {
    #[serde(rename = "Value", default)]
    value: Option<i64>,
    #[serde(rename = "Red", default)]
    red: Option<u8>,
    #[serde(rename = "Green", default)]
    green: Option<u8>,
    #[serde(rename = "Blue", default)]
    blue: Option<u8>,
    #[serde(rename = "ClassName", default)]
    class_name: Option<String>,
}

impl RecordAttributes {
    /// A record without a value can not classify any pixel
    fn into_row(self) -> Option<RasterClassAttribute> {
        Some(RasterClassAttribute {
            value: self.value?,
            red: self.red.unwrap_or_default(),
            green: self.green.unwrap_or_default(),
            blue: self.blue.unwrap_or_default(),
            class_name: self.class_name.unwrap_or_default(),
        })
    }
}

/// Maps the pixel values of a classified raster to a color and a class name
///
/// When the table contains a value more than once, the first row with that value is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationTable {
    rows: Vec<RasterClassAttribute>,
    index: HashMap<i64, usize>,
}

impl ClassificationTable {
    pub fn new(rows: Vec<RasterClassAttribute>) -> Self {
        let mut index = HashMap::with_capacity(rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            index.entry(row.value).or_insert(row_index);
        }

        ClassificationTable { rows, index }
    }

    /// Parses the json document of the `rasterattributetable` endpoint
    ///
    /// Records without attributes or without a value are skipped, missing colors are black.
    pub fn from_json(json: &[u8]) -> Result<Self> {
        let document: AttributeTableDocument = serde_json::from_slice(json)?;
        let Some(features) = document.features else {
            return Err(Error::InvalidTable("Response does not contain a 'features' array".into()));
        };

        let record_count = features.len();
        let rows: Vec<RasterClassAttribute> = features
            .into_iter()
            .flatten()
            .filter_map(|record| record.attributes.and_then(RecordAttributes::into_row))
            .collect();
        if rows.len() < record_count {
            log::debug!("Skipped {} raster attribute records without a value", record_count - rows.len());
        }

        Ok(ClassificationTable::new(rows))
    }

    /// Fetches the raster attribute table of the image service
    pub async fn load(fetcher: &impl Fetcher, url: &str, token: Option<&str>) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::MissingEndpoint);
        }

        let table_url = fetch::attribute_table_url(url, token);
        log::debug!("Fetch raster attribute table: {}", fetch::redact_token(&table_url));
        let body = fetcher.get(&table_url).await?;
        let table = ClassificationTable::from_json(&body)?;
        log::info!("Loaded raster attribute table with {} classes", table.len());

        Ok(table)
    }

    pub fn lookup(&self, value: i64) -> Option<&RasterClassAttribute> {
        self.index.get(&value).map(|&row_index| &self.rows[row_index])
    }

    pub fn rows(&self) -> &[RasterClassAttribute] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Categoric legend of the table, "No Data" classes and unknown values map to transparent
    pub fn legend(&self, opacity: f32) -> CategoricLegend {
        let categories = self
            .rows
            .iter()
            .map(|row| (row.value, LegendCategory::new(row.color(), row.class_name.clone())))
            .collect();

        CategoricLegend::new(
            categories,
            MappingConfig::new(inf::color::TRANSPARENT, Some(NO_DATA_CLASS.to_string()), opacity),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_JSON: &str = r#"{
        "objectIdFieldName": "OBJECTID",
        "fields": [],
        "features": [
            {"attributes": {"OBJECTID": 1, "Value": 1, "Count": 120, "Red": 10, "Green": 20, "Blue": 30, "ClassName": "Forest"}},
            {"attributes": null},
            {"attributes": {"OBJECTID": 2, "Value": 2, "Red": 0, "Green": 0, "Blue": 0, "ClassName": "No Data"}},
            {},
            {"attributes": {"OBJECTID": 3, "Value": 3, "Red": 0, "Green": 0, "Blue": 255, "ClassName": null}}
        ]
    }"#;

    #[test_log::test]
    fn parse_filters_missing_attributes() -> Result<()> {
        let table = ClassificationTable::from_json(TABLE_JSON.as_bytes())?;
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[0], RasterClassAttribute::new(1, 10, 20, 30, "Forest"));
        assert!(table.rows()[1].is_no_data());
        assert_eq!(table.rows()[2].class_name, "");
        Ok(())
    }

    #[test]
    fn missing_features() {
        assert!(matches!(
            ClassificationTable::from_json(br#"{"error": {"code": 498, "message": "Invalid token"}}"#),
            Err(Error::InvalidTable(_))
        ));
        assert!(matches!(ClassificationTable::from_json(b"<html></html>"), Err(Error::Json(_))));
    }

    #[test]
    fn invalid_attribute_values() {
        let json = br#"{"features": [{"attributes": {"Value": 1, "Red": 300, "Green": 0, "Blue": 0, "ClassName": "x"}}]}"#;
        assert!(matches!(ClassificationTable::from_json(json), Err(Error::Json(_))));
    }

    #[test]
    fn partial_records() -> Result<()> {
        let json = br#"{"features": [
            {"attributes": {"Value": 0, "ClassName": "No Data"}},
            {"attributes": {}},
            {"attributes": {"Value": 5, "Red": 200, "Green": null}},
            {"attributes": {"Red": 1, "Green": 2, "Blue": 3, "ClassName": "Orphan"}}
        ]}"#;

        let table = ClassificationTable::from_json(json)?;
        assert_eq!(
            table.rows(),
            &[
                RasterClassAttribute::new(0, 0, 0, 0, NO_DATA_CLASS),
                RasterClassAttribute::new(5, 200, 0, 0, ""),
            ]
        );
        Ok(())
    }

    #[test]
    fn first_match_wins() {
        let table = ClassificationTable::new(vec![
            RasterClassAttribute::new(4, 1, 1, 1, "First"),
            RasterClassAttribute::new(4, 2, 2, 2, "Second"),
        ]);

        assert_eq!(table.lookup(4).map(|row| row.class_name.as_str()), Some("First"));
        assert_eq!(table.lookup(5), None);
        assert_eq!(table.legend(1.0).color_for_value(4), Color::rgb(1, 1, 1));
    }

    #[test]
    fn legend_colors() {
        let table = ClassificationTable::new(vec![
            RasterClassAttribute::new(1, 10, 20, 30, "Forest"),
            RasterClassAttribute::new(2, 0, 0, 0, NO_DATA_CLASS),
        ]);

        let legend = table.legend(0.5);
        assert_eq!(legend.color_for_value(1), Color::rgba(10, 20, 30, 128));
        assert_eq!(legend.color_for_value(2), inf::color::TRANSPARENT);
        assert_eq!(legend.color_for_value(9), inf::color::TRANSPARENT);
        assert_eq!(legend.legend_entries().len(), 2);
    }
}
