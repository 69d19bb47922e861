use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{ColorLayer, Error, LayerConfig, Result, layer};

/// Item types of a map content catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    #[serde(rename = "ArcGISTiledMapServiceLayer")]
    TiledMapService,
    #[serde(rename = "ArcGISMapServiceLayer")]
    MapService,
    #[serde(rename = "VectorTileLayer")]
    VectorTile,
    #[serde(rename = "ArcGISImageServiceLayer")]
    ImageService,
    #[serde(rename = "ArcGISFeatureLayer")]
    FeatureLayer,
    #[serde(rename = "Lerc8bitColorLayer")]
    Lerc8bitColor,
}

impl LayerType {
    pub const ALL: [LayerType; 6] = [
        LayerType::TiledMapService,
        LayerType::MapService,
        LayerType::VectorTile,
        LayerType::ImageService,
        LayerType::FeatureLayer,
        LayerType::Lerc8bitColor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::TiledMapService => "ArcGISTiledMapServiceLayer",
            LayerType::MapService => "ArcGISMapServiceLayer",
            LayerType::VectorTile => "VectorTileLayer",
            LayerType::ImageService => "ArcGISImageServiceLayer",
            LayerType::FeatureLayer => "ArcGISFeatureLayer",
            LayerType::Lerc8bitColor => "Lerc8bitColorLayer",
        }
    }

    /// Only the lerc color layer is rendered by this crate, the other types are handled by the map host
    pub async fn create_color_layer(&self, config: LayerConfig) -> Result<ColorLayer> {
        match self {
            LayerType::Lerc8bitColor => layer::create_color_layer(config).await,
            _ => Err(Error::UnsupportedLayerType(self.to_string())),
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        LayerType::ALL
            .into_iter()
            .find(|layer_type| layer_type.as_str() == s)
            .ok_or_else(|| Error::UnsupportedLayerType(s.to_string()))
    }
}
