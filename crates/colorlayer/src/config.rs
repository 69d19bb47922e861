use std::{fmt, path::Path, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const DEFAULT_MAX_ZOOM: i32 = 18;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);
/// Tile coordinates of deeper levels no longer fit in an i32
pub const MAX_SUPPORTED_ZOOM: i32 = 30;
const MAX_TILE_SIZE: u32 = 4096;

/// Coordinate reference system of the tile grid, passed through to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Crs {
    #[default]
    #[serde(rename = "EPSG:3857")]
    WebMercator,
    #[serde(rename = "EPSG:4326")]
    Wgs84,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::WebMercator => 3857,
            Crs::Wgs84 => 4326,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EPSG:3857" | "EPSG:900913" => Ok(Crs::WebMercator),
            "EPSG:4326" => Ok(Crs::Wgs84),
            _ => Err(Error::InvalidArgument(format!("Unsupported crs: {s}"))),
        }
    }
}

/// Configuration of a color layer, immutable for the lifetime of the layer
///
/// Serialized with camelCase keys, missing keys take their default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerConfig {
    /// Url of the image service, the tile and attribute table endpoints are relative to it
    pub url: String,
    /// Opaque access token appended as query parameter to every request
    pub token: Option<String>,
    pub tile_size: u32,
    /// Opacity in the range [0, 1] of the classified pixels
    pub opacity: f32,
    pub crs: Crs,
    pub no_wrap: bool,
    pub min_zoom: i32,
    pub max_zoom: i32,
    #[serde(rename = "fetchTimeoutSeconds", with = "duration_seconds")]
    pub fetch_timeout: Duration,
}

impl Default for LayerConfig {
    fn default() -> Self {
        LayerConfig {
            url: String::new(),
            token: None,
            tile_size: DEFAULT_TILE_SIZE,
            opacity: 1.0,
            crs: Crs::default(),
            no_wrap: false,
            min_zoom: 0,
            max_zoom: DEFAULT_MAX_ZOOM,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl LayerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        LayerConfig {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        LayerConfig::from_json(&json)
    }

    /// The token to send, an empty token is no token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::MissingEndpoint);
        }

        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(Error::InvalidArgument(format!(
                "Tile size must be in the range [1, {MAX_TILE_SIZE}], got {}",
                self.tile_size
            )));
        }

        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidArgument(format!("Opacity must be in the range [0, 1], got {}", self.opacity)));
        }

        if self.min_zoom < 0 || self.max_zoom > MAX_SUPPORTED_ZOOM || self.min_zoom > self.max_zoom {
            return Err(Error::InvalidArgument(format!(
                "Invalid zoom range [{}, {}], levels must be in [0, {MAX_SUPPORTED_ZOOM}]",
                self.min_zoom, self.max_zoom
            )));
        }

        if self.fetch_timeout.is_zero() {
            return Err(Error::InvalidArgument("Fetch timeout must be positive".into()));
        }

        Ok(())
    }
}

mod duration_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let seconds = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(seconds).map_err(|err| D::Error::custom(format!("Invalid duration {seconds}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults() {
        let config = LayerConfig::new("https://example.com/arcgis/rest/services/landcover/ImageServer");
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.opacity, 1.0);
        assert_eq!(config.crs, Crs::WebMercator);
        assert!(!config.no_wrap);
        assert_eq!(config.max_zoom, 18);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_with_defaults() -> Result<()> {
        let config = LayerConfig::from_json(
            r#"{"url": "https://example.com/ImageServer", "token": "abc", "opacity": 0.7, "noWrap": true, "crs": "EPSG:4326", "fetchTimeoutSeconds": 2.5}"#,
        )?;

        assert_eq!(config.url, "https://example.com/ImageServer");
        assert_eq!(config.token(), Some("abc"));
        assert_relative_eq!(config.opacity, 0.7);
        assert!(config.no_wrap);
        assert_eq!(config.crs, Crs::Wgs84);
        assert_eq!(config.tile_size, DEFAULT_TILE_SIZE);
        assert_eq!(config.fetch_timeout, Duration::from_millis(2500));
        Ok(())
    }

    #[test]
    fn json_roundtrip() -> Result<()> {
        let config = LayerConfig {
            token: Some("secret".into()),
            tile_size: 512,
            ..LayerConfig::new("https://example.com/ImageServer")
        };

        let json = serde_json::to_string(&config)?;
        assert!(json.contains("\"tileSize\":512"));
        assert_eq!(LayerConfig::from_json(&json)?, config);
        Ok(())
    }

    #[test]
    fn config_file() -> Result<()> {
        let path = std::env::temp_dir().join(format!("colorlayer-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"url": "https://example.com/ImageServer", "tileSize": 512}"#)?;
        let config = LayerConfig::from_file(&path);
        std::fs::remove_file(&path)?;

        assert_eq!(config?.tile_size, 512);
        assert!(matches!(LayerConfig::from_file(Path::new("/nonexistent/config.json")), Err(Error::Io(_))));
        Ok(())
    }

    #[test]
    fn missing_url() {
        assert!(matches!(LayerConfig::default().validate(), Err(Error::MissingEndpoint)));
        assert!(matches!(LayerConfig::new("  ").validate(), Err(Error::MissingEndpoint)));
    }

    #[test]
    fn invalid_values() {
        let url = "https://example.com/ImageServer";
        let invalid = [
            LayerConfig { tile_size: 0, ..LayerConfig::new(url) },
            LayerConfig { opacity: 1.5, ..LayerConfig::new(url) },
            LayerConfig { opacity: f32::NAN, ..LayerConfig::new(url) },
            LayerConfig { min_zoom: 5, max_zoom: 4, ..LayerConfig::new(url) },
            LayerConfig { max_zoom: 31, ..LayerConfig::new(url) },
            LayerConfig { fetch_timeout: Duration::ZERO, ..LayerConfig::new(url) },
        ];

        for config in invalid {
            assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))), "{config:?}");
        }
    }

    #[test]
    fn empty_token_is_no_token() {
        let config = LayerConfig {
            token: Some(String::new()),
            ..LayerConfig::new("https://example.com/ImageServer")
        };
        assert_eq!(config.token(), None);
    }

    #[test]
    fn crs_parsing() -> Result<()> {
        assert_eq!("epsg:3857".parse::<Crs>()?, Crs::WebMercator);
        assert_eq!("EPSG:4326".parse::<Crs>()?, Crs::Wgs84);
        assert_eq!(Crs::WebMercator.to_string(), "EPSG:3857");
        assert!("EPSG:31370".parse::<Crs>().is_err());
        Ok(())
    }
}
