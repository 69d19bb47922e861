//! Renders classified LERC raster tiles of an image service as RGBA tiles
//!
//! The raster attribute table of the service is loaded once when the layer is created,
//! every tile is fetched, decoded and colorized with the class colors of the table.
//! Rendering a tile never fails, failures produce an error tile with the reason drawn on it.

#![warn(clippy::unwrap_used)]

mod attributetable;
mod bitmap;
mod colorize;
mod config;
mod decode;
mod error;
mod errortile;
pub mod fetch;
mod layer;
mod layertype;
mod tile;

pub use attributetable::{ClassificationTable, NO_DATA_CLASS, RasterClassAttribute};
pub use bitmap::TileBitmap;
pub use colorize::{colorize, colorize_with_legend};
pub use config::{Crs, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_ZOOM, DEFAULT_TILE_SIZE, LayerConfig, MAX_SUPPORTED_ZOOM};
pub use decode::{DecodedRaster, LercDecoder, RasterDecoder};
pub use error::Error;
pub use errortile::error_tile;
pub use fetch::{Fetcher, HttpFetcher};
pub use layer::{ColorLayer, RenderedTile, TileStatus, create_color_layer, create_color_layer_with};
pub use layertype::LayerType;
pub use tile::{Tile, tiles_per_axis};

pub type Result<T = ()> = std::result::Result<T, Error>;
