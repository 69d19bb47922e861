//! Colorized map tiles for the classified LERC rasters of image services
//!
//! - [`colorlayer`]: the color layer, loads the raster attribute table and renders tiles
//! - [`lerc_decoder`]: pure Rust decoder of LERC2 payloads
//! - [`inf`]: colors and categoric legends

pub use colorlayer;
pub use inf;
pub use lerc_decoder;
#[cfg(feature = "tileserver")]
pub use tileserver;
