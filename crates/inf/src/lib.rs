#![warn(clippy::unwrap_used)]

pub use error::Error;
pub type Result<T = ()> = std::result::Result<T, Error>;

pub mod color;
mod colormapper;
mod error;
pub mod legend;

#[doc(inline)]
pub use color::Color;

#[doc(inline)]
pub use legend::CategoricLegend;
#[doc(inline)]
pub use legend::LegendCategory;
#[doc(inline)]
pub use legend::MappingConfig;
