use std::sync::Arc;

use inf::CategoricLegend;

use crate::{
    Error, LayerConfig, Result,
    attributetable::ClassificationTable,
    bitmap::TileBitmap,
    colorize::colorize_with_legend,
    decode::{LercDecoder, RasterDecoder},
    errortile::error_tile,
    fetch::{self, Fetcher, HttpFetcher},
    tile::Tile,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStatus {
    Ready,
    /// The tile could not be rendered, the bitmap contains the error tile
    Failed(String),
}

/// The result of a tile render, there is always a bitmap of the configured tile size
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTile {
    pub bitmap: TileBitmap,
    pub status: TileStatus,
}

impl RenderedTile {
    pub fn is_ready(&self) -> bool {
        self.status == TileStatus::Ready
    }
}

/// Where in the tile pipeline a render failed
enum TileFailure {
    Fetch(Error),
    Decode(Error),
    Draw(Error),
}

impl TileFailure {
    /// The short text drawn on the error tile
    fn tile_message(&self) -> String {
        match self {
            TileFailure::Fetch(Error::HttpStatus { status, .. }) => format!("no tile: {status}"),
            TileFailure::Fetch(err) => err.to_string(),
            TileFailure::Decode(_) => "error decoding data".into(),
            TileFailure::Draw(_) => "error drawing data".into(),
        }
    }

    fn error(&self) -> &Error {
        match self {
            TileFailure::Fetch(err) | TileFailure::Decode(err) | TileFailure::Draw(err) => err,
        }
    }
}

/// Colorizes the classified raster tiles of an image service with its raster attribute table
///
/// Cloning is cheap, clones share the table and the http client.
pub struct ColorLayer<F = HttpFetcher, D = LercDecoder> {
    config: Arc<LayerConfig>,
    table: Arc<ClassificationTable>,
    legend: Arc<CategoricLegend>,
    fetcher: Arc<F>,
    decoder: Arc<D>,
}

impl<F, D> Clone for ColorLayer<F, D> {
    fn clone(&self) -> Self {
        ColorLayer {
            config: self.config.clone(),
            table: self.table.clone(),
            legend: self.legend.clone(),
            fetcher: self.fetcher.clone(),
            decoder: self.decoder.clone(),
        }
    }
}

impl<F: Fetcher> ColorLayer<F, LercDecoder> {
    /// Creates a layer from a loaded table, no requests are made
    pub fn new(fetcher: F, config: LayerConfig, table: ClassificationTable) -> Result<Self> {
        config.validate()?;
        let legend = table.legend(config.opacity);

        Ok(ColorLayer {
            config: Arc::new(config),
            table: Arc::new(table),
            legend: Arc::new(legend),
            fetcher: Arc::new(fetcher),
            decoder: Arc::new(LercDecoder),
        })
    }
}

impl<F: Fetcher, D: RasterDecoder> ColorLayer<F, D> {
    /// Replaces the decoder of the tile payloads
    pub fn with_decoder<T: RasterDecoder>(self, decoder: T) -> ColorLayer<F, T> {
        ColorLayer {
            config: self.config,
            table: self.table,
            legend: self.legend,
            fetcher: self.fetcher,
            decoder: Arc::new(decoder),
        }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    pub fn legend(&self) -> &CategoricLegend {
        &self.legend
    }

    pub fn tile_size(&self) -> usize {
        self.config.tile_size as usize
    }

    pub fn tile_url(&self, tile: Tile) -> String {
        fetch::tile_url(&self.config.url, tile, self.config.token())
    }

    /// Renders the tile, failures result in an error tile
    pub async fn render_tile(&self, tile: Tile) -> RenderedTile {
        match self.try_render_tile(tile).await {
            Ok(bitmap) => {
                log::debug!("Tile {tile}: ready");
                RenderedTile {
                    bitmap,
                    status: TileStatus::Ready,
                }
            }
            Err(failure) => {
                let err = failure.error();
                log::warn!("Tile {tile}: {err}");
                RenderedTile {
                    bitmap: error_tile(self.tile_size(), &failure.tile_message()),
                    status: TileStatus::Failed(err.to_string()),
                }
            }
        }
    }

    async fn try_render_tile(&self, tile: Tile) -> std::result::Result<TileBitmap, TileFailure> {
        let url = self.tile_url(tile);
        log::debug!("Tile {tile}: fetching {}", fetch::redact_token(&url));
        let payload = self.fetcher.get(&url).await.map_err(TileFailure::Fetch)?;

        log::debug!("Tile {tile}: decoding {} bytes", payload.len());
        let raster = self
            .decoder
            .decode(&payload)
            .and_then(|raster| raster.check_shape().map(|_| raster))
            .map_err(TileFailure::Decode)?;

        log::debug!("Tile {tile}: classifying {}x{} pixels", raster.width, raster.height);
        let bitmap = colorize_with_legend(&raster, &self.legend).map_err(TileFailure::Draw)?;
        Ok(bitmap.placed_on_canvas(self.tile_size()))
    }
}

/// Validates the configuration and loads the raster attribute table of the service
pub async fn create_color_layer(config: LayerConfig) -> Result<ColorLayer> {
    config.validate()?;
    let fetcher = HttpFetcher::new(config.fetch_timeout)?;
    create_color_layer_with(fetcher, config).await
}

/// Creates a color layer that performs its requests with the provided fetcher
pub async fn create_color_layer_with<F: Fetcher>(fetcher: F, config: LayerConfig) -> Result<ColorLayer<F>> {
    config.validate()?;
    let table = ClassificationTable::load(&fetcher, &config.url, config.token()).await?;
    if table.is_empty() {
        log::warn!("The raster attribute table of {} has no classes", config.url);
    }

    ColorLayer::new(fetcher, config, table)
}
