use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    http::StatusCode,
    routing::get,
};

use colorlayer::{ColorLayer, Crs, LayerConfig, Tile, TileStatus, tiles_per_axis};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{AppError, Error, Result};

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    value: i64,
    class_name: String,
    color: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerResponse {
    tile_size: u32,
    min_zoom: i32,
    max_zoom: i32,
    crs: Crs,
    no_wrap: bool,
    opacity: f32,
    classes: Vec<ClassEntry>,
}

struct State {
    api: TileApiHandler,
}

enum TileResponse {
    /// The tile is not part of the grid of the layer
    Empty,
    Png { data: Vec<u8>, status: TileStatus },
}

async fn layer_info(state: axum::Extension<Arc<State>>) -> Json<LayerResponse> {
    state.api.layer_info()
}

async fn layer_tile(
    state: axum::Extension<Arc<State>>,
    axum::extract::Path((z, x, y)): axum::extract::Path<(i32, i32, String)>,
) -> std::result::Result<TileResponse, AppError> {
    let y = parse_tile_row(&y)?;
    Ok(state.api.get_tile(z, x, y).await?)
}

pub fn create_router(layer: ColorLayer) -> axum::routing::Router {
    let state = State {
        api: TileApiHandler::new(layer),
    };

    axum::Router::new()
        .route("/api/layer", get(layer_info))
        .route("/api/tiles/{z}/{x}/{y}", get(layer_tile))
        .layer(axum::Extension(Arc::new(state)))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Parses the row of a tile request, a `.png` extension is allowed
fn parse_tile_row(y: &str) -> Result<i32> {
    let index = y.strip_suffix(".png").unwrap_or(y);
    index
        .parse::<i32>()
        .map_err(|_| Error::InvalidArgument(format!("Invalid tile y index: {y}")))
}

/// The tile to render for the requested coordinate, `None` when the layer has no tile there
///
/// Columns outside of the grid are wrapped around the antimeridian unless wrapping is disabled.
pub fn resolve_tile(config: &LayerConfig, z: i32, x: i32, y: i32) -> Option<Tile> {
    if z < config.min_zoom || z > config.max_zoom {
        return None;
    }

    let count = tiles_per_axis(z);
    if !(0..count).contains(&(y as i64)) {
        return None;
    }

    let tile = Tile::new(x, y, z);
    if tile.is_within_grid() {
        Some(tile)
    } else if config.no_wrap {
        None
    } else {
        Some(tile.wrapped())
    }
}

impl axum::response::IntoResponse for TileResponse {
    fn into_response(self) -> axum::response::Response {
        let (data, status) = match self {
            TileResponse::Empty => return StatusCode::NO_CONTENT.into_response(),
            TileResponse::Png { data, status } => (data, status),
        };

        let tile_status = match status {
            TileStatus::Ready => "ready",
            TileStatus::Failed(_) => "error",
        };

        axum::response::Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "image/png")
            .header("X-Tile-Status", tile_status)
            .body(Body::from(data))
            .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, "Failed to create response").into_response())
    }
}

pub struct TileApiHandler {
    layer: ColorLayer,
}

impl TileApiHandler {
    pub fn new(layer: ColorLayer) -> Self {
        TileApiHandler { layer }
    }

    fn layer_info(&self) -> Json<LayerResponse> {
        let config = self.layer.config();
        let classes = self
            .layer
            .table()
            .rows()
            .iter()
            .map(|row| ClassEntry {
                value: row.value,
                class_name: row.class_name.clone(),
                color: row.color().to_hex_string(),
            })
            .collect();

        Json(LayerResponse {
            tile_size: config.tile_size,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            crs: config.crs,
            no_wrap: config.no_wrap,
            opacity: config.opacity,
            classes,
        })
    }

    async fn get_tile(&self, z: i32, x: i32, y: i32) -> Result<TileResponse> {
        let Some(tile) = resolve_tile(self.layer.config(), z, x, y) else {
            log::debug!("Tile request {z}/{x}/{y}: outside of the layer grid");
            return Ok(TileResponse::Empty);
        };

        log::debug!("Tile request {z}/{x}/{y}: rendering {tile}");
        let rendered = self.layer.render_tile(tile).await;
        let data = rendered.bitmap.encode_png()?;

        Ok(TileResponse::Png {
            data,
            status: rendered.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LayerConfig {
        LayerConfig {
            min_zoom: 1,
            max_zoom: 5,
            ..LayerConfig::new("https://example.com/ImageServer")
        }
    }

    #[test]
    fn tiles_inside_the_grid() {
        assert_eq!(resolve_tile(&config(), 2, 3, 1), Some(Tile::new(3, 1, 2)));
        assert_eq!(resolve_tile(&config(), 5, 31, 31), Some(Tile::new(31, 31, 5)));
    }

    #[test]
    fn zoom_outside_the_range() {
        assert_eq!(resolve_tile(&config(), 0, 0, 0), None);
        assert_eq!(resolve_tile(&config(), 6, 0, 0), None);
        assert_eq!(resolve_tile(&config(), -1, 0, 0), None);
    }

    #[test]
    fn rows_are_never_wrapped() {
        assert_eq!(resolve_tile(&config(), 2, 0, 4), None);
        assert_eq!(resolve_tile(&config(), 2, 0, -1), None);
    }

    #[test]
    fn columns_wrap_around() {
        assert_eq!(resolve_tile(&config(), 2, 4, 1), Some(Tile::new(0, 1, 2)));
        assert_eq!(resolve_tile(&config(), 2, -1, 1), Some(Tile::new(3, 1, 2)));

        let no_wrap = LayerConfig { no_wrap: true, ..config() };
        assert_eq!(resolve_tile(&no_wrap, 2, 4, 1), None);
        assert_eq!(resolve_tile(&no_wrap, 2, -1, 1), None);
        assert_eq!(resolve_tile(&no_wrap, 2, 2, 1), Some(Tile::new(2, 1, 2)));
    }

    #[test]
    fn tile_row_parsing() -> Result<()> {
        assert_eq!(parse_tile_row("12")?, 12);
        assert_eq!(parse_tile_row("12.png")?, 12);
        assert!(parse_tile_row("12.pbf").is_err());
        assert!(parse_tile_row("y").is_err());
        Ok(())
    }
}
