use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use colorlayer::{
    ColorLayer, DecodedRaster, Error, Fetcher, LayerConfig, RasterDecoder, Result, Tile, TileStatus, create_color_layer_with,
};
use lerc_decoder::{DataType, testutils::BlobWriter};

const SERVICE_URL: &str = "https://example.com/arcgis/rest/services/landcover/ImageServer";

const TABLE_JSON: &str = r#"{
    "features": [
        {"attributes": {"OBJECTID": 1, "Value": 1, "Red": 10, "Green": 20, "Blue": 30, "ClassName": "Forest"}},
        {"attributes": null},
        {"attributes": {"OBJECTID": 2, "Value": 2, "Red": 0, "Green": 0, "Blue": 0, "ClassName": "No Data"}},
        {"attributes": null},
        {"attributes": {"OBJECTID": 3, "Value": 3, "Red": 0, "Green": 0, "Blue": 255, "ClassName": "Water"}}
    ]
}"#;

/// Serves canned responses and records the requested urls, unknown urls are a 404
#[derive(Clone, Default)]
struct FakeFetcher {
    responses: Arc<HashMap<String, Bytes>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeFetcher {
    fn new(responses: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        FakeFetcher {
            responses: Arc::new(responses.into_iter().map(|(url, body)| (url, Bytes::from(body))).collect()),
            requests: Arc::default(),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("poisoned lock").clone()
    }
}

impl Fetcher for FakeFetcher {
    async fn get(&self, url: &str) -> Result<Bytes> {
        self.requests.lock().expect("poisoned lock").push(url.to_string());
        self.responses.get(url).cloned().ok_or_else(|| Error::HttpStatus {
            status: 404,
            url: url.to_string(),
        })
    }
}

fn table_url() -> String {
    format!("{SERVICE_URL}/rasterattributetable?f=json")
}

fn tile_url(tile: Tile) -> String {
    format!("{SERVICE_URL}/tile/{}/{}/{}", tile.z, tile.y, tile.x)
}

fn landcover_blob() -> Vec<u8> {
    BlobWriter::new(3, 1, DataType::Byte, vec![1, 2, 9]).encode()
}

async fn create_layer(config: LayerConfig, tiles: Vec<(Tile, Vec<u8>)>) -> Result<(ColorLayer<FakeFetcher>, FakeFetcher)> {
    let mut responses = vec![(table_url(), TABLE_JSON.as_bytes().to_vec())];
    responses.extend(tiles.into_iter().map(|(tile, blob)| (tile_url(tile), blob)));

    let fetcher = FakeFetcher::new(responses);
    let layer = create_color_layer_with(fetcher.clone(), config).await?;
    Ok((layer, fetcher))
}

fn alpha_values(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4).map(|pixel| pixel[3]).collect()
}

#[test_log::test(tokio::test)]
async fn render_classified_tile() -> Result<()> {
    let tile = Tile::new(5, 7, 3);
    let config = LayerConfig {
        tile_size: 3,
        ..LayerConfig::new(SERVICE_URL)
    };

    let (layer, fetcher) = create_layer(config, vec![(tile, landcover_blob())]).await?;
    assert_eq!(layer.table().len(), 3);

    let rendered = layer.render_tile(tile).await;
    assert_eq!(rendered.status, TileStatus::Ready);
    assert_eq!(
        &rendered.bitmap.as_rgba_bytes()[..12],
        &[10, 20, 30, 255, 0, 0, 0, 0, 0, 0, 0, 0]
    );
    // the 3x1 raster only covers the first row of the tile
    assert_eq!(rendered.bitmap.as_rgba_bytes().len(), 3 * 3 * 4);
    assert_eq!(rendered.bitmap.visible_pixel_count(), 1);

    assert_eq!(fetcher.requests(), [table_url(), tile_url(tile)]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn masked_pixels_are_transparent() -> Result<()> {
    let tile = Tile::new(0, 0, 0);
    let blob = BlobWriter::new(2, 2, DataType::Byte, vec![1, 3, 3, 1])
        .with_mask(vec![true, false, true, false])
        .encode();
    let config = LayerConfig {
        tile_size: 2,
        ..LayerConfig::new(SERVICE_URL)
    };

    let (layer, _) = create_layer(config, vec![(tile, blob)]).await?;
    let rendered = layer.render_tile(tile).await;
    assert!(rendered.is_ready());
    assert_eq!(
        rendered.bitmap.as_rgba_bytes(),
        &[10, 20, 30, 255, 0, 0, 0, 0, 0, 0, 255, 255, 0, 0, 0, 0]
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn opacity_is_applied() -> Result<()> {
    let tile = Tile::new(1, 1, 1);
    let config = LayerConfig {
        tile_size: 3,
        opacity: 0.5,
        ..LayerConfig::new(SERVICE_URL)
    };

    let (layer, _) = create_layer(config, vec![(tile, landcover_blob())]).await?;
    let rendered = layer.render_tile(tile).await;
    assert_eq!(alpha_values(&rendered.bitmap.as_rgba_bytes()[..12]), [128, 0, 0]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rendering_is_idempotent() -> Result<()> {
    let tile = Tile::new(2, 3, 4);
    let blob = BlobWriter::new(16, 16, DataType::Byte, (0..256).map(|i| i % 4).collect()).encode();
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), vec![(tile, blob)]).await?;

    let first = layer.render_tile(tile).await;
    let second = layer.clone().render_tile(tile).await;
    assert!(first.is_ready());
    assert_eq!(first, second);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn missing_tile_renders_error_tile() -> Result<()> {
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), Vec::new()).await?;

    let rendered = layer.render_tile(Tile::new(9, 9, 9)).await;
    assert!(matches!(&rendered.status, TileStatus::Failed(msg) if msg.contains("404")));
    assert_eq!(rendered.bitmap.width(), 256);
    assert_eq!(rendered.bitmap.height(), 256);
    assert_eq!(rendered.bitmap.as_rgba_bytes().len(), 256 * 256 * 4);
    assert!(rendered.bitmap.visible_pixel_count() > 0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn undecodable_tile_renders_error_tile() -> Result<()> {
    let tile = Tile::new(0, 0, 1);
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), vec![(tile, b"<html>busy</html>".to_vec())]).await?;

    let rendered = layer.render_tile(tile).await;
    assert!(!rendered.is_ready());
    assert_eq!(rendered.bitmap.as_rgba_bytes().len(), 256 * 256 * 4);
    assert!(rendered.bitmap.visible_pixel_count() > 0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn oversized_raster_renders_error_tile() -> Result<()> {
    let tile = Tile::new(0, 0, 1);
    let blob = lerc_decoder::testutils::empty_blob(60_000, 60_000, DataType::Byte);
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), vec![(tile, blob)]).await?;

    let rendered = layer.render_tile(tile).await;
    assert!(matches!(&rendered.status, TileStatus::Failed(msg) if msg.contains("exceeds the maximum")));
    assert_eq!(rendered.bitmap.as_rgba_bytes().len(), 256 * 256 * 4);
    assert!(rendered.bitmap.visible_pixel_count() > 0);
    Ok(())
}

struct ShortPayloadDecoder;

impl RasterDecoder for ShortPayloadDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<DecodedRaster> {
        Ok(DecodedRaster::new(4, 4, vec![1, 2, 3]))
    }
}

#[test_log::test(tokio::test)]
async fn unexpected_payload_shape_renders_error_tile() -> Result<()> {
    let tile = Tile::new(0, 0, 0);
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), vec![(tile, landcover_blob())]).await?;
    let layer = layer.with_decoder(ShortPayloadDecoder);

    let rendered = layer.render_tile(tile).await;
    assert!(matches!(&rendered.status, TileStatus::Failed(msg) if msg.contains("Unexpected payload")));
    assert_eq!(rendered.bitmap.as_rgba_bytes().len(), 256 * 256 * 4);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn missing_url_makes_no_requests() {
    let fetcher = FakeFetcher::default();
    let result = create_color_layer_with(fetcher.clone(), LayerConfig::default()).await;

    assert!(matches!(result, Err(Error::MissingEndpoint)));
    assert!(fetcher.requests().is_empty());
}

#[test_log::test(tokio::test)]
async fn token_is_appended_to_every_request() -> Result<()> {
    let tile = Tile::new(5, 7, 3);
    let fetcher = FakeFetcher::new([
        (format!("{SERVICE_URL}/rasterattributetable?f=json&token=secret"), TABLE_JSON.as_bytes().to_vec()),
        (format!("{SERVICE_URL}/tile/3/7/5?token=secret"), landcover_blob()),
    ]);

    let config = LayerConfig {
        token: Some("secret".into()),
        ..LayerConfig::new(format!("{SERVICE_URL}/"))
    };

    let layer = create_color_layer_with(fetcher.clone(), config).await?;
    assert!(layer.render_tile(tile).await.is_ready());
    assert_eq!(
        fetcher.requests(),
        [
            format!("{SERVICE_URL}/rasterattributetable?f=json&token=secret"),
            format!("{SERVICE_URL}/tile/3/7/5?token=secret"),
        ]
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn table_load_failures() {
    let fetcher = FakeFetcher::default();
    let result = create_color_layer_with(fetcher, LayerConfig::new(SERVICE_URL)).await;
    assert!(matches!(result, Err(Error::HttpStatus { status: 404, .. })));

    let fetcher = FakeFetcher::new([(table_url(), b"{\"error\": {\"code\": 498}}".to_vec())]);
    let result = create_color_layer_with(fetcher, LayerConfig::new(SERVICE_URL)).await;
    assert!(matches!(result, Err(Error::InvalidTable(_))));

    let fetcher = FakeFetcher::new([(table_url(), b"not json".to_vec())]);
    let result = create_color_layer_with(fetcher, LayerConfig::new(SERVICE_URL)).await;
    assert!(matches!(result, Err(Error::Json(_))));
}

#[test_log::test(tokio::test)]
async fn concurrent_tiles() -> Result<()> {
    let tiles: Vec<Tile> = (0..4).map(|x| Tile::new(x, 0, 2)).collect();
    let blobs = tiles.iter().map(|&tile| (tile, landcover_blob())).collect();
    let config = LayerConfig {
        tile_size: 3,
        ..LayerConfig::new(SERVICE_URL)
    };
    let (layer, fetcher) = create_layer(config, blobs).await?;

    let handles: Vec<_> = tiles
        .iter()
        .map(|&tile| {
            let layer = layer.clone();
            tokio::spawn(async move { layer.render_tile(tile).await })
        })
        .collect();

    for handle in handles {
        let rendered = handle.await.expect("render task panicked");
        assert!(rendered.is_ready());
    }

    assert_eq!(fetcher.requests().len(), 1 + tiles.len());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rendered_tile_encodes_as_png() -> Result<()> {
    let tile = Tile::new(0, 0, 0);
    let (layer, _) = create_layer(LayerConfig::new(SERVICE_URL), vec![(tile, landcover_blob())]).await?;

    let png = layer.render_tile(tile).await.bitmap.encode_png()?;
    assert_eq!(&png[1..4], b"PNG");
    assert_eq!(u32::from_be_bytes([png[16], png[17], png[18], png[19]]), 256);
    assert_eq!(u32::from_be_bytes([png[20], png[21], png[22], png[23]]), 256);
    Ok(())
}
