use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Options missing 'url' parameter, this should be the url of the image service")]
    MissingEndpoint,
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid raster attribute table: {0}")]
    InvalidTable(String),
    #[error("Failed to decode raster data: {0}")]
    Decode(#[from] lerc_decoder::LercError),
    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),
    #[error("Failed to encode png: {0}")]
    PngEncode(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unsupported layer type: {0}")]
    UnsupportedLayerType(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Infra error: {0}")]
    Inf(#[from] inf::Error),
}
