use axum::{
    Json, http,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::Error;

/// Our app's top level error type.
#[derive(Debug)]
pub enum AppError {
    /// Something went wrong when rendering or encoding a tile.
    Error(Error),
}

impl From<crate::Error> for AppError {
    fn from(inner: crate::Error) -> Self {
        AppError::Error(inner)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Error(err) => match err {
                Error::InvalidArgument(err) => (http::StatusCode::BAD_REQUEST, err),
                Error::MissingEndpoint | Error::UnsupportedLayerType(_) => (http::StatusCode::BAD_REQUEST, err.to_string()),
                Error::Http(_) | Error::HttpStatus { .. } => (http::StatusCode::BAD_GATEWAY, err.to_string()),
                Error::Json(_)
                | Error::InvalidTable(_)
                | Error::Decode(_)
                | Error::UnexpectedPayload(_)
                | Error::PngEncode(_)
                | Error::Io(_)
                | Error::Inf(_) => (http::StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
