use std::{future::Future, time::Duration};

use bytes::Bytes;

use crate::{Error, Result, tile::Tile};

/// Retrieves the body of a GET request
///
/// A non-success status is an error, the body of such a response is never returned.
pub trait Fetcher: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Fetcher backed by a shared reqwest client
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Every request is aborted when it did not complete within the timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Http(format!("Failed to create http client: {err}")))?;

        Ok(HttpFetcher::with_client(client))
    }

    /// Uses the timeout and proxy configuration of the provided client
    pub fn with_client(client: reqwest::Client) -> Self {
        HttpFetcher { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Bytes> {
        let response = self.client.get(url).send().await.map_err(|err| {
            Error::Http(if err.is_timeout() {
                format!("Request timed out: {}", redact_token(url))
            } else {
                format!("Failed to fetch {}: {}", redact_token(url), err.without_url())
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                url: redact_token(url),
            });
        }

        response
            .bytes()
            .await
            .map_err(|err| Error::Http(format!("Failed to read the response of {}: {}", redact_token(url), err.without_url())))
    }
}

fn with_token(url: String, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}token={token}")
        }
        _ => url,
    }
}

fn service_url(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

/// `{url}/rasterattributetable?f=json[&token=...]`
pub fn attribute_table_url(url: &str, token: Option<&str>) -> String {
    with_token(format!("{}/rasterattributetable?f=json", service_url(url)), token)
}

/// `{url}/tile/{z}/{y}/{x}[?token=...]`
pub fn tile_url(url: &str, tile: Tile, token: Option<&str>) -> String {
    with_token(format!("{}/tile/{}/{}/{}", service_url(url), tile.z, tile.y, tile.x), token)
}

/// Hides the value of the token query parameter, urls end up in logs and error tiles
pub fn redact_token(url: &str) -> String {
    let Some(start) = url.find("token=").map(|pos| pos + "token=".len()) else {
        return url.to_string();
    };

    let end = url[start..].find('&').map_or(url.len(), |pos| start + pos);
    format!("{}***{}", &url[..start], &url[end..])
}
