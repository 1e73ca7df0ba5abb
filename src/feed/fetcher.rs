use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_feed, ParsedFeed};

/// Per-request deadline. An unresponsive server must not stall the
/// scheduler past this bound.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while retrieving and decoding one feed.
///
/// The ingestion pipeline treats every variant the same way — the cycle's
/// fetch failed — so no caller needs to distinguish network trouble from
/// a malformed payload.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the per-fetch deadline
    #[error("request timed out")]
    Timeout,
    /// Body could not be decoded as RSS 2.0
    #[error("decode error: {0}")]
    Decode(String),
}

/// Build the HTTP client used for all feed retrieval.
///
/// Carries an identifying User-Agent so feed servers can tell this
/// aggregator apart from browsers.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("trawl/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Retrieve and decode one feed.
///
/// A single GET, no retries, no caching: retry policy belongs to the
/// caller, and this design's policy is "try again next time the feed
/// rotates to the front of the queue".
pub async fn fetch_feed(
    client: &reqwest::Client,
    url: &str,
) -> Result<ParsedFeed, FetchError> {
    fetch_with_deadline(client, url, FETCH_TIMEOUT).await
}

async fn fetch_with_deadline(
    client: &reqwest::Client,
    url: &str,
    deadline: Duration,
) -> Result<ParsedFeed, FetchError> {
    let response = tokio::time::timeout(deadline, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    let bytes = tokio::time::timeout(deadline, response.bytes())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    parse_feed(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
}
