use serde::Deserialize;
use thiserror::Error;

/// RSS 2.0 decode failure (malformed XML or a shape we don't recognize).
#[derive(Debug, Error)]
#[error("feed decode error: {0}")]
pub struct ParseError(String);

// ============================================================================
// Wire Shape (RSS 2.0)
// ============================================================================

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// ============================================================================
// Parsed Feed
// ============================================================================

/// Channel metadata plus the ordered item list from one fetched payload.
///
/// Ephemeral: lives only for the duration of a single ingestion cycle and
/// is never persisted as-is.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub link: Option<String>,
    pub description: Option<String>,
    pub items: Vec<ParsedItem>,
}

/// One entry of a fetched feed, pre-persistence.
///
/// `pub_date` stays a raw string here: the ingestion pipeline applies the
/// strict publish-date format, so decode never hides a malformed date.
#[derive(Debug, Clone)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub pub_date: String,
}

/// Decode raw response bytes as an RSS 2.0 document.
///
/// Missing optional elements collapse to empty strings, matching the
/// leniency of a plain XML decode; structural problems are errors.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let rss: Rss =
        quick_xml::de::from_reader(bytes).map_err(|e| ParseError(e.to_string()))?;

    let channel = rss.channel;
    let items = channel
        .items
        .into_iter()
        .map(|item| ParsedItem {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default(),
            description: item.description,
            pub_date: item.pub_date.unwrap_or_default(),
        })
        .collect();

    Ok(ParsedFeed {
        title: channel.title.unwrap_or_default(),
        link: channel.link,
        description: channel.description,
        items,
    })
}
