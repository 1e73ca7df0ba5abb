mod fetcher;
mod parser;

pub use fetcher::{build_client, fetch_feed, FetchError};
pub use parser::{ParsedFeed, ParsedItem};
