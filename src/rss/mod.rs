//! Feed fetching and parsing.
//!
//! A [`FeedSource`] turns a feed URL into canonical [`FetchedArticle`]s. The
//! HTTP implementation handles retries, compressed and non-UTF-8 bodies and
//! malformed XML; [`SourceResolver`] names the outlet behind each feed.

mod client;
mod fetcher;
mod parser;
mod source;
mod types;
mod util;

pub use self::client::{create_http_client, fetch_with_fallback};
pub use self::fetcher::{FeedSource, HttpFeedSource};
pub use self::parser::parse_feed;
pub use self::source::SourceResolver;
pub use self::types::*;
pub use self::util::{is_valid_url, strip_html};
