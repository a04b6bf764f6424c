//! Calendar feed sources, ICS parsing and retrieval.

pub mod fetch;
pub mod ics;
pub mod source;

pub use fetch::{FeedFetcher, FetchError, HttpFeedFetcher};
pub use ics::{parse_events, FeedEvent, IcsError};
pub use source::{load_feed_list, parse_feed_list, FeedListError, FeedSource};
