//! Feed list parsing.
//!
//! The feed list is a two-column text table with a header row. Names containing a
//! comma are double-quoted:
//!
//! ```text
//! name,url
//! Soccer,https://example.com/soccer.ics
//! "Soccer, U10",https://example.com/u10.ics
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// One external calendar feed to import. Identity is the url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FeedListError {
    #[error("Failed to read feed list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: expected `name,url`")]
    MissingUrl { line: usize },

    #[error("Line {line}: invalid feed url {url:?}: {reason}")]
    InvalidUrl {
        line: usize,
        url: String,
        reason: String,
    },
}

/// Read and parse a feed list file.
pub fn load_feed_list(path: &Path) -> Result<Vec<FeedSource>, FeedListError> {
    let contents = std::fs::read_to_string(path).map_err(|source| FeedListError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_feed_list(&contents)
}

/// Parse feed list text. The first line is a header and is skipped, as are blank lines.
pub fn parse_feed_list(contents: &str) -> Result<Vec<FeedSource>, FeedListError> {
    let mut feeds = Vec::new();

    for (idx, line) in contents.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (name, url) = split_row(line)
            .filter(|(_, u)| !u.is_empty())
            .ok_or(FeedListError::MissingUrl { line: line_no })?;

        validate_feed_url(url).map_err(|reason| FeedListError::InvalidUrl {
            line: line_no,
            url: url.to_string(),
            reason,
        })?;

        feeds.push(FeedSource::new(name, url));
    }

    Ok(dedup_feeds(feeds))
}

/// Split a `name,url` row at the first comma outside a quoted name.
fn split_row(line: &str) -> Option<(&str, &str)> {
    let (name, url) = match line.strip_prefix('"') {
        Some(quoted) => {
            let (name, rest) = quoted.split_once('"')?;
            (name, rest.trim_start().strip_prefix(',')?)
        }
        None => line.split_once(',')?,
    };
    Some((name.trim(), url.trim().trim_matches('"')))
}

/// Check that `url` is an absolute http(s) or webcal url.
pub fn validate_feed_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    match parsed.scheme() {
        "http" | "https" | "webcal" => Ok(()),
        other => Err(format!("unsupported scheme {:?}", other)),
    }
}

/// Drop feeds whose url was already listed, keeping the first occurrence.
pub fn dedup_feeds(feeds: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    feeds
        .into_iter()
        .filter(|feed| {
            let first = seen.insert(feed.url.clone());
            if !first {
                tracing::warn!("Ignoring duplicate feed {} ({})", feed.name, feed.url);
            }
            first
        })
        .collect()
}
