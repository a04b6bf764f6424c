//! Feed retrieval over HTTP.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use famcal_calendar::CalendarEvent;
use thiserror::Error;
use tracing::instrument;

use crate::ics::{parse_events, FeedEvent, IcsError};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Feed {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse feed {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: IcsError,
    },
}

/// Produces the events of one feed inside a time window.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FetchError>;
}

/// Fetches ICS feeds with reqwest and parses them with [`parse_events`].
pub struct HttpFeedFetcher {
    client: reqwest::Client,
}

impl HttpFeedFetcher {
    /// Timeouts and User-Agent come from the supplied client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    #[instrument(skip(self), level = "info")]
    async fn fetch(
        &self,
        url: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        let request_url = http_url(url);

        let response = self
            .client
            .get(&request_url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let events = parse_events(&body, window_start, window_end).map_err(|source| {
            FetchError::Parse {
                url: url.to_string(),
                source,
            }
        })?;

        tracing::debug!("Parsed {} events from {}", events.len(), url);
        Ok(events.into_iter().map(CalendarEvent::from).collect())
    }
}

/// `webcal://` is a subscription hint; the document itself is served over https.
fn http_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

impl From<FeedEvent> for CalendarEvent {
    fn from(event: FeedEvent) -> Self {
        Self {
            external_id: event.uid,
            title: event.summary,
            location: event.location,
            description: event.description,
            start: event.start,
            end: event.end,
        }
    }
}
