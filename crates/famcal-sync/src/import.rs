//! Copying feed events into the destination calendar.

use famcal_calendar::CalendarService;
use famcal_feeds::{FeedFetcher, FeedSource};
use serde::Serialize;
use tracing::instrument;

use crate::error::ImportError;
use crate::window::SyncWindow;

/// Events inserted for one feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedImport {
    pub feed: String,
    pub url: String,
    pub inserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub feeds: Vec<FeedImport>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.feeds.iter().map(|f| f.inserted).sum()
    }
}

/// Fetch each feed in order and insert its events into `calendar_id`.
///
/// Stops at the first fetch or insert failure; events inserted before it stay.
#[instrument(skip(service, fetcher, feeds), fields(feeds = feeds.len()), level = "info")]
pub async fn import_all(
    service: &dyn CalendarService,
    fetcher: &dyn FeedFetcher,
    calendar_id: &str,
    feeds: &[FeedSource],
    window: &SyncWindow,
) -> Result<ImportSummary, ImportError> {
    let mut summary = ImportSummary::default();

    for feed in feeds {
        let events = fetcher
            .fetch(&feed.url, window.start, window.end)
            .await
            .map_err(|source| ImportError::Fetch {
                feed: feed.name.clone(),
                source,
            })?;

        if events.is_empty() {
            tracing::info!("Feed {} has no events in the window", feed.name);
        }

        let mut inserted = 0;
        for mut event in events {
            // The destination assigns its own ids.
            event.external_id = None;
            let created = service
                .insert_event(calendar_id, &event)
                .await
                .map_err(|source| ImportError::Insert {
                    feed: feed.name.clone(),
                    source,
                })?;
            tracing::debug!("Inserted event {} from {}", created.id, feed.name);
            inserted += 1;
        }

        tracing::info!("Imported {} events from {}", inserted, feed.name);
        summary.feeds.push(FeedImport {
            feed: feed.name.clone(),
            url: feed.url.clone(),
            inserted,
        });
    }

    Ok(summary)
}
