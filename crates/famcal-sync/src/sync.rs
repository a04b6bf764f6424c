//! Clear-and-reload of the destination calendar.

use famcal_calendar::CalendarService;
use famcal_feeds::{FeedFetcher, FeedSource};
use serde::Serialize;
use tracing::instrument;

use crate::clear::clear;
use crate::error::SyncError;
use crate::import::{import_all, ImportSummary};
use crate::window::SyncWindow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub deleted: usize,
    pub imported: ImportSummary,
}

/// Empty `calendar_id`, then import every feed into it.
///
/// The two phases are not transactional: a failed import leaves the calendar with
/// whatever was inserted before the failure.
#[instrument(skip(service, fetcher, feeds), level = "info")]
pub async fn sync(
    service: &dyn CalendarService,
    fetcher: &dyn FeedFetcher,
    calendar_id: &str,
    feeds: &[FeedSource],
    window: &SyncWindow,
) -> Result<SyncReport, SyncError> {
    let deleted = clear(service, calendar_id).await?;
    let imported = import_all(service, fetcher, calendar_id, feeds, window).await?;

    tracing::info!(
        "Sync of {} complete: {} deleted, {} imported",
        calendar_id,
        deleted,
        imported.total()
    );
    Ok(SyncReport { deleted, imported })
}
