//! Emptying the destination calendar.

use famcal_calendar::CalendarService;
use tracing::instrument;

use crate::error::ClearError;

/// Delete every event in `calendar_id` and return how many were deleted.
///
/// All pages are listed before the first deletion. The first failure aborts and
/// leaves the calendar partially cleared.
#[instrument(skip(service), level = "info")]
pub async fn clear(service: &dyn CalendarService, calendar_id: &str) -> Result<usize, ClearError> {
    let mut event_ids = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = service
            .list_events(calendar_id, page_token.as_deref())
            .await
            .map_err(ClearError::List)?;
        event_ids.extend(page.items.into_iter().map(|event| event.id));

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    for event_id in &event_ids {
        service
            .delete_event(calendar_id, event_id)
            .await
            .map_err(|source| ClearError::Delete {
                event_id: event_id.clone(),
                source,
            })?;
        tracing::debug!("Deleted event {}", event_id);
    }

    tracing::info!("Deleted {} events from {}", event_ids.len(), calendar_id);
    Ok(event_ids.len())
}
