//! The calendar service seam used by the sync core.

use async_trait::async_trait;

use crate::error::CalendarError;
use crate::types::{AccessRole, Calendar, CalendarEvent, Event, Page};

/// Remote calendar operations the sync core depends on.
///
/// Listing operations are paginated: pass `None` for the first page and the returned
/// `next_page_token` for each following page.
#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn list_calendars(&self, page_token: Option<&str>)
        -> Result<Page<Calendar>, CalendarError>;

    async fn create_calendar(&self, summary: &str) -> Result<Calendar, CalendarError>;

    /// Add `calendar_id` to the caller's calendar list under `display_name`.
    async fn insert_calendar_list_entry(
        &self,
        calendar_id: &str,
        display_name: &str,
        access_role: AccessRole,
    ) -> Result<Calendar, CalendarError>;

    async fn delete_calendar(&self, calendar_id: &str) -> Result<(), CalendarError>;

    async fn list_events(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Event>, CalendarError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), CalendarError>;

    async fn insert_event(
        &self,
        calendar_id: &str,
        event: &CalendarEvent,
    ) -> Result<Event, CalendarError>;
}
